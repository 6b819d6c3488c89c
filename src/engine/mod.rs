// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub mod connectors;
pub mod cycle_driver;
pub mod error;
pub mod result;
pub mod route_runner;

pub use cycle_driver::run_cycle;
pub use error::EngineError;
pub use result::{RouteRunResult, RouteStatus, SyncRunResult};
