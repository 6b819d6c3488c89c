// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One-way IMAP mailbox replicator with at-most-once delivery.
//!
//! Reads new mail from one or more source (Gmail-style) mailboxes and
//! appends it to folders under a single shared destination (Outlook-style)
//! mailbox, tracking per-route progress durably so that a crash mid-cycle
//! never re-delivers a message that already landed.

pub mod config;
pub mod contracts;
pub mod engine;
pub mod fingerprint;
pub mod imap;
pub mod oauth;
pub mod retry;
pub mod state;
