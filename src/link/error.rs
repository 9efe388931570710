/*
SPDX-FileCopyrightText: Copyright 2026 Dosewatch Authors
SPDX-License-Identifier: MIT
*/

//! Structured error type for the connectivity channel.
//!
//! All variants are *transient link errors* in the system's taxonomy:
//! recovered locally by [`ResilientChannel`](super::ResilientChannel) via
//! reconnect-and-retry, logged, and never surfaced to the scheduling
//! logic.  Logic errors (out-of-range dose times) live in
//! [`schedule::TimeOfDayError`](crate::schedule::TimeOfDayError) and are
//! rejected at configuration time instead.
//!
//! **Do not** collapse this into `anyhow::Error` — the variants tell the
//! channel (and the logs) which recovery stage failed.

use thiserror::Error;

/// A failure reported by a [`StatusLink`](super::StatusLink)
/// implementation.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The underlying network association (e.g. Wi-Fi station mode) could
    /// not be established.
    #[error("network association failed: {0}")]
    Association(String),

    /// The network is up but the message-broker session could not be
    /// (re-)established.
    #[error("broker session failed: {0}")]
    Session(String),

    /// A publish attempt on an established session failed.
    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
}
