/*
SPDX-FileCopyrightText: Copyright 2026 Dosewatch Authors
SPDX-License-Identifier: MIT
*/

//! Dosewatch – medication-reminder controller (Rust port)
//!
//! Tracks a daily schedule of dose times, raises a persistent light+sound
//! alert at each one, blocks until the user physically confirms, and
//! reports status transitions best-effort over a lossy link.
//!
//! ```text
//! lib.rs
//! ├── config/       – YAML reminder configuration (schedule, topics, timing)
//! ├── schedule/     – DoseTime + per-day fired-mark bookkeeping
//! ├── controller/   – the dose cycle state machine
//! ├── link/         – StatusLink seam + reconnect-then-retry-once channel
//! └── device/       – clock / indicator / button seams + host simulation
//! ```

pub mod config;
pub mod controller;
pub mod device;
pub mod link;
pub mod schedule;
