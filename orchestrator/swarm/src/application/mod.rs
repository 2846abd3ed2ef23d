// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the message bus and the round loop that drives it.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements publishing, delivery and round scheduling

pub mod environment;
pub mod scheduler;

pub use environment::{Environment, EnvironmentConfig, EnvironmentError, RoundReport};
pub use scheduler::{RoundScheduler, RunOutcome, RunStatus};
