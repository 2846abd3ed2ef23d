// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the infrastructure layer: event streaming and human input.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Side channels handed to the environment through `EnvContext`

pub mod event_bus;
pub mod human_input;
pub mod context;
