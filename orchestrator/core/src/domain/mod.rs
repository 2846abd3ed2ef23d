// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the domain layer: value objects and aggregates with no I/O.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Messages, addressing, mailboxes, task plans and the agent contract

pub mod message;
pub mod address;
pub mod mailbox;
pub mod task;
pub mod plan;
pub mod agent;
pub mod events;
pub mod node_config;
