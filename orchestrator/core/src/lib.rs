// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `colony-core`: Orchestration Core Primitives
//!
//! Pure building blocks shared by the coordination crate and the CLI.
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Message`, `Address`, `Mailbox`, `Task`, `Plan`, `Agent` contract, config manifest |
//! | [`application`] | Application | `TaskExecutor` contract and the plan-driving task runner |
//! | [`infrastructure`] | Infrastructure | `EventBus`, `EnvContext`, human-input providers |

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
