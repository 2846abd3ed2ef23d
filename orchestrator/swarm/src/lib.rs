// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `colony-swarm`: Message Bus and Round Scheduling
//!
//! Routes messages between a fixed roster of agents and drives them in
//! rounds until the whole team is idle.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `RoutingRule` and the ordered routing policy |
//! | [`application`] | Application | `Environment` (message bus), `RoundScheduler` |
//!
//! ## Key Concepts
//!
//! - **Environment**: registry of agents with one mailbox each; `publish`
//!   applies the routing policy, resolves recipients and fills mailboxes.
//! - **Direct chat**: a message sent to a named idle agent by the initiator
//!   opens a one-reply window in which that agent's answer skips broadcast.
//! - **Round**: every non-idle agent takes one turn concurrently; the next
//!   round starts only after all of them finish.

pub mod domain;
pub mod application;

pub use domain::*;
