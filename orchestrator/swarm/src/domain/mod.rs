// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure routing policy. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`routing`] | `RoutingRule`, `ROUTING_RULES`, `Route` |

pub mod routing;

pub use routing::*;
