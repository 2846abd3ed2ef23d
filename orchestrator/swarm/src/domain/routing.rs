// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Routing Policy
//!
//! Decides, before address resolution, how a published message is treated.
//! The rules are evaluated in the order of [`ROUTING_RULES`]; the first one
//! that applies wins. [`RoutingRule::DefaultToCoordinator`] always applies.
//!
//! ## Rule Table
//! | # | Rule | Applies when | Addresses |
//! |---|------|--------------|-----------|
//! | 1 | `DirectChatRequest` | caller named a direct recipient | as given, plus the direct recipient |
//! | 2 | `DirectChatReply` | sender is in an open direct chat | as given |
//! | 3 | `CoordinatorSilence` | coordinator publicer, `send_to == {<none>}` | suppressed |
//! | 4 | `CoordinatorBroadcast` | coordinator publicer | as given, `+<all>` in public mode |
//! | 5 | `DefaultToCoordinator` | always | `+coordinator`, `+<all>` in public mode |

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use colony_core::domain::address::Address;
use colony_core::domain::agent::PublishOptions;
use colony_core::domain::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingRule {
    DirectChatRequest,
    DirectChatReply,
    CoordinatorSilence,
    CoordinatorBroadcast,
    DefaultToCoordinator,
}

/// Evaluation order.
pub const ROUTING_RULES: [RoutingRule; 5] = [
    RoutingRule::DirectChatRequest,
    RoutingRule::DirectChatReply,
    RoutingRule::CoordinatorSilence,
    RoutingRule::CoordinatorBroadcast,
    RoutingRule::DefaultToCoordinator,
];

/// Bus state a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RoutingContext<'a> {
    pub options: &'a PublishOptions,
    /// Sender currently holds an open direct-chat window.
    pub sender_in_direct_chat: bool,
    pub coordinator: &'a str,
    pub coordinator_profile: &'a str,
    pub public_chat: bool,
}

/// Effect of a rule on a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Deliver(BTreeSet<Address>),
    Suppress,
}

impl RoutingRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingRule::DirectChatRequest => "direct_chat_request",
            RoutingRule::DirectChatReply => "direct_chat_reply",
            RoutingRule::CoordinatorSilence => "coordinator_silence",
            RoutingRule::CoordinatorBroadcast => "coordinator_broadcast",
            RoutingRule::DefaultToCoordinator => "default_to_coordinator",
        }
    }

    pub fn applies(&self, message: &Message, ctx: &RoutingContext<'_>) -> bool {
        match self {
            RoutingRule::DirectChatRequest => ctx.options.direct_recipient.is_some(),
            RoutingRule::DirectChatReply => ctx.sender_in_direct_chat,
            RoutingRule::CoordinatorSilence => {
                is_coordinator_publicer(ctx)
                    && message.send_to.len() == 1
                    && message.send_to.contains(&Address::None)
            }
            RoutingRule::CoordinatorBroadcast => is_coordinator_publicer(ctx),
            RoutingRule::DefaultToCoordinator => true,
        }
    }

    /// Addresses the message is delivered to under this rule.
    pub fn route(&self, message: &Message, ctx: &RoutingContext<'_>) -> Route {
        let mut send_to = message.send_to.clone();
        match self {
            RoutingRule::DirectChatRequest => {
                if let Some(recipient) = &ctx.options.direct_recipient {
                    send_to.insert(Address::named(recipient.as_str()));
                }
            }
            RoutingRule::DirectChatReply => {}
            RoutingRule::CoordinatorSilence => return Route::Suppress,
            RoutingRule::CoordinatorBroadcast => {
                if ctx.public_chat {
                    send_to.insert(Address::All);
                }
            }
            RoutingRule::DefaultToCoordinator => {
                send_to.insert(Address::named(ctx.coordinator));
                if ctx.public_chat {
                    send_to.insert(Address::All);
                }
            }
        }
        Route::Deliver(send_to)
    }
}

impl fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_coordinator_publicer(ctx: &RoutingContext<'_>) -> bool {
    ctx.options.publicer.as_deref() == Some(ctx.coordinator_profile)
}

/// First rule in [`ROUTING_RULES`] that applies.
pub fn select_rule(message: &Message, ctx: &RoutingContext<'_>) -> RoutingRule {
    ROUTING_RULES
        .into_iter()
        .find(|rule| rule.applies(message, ctx))
        .unwrap_or(RoutingRule::DefaultToCoordinator)
}
