// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Addressing and Recipient Resolution
//!
//! A message is addressed to a set of logical [`Address`]es. Agents declare
//! the addresses they listen on through a subscription set fixed at
//! registration time; [`resolve_recipients`] maps one onto the other.
//!
//! ## Resolution Table
//! | `send_to` contains | Matching agents |
//! |--------------------|-----------------|
//! | `<none>` | agents with a concrete (`Named`) subscription listed in `send_to` |
//! | `<all>` (no `<none>`) | every registered agent |
//! | only names | agents whose subscription set intersects `send_to` |
//!
//! `<self>` is rewritten to the sender's name before matching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::message::Message;

pub const ROUTE_TO_ALL: &str = "<all>";
pub const ROUTE_TO_NONE: &str = "<none>";
pub const ROUTE_TO_SELF: &str = "<self>";

/// Legacy spelling used by coordinators to request silent suppression.
pub const ROUTE_TO_NO_ONE: &str = "no one";

/// Logical routing key of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Address {
    /// Every subscribed agent.
    All,
    /// Suppress broadcast delivery.
    None,
    /// Loop back to the sender.
    SelfAddr,
    /// A concrete agent name (or any custom topic an agent subscribes to).
    Named(String),
}

impl Address {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// `<all>`, `<none>` or `<self>`.
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Named(_))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        match value.as_str() {
            ROUTE_TO_ALL => Self::All,
            ROUTE_TO_NONE | ROUTE_TO_NO_ONE => Self::None,
            ROUTE_TO_SELF => Self::SelfAddr,
            _ => Self::Named(value),
        }
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        match value {
            Address::All => ROUTE_TO_ALL.to_string(),
            Address::None => ROUTE_TO_NONE.to_string(),
            Address::SelfAddr => ROUTE_TO_SELF.to_string(),
            Address::Named(name) => name,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::All => f.write_str(ROUTE_TO_ALL),
            Address::None => f.write_str(ROUTE_TO_NONE),
            Address::SelfAddr => f.write_str(ROUTE_TO_SELF),
            Address::Named(name) => f.write_str(name),
        }
    }
}

/// Default subscription set of an agent: its own name plus `<all>`.
pub fn default_subscriptions(agent_name: &str) -> BTreeSet<Address> {
    BTreeSet::from([Address::named(agent_name), Address::All])
}

/// Expand `<self>` relative to the sender. An anonymous sender has no loop-back.
pub fn expand_self(send_to: &BTreeSet<Address>, sent_from: &str) -> BTreeSet<Address> {
    send_to
        .iter()
        .filter_map(|addr| match addr {
            Address::SelfAddr if sent_from.is_empty() => None,
            Address::SelfAddr => Some(Address::named(sent_from)),
            other => Some(other.clone()),
        })
        .collect()
}

/// Whether an agent with `subscriptions` should receive a message addressed to `send_to`.
///
/// `send_to` must already have `<self>` expanded.
pub fn is_send_to(send_to: &BTreeSet<Address>, subscriptions: &BTreeSet<Address>) -> bool {
    if send_to.contains(&Address::None) {
        return subscriptions
            .iter()
            .any(|addr| !addr.is_sentinel() && send_to.contains(addr));
    }
    if send_to.contains(&Address::All) {
        return true;
    }
    subscriptions.iter().any(|addr| send_to.contains(addr))
}

/// Compute the recipients of `message` from an ordered registry of
/// `(agent name, subscription set)` pairs. Registry order is preserved.
pub fn resolve_recipients<'a, I>(message: &Message, registry: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a BTreeSet<Address>)>,
{
    let send_to = expand_self(&message.send_to, &message.sent_from);
    registry
        .into_iter()
        .filter(|(_, subscriptions)| is_send_to(&send_to, subscriptions))
        .map(|(name, _)| name.to_string())
        .collect()
}
