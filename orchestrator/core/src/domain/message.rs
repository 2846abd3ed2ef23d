// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Message Value Object
//!
//! The unit of communication between agents. A [`Message`] is created by an
//! agent or an external initiator, recorded once in the bus history, and
//! copied into the mailbox of every resolved recipient.
//!
//! # Invariants
//!
//! - `id` is assigned at construction and never changes.
//! - `content` is not rewritten after dispatch; delivery decorations are
//!   applied to a copy (see [`Message::decorated_for_delivery`]).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

use crate::domain::address::Address;

/// Unique identifier of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Conversational role of a message, as understood by chat-completion style collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    /// Any other role label (e.g. an agent profile).
    Custom(String),
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Custom(role) => role,
        }
    }
}

impl Default for MessageRole {
    fn default() -> Self {
        Self::User
    }
}

impl From<String> for MessageRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::Custom(value),
        }
    }
}

impl From<MessageRole> for String {
    fn from(value: MessageRole) -> Self {
        value.as_str().to_string()
    }
}

/// Routing metadata attached to a message.
///
/// Known keys are typed fields; anything else goes into `extensions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Display name of the agent that produced the content, when it differs from `sent_from`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Free-form extension values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl MessageMetadata {
    pub fn is_empty(&self) -> bool {
        self.agent.is_none() && self.extensions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    #[serde(default)]
    pub role: MessageRole,
    /// Name of the sending agent; empty for external initiators.
    #[serde(default)]
    pub sent_from: String,
    #[serde(default)]
    pub send_to: BTreeSet<Address>,
    /// Identifier of the action that caused this message.
    #[serde(default)]
    pub cause: String,
    #[serde(default, skip_serializing_if = "MessageMetadata::is_empty")]
    pub metadata: MessageMetadata,
}

impl Message {
    /// Create a user message with no recipients.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            role: MessageRole::User,
            sent_from: String::new(),
            send_to: BTreeSet::new(),
            cause: String::new(),
            metadata: MessageMetadata::default(),
        }
    }

    pub fn with_role(mut self, role: MessageRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_sent_from(mut self, sender: impl Into<String>) -> Self {
        self.sent_from = sender.into();
        self
    }

    pub fn with_send_to<I, A>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.send_to = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = cause.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extensions.insert(key.into(), value);
        self
    }

    /// Build the copy that lands in recipients' mailboxes.
    ///
    /// Non-chat roles become `assistant`, and the content is prefixed with
    /// sender and recipient so that content-only consumers can see who is
    /// talking to whom. `{<all>}` alone is displayed as `hub`.
    pub fn decorated_for_delivery(&self, hub: &str) -> Message {
        let mut copy = self.clone();
        if matches!(copy.role, MessageRole::Custom(_)) {
            copy.role = MessageRole::Assistant;
        }

        let sender = copy
            .metadata
            .agent
            .clone()
            .unwrap_or_else(|| copy.sent_from.clone());
        let sender = if sender.is_empty() { "User".to_string() } else { sender };

        let recipients = if copy.send_to.len() == 1 && copy.send_to.contains(&Address::All) {
            hub.to_string()
        } else {
            copy.send_to
                .iter()
                .filter(|addr| **addr != Address::All)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        copy.content = format!("[Message] from {} to {}: {}", sender, recipients, copy.content);
        copy
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role.as_str(), self.content)
    }
}
