// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Contract
//!
//! What the orchestration core needs from an agent: a unique name, whether it
//! still has work, and an async turn that reads its mailbox and may publish
//! replies. Everything an agent does inside [`Agent::run`] (calling a model,
//! searching, executing code) is opaque to the core.

use async_trait::async_trait;

use crate::domain::mailbox::Mailbox;
use crate::domain::message::Message;
use crate::domain::plan::{PlanError, PlanProgress, PlanSnapshot};
use crate::infrastructure::context::EnvContext;
use crate::infrastructure::human_input::HumanInputError;

/// Routing hints accepted by the bus next to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Set by an external initiator addressing a specific agent directly.
    pub direct_recipient: Option<String>,
    /// Profile of the agent publishing on the coordinator's behalf.
    pub publicer: Option<String>,
}

impl PublishOptions {
    pub fn direct(recipient: impl Into<String>) -> Self {
        Self {
            direct_recipient: Some(recipient.into()),
            publicer: None,
        }
    }

    pub fn from_publicer(profile: impl Into<String>) -> Self {
        Self {
            direct_recipient: None,
            publicer: Some(profile.into()),
        }
    }
}

/// The publish side of the message bus, as seen by agents.
pub trait MessagePublisher: Send + Sync {
    /// Route `message`. Returns `true` once the message has been accepted
    /// (delivered, suppressed on request, or recorded as unroutable).
    fn publish_with(&self, message: Message, options: PublishOptions) -> bool;

    fn publish(&self, message: Message) -> bool {
        self.publish_with(message, PublishOptions::default())
    }
}

/// Prefix the bus puts in front of every answer from the human.
pub const HUMAN_RESPONSE_PREFIX: &str = "Human response: ";

/// Acknowledgement handed back to an agent that replied to the human.
pub const HUMAN_REPLY_ACK: &str = "SUCCESS, human has received your reply. Refrain from resending duplicate messages.  If you no longer need to take action, use the command \u{2018}end\u{2019} to stop.";

/// The human-facing side of the message bus.
#[async_trait]
pub trait HumanChannel: Send + Sync {
    /// Ask the human on behalf of `sent_from`. The answer comes back
    /// prefixed with [`HUMAN_RESPONSE_PREFIX`].
    async fn ask_human(
        &self,
        question: &str,
        sent_from: Option<&str>,
    ) -> Result<String, HumanInputError>;

    /// Hand a reply to the human; returns [`HUMAN_REPLY_ACK`].
    async fn reply_to_human(&self, content: &str, sent_from: Option<&str>) -> &'static str;
}

/// Everything an agent may touch during one turn.
pub struct Turn<'a> {
    pub round: u32,
    pub mailbox: &'a Mailbox,
    pub publisher: &'a dyn MessagePublisher,
    pub human: &'a dyn HumanChannel,
    pub context: &'a EnvContext,
}

#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique name; also the agent's default concrete address.
    fn name(&self) -> &str;

    /// Role label (e.g. "TeamLeader"). Defaults to the name.
    fn profile(&self) -> &str {
        self.name()
    }

    /// Asynchronous work still in flight outside the mailbox.
    fn has_pending_work(&self) -> bool {
        false
    }

    /// Progress of the plan this agent owns, if any. Read-only.
    fn plan_progress(&self) -> Option<PlanProgress> {
        None
    }

    /// Full copy of the plan this agent owns, if any.
    fn plan_snapshot(&self) -> Option<PlanSnapshot> {
        None
    }

    /// Take one turn: drain the mailbox, act, publish replies.
    async fn run(&self, turn: Turn<'_>) -> Result<(), AgentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Collaborator call failed: {0}")]
    Collaborator(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Human(#[from] HumanInputError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
