// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::message::MessageId;
use crate::domain::plan::PlanProgress;

/// Events emitted by the message bus while routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageEvent {
    MessagePublished {
        message_id: MessageId,
        sent_from: String,
        rule: String,
        recipients: Vec<String>,
        published_at: DateTime<Utc>,
    },
    /// No subscriber matched, even after falling back to the coordinator.
    MessageUnroutable {
        message_id: MessageId,
        sent_from: String,
        recorded_at: DateTime<Utc>,
    },
    /// Coordinator asked for silence; logged but not delivered.
    MessageSuppressed {
        message_id: MessageId,
        sent_from: String,
        suppressed_at: DateTime<Utc>,
    },
}

/// Events emitted by the round scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoundEvent {
    RoundStarted {
        round: u32,
        agents: Vec<String>,
        started_at: DateTime<Utc>,
    },
    RoundCompleted {
        round: u32,
        failed_agents: Vec<String>,
        completed_at: DateTime<Utc>,
    },
    AgentFailed {
        round: u32,
        agent: String,
        error: String,
        failed_at: DateTime<Utc>,
    },
}

/// Events emitted by agents that own a plan or need a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    PlanUpdated {
        agent: String,
        progress: PlanProgress,
        updated_at: DateTime<Utc>,
    },
    HumanInputRequested {
        agent: String,
        question: String,
        requested_at: DateTime<Utc>,
    },
}

impl MessageEvent {
    pub fn sent_from(&self) -> &str {
        match self {
            MessageEvent::MessagePublished { sent_from, .. } => sent_from,
            MessageEvent::MessageUnroutable { sent_from, .. } => sent_from,
            MessageEvent::MessageSuppressed { sent_from, .. } => sent_from,
        }
    }
}

impl RoundEvent {
    pub fn round(&self) -> u32 {
        match self {
            RoundEvent::RoundStarted { round, .. } => *round,
            RoundEvent::RoundCompleted { round, .. } => *round,
            RoundEvent::AgentFailed { round, .. } => *round,
        }
    }
}

impl AgentEvent {
    pub fn agent(&self) -> &str {
        match self {
            AgentEvent::PlanUpdated { agent, .. } => agent,
            AgentEvent::HumanInputRequested { agent, .. } => agent,
        }
    }
}
