// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

use colony_core::domain::agent::{Agent, AgentError, Turn};
use colony_core::domain::message::{Message, MessageRole};

/// Team member that answers with canned lines, one per turn that brought
/// news from someone else. Silent once the lines run out.
pub struct ScriptedAgent {
    name: String,
    profile: String,
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedAgent {
    pub fn new<I, S>(name: impl Into<String>, profile: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            profile: profile.into(),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> &str {
        &self.profile
    }

    async fn run(&self, turn: Turn<'_>) -> Result<(), AgentError> {
        let news: Vec<Message> = turn
            .mailbox
            .pop_all()
            .into_iter()
            .filter(|message| message.sent_from != self.name)
            .collect();
        if news.is_empty() {
            return Ok(());
        }

        let Some(reply) = self.replies.lock().pop_front() else {
            debug!(agent = %self.name, "No scripted reply left");
            return Ok(());
        };

        let cause = news.last().map(|m| m.id.to_string()).unwrap_or_default();
        turn.publisher.publish(
            Message::new(reply)
                .with_role(MessageRole::Assistant)
                .with_sent_from(self.name.as_str())
                .with_cause(cause),
        );
        Ok(())
    }
}
