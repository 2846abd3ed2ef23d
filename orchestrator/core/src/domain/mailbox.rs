// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Mailbox
//!
//! Inbound FIFO of [`Message`]s owned by exactly one agent. Any number of
//! producers may `push` concurrently; only the owner pops. Pushing never
//! blocks for longer than the queue lock and never fails.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::domain::message::Message;

#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Message>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mailbox pre-filled with `messages` in order.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            queue: Mutex::new(messages.into_iter().collect()),
        }
    }

    /// Append a message to the tail.
    pub fn push(&self, message: Message) {
        self.queue.lock().push_back(message);
    }

    /// Remove and return the head, or `None` when empty.
    pub fn pop(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    /// Drain every queued message in arrival order.
    pub fn pop_all(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(message) = self.pop() {
            messages.push(message);
        }
        messages
    }

    /// Approximate number of queued messages; may be stale under concurrent pushes.
    pub fn size(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Copy of the queued messages, head first. Does not consume.
    pub fn snapshot(&self) -> Vec<Message> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Serialize the queue as an ordered JSON array without consuming it.
    pub fn dump(&self) -> Result<String, MailboxError> {
        serde_json::to_string(&self.snapshot()).map_err(MailboxError::Encode)
    }

    /// Rebuild a mailbox from [`Mailbox::dump`] output. Restored messages are
    /// queued as-is; no routing happens.
    pub fn restore(data: &str) -> Result<Self, MailboxError> {
        let messages: Vec<Message> = serde_json::from_str(data).map_err(MailboxError::Decode)?;
        Ok(Self::from_messages(messages))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Failed to encode mailbox: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode mailbox snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::Address;
    use std::sync::Arc;

    #[test]
    fn test_fifo_order() {
        let mailbox = Mailbox::new();
        mailbox.push(Message::new("first"));
        mailbox.push(Message::new("second"));
        mailbox.push(Message::new("first"));

        assert_eq!(mailbox.size(), 3);
        assert_eq!(mailbox.pop().unwrap().content, "first");

        let rest: Vec<String> = mailbox.pop_all().into_iter().map(|m| m.content).collect();
        assert_eq!(rest, vec!["second", "first"]);
        assert!(mailbox.is_empty());
        assert!(mailbox.pop().is_none());
    }

    #[test]
    fn test_dump_restore_preserves_order_and_content() {
        let mailbox = Mailbox::new();
        mailbox.push(
            Message::new("plan the sprint")
                .with_sent_from("Mike")
                .with_send_to([Address::named("Alice")]),
        );
        mailbox.push(Message::new("ack").with_send_to([Address::All]));

        let data = mailbox.dump().unwrap();
        assert_eq!(mailbox.size(), 2, "dump must not consume");

        let restored = Mailbox::restore(&data).unwrap();
        assert_eq!(restored.snapshot(), mailbox.snapshot());
    }

    #[test]
    fn test_empty_dump_is_empty_array() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.dump().unwrap(), "[]");
        assert!(Mailbox::restore("[]").unwrap().is_empty());
    }

    #[test]
    fn test_restore_rejects_garbage() {
        assert!(matches!(Mailbox::restore("not json"), Err(MailboxError::Decode(_))));
    }

    #[tokio::test]
    async fn test_concurrent_producers() {
        let mailbox = Arc::new(Mailbox::new());
        let mut handles = Vec::new();
        for producer in 0..4 {
            let mailbox = mailbox.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    mailbox.push(Message::new(format!("{}-{}", producer, i)));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(mailbox.pop_all().len(), 100);
    }
}
