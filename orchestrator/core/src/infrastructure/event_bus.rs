// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Orchestration Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Lets observers (CLI progress output, tests) follow routing, rounds and plan
// updates without reaching into the bus or a global reporter.
//
// In-memory only: events emitted while nobody listens are dropped.

use crate::domain::events::{AgentEvent, MessageEvent, RoundEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Message(MessageEvent),
    Round(RoundEvent),
    Agent(AgentEvent),
}

/// Event bus for publishing and subscribing to orchestration events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_message_event(&self, event: MessageEvent) {
        self.publish(DomainEvent::Message(event));
    }

    pub fn publish_round_event(&self, event: RoundEvent) {
        self.publish(DomainEvent::Round(event));
    }

    pub fn publish_agent_event(&self, event: AgentEvent) {
        self.publish(DomainEvent::Agent(event));
    }

    fn publish(&self, event: DomainEvent) {
        // send() only fails when there are no receivers
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to events that concern one agent: messages it sent, agent
    /// events it raised, and failures of its turns
    pub fn subscribe_agent(&self, agent: impl Into<String>) -> AgentEventReceiver {
        AgentEventReceiver {
            receiver: self.sender.subscribe(),
            agent: agent.into(),
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Drain everything currently buffered
    pub fn drain(&mut self) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }
}

/// Receiver filtered to one agent
pub struct AgentEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    agent: String,
}

impl AgentEventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if self.matches_agent(&event) {
                return Ok(event);
            }
        }
    }

    fn matches_agent(&self, event: &DomainEvent) -> bool {
        match event {
            DomainEvent::Message(message) => message.sent_from() == self.agent,
            DomainEvent::Agent(agent_event) => agent_event.agent() == self.agent,
            DomainEvent::Round(RoundEvent::AgentFailed { agent, .. }) => *agent == self.agent,
            DomainEvent::Round(_) => false,
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
