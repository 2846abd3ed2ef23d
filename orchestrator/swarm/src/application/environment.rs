// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Environment (Message Bus)
//!
//! Owns the agent registry, one [`Mailbox`] per agent, subscription sets, the
//! append-only history and the direct-chat window. Publishing runs the
//! routing policy, resolves recipients and copies the message into their
//! mailboxes; [`Environment::run_round`] gives every non-idle agent one turn.
//!
//! Bus state lives behind `parking_lot` mutexes that are never held across an
//! await, so agents can publish from inside their turns.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use colony_core::domain::address::{default_subscriptions, resolve_recipients, Address};
use colony_core::domain::agent::{
    Agent, HumanChannel, MessagePublisher, PublishOptions, Turn, HUMAN_REPLY_ACK,
    HUMAN_RESPONSE_PREFIX,
};
use colony_core::domain::events::{AgentEvent, MessageEvent, RoundEvent};
use colony_core::domain::mailbox::Mailbox;
use colony_core::domain::message::Message;
use colony_core::domain::node_config::EnvironmentSettings;
use colony_core::infrastructure::context::EnvContext;
use colony_core::infrastructure::human_input::HumanInputError;

use crate::domain::routing::{select_rule, Route, RoutingContext, RoutingRule};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub public_chat: bool,
    pub coordinator: String,
    pub coordinator_profile: String,
    pub decorate_content: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self::from(&EnvironmentSettings::default())
    }
}

impl From<&EnvironmentSettings> for EnvironmentConfig {
    fn from(settings: &EnvironmentSettings) -> Self {
        Self {
            public_chat: settings.public_chat,
            coordinator: settings.coordinator.clone(),
            coordinator_profile: settings.coordinator_profile.clone(),
            decorate_content: settings.decorate_content,
        }
    }
}

/// A failed agent turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFailure {
    pub agent: String,
    pub error: String,
}

/// What happened in one round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    /// Agents that took a turn, in registration order.
    pub ran: Vec<String>,
    pub failures: Vec<AgentFailure>,
}

struct AgentSlot {
    agent: Arc<dyn Agent>,
    mailbox: Mailbox,
    addresses: BTreeSet<Address>,
}

impl AgentSlot {
    fn is_idle(&self) -> bool {
        self.mailbox.is_empty() && !self.agent.has_pending_work()
    }
}

pub struct Environment {
    config: EnvironmentConfig,
    slots: Vec<AgentSlot>,
    index: HashMap<String, usize>,
    history: Mutex<Vec<Message>>,
    direct_chat_roles: Mutex<HashSet<String>>,
    rounds: Mutex<u32>,
    context: EnvContext,
}

impl Environment {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self::with_context(config, EnvContext::default())
    }

    pub fn with_context(config: EnvironmentConfig, context: EnvContext) -> Self {
        Self {
            config,
            slots: Vec::new(),
            index: HashMap::new(),
            history: Mutex::new(Vec::new()),
            direct_chat_roles: Mutex::new(HashSet::new()),
            rounds: Mutex::new(0),
            context,
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn context(&self) -> &EnvContext {
        &self.context
    }

    /// Register an agent with the default subscriptions (its name and `<all>`).
    pub fn add_agent(&mut self, agent: Arc<dyn Agent>) -> Result<(), EnvironmentError> {
        let name = agent.name().to_string();
        if name.is_empty() {
            return Err(EnvironmentError::EmptyAgentName);
        }
        if self.index.contains_key(&name) {
            return Err(EnvironmentError::DuplicateAgent(name));
        }

        info!(agent = %name, profile = %agent.profile(), "Registering agent");
        self.index.insert(name.clone(), self.slots.len());
        self.slots.push(AgentSlot {
            addresses: default_subscriptions(&name),
            mailbox: Mailbox::new(),
            agent,
        });
        Ok(())
    }

    pub fn add_agents<I>(&mut self, agents: I) -> Result<(), EnvironmentError>
    where
        I: IntoIterator<Item = Arc<dyn Agent>>,
    {
        for agent in agents {
            self.add_agent(agent)?;
        }
        Ok(())
    }

    /// Replace an agent's subscription set.
    pub fn set_addresses<I, A>(&mut self, name: &str, addresses: I) -> Result<(), EnvironmentError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        let idx = self.slot_index(name)?;
        let addresses: BTreeSet<Address> = addresses.into_iter().map(Into::into).collect();
        debug!(agent = %name, addresses = ?addresses, "Updating subscriptions");
        self.slots[idx].addresses = addresses;
        Ok(())
    }

    pub fn addresses(&self, name: &str) -> Option<&BTreeSet<Address>> {
        self.slot(name).map(|slot| &slot.addresses)
    }

    pub fn agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.slot(name).map(|slot| Arc::clone(&slot.agent))
    }

    /// Registered names in registration order.
    pub fn agent_names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.agent.name().to_string()).collect()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Arc<dyn Agent>> {
        self.slots.iter().map(|slot| &slot.agent)
    }

    pub fn mailbox(&self, name: &str) -> Option<&Mailbox> {
        self.slot(name).map(|slot| &slot.mailbox)
    }

    /// Every published message, once each, in publish order.
    pub fn history(&self) -> Vec<Message> {
        self.history.lock().clone()
    }

    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(AgentSlot::is_idle)
    }

    pub fn is_agent_idle(&self, name: &str) -> Option<bool> {
        self.slot(name).map(AgentSlot::is_idle)
    }

    pub fn set_public_chat(&mut self, public_chat: bool) {
        self.config.public_chat = public_chat;
    }

    pub fn is_public_chat(&self) -> bool {
        self.config.public_chat
    }

    /// Whether `name` holds an open direct-chat window.
    pub fn is_direct_chat(&self, name: &str) -> bool {
        self.direct_chat_roles.lock().contains(name)
    }

    /// Rounds run so far.
    pub fn rounds(&self) -> u32 {
        *self.rounds.lock()
    }

    /// Give every non-idle agent one turn, concurrently, and wait for all of them.
    pub async fn run_round(&self) -> RoundReport {
        let round = {
            let mut rounds = self.rounds.lock();
            *rounds += 1;
            *rounds
        };

        let cohort: Vec<&AgentSlot> = self.slots.iter().filter(|slot| !slot.is_idle()).collect();
        let ran: Vec<String> = cohort.iter().map(|slot| slot.agent.name().to_string()).collect();

        info!(round, agents = %ran.join(","), "Starting round");
        self.context.events.publish_round_event(RoundEvent::RoundStarted {
            round,
            agents: ran.clone(),
            started_at: Utc::now(),
        });

        let turns = cohort.iter().map(|&slot| async move {
            let turn = Turn {
                round,
                mailbox: &slot.mailbox,
                publisher: self,
                human: self,
                context: &self.context,
            };
            (slot.agent.name(), slot.agent.run(turn).await)
        });
        let results = join_all(turns).await;

        let mut failures = Vec::new();
        for (agent, result) in results {
            if let Err(e) = result {
                warn!(round, agent = %agent, error = %e, "Agent turn failed");
                self.context.events.publish_round_event(RoundEvent::AgentFailed {
                    round,
                    agent: agent.to_string(),
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                failures.push(AgentFailure {
                    agent: agent.to_string(),
                    error: e.to_string(),
                });
            }
        }

        metrics::counter!("colony_rounds_total").increment(1);
        self.context.events.publish_round_event(RoundEvent::RoundCompleted {
            round,
            failed_agents: failures.iter().map(|f| f.agent.clone()).collect(),
            completed_at: Utc::now(),
        });
        debug!(round, failed = failures.len(), "Round completed");

        RoundReport {
            round,
            ran,
            failures,
        }
    }

    fn slot(&self, name: &str) -> Option<&AgentSlot> {
        self.index.get(name).map(|&idx| &self.slots[idx])
    }

    fn slot_index(&self, name: &str) -> Result<usize, EnvironmentError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EnvironmentError::UnknownAgent(name.to_string()))
    }

    fn recipients_for(&self, message: &Message) -> Vec<String> {
        resolve_recipients(
            message,
            self.slots
                .iter()
                .map(|slot| (slot.agent.name(), &slot.addresses)),
        )
    }

    fn open_direct_chats(&self, message: &Message) {
        // Idleness runs agent code; decide before taking the lock.
        let idle: Vec<&str> = message
            .send_to
            .iter()
            .filter_map(Address::as_name)
            .filter(|name| match self.slot(name) {
                Some(slot) if slot.is_idle() => true,
                Some(_) => {
                    debug!(agent = %name, "Agent busy; not opening direct chat");
                    false
                }
                None => false,
            })
            .collect();

        let mut direct = self.direct_chat_roles.lock();
        for name in idle {
            debug!(agent = %name, "Opening direct chat");
            direct.insert(name.to_string());
        }
    }

    fn record(&self, message: Message) {
        self.history.lock().push(message);
    }

    /// Resolve, fall back to the coordinator once, copy into mailboxes.
    fn deliver(&self, mut message: Message, rule: RoutingRule) {
        let mut recipients = self.recipients_for(&message);

        if recipients.is_empty() {
            warn!(
                message_id = %message.id,
                sent_from = %message.sent_from,
                send_to = ?message.send_to,
                "Message has no recipients; routing to coordinator"
            );
            message.send_to.insert(Address::named(self.config.coordinator.as_str()));
            recipients = self.recipients_for(&message);
        }

        if recipients.is_empty() {
            warn!(message_id = %message.id, "Message unroutable; recorded in history only");
            metrics::counter!("colony_messages_unroutable_total").increment(1);
            self.context.events.publish_message_event(MessageEvent::MessageUnroutable {
                message_id: message.id,
                sent_from: message.sent_from.clone(),
                recorded_at: Utc::now(),
            });
            self.record(message);
            return;
        }

        let delivered = if self.config.decorate_content {
            message.decorated_for_delivery(&self.config.coordinator)
        } else {
            message.clone()
        };
        for name in &recipients {
            if let Some(slot) = self.slot(name) {
                slot.mailbox.push(delivered.clone());
            }
        }

        info!(
            message_id = %message.id,
            sent_from = %message.sent_from,
            rule = %rule,
            recipients = %recipients.join(","),
            "Message published"
        );
        metrics::counter!("colony_messages_published_total", "rule" => rule.as_str()).increment(1);
        self.context.events.publish_message_event(MessageEvent::MessagePublished {
            message_id: message.id,
            sent_from: message.sent_from.clone(),
            rule: rule.as_str().to_string(),
            recipients,
            published_at: Utc::now(),
        });
        self.record(message);
    }
}

#[async_trait]
impl HumanChannel for Environment {
    async fn ask_human(
        &self,
        question: &str,
        sent_from: Option<&str>,
    ) -> Result<String, HumanInputError> {
        let agent = sent_from.unwrap_or("User").to_string();
        info!(agent = %agent, "Asking human");
        self.context.events.publish_agent_event(AgentEvent::HumanInputRequested {
            agent,
            question: question.to_string(),
            requested_at: Utc::now(),
        });

        let answer = self.context.human.ask(question).await?;
        Ok(format!("{}{}", HUMAN_RESPONSE_PREFIX, answer))
    }

    /// The reply itself is only logged.
    async fn reply_to_human(&self, content: &str, sent_from: Option<&str>) -> &'static str {
        info!(agent = %sent_from.unwrap_or("User"), content = %content, "Reply to human");
        HUMAN_REPLY_ACK
    }
}

impl MessagePublisher for Environment {
    fn publish_with(&self, mut message: Message, options: PublishOptions) -> bool {
        let sender_in_direct_chat = self.is_direct_chat(&message.sent_from);
        let ctx = RoutingContext {
            options: &options,
            sender_in_direct_chat,
            coordinator: &self.config.coordinator,
            coordinator_profile: &self.config.coordinator_profile,
            public_chat: self.config.public_chat,
        };

        let rule = select_rule(&message, &ctx);
        let route = rule.route(&message, &ctx);
        debug!(message_id = %message.id, rule = %rule, "Routing rule selected");

        match rule {
            RoutingRule::DirectChatRequest => {
                if let Route::Deliver(send_to) = &route {
                    message.send_to = send_to.clone();
                }
                self.open_direct_chats(&message);
            }
            RoutingRule::DirectChatReply => {
                self.direct_chat_roles.lock().remove(&message.sent_from);
            }
            _ => {}
        }

        match route {
            Route::Suppress => {
                info!(message_id = %message.id, sent_from = %message.sent_from, "Coordinator message suppressed");
                self.context.events.publish_message_event(MessageEvent::MessageSuppressed {
                    message_id: message.id,
                    sent_from: message.sent_from.clone(),
                    suppressed_at: Utc::now(),
                });
                self.record(message);
            }
            Route::Deliver(send_to) => {
                message.send_to = send_to;
                self.deliver(message, rule);
            }
        }
        true
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(EnvironmentConfig::default())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Agent '{0}' is already registered")]
    DuplicateAgent(String),

    #[error("Agent '{0}' is not registered")]
    UnknownAgent(String),

    #[error("Agent name cannot be empty")]
    EmptyAgentName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_core::domain::agent::AgentError;

    struct Silent(&'static str);

    #[async_trait]
    impl Agent for Silent {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, turn: Turn<'_>) -> Result<(), AgentError> {
            turn.mailbox.pop_all();
            Ok(())
        }
    }

    fn env(names: &[&'static str]) -> Environment {
        let mut env = Environment::default();
        for name in names {
            env.add_agent(Arc::new(Silent(name))).unwrap();
        }
        env
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let mut env = env(&["Mike"]);
        let err = env.add_agent(Arc::new(Silent("Mike"))).unwrap_err();
        assert!(matches!(err, EnvironmentError::DuplicateAgent(name) if name == "Mike"));
        assert_eq!(env.agent_names(), vec!["Mike"]);
    }

    #[test]
    fn test_default_addresses_and_override() {
        let mut env = env(&["Mike", "Alice"]);
        assert_eq!(env.addresses("Alice"), Some(&default_subscriptions("Alice")));

        env.set_addresses("Alice", ["Alice", "design"]).unwrap();
        assert!(!env.addresses("Alice").unwrap().contains(&Address::All));
        assert!(matches!(
            env.set_addresses("Nobody", ["x"]),
            Err(EnvironmentError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_history_keeps_original_content() {
        let env = env(&["Mike", "Alice"]);
        env.publish(Message::new("hello").with_sent_from("Alice"));

        let history = env.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");

        let delivered = env.mailbox("Mike").unwrap().pop().unwrap();
        assert_eq!(delivered.content, "[Message] from Alice to Mike: hello");
        assert_eq!(delivered.id, history[0].id);
    }

    #[test]
    fn test_decoration_can_be_disabled() {
        let mut config = EnvironmentConfig::default();
        config.decorate_content = false;
        let mut env = Environment::new(config);
        env.add_agent(Arc::new(Silent("Mike"))).unwrap();

        env.publish(Message::new("plain"));
        assert_eq!(env.mailbox("Mike").unwrap().pop().unwrap().content, "plain");
    }

    /// Looks at the bus from inside its own idleness check.
    struct Watcher {
        env: Arc<std::sync::OnceLock<std::sync::Weak<Environment>>>,
    }

    #[async_trait]
    impl Agent for Watcher {
        fn name(&self) -> &str {
            "Watcher"
        }

        fn has_pending_work(&self) -> bool {
            if let Some(env) = self.env.get().and_then(std::sync::Weak::upgrade) {
                env.is_direct_chat("Watcher");
            }
            false
        }

        async fn run(&self, turn: Turn<'_>) -> Result<(), AgentError> {
            turn.mailbox.pop_all();
            Ok(())
        }
    }

    #[test]
    fn test_direct_chat_with_agent_that_inspects_the_bus() {
        let cell = Arc::new(std::sync::OnceLock::new());
        let mut env = env(&["Mike"]);
        env.add_agent(Arc::new(Watcher { env: cell.clone() })).unwrap();
        let env = Arc::new(env);
        cell.set(Arc::downgrade(&env)).unwrap();

        env.publish_with(
            Message::new("hello").with_send_to(["Watcher"]),
            PublishOptions::direct("Watcher"),
        );

        assert!(env.is_direct_chat("Watcher"));
        assert_eq!(env.mailbox("Watcher").unwrap().size(), 1);
    }

    #[tokio::test]
    async fn test_ask_and_reply_to_human() {
        use colony_core::infrastructure::human_input::ScriptedHumanInput;

        let context = EnvContext::default().with_human(Arc::new(ScriptedHumanInput::new(["blue"])));
        let env = Environment::with_context(EnvironmentConfig::default(), context);

        let answer = env.ask_human("Which color?", Some("Alice")).await.unwrap();
        assert_eq!(answer, "Human response: blue");
        assert_eq!(env.reply_to_human("done", Some("Alice")).await, HUMAN_REPLY_ACK);

        assert!(matches!(
            Environment::default().ask_human("?", None).await,
            Err(HumanInputError::Unavailable)
        ));
    }
}
