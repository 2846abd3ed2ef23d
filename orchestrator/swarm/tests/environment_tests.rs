// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the message bus and the round scheduler.
//!
//! Agents here are scripted: each turn they drain their mailbox and, if they
//! received anything, publish the next queued reply.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use colony_core::domain::address::Address;
use colony_core::domain::agent::{Agent, AgentError, MessagePublisher, PublishOptions, Turn};
use colony_core::domain::events::{MessageEvent, RoundEvent};
use colony_core::domain::message::Message;
use colony_core::infrastructure::event_bus::DomainEvent;
use colony_swarm::application::environment::{Environment, EnvironmentConfig};
use colony_swarm::application::scheduler::{RoundScheduler, RunStatus};

enum Behaviour {
    /// Publish queued replies, one per turn with mail.
    Scripted(Mutex<VecDeque<Message>>),
    /// Always answer `target`.
    Pinger { target: &'static str },
    Failing,
}

struct TestAgent {
    name: &'static str,
    behaviour: Behaviour,
    turns: AtomicU32,
    received: Mutex<Vec<Message>>,
}

impl TestAgent {
    fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name,
            behaviour,
            turns: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        })
    }

    fn silent(name: &'static str) -> Arc<Self> {
        Self::new(name, Behaviour::Scripted(Mutex::new(VecDeque::new())))
    }

    fn scripted(name: &'static str, replies: Vec<Message>) -> Arc<Self> {
        Self::new(name, Behaviour::Scripted(Mutex::new(replies.into())))
    }

    fn turns(&self) -> u32 {
        self.turns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for TestAgent {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, turn: Turn<'_>) -> Result<(), AgentError> {
        self.turns.fetch_add(1, Ordering::SeqCst);
        let news = turn.mailbox.pop_all();
        let had_mail = !news.is_empty();
        self.received.lock().extend(news);

        match &self.behaviour {
            Behaviour::Scripted(replies) => {
                let next = if had_mail { replies.lock().pop_front() } else { None };
                if let Some(reply) = next {
                    turn.publisher.publish(reply.with_sent_from(self.name));
                }
            }
            Behaviour::Pinger { target } => {
                turn.publisher.publish(
                    Message::new(format!("ping from {}", self.name))
                        .with_sent_from(self.name)
                        .with_send_to([*target]),
                );
            }
            Behaviour::Failing => {
                return Err(AgentError::Other(anyhow::anyhow!("model call timed out")));
            }
        }
        Ok(())
    }
}

fn environment(agents: Vec<Arc<TestAgent>>) -> Environment {
    let mut env = Environment::default();
    env.add_agents(agents.into_iter().map(|agent| agent as Arc<dyn Agent>))
        .unwrap();
    env
}

#[tokio::test]
async fn test_broadcast_keeps_bus_busy_until_everyone_ran() {
    let (mike, alice, bob) = (TestAgent::silent("Mike"), TestAgent::silent("Alice"), TestAgent::silent("Bob"));
    let env = environment(vec![mike.clone(), alice.clone(), bob.clone()]);
    assert!(env.is_idle());

    env.publish(Message::new("kickoff").with_send_to(["<all>"]));
    assert!(!env.is_idle());
    for name in ["Mike", "Alice", "Bob"] {
        assert_eq!(env.mailbox(name).unwrap().size(), 1, "{} should have mail", name);
    }

    let outcome = RoundScheduler::new(5).run(&env).await;
    assert_eq!(outcome.status, RunStatus::Idle);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.reports[0].ran, vec!["Mike", "Alice", "Bob"]);
    for agent in [&mike, &alice, &bob] {
        assert_eq!(agent.turns(), 1);
    }
    assert!(env.is_idle());
}

#[tokio::test]
async fn test_idle_agents_are_not_polled() {
    let (mike, alice) = (TestAgent::silent("Mike"), TestAgent::silent("Alice"));
    let mut env = environment(vec![mike.clone(), alice.clone()]);

    // Default routing adds the coordinator; in private mode nobody else hears it.
    env.set_public_chat(false);
    env.publish(Message::new("status?").with_sent_from("Alice"));

    let report = env.run_round().await;
    assert_eq!(report.ran, vec!["Mike"]);
    assert_eq!(alice.turns(), 0);
    assert_eq!(mike.turns(), 1);
}

#[tokio::test]
async fn test_direct_chat_window_is_single_use() {
    let alex = TestAgent::scripted("Alex", vec![Message::new("on it")]);
    let (mike, bob) = (TestAgent::silent("Mike"), TestAgent::silent("Bob"));
    let env = environment(vec![mike.clone(), alex.clone(), bob.clone()]);

    env.publish_with(
        Message::new("please fix the login bug").with_send_to(["Alex"]),
        PublishOptions::direct("Alex"),
    );
    assert!(env.is_direct_chat("Alex"));
    assert_eq!(env.mailbox("Alex").unwrap().size(), 1);
    assert!(env.mailbox("Mike").unwrap().is_empty());
    assert!(env.mailbox("Bob").unwrap().is_empty());

    // Alex's first reply uses the window: no broadcast.
    env.run_round().await;
    assert!(!env.is_direct_chat("Alex"));
    let history = env.history();
    let first_reply = history.last().unwrap();
    assert_eq!(first_reply.sent_from, "Alex");
    assert!(!first_reply.send_to.contains(&Address::All));
    assert!(env.mailbox("Bob").unwrap().is_empty());
    // Nobody was addressed, so the coordinator picked it up.
    assert_eq!(env.mailbox("Mike").unwrap().size(), 1);

    // The next reply is routed normally and broadcast in public mode.
    env.publish(Message::new("done").with_sent_from("Alex"));
    let second_reply = env.history().pop().unwrap();
    assert!(second_reply.send_to.contains(&Address::All));
    assert!(second_reply.send_to.contains(&Address::named("Mike")));
    assert_eq!(env.mailbox("Bob").unwrap().size(), 1);
}

#[tokio::test]
async fn test_direct_chat_skips_busy_agents() {
    let env = environment(vec![TestAgent::silent("Mike"), TestAgent::silent("Alex")]);
    env.publish(Message::new("first").with_send_to(["Alex"]));
    assert!(!env.is_agent_idle("Alex").unwrap());

    env.publish_with(
        Message::new("second").with_send_to(["Alex"]),
        PublishOptions::direct("Alex"),
    );
    assert!(!env.is_direct_chat("Alex"));
}

#[tokio::test]
async fn test_coordinator_silence_is_logged_not_delivered() {
    let env = environment(vec![TestAgent::silent("Mike"), TestAgent::silent("Alice")]);
    let mut events = env.context().events.subscribe();

    let accepted = env.publish_with(
        Message::new("nothing to add").with_sent_from("Mike").with_send_to(["no one"]),
        PublishOptions::from_publicer("TeamLeader"),
    );

    assert!(accepted);
    assert!(env.is_idle());
    assert_eq!(env.history().len(), 1);
    assert!(matches!(
        events.try_recv().unwrap(),
        DomainEvent::Message(MessageEvent::MessageSuppressed { .. })
    ));
}

#[tokio::test]
async fn test_coordinator_broadcast_reaches_team() {
    let env = environment(vec![
        TestAgent::silent("Mike"),
        TestAgent::silent("Alice"),
        TestAgent::silent("Bob"),
    ]);

    env.publish_with(
        Message::new("Alice, write the PRD").with_sent_from("Mike").with_send_to(["Alice"]),
        PublishOptions::from_publicer("TeamLeader"),
    );

    let delivered = env.mailbox("Bob").unwrap().pop().unwrap();
    assert_eq!(delivered.content, "[Message] from Mike to Alice: Alice, write the PRD");
    assert!(!env.mailbox("Alice").unwrap().is_empty());
}

#[tokio::test]
async fn test_none_and_self_addressing() {
    let mut env = environment(vec![
        TestAgent::silent("Mike"),
        TestAgent::silent("Alice"),
        TestAgent::silent("Watcher"),
    ]);
    env.set_addresses("Watcher", ["<all>"]).unwrap();

    env.publish_with(
        Message::new("for Alice only").with_send_to(["<none>", "Alice"]),
        PublishOptions::from_publicer("TeamLeader"),
    );
    assert_eq!(env.mailbox("Alice").unwrap().size(), 1);
    assert!(env.mailbox("Mike").unwrap().is_empty());
    assert!(env.mailbox("Watcher").unwrap().is_empty());

    env.publish_with(
        Message::new("note to self").with_sent_from("Alice").with_send_to(["<none>", "<self>"]),
        PublishOptions::from_publicer("TeamLeader"),
    );
    assert_eq!(env.mailbox("Alice").unwrap().size(), 2);
    assert!(env.mailbox("Watcher").unwrap().is_empty());
}

#[tokio::test]
async fn test_unmatched_message_falls_back_to_coordinator() {
    let mut env = environment(vec![TestAgent::silent("Mike"), TestAgent::silent("Alice")]);
    env.set_public_chat(false);

    env.publish_with(
        Message::new("anyone?").with_send_to(["Ghost"]),
        PublishOptions::from_publicer("TeamLeader"),
    );

    assert_eq!(env.mailbox("Mike").unwrap().size(), 1);
    assert!(env.mailbox("Alice").unwrap().is_empty());
    assert!(env.history()[0].send_to.contains(&Address::named("Mike")));
}

#[tokio::test]
async fn test_unroutable_message_is_only_recorded() {
    let mut config = EnvironmentConfig::default();
    config.public_chat = false;
    let mut env = Environment::new(config);
    env.add_agent(TestAgent::silent("Alice")).unwrap();
    env.set_addresses("Alice", ["design"]).unwrap();
    let mut events = env.context().events.subscribe();

    assert!(env.publish(Message::new("hello?").with_send_to(["Ghost"])));

    assert!(env.is_idle());
    assert_eq!(env.history().len(), 1);
    assert!(matches!(
        events.try_recv().unwrap(),
        DomainEvent::Message(MessageEvent::MessageUnroutable { .. })
    ));
}

#[tokio::test]
async fn test_failed_agent_does_not_roll_back_others() {
    let bob = TestAgent::scripted("Bob", vec![Message::new("PRD drafted").with_send_to(["Mike"])]);
    let env = environment(vec![
        TestAgent::silent("Mike"),
        TestAgent::new("Alex", Behaviour::Failing),
        bob.clone(),
    ]);
    let mut events = env.context().events.subscribe();

    env.publish(Message::new("start").with_send_to(["<all>"]));
    let report = env.run_round().await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].agent, "Alex");
    assert!(report.failures[0].error.contains("timed out"));
    assert!(env.history().iter().any(|m| m.content == "PRD drafted"));

    let failed = events.drain().into_iter().any(|event| {
        matches!(event, DomainEvent::Round(RoundEvent::AgentFailed { ref agent, .. }) if agent == "Alex")
    });
    assert!(failed);
}

#[tokio::test]
async fn test_round_budget_exhaustion_is_reported() {
    let mut env = environment(vec![
        TestAgent::silent("Mike"),
        TestAgent::new("Alice", Behaviour::Pinger { target: "Bob" }),
        TestAgent::new("Bob", Behaviour::Pinger { target: "Alice" }),
    ]);
    env.set_public_chat(false);
    env.publish(Message::new("serve").with_send_to(["Alice"]));

    let outcome = RoundScheduler::new(3).run(&env).await;
    assert_eq!(outcome.status, RunStatus::RoundBudgetExhausted);
    assert_eq!(outcome.rounds, 3);
    assert!(!env.is_idle());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "round_budget_exhausted");
}

#[tokio::test]
async fn test_history_records_each_message_once() {
    let env = environment(vec![
        TestAgent::silent("Mike"),
        TestAgent::silent("Alice"),
        TestAgent::silent("Bob"),
    ]);
    let message = Message::new("to everyone").with_send_to(["<all>"]);
    let id = message.id;
    env.publish(message);

    let history = env.history();
    assert_eq!(history.iter().filter(|m| m.id == id).count(), 1);
    assert_eq!(history[0].content, "to everyone");
}
