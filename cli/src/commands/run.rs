// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Team simulation command
//!
//! Builds the message bus from the team manifest, publishes the project idea
//! and drives the team in rounds until it goes idle or runs out of rounds.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use colony_core::domain::agent::{Agent, MessagePublisher, PublishOptions};
use colony_core::domain::message::{Message, MessageRole};
use colony_core::domain::node_config::{ColonyConfigManifest, TeamAgentConfig};
use colony_core::domain::plan::{Plan, PlanSnapshot};
use colony_core::infrastructure::context::EnvContext;
use colony_core::infrastructure::event_bus::EventBus;
use colony_core::infrastructure::human_input::{HumanInput, NoHumanInput, StdinHumanInput};
use colony_swarm::application::environment::{Environment, EnvironmentConfig};
use colony_swarm::application::scheduler::{RoundScheduler, RunOutcome, RunStatus};

use crate::agents::{PlanningAgent, ScriptedAgent, ScriptedExecutor};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project idea handed to the team
    #[arg(value_name = "IDEA")]
    pub idea: String,

    /// Send the idea straight to this agent (default: the coordinator)
    #[arg(long, value_name = "AGENT")]
    pub to: Option<String>,

    /// Override spec.scheduler.max_rounds
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Do not broadcast coordinator and default-routed messages
    #[arg(long)]
    pub private: bool,

    /// Answer the coordinator's questions on stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Print history, plans and run status as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut manifest =
        ColonyConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    if let Some(max_rounds) = args.max_rounds {
        manifest.spec.scheduler.max_rounds = max_rounds;
    }
    if args.private {
        manifest.spec.environment.public_chat = false;
    }
    manifest
        .validate()
        .context("Configuration validation failed")?;

    if manifest.spec.team.agents.is_empty() {
        anyhow::bail!(
            "spec.team.agents is empty. Generate a team manifest with `colony config generate --examples`."
        );
    }

    let human: Arc<dyn HumanInput> = if args.interactive {
        Arc::new(StdinHumanInput)
    } else {
        Arc::new(NoHumanInput)
    };
    let context = EnvContext::new(
        EventBus::new(manifest.spec.environment.event_capacity),
        human,
    );

    let env = build_environment(&manifest, context)?;
    let recipient = args
        .to
        .unwrap_or_else(|| manifest.spec.environment.coordinator.clone());
    if env.agent(&recipient).is_none() {
        anyhow::bail!("Agent '{}' is not part of the team", recipient);
    }

    info!(recipient = %recipient, "Publishing project idea");
    let idea = Message::new(format!(
        "I want to build the following application: {}",
        args.idea
    ))
    .with_role(MessageRole::User)
    .with_send_to([recipient.as_str()]);
    env.publish_with(idea, PublishOptions::direct(recipient.as_str()));

    let scheduler = RoundScheduler::from(&manifest.spec.scheduler);
    let outcome = scheduler.run(&env).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&json_report(&env, &outcome))?);
    } else {
        print_summary(&env, &outcome);
    }
    Ok(())
}

/// Register every team member; the coordinator gets the seed plan.
pub fn build_environment(manifest: &ColonyConfigManifest, context: EnvContext) -> Result<Environment> {
    let settings = &manifest.spec.environment;
    let mut env = Environment::with_context(EnvironmentConfig::from(settings), context);

    for member in &manifest.spec.team.agents {
        env.add_agent(build_agent(manifest, member)?)
            .with_context(|| format!("Failed to register agent '{}'", member.name))?;
        if let Some(addresses) = &member.addresses {
            env.set_addresses(&member.name, addresses.iter().map(String::as_str))?;
        }
    }
    Ok(env)
}

fn build_agent(manifest: &ColonyConfigManifest, member: &TeamAgentConfig) -> Result<Arc<dyn Agent>> {
    let settings = &manifest.spec.environment;
    let profile = member.profile.clone().unwrap_or_else(|| member.name.clone());

    if member.name != settings.coordinator {
        return Ok(Arc::new(ScriptedAgent::new(
            member.name.as_str(),
            profile,
            member.replies.iter().cloned(),
        )));
    }

    let mut plan = Plan::new("").with_cycle_policy(manifest.spec.plan.cycle_policy);
    if let Some(seed) = &manifest.spec.team.plan {
        plan.goal = seed.goal.clone();
        plan.add_tasks(seed.tasks.clone())
            .context("Invalid seed plan in spec.team.plan")?;
    }
    Ok(Arc::new(PlanningAgent::new(
        member.name.as_str(),
        profile,
        plan,
        Arc::new(ScriptedExecutor),
    )))
}

/// Machine-readable run report: message history, owned plans, outcome.
fn json_report(env: &Environment, outcome: &RunOutcome) -> serde_json::Value {
    let plans: Vec<PlanSnapshot> = env.agents().filter_map(|agent| agent.plan_snapshot()).collect();
    serde_json::json!({
        "status": outcome.status,
        "rounds": outcome.rounds,
        "history": env.history(),
        "plans": plans,
    })
}

fn print_summary(env: &Environment, outcome: &RunOutcome) {
    let history = env.history();

    println!();
    println!("{}", "Conversation Flow Summary".bold());
    println!("Total messages: {}", history.len());
    for (i, message) in history.iter().enumerate() {
        let sender = if message.sent_from.is_empty() {
            "User"
        } else {
            message.sent_from.as_str()
        };
        let receivers = if message.send_to.is_empty() {
            "All".to_string()
        } else {
            message
                .send_to
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("{}. {} -> {}: {}", i + 1, sender.cyan(), receivers, preview(&message.content, 100));
    }
    println!();

    for agent in env.agents() {
        if let Some(progress) = agent.plan_progress() {
            println!(
                "Plan '{}': {}/{} tasks finished",
                progress.goal, progress.finished, progress.total
            );
        }
    }

    match outcome.status {
        RunStatus::Idle => println!(
            "{}",
            format!("✓ Team went idle after {} rounds", outcome.rounds).green()
        ),
        RunStatus::RoundBudgetExhausted => println!(
            "{}",
            format!("⚠ Round budget exhausted after {} rounds", outcome.rounds).yellow()
        ),
    }
}

fn preview(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let cut: String = content.chars().take(limit).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEAM: &str = r#"
apiVersion: colony.dev/v1
kind: ColonyConfig
metadata:
  name: demo
spec:
  team:
    agents:
      - name: Mike
        profile: TeamLeader
      - name: Alex
        profile: Engineer
        replies: ["Done"]
      - name: Bob
        addresses: ["Bob", "architecture"]
    plan:
      goal: Demo
      tasks:
        - id: "1"
          instruction: Build it
          assignee: Alex
"#;

    #[test]
    fn test_build_environment_from_manifest() {
        let manifest = ColonyConfigManifest::from_yaml_str(TEAM).unwrap();
        let env = build_environment(&manifest, EnvContext::default()).unwrap();

        assert_eq!(env.agent_names(), vec!["Mike", "Alex", "Bob"]);
        assert_eq!(env.agent("Alex").unwrap().profile(), "Engineer");
        assert_eq!(env.agent("Bob").unwrap().profile(), "Bob");

        let progress = env.agent("Mike").unwrap().plan_progress().unwrap();
        assert_eq!(progress.goal, "Demo");
        assert_eq!(progress.total, 1);

        let bob = env.addresses("Bob").unwrap();
        assert_eq!(bob.len(), 2);
        assert!(bob.iter().all(|address| address.as_name().is_some()));
    }

    #[tokio::test]
    async fn test_json_report_includes_plan_snapshot() {
        let manifest = ColonyConfigManifest::from_yaml_str(TEAM).unwrap();
        let env = build_environment(&manifest, EnvContext::default()).unwrap();
        let outcome = RoundScheduler::new(1).run(&env).await;

        let report = json_report(&env, &outcome);
        assert_eq!(report["status"], "idle");
        assert_eq!(report["rounds"], 0);
        assert_eq!(report["history"].as_array().unwrap().len(), 0);

        let plans = report["plans"].as_array().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0]["goal"], "Demo");
        assert_eq!(plans[0]["current_task_id"], "1");
        assert_eq!(plans[0]["tasks"][0]["assignee"], "Alex");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("héllo wörld", 5), "héllo...");
    }
}
