// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Round Scheduler
//!
//! Repeats [`Environment::run_round`] until every agent is idle or the round
//! budget is spent. Running out of rounds is a normal outcome, not an error.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use colony_core::domain::events::AgentEvent;
use colony_core::domain::node_config::SchedulerSettings;

use crate::application::environment::{Environment, RoundReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    RoundBudgetExhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub rounds: u32,
    pub reports: Vec<RoundReport>,
}

#[derive(Debug, Clone)]
pub struct RoundScheduler {
    max_rounds: u32,
}

impl RoundScheduler {
    pub fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub async fn run(&self, env: &Environment) -> RunOutcome {
        let mut rounds = 0;
        let mut reports = Vec::new();

        while !env.is_idle() && rounds < self.max_rounds {
            let report = env.run_round().await;
            rounds += 1;
            if !report.failures.is_empty() {
                warn!(round = report.round, failed = report.failures.len(), "Round finished with failed agents");
            }
            reports.push(report);
            self.report_plan_progress(env);
        }

        let status = if env.is_idle() {
            RunStatus::Idle
        } else {
            RunStatus::RoundBudgetExhausted
        };

        match status {
            RunStatus::Idle => info!(rounds, "All agents idle"),
            RunStatus::RoundBudgetExhausted => {
                warn!(rounds, max_rounds = self.max_rounds, "Round budget exhausted with work pending")
            }
        }

        RunOutcome {
            status,
            rounds,
            reports,
        }
    }

    fn report_plan_progress(&self, env: &Environment) {
        for agent in env.agents() {
            let Some(progress) = agent.plan_progress() else {
                continue;
            };
            info!(
                agent = %agent.name(),
                goal = %progress.goal,
                finished = progress.finished,
                total = progress.total,
                current_task_id = ?progress.current_task_id,
                "Plan progress"
            );
            env.context().events.publish_agent_event(AgentEvent::PlanUpdated {
                agent: agent.name().to_string(),
                progress,
                updated_at: Utc::now(),
            });
        }
    }
}

impl From<&SchedulerSettings> for RoundScheduler {
    fn from(settings: &SchedulerSettings) -> Self {
        Self::new(settings.max_rounds)
    }
}

impl Default for RoundScheduler {
    fn default() -> Self {
        Self::from(&SchedulerSettings::default())
    }
}
