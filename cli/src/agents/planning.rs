// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Coordinator that owns the team plan.
//!
//! Every turn that brings news runs the current task through the executor
//! and hands the result to the task's assignee. Once the plan is finished
//! it asks the human for follow-up work; without an answer it stays silent.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use colony_core::application::task_runner::{execute_current_task, TaskExecutor};
use colony_core::domain::address::ROUTE_TO_NO_ONE;
use colony_core::domain::agent::{
    Agent, AgentError, HumanChannel, PublishOptions, Turn, HUMAN_RESPONSE_PREFIX,
};
use colony_core::domain::message::{Message, MessageRole};
use colony_core::domain::plan::{Plan, PlanProgress, PlanSnapshot};
use colony_core::domain::task::{Task, TaskId};

pub struct PlanningAgent {
    name: String,
    profile: String,
    plan: Mutex<Plan>,
    executor: Arc<dyn TaskExecutor>,
}

impl PlanningAgent {
    pub fn new(
        name: impl Into<String>,
        profile: impl Into<String>,
        plan: Plan,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            profile: profile.into(),
            plan: Mutex::new(plan),
            executor,
        }
    }

    pub async fn current_plan(&self) -> Plan {
        self.plan.lock().await.clone()
    }

    fn publish_as_coordinator(&self, turn: &Turn<'_>, message: Message) -> bool {
        turn.publisher
            .publish_with(message, PublishOptions::from_publicer(self.profile.as_str()))
    }

    fn message(&self, content: String) -> Message {
        Message::new(content)
            .with_role(MessageRole::Assistant)
            .with_sent_from(self.name.as_str())
    }

    /// Ask the human for more work once the plan is done.
    async fn request_follow_up(&self, turn: &Turn<'_>, plan: &mut Plan) -> Result<bool, AgentError> {
        let question = format!("Plan '{}' is finished. Anything else to do?", plan.goal);
        let answer = match turn.human.ask_human(&question, Some(self.name.as_str())).await {
            Ok(answer) => answer,
            Err(e) => {
                info!(agent = %self.name, reason = %e, "No follow-up from human");
                return Ok(false);
            }
        };
        let answer = answer
            .strip_prefix(HUMAN_RESPONSE_PREFIX)
            .unwrap_or(&answer)
            .trim()
            .to_string();
        if answer.is_empty() {
            return Ok(false);
        }

        let assignee = plan
            .tasks()
            .last()
            .map(|task| task.assignee.clone())
            .unwrap_or_default();
        let task = Task::new(next_feedback_id(plan), answer).with_assignee(assignee);
        info!(agent = %self.name, task_id = %task.id, "Appending follow-up task");
        plan.append_task(task)?;
        Ok(true)
    }
}

/// First free id of the form `feedback-N`.
fn next_feedback_id(plan: &Plan) -> TaskId {
    (1..)
        .map(|n| TaskId::new(format!("feedback-{}", n)))
        .find(|id| !plan.has_task_id(id))
        .unwrap_or_else(|| TaskId::new("feedback"))
}

#[async_trait]
impl Agent for PlanningAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> &str {
        &self.profile
    }

    fn plan_progress(&self) -> Option<PlanProgress> {
        self.plan.try_lock().ok().map(|plan| plan.progress())
    }

    fn plan_snapshot(&self) -> Option<PlanSnapshot> {
        self.plan.try_lock().ok().map(|plan| plan.snapshot())
    }

    async fn run(&self, turn: Turn<'_>) -> Result<(), AgentError> {
        let news = turn
            .mailbox
            .pop_all()
            .into_iter()
            .filter(|message| message.sent_from != self.name)
            .count();
        if news == 0 {
            return Ok(());
        }

        let mut plan = self.plan.lock().await;

        if plan.is_plan_finished() && !self.request_follow_up(&turn, &mut plan).await? {
            // Nothing left to coordinate.
            let summary = format!("Plan '{}' is finished.", plan.goal);
            turn.human
                .reply_to_human(&summary, Some(self.name.as_str()))
                .await;
            self.publish_as_coordinator(
                &turn,
                self.message(summary).with_send_to([ROUTE_TO_NO_ONE]),
            );
            return Ok(());
        }

        let executed = execute_current_task(&mut plan, self.executor.as_ref())
            .await
            .map_err(|e| AgentError::Collaborator(e.to_string()))?;
        let Some((task_id, outcome)) = executed else {
            return Ok(());
        };

        let assignee = plan
            .task(&task_id)
            .map(|task| task.assignee.clone())
            .unwrap_or_default();
        if !outcome.success {
            warn!(agent = %self.name, task_id = %task_id, "Task failed; will retry on next news");
        }

        let status = if outcome.success { "done" } else { "failed" };
        let mut message = self.message(format!("Task {} {}: {}", task_id, status, outcome.output));
        if !assignee.is_empty() {
            message = message.with_send_to([assignee.as_str()]);
        }
        self.publish_as_coordinator(&turn, message);
        Ok(())
    }
}
