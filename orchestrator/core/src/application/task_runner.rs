// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Runner
//!
//! Drives a [`Plan`] forward with an external [`TaskExecutor`]:
//! run the current task → record its result → finish it on success →
//! recompute the current task (repeat until the plan is finished or a task
//! runs out of attempts).
//!
//! ## Attempt Table
//! | Outcome | Action |
//! |---------|--------|
//! | `success = true` | Record result, finish task, move on |
//! | `success = false` / executor error, attempts remaining | Record result, retry same task |
//! | failure, `max_attempts` reached | Stop with [`PlanRunStatus::TaskFailed`] |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::plan::Plan;
use crate::domain::task::{Task, TaskId, TaskResult};

/// What an executor reports back for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub code: String,
}

impl TaskOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            code: String::new(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            code: String::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

impl From<TaskOutcome> for TaskResult {
    fn from(outcome: TaskOutcome) -> Self {
        TaskResult {
            code: outcome.code,
            output: outcome.output,
            is_success: outcome.success,
        }
    }
}

/// Collaborator that carries out a single task (writes code, runs a tool, ...).
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> Result<TaskOutcome, ExecutorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Task execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Executor unavailable: {0}")]
    Unavailable(String),
}

/// Run the plan's current task once.
///
/// Returns `Ok(None)` when the plan has no current task. Executor errors are
/// returned unchanged and leave the plan untouched.
pub async fn execute_current_task(
    plan: &mut Plan,
    executor: &dyn TaskExecutor,
) -> Result<Option<(TaskId, TaskOutcome)>, ExecutorError> {
    let Some(task) = plan.current_task().cloned() else {
        return Ok(None);
    };

    info!(task_id = %task.id, assignee = %task.assignee, "Executing task");
    let outcome = executor.execute(&task).await?;

    // The task id comes from the plan itself, so recording cannot miss.
    if let Err(e) = plan.record_result(&task.id, outcome.clone().into()) {
        warn!(task_id = %task.id, error = %e, "Failed to record task result");
    }

    if outcome.success {
        plan.finish_current_task();
        info!(task_id = %task.id, "Task finished");
    } else {
        warn!(task_id = %task.id, output = %outcome.output, "Task reported failure");
    }

    Ok(Some((task.id, outcome)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanRunStatus {
    Finished,
    TaskFailed { task_id: TaskId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRunReport {
    pub status: PlanRunStatus,
    pub completed: Vec<TaskId>,
    pub attempts: u32,
}

/// Execute tasks until the plan is finished or one task fails
/// `max_attempts` times in a row.
pub async fn run_plan(
    plan: &mut Plan,
    executor: &dyn TaskExecutor,
    max_attempts: u32,
) -> PlanRunReport {
    let max_attempts = max_attempts.max(1);
    let mut completed = Vec::new();
    let mut attempts = 0;
    let mut failures_on_current = 0;

    while let Some(task_id) = plan.current_task_id().cloned() {
        attempts += 1;
        info!(task_id = %task_id, attempt = failures_on_current + 1, max_attempts, "Starting task attempt");

        let succeeded = match execute_current_task(plan, executor).await {
            Ok(Some((_, outcome))) => outcome.success,
            Ok(None) => break,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Executor error");
                false
            }
        };

        if succeeded {
            completed.push(task_id);
            failures_on_current = 0;
            continue;
        }

        failures_on_current += 1;
        if failures_on_current >= max_attempts {
            warn!(task_id = %task_id, attempts = failures_on_current, "Task exhausted its attempts");
            return PlanRunReport {
                status: PlanRunStatus::TaskFailed { task_id },
                completed,
                attempts,
            };
        }
    }

    PlanRunReport {
        status: PlanRunStatus::Finished,
        completed,
        attempts,
    }
}
