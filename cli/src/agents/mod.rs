// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scripted team members used by `colony run`
//!
//! Agents here produce deterministic content so that a team manifest can be
//! exercised end to end without any model behind it.

pub mod planning;
pub mod scripted;

pub use planning::PlanningAgent;
pub use scripted::ScriptedAgent;

use async_trait::async_trait;

use colony_core::application::task_runner::{ExecutorError, TaskExecutor, TaskOutcome};
use colony_core::domain::task::Task;

/// Executor that reports every task as completed.
#[derive(Debug, Default)]
pub struct ScriptedExecutor;

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&self, task: &Task) -> Result<TaskOutcome, ExecutorError> {
        let by = if task.assignee.is_empty() {
            String::new()
        } else {
            format!(" (by {})", task.assignee)
        };
        Ok(TaskOutcome::success(format!("Completed: {}{}", task.instruction, by)))
    }
}
