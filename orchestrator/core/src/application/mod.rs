// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod task_runner;

// Re-export use cases for convenience
pub use task_runner::{
    execute_current_task, run_plan, ExecutorError, PlanRunReport, PlanRunStatus, TaskExecutor,
    TaskOutcome,
};
