// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a [`Task`] within a plan (usually a short number like `"3"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Outcome recorded by whoever executed the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub code: String,
    pub output: String,
    pub is_success: bool,
}

/// A unit of work in a [`Plan`](crate::domain::plan::Plan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub task_type: String,
    /// Name of the agent expected to carry out the task.
    #[serde(default)]
    pub assignee: String,
    pub instruction: String,
    /// Ids of tasks that must finish before this one.
    #[serde(default)]
    pub dependent_ids: BTreeSet<TaskId>,
    #[serde(default)]
    pub is_finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, instruction: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_type: String::new(),
            assignee: String::new(),
            instruction: instruction.into(),
            dependent_ids: BTreeSet::new(),
            is_finished: false,
            result: None,
        }
    }

    pub fn with_dependencies<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.dependent_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = assignee.into();
        self
    }

    pub fn with_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    pub fn depends_on(&self, id: &TaskId) -> bool {
        self.dependent_ids.contains(id)
    }

    /// Mark unfinished and drop any recorded result.
    pub fn reset(&mut self) {
        self.is_finished = false;
        self.result = None;
    }

    pub fn record_result(&mut self, result: TaskResult) {
        self.result = Some(result);
    }
}
