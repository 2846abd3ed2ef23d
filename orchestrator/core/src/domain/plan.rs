// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Plan Aggregate (Task Graph)
//!
//! A [`Plan`] is a goal plus a sequence of [`Task`]s linked by dependency
//! edges, and a pointer to the task that should run next.
//!
//! # Invariants
//!
//! - `tasks` is kept in topological order relative to the acyclic part of the
//!   graph; cyclic members end up in some order, not a valid linearization.
//! - `task_map` is rebuilt from `tasks` after every mutation.
//! - `current_task_id` is the first unfinished task in `tasks`, or `None`.
//!
//! The graph is not guaranteed to be acyclic. Sorting and reset cascades are
//! guarded by visited sets so they always terminate; [`find_cycle`] reports a
//! cycle and [`CyclePolicy`] decides whether merging one is an error.
//!
//! The plan is owned by a single planning agent; concurrent callers must
//! serialize access themselves.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::domain::task::{Task, TaskId, TaskResult};

/// What [`Plan::add_tasks`] does when a batch contains a dependency cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Log a warning and merge anyway.
    #[default]
    Tolerate,
    /// Reject the batch with [`PlanError::CyclicDependency`].
    Reject,
}

/// Sort tasks so that dependencies come first (DFS post-order).
///
/// Each id is visited once, so cyclic input terminates. Dependencies that are
/// not part of `tasks` are skipped. When ids repeat, the last definition wins.
pub fn topological_sort(tasks: &[Task]) -> Vec<Task> {
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|task| (&task.id, task)).collect();
    let mut visited: HashSet<&TaskId> = HashSet::with_capacity(by_id.len());
    let mut sorted = Vec::with_capacity(by_id.len());

    for root in tasks {
        // (id, children already pushed)
        let mut stack: Vec<(&TaskId, bool)> = vec![(&root.id, false)];
        while let Some((id, expanded)) = stack.pop() {
            let Some(task) = by_id.get(id).copied() else {
                continue;
            };
            if expanded {
                sorted.push(task.clone());
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            for dep in task.dependent_ids.iter().rev() {
                if !visited.contains(dep) {
                    stack.push((dep, false));
                }
            }
        }
    }

    sorted
}

/// Find one dependency cycle, returned as a closed path (`[a, b, a]`).
///
/// Three-colour DFS over an explicit stack; depth is bounded by the heap,
/// not the thread stack.
pub fn find_cycle(tasks: &[Task]) -> Option<Vec<TaskId>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|task| (&task.id, task)).collect();
    let mut marks: HashMap<&TaskId, Mark> = HashMap::with_capacity(by_id.len());

    for root in tasks {
        if marks.contains_key(&root.id) {
            continue;
        }
        let Some(task) = by_id.get(&root.id).copied() else {
            continue;
        };

        // `path` mirrors the ids on `stack`, in order.
        let mut path: Vec<&TaskId> = vec![&task.id];
        let mut stack = vec![task.dependent_ids.iter()];
        marks.insert(&task.id, Mark::InProgress);

        while let Some(deps) = stack.last_mut() {
            match deps.next() {
                Some(dep) => match marks.get(dep) {
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => {
                        let start = path.iter().position(|p| *p == dep)?;
                        let mut cycle: Vec<TaskId> =
                            path[start..].iter().map(|p| (*p).clone()).collect();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    None => {
                        if let Some(next) = by_id.get(dep).copied() {
                            marks.insert(&next.id, Mark::InProgress);
                            path.push(&next.id);
                            stack.push(next.dependent_ids.iter());
                        }
                    }
                },
                None => {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        marks.insert(done, Mark::Done);
                    }
                }
            }
        }
    }

    None
}

/// Read-only view of plan progress, used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProgress {
    pub goal: String,
    pub total: usize,
    pub finished: usize,
    pub current_task_id: Option<TaskId>,
}

/// Serializable form of a plan. `tasks` is the ordered JSON array persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub goal: String,
    #[serde(default)]
    pub context: String,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub current_task_id: Option<TaskId>,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub goal: String,
    pub context: String,
    tasks: Vec<Task>,
    task_map: HashMap<TaskId, usize>,
    current_task_id: Option<TaskId>,
    cycle_policy: CyclePolicy,
}

impl Plan {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            context: String::new(),
            tasks: Vec::new(),
            task_map: HashMap::new(),
            current_task_id: None,
            cycle_policy: CyclePolicy::default(),
        }
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    pub fn cycle_policy(&self) -> CyclePolicy {
        self.cycle_policy
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Index of every task in [`Plan::tasks`], keyed by id.
    pub fn task_map(&self) -> &HashMap<TaskId, usize> {
        &self.task_map
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.task_map.get(id).map(|&idx| &self.tasks[idx])
    }

    pub fn has_task_id(&self, id: &TaskId) -> bool {
        self.task_map.contains_key(id)
    }

    pub fn current_task_id(&self) -> Option<&TaskId> {
        self.current_task_id.as_ref()
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current_task_id.as_ref().and_then(|id| self.task(id))
    }

    /// Merge an unordered batch into the plan.
    ///
    /// The batch is sorted first. An empty plan adopts it; otherwise the
    /// longest common prefix (same id and instruction, position by position)
    /// is kept as-is, finished state included, and the rest of the sorted
    /// batch replaces the old tail.
    pub fn add_tasks(&mut self, tasks: Vec<Task>) -> Result<(), PlanError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let batch_ids: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();
        for task in &tasks {
            if let Some(dep) = task.dependent_ids.iter().find(|dep| !batch_ids.contains(dep)) {
                return Err(PlanError::UnknownDependency {
                    task_id: task.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        if let Some(cycle) = find_cycle(&tasks) {
            match self.cycle_policy {
                CyclePolicy::Reject => return Err(PlanError::CyclicDependency { cycle }),
                CyclePolicy::Tolerate => warn!(
                    cycle = %display_cycle(&cycle),
                    "Merging task batch with a dependency cycle; order of cyclic tasks is arbitrary"
                ),
            }
        }

        let new_tasks = topological_sort(&tasks);

        if self.tasks.is_empty() {
            self.tasks = new_tasks;
        } else {
            let prefix_length = self
                .tasks
                .iter()
                .zip(new_tasks.iter())
                .take_while(|(old, new)| old.id == new.id && old.instruction == new.instruction)
                .count();

            let mut merged: Vec<Task> = self.tasks[..prefix_length].to_vec();
            merged.extend(new_tasks.into_iter().skip(prefix_length));
            self.tasks = merged;
        }

        self.update_current_task();
        Ok(())
    }

    /// Mark a task unfinished, clear its result, and do the same for every
    /// task that depends on it directly or transitively.
    pub fn reset_task(&mut self, id: &TaskId) -> Result<(), PlanError> {
        if !self.has_task_id(id) {
            return Err(PlanError::TaskNotFound(id.clone()));
        }
        self.reset_cascade(vec![id.clone()]);
        self.update_current_task();
        Ok(())
    }

    /// Swap in a new definition for an existing task and reset its dependents.
    pub fn replace_task(&mut self, new_task: Task) -> Result<(), PlanError> {
        let Some(&idx) = self.task_map.get(&new_task.id) else {
            return Err(PlanError::TaskNotFound(new_task.id.clone()));
        };
        self.check_dependencies_exist(&new_task)?;

        let id = new_task.id.clone();
        self.tasks[idx] = new_task;

        let dependents = self.dependents_of(&id);
        self.reset_cascade(dependents);
        self.update_current_task();
        Ok(())
    }

    /// Add one task at the end of the plan. Its dependencies must already be
    /// planned. An existing id is overwritten in place.
    pub fn append_task(&mut self, new_task: Task) -> Result<(), PlanError> {
        self.check_dependencies_exist(&new_task)?;

        if let Some(&idx) = self.task_map.get(&new_task.id) {
            warn!(
                task_id = %new_task.id,
                "Task already in current plan, should use replace_task instead. Overwriting the existing task."
            );
            self.tasks[idx] = new_task;
        } else {
            self.task_map.insert(new_task.id.clone(), self.tasks.len());
            self.tasks.push(new_task);
        }

        self.update_current_task();
        Ok(())
    }

    /// Store an execution result on a task without changing its finished flag.
    pub fn record_result(&mut self, id: &TaskId, result: TaskResult) -> Result<(), PlanError> {
        let Some(&idx) = self.task_map.get(id) else {
            return Err(PlanError::TaskNotFound(id.clone()));
        };
        self.tasks[idx].record_result(result);
        Ok(())
    }

    /// Finish the current task and move the pointer. Returns the finished id.
    pub fn finish_current_task(&mut self) -> Option<TaskId> {
        let id = self.current_task_id.clone()?;
        if let Some(&idx) = self.task_map.get(&id) {
            self.tasks[idx].is_finished = true;
        }
        self.update_current_task();
        Some(id)
    }

    pub fn finish_all_tasks(&mut self) {
        while self.finish_current_task().is_some() {}
    }

    pub fn is_plan_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.is_finished)
    }

    /// Finished tasks in plan order.
    pub fn finished_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|task| task.is_finished).collect()
    }

    pub fn progress(&self) -> PlanProgress {
        PlanProgress {
            goal: self.goal.clone(),
            total: self.tasks.len(),
            finished: self.tasks.iter().filter(|task| task.is_finished).count(),
            current_task_id: self.current_task_id.clone(),
        }
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            goal: self.goal.clone(),
            context: self.context.clone(),
            tasks: self.tasks.clone(),
            current_task_id: self.current_task_id.clone(),
        }
    }

    /// Rebuild a plan from a snapshot. Tasks keep their array order and state.
    pub fn from_snapshot(snapshot: PlanSnapshot) -> Self {
        let mut plan = Plan::new(snapshot.goal);
        plan.context = snapshot.context;
        plan.tasks = snapshot.tasks;
        plan.update_current_task();
        plan
    }

    /// The task list as an ordered JSON array.
    pub fn dump_tasks(&self) -> Result<String, PlanError> {
        serde_json::to_string(&self.tasks).map_err(PlanError::Serialization)
    }

    /// Rebuild a plan for `goal` from [`Plan::dump_tasks`] output.
    pub fn restore(goal: impl Into<String>, data: &str) -> Result<Self, PlanError> {
        let tasks: Vec<Task> = serde_json::from_str(data).map_err(PlanError::Serialization)?;
        Ok(Self::from_snapshot(PlanSnapshot {
            goal: goal.into(),
            context: String::new(),
            tasks,
            current_task_id: None,
        }))
    }

    fn check_dependencies_exist(&self, task: &Task) -> Result<(), PlanError> {
        match task.dependent_ids.iter().find(|dep| !self.has_task_id(dep)) {
            Some(dep) => Err(PlanError::UnknownDependency {
                task_id: task.id.clone(),
                dependency: dep.clone(),
            }),
            None => Ok(()),
        }
    }

    fn dependents_of(&self, id: &TaskId) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|task| task.depends_on(id))
            .map(|task| task.id.clone())
            .collect()
    }

    fn reset_cascade(&mut self, roots: Vec<TaskId>) {
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut pending = roots;

        while let Some(id) = pending.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            if let Some(&idx) = self.task_map.get(&id) {
                self.tasks[idx].reset();
            }
            pending.extend(
                self.dependents_of(&id)
                    .into_iter()
                    .filter(|dependent| !visited.contains(dependent)),
            );
        }
    }

    fn update_current_task(&mut self) {
        self.tasks = topological_sort(&self.tasks);
        self.task_map = self
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.id.clone(), idx))
            .collect();
        self.current_task_id = self
            .tasks
            .iter()
            .find(|task| !task.is_finished)
            .map(|task| task.id.clone());

        debug!(
            goal = %self.goal,
            tasks = self.tasks.len(),
            current_task_id = ?self.current_task_id,
            "Plan updated"
        );
    }
}

fn display_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Task '{0}' not found in plan")]
    TaskNotFound(TaskId),

    #[error("Task '{task_id}' has unknown dependency '{dependency}'")]
    UnknownDependency { task_id: TaskId, dependency: TaskId },

    #[error("Cyclic task dependency: {}", display_cycle(.cycle))]
    CyclicDependency { cycle: Vec<TaskId> },

    #[error("Plan serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}
