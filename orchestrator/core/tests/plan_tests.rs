// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the plan aggregate and the task runner.
//!
//! Covers the life of a plan as a planning agent sees it: merge a batch,
//! execute tasks with an executor, revise a finished task, persist and
//! restore, and merge a revised batch that keeps the finished prefix.

use async_trait::async_trait;
use colony_core::application::task_runner::{
    execute_current_task, run_plan, ExecutorError, PlanRunStatus, TaskExecutor, TaskOutcome,
};
use colony_core::domain::plan::{find_cycle, CyclePolicy, Plan, PlanError};
use colony_core::domain::task::{Task, TaskId};

struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(&self, task: &Task) -> Result<TaskOutcome, ExecutorError> {
        Ok(TaskOutcome::success(format!("did: {}", task.instruction)))
    }
}

fn id(value: &str) -> TaskId {
    TaskId::new(value)
}

fn game_plan() -> Plan {
    let mut plan = Plan::new("Build a snake game");
    plan.add_tasks(vec![
        Task::new("3", "Write tests").with_dependencies(["2"]).with_assignee("Edward"),
        Task::new("1", "Write the PRD").with_assignee("Alice"),
        Task::new("2", "Implement the game").with_dependencies(["1"]).with_assignee("Alex"),
        Task::new("4", "Deploy").with_dependencies(["2", "3"]).with_assignee("Alex"),
    ])
    .unwrap();
    plan
}

fn order(plan: &Plan) -> Vec<&str> {
    plan.tasks().iter().map(|task| task.id.as_str()).collect()
}

#[test]
fn test_batch_is_sorted_dependencies_first() {
    let plan = game_plan();
    assert_eq!(order(&plan), vec!["1", "2", "3", "4"]);

    for (idx, task) in plan.tasks().iter().enumerate() {
        assert_eq!(plan.task_map()[&task.id], idx);
        for dep in &task.dependent_ids {
            assert!(plan.task_map()[dep] < idx, "{} must come after {}", task.id, dep);
        }
    }
    assert_eq!(plan.current_task_id(), Some(&id("1")));
}

#[test]
fn test_run_to_completion_then_revise() {
    let mut plan = game_plan();

    let report = tokio_test::block_on(run_plan(&mut plan, &EchoExecutor, 1));
    assert_eq!(report.status, PlanRunStatus::Finished);
    assert!(plan.is_plan_finished());
    assert_eq!(plan.current_task_id(), None);

    // Revising the implementation invalidates everything built on it.
    plan.replace_task(
        Task::new("2", "Implement the game with levels")
            .with_dependencies(["1"])
            .with_assignee("Alex"),
    )
    .unwrap();

    let unfinished: Vec<&str> = plan
        .tasks()
        .iter()
        .filter(|task| !task.is_finished)
        .map(|task| task.id.as_str())
        .collect();
    // The replaced task carries its own (unfinished) state; 3 and 4 were reset.
    assert_eq!(unfinished, vec!["2", "3", "4"]);
    assert!(plan.task(&id("3")).unwrap().result.is_none());
    assert_eq!(plan.current_task_id(), Some(&id("2")));
}

#[test]
fn test_reset_cascades_and_rewinds_current() {
    let mut plan = game_plan();
    plan.finish_all_tasks();

    plan.reset_task(&id("1")).unwrap();
    assert!(plan.tasks().iter().all(|task| !task.is_finished));
    assert_eq!(plan.current_task_id(), Some(&id("1")));

    assert!(matches!(
        plan.reset_task(&id("missing")),
        Err(PlanError::TaskNotFound(_))
    ));
}

#[test]
fn test_revised_batch_keeps_finished_prefix() {
    let mut plan = game_plan();
    tokio_test::block_on(execute_current_task(&mut plan, &EchoExecutor)).unwrap();
    tokio_test::block_on(execute_current_task(&mut plan, &EchoExecutor)).unwrap();
    assert_eq!(plan.finished_tasks().len(), 2);

    plan.add_tasks(vec![
        Task::new("1", "Write the PRD"),
        Task::new("2", "Implement the game").with_dependencies(["1"]),
        Task::new("5", "Write docs").with_dependencies(["2"]),
    ])
    .unwrap();

    assert_eq!(order(&plan), vec!["1", "2", "5"]);
    assert_eq!(plan.finished_tasks().len(), 2);
    assert_eq!(plan.current_task_id(), Some(&id("5")));
    assert!(!plan.has_task_id(&id("3")));
}

#[test]
fn test_dump_and_restore_preserve_order_and_state() {
    let mut plan = game_plan();
    plan.finish_current_task();

    let data = plan.dump_tasks().unwrap();
    let restored = Plan::restore("Build a snake game", &data).unwrap();

    assert_eq!(order(&restored), order(&plan));
    assert_eq!(restored.current_task_id(), Some(&id("2")));
    assert_eq!(restored.progress().finished, 1);
    assert_eq!(restored.progress().total, 4);
}

#[test]
fn test_cycles_are_detected_and_policy_applied() {
    let batch = vec![
        Task::new("a", "first").with_dependencies(["b"]),
        Task::new("b", "second").with_dependencies(["a"]),
    ];
    assert!(find_cycle(&batch).is_some());

    let mut tolerant = Plan::new("loop");
    tolerant.add_tasks(batch.clone()).unwrap();
    assert_eq!(tolerant.tasks().len(), 2);

    let mut strict = Plan::new("loop").with_cycle_policy(CyclePolicy::Reject);
    let err = strict.add_tasks(batch).unwrap_err();
    assert!(matches!(err, PlanError::CyclicDependency { .. }));
    assert!(strict.tasks().is_empty());
}

/// `t{i}` depends on `t{i-1}`, listed last-first.
fn chain(len: usize) -> Vec<Task> {
    (0..len)
        .rev()
        .map(|i| {
            let task = Task::new(format!("t{}", i), format!("step {}", i));
            if i == 0 {
                task
            } else {
                task.with_dependencies([format!("t{}", i - 1)])
            }
        })
        .collect()
}

#[test]
fn test_long_dependency_chain_merges() {
    let mut plan = Plan::new("deep").with_cycle_policy(CyclePolicy::Reject);
    plan.add_tasks(chain(100_000)).unwrap();

    assert_eq!(plan.tasks().len(), 100_000);
    assert_eq!(plan.tasks()[0].id, id("t0"));
    assert_eq!(plan.tasks()[99_999].id, id("t99999"));
    assert_eq!(plan.current_task_id(), Some(&id("t0")));
}

#[test]
fn test_long_dependency_ring_is_reported() {
    let mut ring = chain(100_000);
    // Close the loop: t0 now waits on the last task.
    if let Some(first) = ring.iter_mut().find(|task| task.id == id("t0")) {
        first.dependent_ids.insert(id("t99999"));
    }

    let cycle = find_cycle(&ring).unwrap();
    assert_eq!(cycle.len(), 100_001);
    assert_eq!(cycle.first(), cycle.last());

    let mut strict = Plan::new("ring").with_cycle_policy(CyclePolicy::Reject);
    assert!(matches!(
        strict.add_tasks(ring),
        Err(PlanError::CyclicDependency { .. })
    ));
}
