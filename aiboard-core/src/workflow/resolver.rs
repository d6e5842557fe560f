//! Step dependency resolution

use crate::models::workflow::{StepStatus, WorkflowDefinition, WorkflowExecution, WorkflowStep};
use std::collections::HashSet;

/// Whether a pending step has every dependency completed
pub fn is_ready(step: &WorkflowStep, execution: &WorkflowExecution) -> bool {
    let pending = execution
        .step(&step.id)
        .is_some_and(|s| s.status == StepStatus::Pending);

    pending
        && step.dependencies.iter().all(|dep| {
            execution
                .step(dep)
                .is_some_and(|s| s.status == StepStatus::Completed)
        })
}

/// Steps that can run now, in declaration order
pub fn ready_steps<'a>(
    workflow: &'a WorkflowDefinition,
    execution: &WorkflowExecution,
) -> Vec<&'a WorkflowStep> {
    workflow
        .steps
        .iter()
        .filter(|step| is_ready(step, execution))
        .collect()
}

/// Pending steps that can never become ready
///
/// A step is blocked when a dependency failed, was skipped, does not exist,
/// or is itself blocked. Dependency cycles block every step on the cycle.
pub fn blocked_steps(workflow: &WorkflowDefinition, execution: &WorkflowExecution) -> Vec<String> {
    let mut blocked: HashSet<&str> = HashSet::new();

    // Fixed point: a pending step is viable if all its deps are completed or viable.
    let mut viable: HashSet<&str> = execution
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .map(|s| s.step_id.as_str())
        .collect();

    loop {
        let mut changed = false;
        for step in &workflow.steps {
            if viable.contains(step.id.as_str()) {
                continue;
            }
            let pending = execution
                .step(&step.id)
                .is_some_and(|s| matches!(s.status, StepStatus::Pending | StepStatus::Running));
            if pending
                && step
                    .dependencies
                    .iter()
                    .all(|dep| viable.contains(dep.as_str()))
            {
                viable.insert(step.id.as_str());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for step in &workflow.steps {
        let pending = execution
            .step(&step.id)
            .is_some_and(|s| s.status == StepStatus::Pending);
        if pending && !viable.contains(step.id.as_str()) {
            blocked.insert(step.id.as_str());
        }
    }

    workflow
        .steps
        .iter()
        .filter(|s| blocked.contains(s.id.as_str()))
        .map(|s| s.id.clone())
        .collect()
}
