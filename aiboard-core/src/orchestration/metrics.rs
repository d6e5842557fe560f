//! Aggregate metrics over executions and messages

use crate::models::{
    AgentPerformance, BusinessProcess, ExecutionStatus, OrchestrationMetrics, ProcessMetrics,
    StepStatus, WorkflowExecution,
};
use std::collections::BTreeMap;

/// How many agents the leaderboard keeps
pub const TOP_AGENT_COUNT: usize = 5;

fn average(durations: impl Iterator<Item = u64>) -> u64 {
    let (sum, count) = durations.fold((0u64, 0u64), |(sum, count), d| (sum + d, count + 1));
    if count == 0 {
        0
    } else {
        sum / count
    }
}

/// Metrics of a business process from its executions
///
/// Only finished executions count; running ones have no outcome yet.
pub fn process_metrics<'a>(
    executions: impl IntoIterator<Item = &'a WorkflowExecution>,
) -> ProcessMetrics {
    let finished: Vec<_> = executions
        .into_iter()
        .filter(|e| e.status.is_terminal())
        .collect();

    let succeeded = finished
        .iter()
        .filter(|e| e.status == ExecutionStatus::Completed)
        .count();

    let success_rate = if finished.is_empty() {
        0.0
    } else {
        succeeded as f64 / finished.len() as f64 * 100.0
    };

    ProcessMetrics {
        total_executions: finished.len(),
        success_rate,
        average_duration_ms: average(finished.iter().filter_map(|e| e.duration_ms())),
        last_execution: finished.iter().map(|e| e.started_at).max(),
    }
}

#[derive(Default)]
struct AgentTally {
    assigned: usize,
    completed: usize,
    failed: usize,
}

/// Board-wide snapshot
pub fn orchestration_metrics(
    total_messages: usize,
    executions: &[WorkflowExecution],
    processes: &[BusinessProcess],
) -> OrchestrationMetrics {
    let completed: Vec<_> = executions
        .iter()
        .filter(|e| e.status == ExecutionStatus::Completed)
        .collect();

    let mut tallies: BTreeMap<String, AgentTally> = BTreeMap::new();
    for record in executions.iter().flat_map(|e| e.steps.iter()) {
        if let Some(agent_id) = &record.assigned_agent_id {
            let tally = tallies.entry(agent_id.clone()).or_default();
            tally.assigned += 1;
            match record.status {
                StepStatus::Completed => tally.completed += 1,
                StepStatus::Failed => tally.failed += 1,
                _ => {}
            }
        }
    }

    let total_assigned: usize = tallies.values().map(|t| t.assigned).sum();
    let agent_utilization = tallies
        .iter()
        .map(|(agent, tally)| {
            (
                agent.clone(),
                tally.assigned as f64 / total_assigned as f64 * 100.0,
            )
        })
        .collect();

    let mut top_performing_agents: Vec<AgentPerformance> = tallies
        .iter()
        .filter(|(_, tally)| tally.completed > 0)
        .map(|(agent, tally)| AgentPerformance {
            agent_id: agent.clone(),
            score: tally.completed as f64 / (tally.completed + tally.failed) as f64 * 100.0,
            completed_tasks: tally.completed,
        })
        .collect();
    top_performing_agents.sort_by(|a, b| {
        b.completed_tasks
            .cmp(&a.completed_tasks)
            .then(b.score.total_cmp(&a.score))
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    top_performing_agents.truncate(TOP_AGENT_COUNT);

    OrchestrationMetrics {
        total_messages,
        active_workflows: executions
            .iter()
            .filter(|e| e.status == ExecutionStatus::Running)
            .count(),
        completed_workflows: completed.len(),
        average_workflow_duration_ms: average(completed.iter().filter_map(|e| e.duration_ms())),
        agent_utilization,
        top_performing_agents,
        business_process_metrics: processes
            .iter()
            .map(|p| (p.id, p.metrics.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepType, WorkflowCategory, WorkflowDefinition, WorkflowStep, WorkflowType};
    use chrono::{Duration, Utc};
    use serde_json::Map;
    use uuid::Uuid;

    fn workflow() -> WorkflowDefinition {
        let now = Utc::now();
        WorkflowDefinition {
            id: Uuid::new_v4(),
            name: "metrics".to_string(),
            description: String::new(),
            workflow_type: WorkflowType::Custom,
            category: WorkflowCategory::General,
            steps: vec![WorkflowStep::new("task", "Task", StepType::AgentTask).with_agent("a")],
            triggers: vec![],
            is_active: true,
            is_template: false,
            metadata: None,
            created_at: now,
            updated_at: now,
            created_by: "user".to_string(),
        }
    }

    fn finished(
        wf: &WorkflowDefinition,
        status: ExecutionStatus,
        millis: i64,
        agent: &str,
        step_status: StepStatus,
    ) -> WorkflowExecution {
        let mut execution = WorkflowExecution::new(wf, Map::new(), "tester");
        execution.status = status;
        execution.completed_at = Some(execution.started_at + Duration::milliseconds(millis));
        let record = execution.step_mut("task").unwrap();
        record.assigned_agent_id = Some(agent.to_string());
        record.status = step_status;
        execution
    }

    #[test]
    fn test_process_metrics_ignore_running() {
        let wf = workflow();
        let mut running = WorkflowExecution::new(&wf, Map::new(), "tester");
        running.status = ExecutionStatus::Running;
        let executions = vec![
            finished(&wf, ExecutionStatus::Completed, 100, "a", StepStatus::Completed),
            finished(&wf, ExecutionStatus::Failed, 300, "a", StepStatus::Failed),
            running,
        ];

        let metrics = process_metrics(&executions);
        assert_eq!(metrics.total_executions, 2);
        assert_eq!(metrics.success_rate, 50.0);
        assert_eq!(metrics.average_duration_ms, 200);
        assert!(metrics.last_execution.is_some());

        let none: Vec<WorkflowExecution> = Vec::new();
        assert_eq!(process_metrics(&none), ProcessMetrics::default());
    }

    #[test]
    fn test_orchestration_metrics() {
        let wf = workflow();
        let executions = vec![
            finished(&wf, ExecutionStatus::Completed, 100, "writer", StepStatus::Completed),
            finished(&wf, ExecutionStatus::Completed, 300, "writer", StepStatus::Completed),
            finished(&wf, ExecutionStatus::Failed, 50, "editor", StepStatus::Failed),
            finished(&wf, ExecutionStatus::Completed, 200, "editor", StepStatus::Completed),
        ];

        let metrics = orchestration_metrics(7, &executions, &[]);

        assert_eq!(metrics.total_messages, 7);
        assert_eq!(metrics.completed_workflows, 3);
        assert_eq!(metrics.active_workflows, 0);
        assert_eq!(metrics.average_workflow_duration_ms, 200);
        assert_eq!(metrics.agent_utilization["writer"], 50.0);
        assert_eq!(metrics.agent_utilization["editor"], 50.0);

        let top = &metrics.top_performing_agents;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].agent_id, "writer");
        assert_eq!(top[0].score, 100.0);
        assert_eq!(top[1].agent_id, "editor");
        assert_eq!(top[1].score, 50.0);
    }
}
