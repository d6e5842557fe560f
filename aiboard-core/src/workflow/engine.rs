//! Dependency-gated workflow execution engine

use crate::error::StepError;
use crate::models::workflow::{
    ExecutionStatus, StepStatus, WorkflowDefinition, WorkflowExecution, WorkflowStep,
    WorkflowStepExecution,
};
use crate::workflow::executor::{StepExecutor, StepOutcome, StepRequest};
use crate::workflow::persistence::BoardPersistence;
use crate::workflow::resolver::{blocked_steps, is_ready};
use crate::workflow::retry::{calculate_retry_delay, should_retry};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Drives one execution of a workflow to a terminal status
///
/// The engine is the only writer of its execution record while it runs; every
/// change is saved through the persistence layer.
pub struct WorkflowEngine {
    /// Workflow definition
    workflow: WorkflowDefinition,
    /// Step executor
    executor: Arc<dyn StepExecutor>,
    /// Persistence layer
    persistence: Arc<BoardPersistence>,
    /// Cancels in-flight steps and retry waits
    cancel: CancellationToken,
}

enum StepRun {
    Finished,
    Cancelled,
}

impl WorkflowEngine {
    /// Create new workflow engine
    pub fn new(
        workflow: WorkflowDefinition,
        executor: Arc<dyn StepExecutor>,
        persistence: Arc<BoardPersistence>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            workflow,
            executor,
            persistence,
            cancel,
        }
    }

    /// Run an execution until no step can make progress, then settle its status
    pub async fn run(&self, mut execution: WorkflowExecution) -> Result<WorkflowExecution> {
        execution.status = ExecutionStatus::Running;
        self.save(&execution)?;

        tracing::info!(
            "Starting execution {} of workflow '{}' ({} steps)",
            execution.id,
            self.workflow.name,
            self.workflow.steps.len()
        );

        'passes: loop {
            let mut progressed = false;

            for step in &self.workflow.steps {
                if self.cancel.is_cancelled() {
                    break 'passes;
                }
                if !is_ready(step, &execution) {
                    continue;
                }

                progressed = true;
                if let StepRun::Cancelled = self.run_step(&mut execution, step).await? {
                    break 'passes;
                }
            }

            if !progressed {
                break;
            }
        }

        self.finalize(&mut execution)?;
        Ok(execution)
    }

    /// Run a step, retrying inline until it completes or exhausts its policy
    async fn run_step(
        &self,
        execution: &mut WorkflowExecution,
        step: &WorkflowStep,
    ) -> Result<StepRun> {
        loop {
            let attempt = {
                let record = step_record(execution, &step.id)?;
                record.status = StepStatus::Running;
                record.started_at = Some(Utc::now());
                record.completed_at = None;
                record.duration_ms = None;
                record.retry_count
            };
            let context = execution.execution_context.clone();
            if let Ok(record) = step_record(execution, &step.id) {
                record.input = Some(Value::Object(context.clone()));
            }
            execution.current_step_id = Some(step.id.clone());
            self.save(execution)?;

            tracing::info!(
                "Execution {}: running step '{}' (attempt {})",
                execution.id,
                step.id,
                attempt + 1
            );

            let request = StepRequest {
                execution_id: execution.id,
                workflow_id: execution.workflow_id,
                step,
                context: &context,
                attempt,
            };

            let started = Instant::now();
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(StepRun::Cancelled),
                result = execute_with_timeout(self.executor.as_ref(), request, step.timeout_seconds) => result,
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(outcome) => {
                    self.complete_step(execution, step, outcome, elapsed_ms)?;
                    return Ok(StepRun::Finished);
                }
                Err(err) => {
                    let message = err.to_string();
                    let record = step_record(execution, &step.id)?;
                    record.error_message = Some(message.clone());
                    record.duration_ms = Some(elapsed_ms);

                    let policy = step.retry_policy.as_ref();
                    if !should_retry(policy, record.retry_count) {
                        record.status = StepStatus::Failed;
                        record.completed_at = Some(Utc::now());
                        execution.metrics.failed_steps += 1;
                        self.save(execution)?;

                        tracing::warn!(
                            "Execution {}: step '{}' failed: {}",
                            execution.id,
                            step.id,
                            message
                        );
                        return Ok(StepRun::Finished);
                    }

                    record.retry_count += 1;
                    record.status = StepStatus::Pending;
                    let retry = record.retry_count;
                    self.save(execution)?;

                    let delay = policy
                        .map(|p| calculate_retry_delay(p, retry))
                        .unwrap_or_default();
                    tracing::warn!(
                        "Execution {}: step '{}' failed ({}), retry {} in {:?}",
                        execution.id,
                        step.id,
                        message,
                        retry,
                        delay
                    );

                    tokio::select! {
                        _ = self.cancel.cancelled() => return Ok(StepRun::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    fn complete_step(
        &self,
        execution: &mut WorkflowExecution,
        step: &WorkflowStep,
        outcome: StepOutcome,
        elapsed_ms: u64,
    ) -> Result<()> {
        execution.execution_context.extend(outcome.context_updates);

        let record = step_record(execution, &step.id)?;
        record.status = StepStatus::Completed;
        record.completed_at = Some(Utc::now());
        record.duration_ms = Some(elapsed_ms);
        record.output = Some(outcome.output);
        record.error_message = None;
        if outcome.assigned_agent_id.is_some() {
            record.assigned_agent_id = outcome.assigned_agent_id;
        }
        execution.metrics.completed_steps += 1;
        self.save(execution)?;

        tracing::info!(
            "Execution {}: step '{}' completed in {}ms",
            execution.id,
            step.id,
            elapsed_ms
        );
        Ok(())
    }

    /// Settle the final status once no step can run
    fn finalize(&self, execution: &mut WorkflowExecution) -> Result<()> {
        if self.cancel.is_cancelled() {
            for record in &mut execution.steps {
                if matches!(record.status, StepStatus::Pending | StepStatus::Running) {
                    record.status = StepStatus::Skipped;
                }
            }
            execution.status = ExecutionStatus::Cancelled;
            execution.error_message = Some("Execution cancelled".to_string());
        } else if let Some(failed) = execution
            .steps
            .iter()
            .find(|s| s.status == StepStatus::Failed)
        {
            execution.status = ExecutionStatus::Failed;
            execution.error_message = Some(format!(
                "Step '{}' failed: {}",
                failed.step_id,
                failed.error_message.as_deref().unwrap_or("unknown error")
            ));
        } else if execution
            .steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Completed | StepStatus::Skipped))
        {
            execution.status = ExecutionStatus::Completed;
        } else {
            let mut stuck = blocked_steps(&self.workflow, execution);
            if stuck.is_empty() {
                stuck = execution
                    .steps
                    .iter()
                    .filter(|s| s.status == StepStatus::Pending)
                    .map(|s| s.step_id.clone())
                    .collect();
            }
            execution.status = ExecutionStatus::Failed;
            execution.error_message = Some(format!(
                "Execution stalled: steps {} can never run",
                stuck.join(", ")
            ));
        }

        execution.completed_at = Some(Utc::now());
        execution.metrics.total_duration_ms = execution.duration_ms();
        self.save(execution)?;

        tracing::info!(
            "Execution {} finished with status {:?}",
            execution.id,
            execution.status
        );
        Ok(())
    }

    fn save(&self, execution: &WorkflowExecution) -> Result<()> {
        self.persistence
            .save_execution(execution)
            .context("Failed to persist execution")
    }
}

fn step_record<'a>(
    execution: &'a mut WorkflowExecution,
    step_id: &str,
) -> Result<&'a mut WorkflowStepExecution> {
    let execution_id = execution.id;
    execution
        .step_mut(step_id)
        .ok_or_else(|| anyhow!("Step '{}' missing from execution {}", step_id, execution_id))
}

async fn execute_with_timeout(
    executor: &dyn StepExecutor,
    request: StepRequest<'_>,
    timeout_seconds: Option<u32>,
) -> Result<StepOutcome, StepError> {
    match timeout_seconds {
        Some(seconds) => {
            tokio::time::timeout(Duration::from_secs(seconds as u64), executor.execute(request))
                .await
                .map_err(|_| StepError::Timeout(seconds))?
        }
        None => executor.execute(request).await,
    }
}
