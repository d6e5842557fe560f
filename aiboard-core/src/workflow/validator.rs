//! Workflow validation logic

use crate::models::workflow::{RetryPolicy, StepType, WorkflowDefinition};
use std::collections::{HashMap, HashSet};

/// Validation error type
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Errors rendered as `field: message`
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Workflow validator
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Validate retry policy
    /// - max_retries: 0-10
    /// - retry_delay: 0-300s
    /// - backoff_multiplier: finite, >= 1.0
    /// - max delay cap: 600s (enforced in calculation, not validated here)
    pub fn validate_retry_policy(policy: &RetryPolicy) -> ValidationResult {
        let mut result = ValidationResult::new();

        if policy.max_retries > 10 {
            result.add_error("max_retries", "max_retries cannot exceed 10");
        }

        if policy.retry_delay > 300 {
            result.add_error("retry_delay", "retry_delay cannot exceed 300");
        }

        if !policy.backoff_multiplier.is_finite() {
            result.add_error("backoff_multiplier", "backoff_multiplier must be a finite number");
        } else if policy.backoff_multiplier < 1.0 {
            result.add_error(
                "backoff_multiplier",
                "backoff_multiplier must be at least 1.0",
            );
        } else if policy.exponential_backoff && policy.backoff_multiplier > 3.0 {
            // Warn if exponential backoff might exceed max delay quickly
            result.add_warning(format!(
                "High backoff_multiplier ({}) with exponential backoff may reach max delay (600s) quickly",
                policy.backoff_multiplier
            ));
        }

        result
    }

    /// Validate workflow definition
    pub fn validate_workflow(workflow: &WorkflowDefinition) -> ValidationResult {
        let mut result = ValidationResult::new();

        if workflow.name.trim().is_empty() {
            result.add_error("name", "Workflow name cannot be empty");
        }

        if workflow.steps.is_empty() {
            result.add_warning("Workflow has no steps");
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, step) in workflow.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                result.add_error(
                    format!("steps[{}].id", index),
                    "Step id cannot be empty",
                );
                continue;
            }
            if positions.insert(step.id.as_str(), index).is_some() {
                result.add_error(
                    format!("steps.{}", step.id),
                    format!("Duplicate step id '{}'", step.id),
                );
            }
        }

        for (index, step) in workflow.steps.iter().enumerate() {
            for dependency in &step.dependencies {
                if dependency == &step.id {
                    result.add_error(
                        format!("steps.{}.dependencies", step.id),
                        format!("Step '{}' depends on itself", step.id),
                    );
                    continue;
                }
                match positions.get(dependency.as_str()) {
                    None => result.add_error(
                        format!("steps.{}.dependencies", step.id),
                        format!("Dependency '{}' not found", dependency),
                    ),
                    Some(&position) if position > index => result.add_warning(format!(
                        "Step '{}' depends on '{}', which is declared after it",
                        step.id, dependency
                    )),
                    Some(_) => {}
                }
            }

            for condition in &step.conditions {
                if let Some(target) = &condition.next_step_id {
                    if !positions.contains_key(target.as_str()) {
                        result.add_error(
                            format!("steps.{}.conditions", step.id),
                            format!("Condition target step '{}' not found", target),
                        );
                    }
                }
            }

            match step.step_type {
                StepType::AgentTask => {
                    if step.agent_id.is_none() && step.agent_role.is_none() {
                        result.add_error(
                            format!("steps.{}", step.id),
                            "Agent task needs an agent_id or an agent_role",
                        );
                    }
                }
                StepType::Condition => {
                    if step.conditions.is_empty() {
                        result.add_warning(format!(
                            "Condition step '{}' has no conditions and always passes",
                            step.id
                        ));
                    }
                }
                StepType::ExternalApi => {
                    if step.config.external_api_config.is_none() {
                        result.add_warning(format!(
                            "External API step '{}' has no external_api_config and will fail",
                            step.id
                        ));
                    }
                }
                StepType::DataTransform | StepType::HumanApproval => {}
            }

            if step.step_type != StepType::Condition && !step.conditions.is_empty() {
                result.add_warning(format!(
                    "Step '{}' has conditions but is not a condition step; they are ignored",
                    step.id
                ));
            }

            if let Some(policy) = &step.retry_policy {
                let policy_validation = Self::validate_retry_policy(policy);
                for error in policy_validation.errors {
                    result.add_error(
                        format!("steps.{}.retry_policy.{}", step.id, error.field),
                        error.message,
                    );
                }
                for warning in policy_validation.warnings {
                    result.add_warning(format!("Step '{}': {}", step.id, warning));
                }
            }
        }

        if let Some(cycle) = Self::detect_circular_dependencies(workflow) {
            result.add_error(
                "steps",
                format!(
                    "Circular dependency detected: {} → {}",
                    cycle.join(" → "),
                    cycle[0]
                ),
            );
        }

        result
    }

    /// Detect circular dependencies using DFS over the dependency edges
    fn detect_circular_dependencies(workflow: &WorkflowDefinition) -> Option<Vec<String>> {
        let edges: HashMap<&str, Vec<&str>> = workflow
            .steps
            .iter()
            .map(|s| {
                (
                    s.id.as_str(),
                    s.dependencies
                        .iter()
                        .map(String::as_str)
                        .filter(|d| *d != s.id)
                        .collect(),
                )
            })
            .collect();

        let mut visited = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        fn dfs<'a>(
            node: &'a str,
            edges: &HashMap<&'a str, Vec<&'a str>>,
            visited: &mut HashSet<&'a str>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            visited.insert(node);
            stack.push(node);

            for &target in edges.get(node).into_iter().flatten() {
                if let Some(start) = stack.iter().position(|n| *n == target) {
                    return Some(stack[start..].iter().map(|s| s.to_string()).collect());
                }
                if !visited.contains(target) && edges.contains_key(target) {
                    if let Some(cycle) = dfs(target, edges, visited, stack) {
                        return Some(cycle);
                    }
                }
            }

            stack.pop();
            None
        }

        for step in &workflow.steps {
            if !visited.contains(step.id.as_str()) {
                if let Some(cycle) = dfs(step.id.as_str(), &edges, &mut visited, &mut stack) {
                    return Some(cycle);
                }
            }
        }

        None
    }
}
