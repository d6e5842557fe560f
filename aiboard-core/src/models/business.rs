//! Business processes, capability registry and orchestration metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kind of business process
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessCategory {
    CustomerOnboarding,
    SupportTicket,
    ContentPipeline,
    DataAnalysis,
    #[default]
    Custom,
}

/// Aggregate results of a business process's executions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessMetrics {
    pub total_executions: usize,
    /// Percentage of finished executions that completed (0-100)
    pub success_rate: f64,
    pub average_duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
}

/// Configured business process bound to a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessProcess {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: ProcessCategory,
    pub workflow_id: Uuid,
    pub is_active: bool,
    pub metrics: ProcessMetrics,
    /// Base execution context, overlaid by the caller's context
    #[serde(default)]
    pub configuration: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusinessProcess {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: ProcessCategory,
    pub workflow_id: Uuid,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub configuration: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessProcessUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Map<String, Value>>,
}

/// Agents holding one capability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityEntry {
    pub capability: String,
    pub description: String,
    pub agent_ids: Vec<String>,
    /// Core capabilities ship with the board; registered ones are custom
    pub is_core: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentPerformance {
    pub agent_id: String,
    /// Share of finished agent tasks that completed (0-100)
    pub score: f64,
    pub completed_tasks: usize,
}

/// Snapshot of orchestration activity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationMetrics {
    pub total_messages: usize,
    /// Executions currently running
    pub active_workflows: usize,
    pub completed_workflows: usize,
    pub average_workflow_duration_ms: u64,
    /// Agent ID -> percentage of assigned agent tasks
    pub agent_utilization: BTreeMap<String, f64>,
    pub top_performing_agents: Vec<AgentPerformance>,
    pub business_process_metrics: BTreeMap<Uuid, ProcessMetrics>,
}
