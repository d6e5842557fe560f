//! Board state persistence using JSON file storage

use crate::models::{
    AgentMessage, ApprovalRequest, ApprovalStatus, BusinessProcess, CapabilityEntry,
    CommunicationChannel, CustomerInquiry, ExecutionStatus, WorkflowDefinition,
    WorkflowExecution,
};
use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Root JSON store containing all board data
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JsonStore {
    pub workflows: Vec<WorkflowDefinition>,
    pub executions: Vec<WorkflowExecution>,
    pub messages: Vec<AgentMessage>,
    pub channels: Vec<CommunicationChannel>,
    pub capabilities: Vec<CapabilityEntry>,
    pub processes: Vec<BusinessProcess>,
    pub approvals: Vec<ApprovalRequest>,
    pub inquiries: Vec<CustomerInquiry>,
}

/// Board persistence manager
pub struct BoardPersistence {
    /// Path to JSON store file
    store_path: PathBuf,
    /// In-memory data store
    store: Arc<Mutex<JsonStore>>,
}

impl BoardPersistence {
    /// Create new persistence manager
    pub fn new<P: AsRef<Path>>(store_path: P) -> Result<Self> {
        let store_path = store_path.as_ref().to_path_buf();

        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create board store directory")?;
        }

        let store = if store_path.exists() {
            Self::load_store(&store_path)?
        } else {
            JsonStore::default()
        };

        Ok(Self {
            store_path,
            store: Arc::new(Mutex::new(store)),
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Load JSON store from file with file locking
    fn load_store(path: &Path) -> Result<JsonStore> {
        let file = File::open(path).context("Failed to open board store file")?;

        file.lock_shared()
            .context("Failed to acquire read lock on board store")?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(file);
        reader
            .read_to_string(&mut contents)
            .context("Failed to read board store")?;

        drop(reader);

        if contents.trim().is_empty() {
            return Ok(JsonStore::default());
        }

        serde_json::from_str(&contents).context("Failed to parse board store JSON")
    }

    fn lock(&self) -> MutexGuard<'_, JsonStore> {
        // A panic mid-update leaves plain data behind; keep serving it.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Save JSON store to file with file locking
    fn save_store(&self) -> Result<()> {
        let store = self.lock();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.store_path)
            .context("Failed to open board store file for writing")?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on board store")?;

        let json =
            serde_json::to_string_pretty(&*store).context("Failed to serialize board store")?;

        let mut writer = std::io::BufWriter::new(file);
        writer
            .write_all(json.as_bytes())
            .context("Failed to write board store")?;

        writer
            .flush()
            .context("Failed to flush board store to disk")?;

        Ok(())
    }

    /// Apply a mutation and write the store through to disk
    fn mutate<R>(&self, f: impl FnOnce(&mut JsonStore) -> R) -> Result<R> {
        let result = {
            let mut store = self.lock();
            f(&mut store)
        };
        self.save_store()?;
        Ok(result)
    }

    // --- workflows ---

    pub fn insert_workflow(&self, workflow: WorkflowDefinition) -> Result<()> {
        self.mutate(|store| store.workflows.push(workflow))
    }

    /// Update a workflow in place; `None` when it does not exist
    pub fn update_workflow(
        &self,
        workflow_id: Uuid,
        f: impl FnOnce(&mut WorkflowDefinition),
    ) -> Result<Option<WorkflowDefinition>> {
        self.mutate(|store| {
            store
                .workflows
                .iter_mut()
                .find(|w| w.id == workflow_id)
                .map(|workflow| {
                    f(workflow);
                    workflow.clone()
                })
        })
    }

    /// Remove a workflow; returns whether it existed
    pub fn remove_workflow(&self, workflow_id: Uuid) -> Result<bool> {
        self.mutate(|store| {
            let before = store.workflows.len();
            store.workflows.retain(|w| w.id != workflow_id);
            store.workflows.len() != before
        })
    }

    pub fn get_workflow(&self, workflow_id: Uuid) -> Option<WorkflowDefinition> {
        self.lock()
            .workflows
            .iter()
            .find(|w| w.id == workflow_id)
            .cloned()
    }

    pub fn list_workflows(&self) -> Vec<WorkflowDefinition> {
        self.lock().workflows.clone()
    }

    // --- executions ---

    pub fn create_execution(&self, execution: WorkflowExecution) -> Result<()> {
        self.mutate(|store| store.executions.push(execution))
    }

    /// Replace the stored copy of an execution
    pub fn save_execution(&self, execution: &WorkflowExecution) -> Result<()> {
        self.mutate(|store| {
            match store.executions.iter_mut().find(|e| e.id == execution.id) {
                Some(existing) => *existing = execution.clone(),
                None => store.executions.push(execution.clone()),
            }
        })
    }

    pub fn get_execution(&self, execution_id: Uuid) -> Option<WorkflowExecution> {
        self.lock()
            .executions
            .iter()
            .find(|e| e.id == execution_id)
            .cloned()
    }

    /// Executions, optionally restricted to one workflow
    pub fn list_executions(&self, workflow_id: Option<Uuid>) -> Vec<WorkflowExecution> {
        self.lock()
            .executions
            .iter()
            .filter(|e| workflow_id.map_or(true, |id| e.workflow_id == id))
            .cloned()
            .collect()
    }

    /// Find executions that never reached a terminal state
    pub fn find_incomplete_executions(&self) -> Vec<WorkflowExecution> {
        self.lock()
            .executions
            .iter()
            .filter(|e| !e.status.is_terminal())
            .cloned()
            .collect()
    }

    // --- messages and channels ---

    pub fn insert_message(&self, message: AgentMessage) -> Result<()> {
        self.mutate(|store| store.messages.push(message))
    }

    pub fn update_message(
        &self,
        message_id: Uuid,
        f: impl FnOnce(&mut AgentMessage),
    ) -> Result<Option<AgentMessage>> {
        self.mutate(|store| {
            store
                .messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .map(|message| {
                    f(message);
                    message.clone()
                })
        })
    }

    pub fn get_message(&self, message_id: Uuid) -> Option<AgentMessage> {
        self.lock()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
    }

    pub fn list_messages(&self) -> Vec<AgentMessage> {
        self.lock().messages.clone()
    }

    pub fn insert_channel(&self, channel: CommunicationChannel) -> Result<()> {
        self.mutate(|store| store.channels.push(channel))
    }

    pub fn list_channels(&self) -> Vec<CommunicationChannel> {
        self.lock().channels.clone()
    }

    // --- capability registry ---

    pub fn update_capabilities<R>(
        &self,
        f: impl FnOnce(&mut Vec<CapabilityEntry>) -> R,
    ) -> Result<R> {
        self.mutate(|store| f(&mut store.capabilities))
    }

    pub fn list_capabilities(&self) -> Vec<CapabilityEntry> {
        self.lock().capabilities.clone()
    }

    // --- business processes ---

    pub fn insert_process(&self, process: BusinessProcess) -> Result<()> {
        self.mutate(|store| store.processes.push(process))
    }

    pub fn update_process(
        &self,
        process_id: Uuid,
        f: impl FnOnce(&mut BusinessProcess),
    ) -> Result<Option<BusinessProcess>> {
        self.mutate(|store| {
            store
                .processes
                .iter_mut()
                .find(|p| p.id == process_id)
                .map(|process| {
                    f(process);
                    process.clone()
                })
        })
    }

    pub fn get_process(&self, process_id: Uuid) -> Option<BusinessProcess> {
        self.lock()
            .processes
            .iter()
            .find(|p| p.id == process_id)
            .cloned()
    }

    pub fn list_processes(&self) -> Vec<BusinessProcess> {
        self.lock().processes.clone()
    }

    // --- customer inquiries ---

    pub fn insert_inquiry(&self, inquiry: CustomerInquiry) -> Result<()> {
        self.mutate(|store| store.inquiries.push(inquiry))
    }

    pub fn update_inquiry<R>(
        &self,
        inquiry_id: Uuid,
        f: impl FnOnce(&mut CustomerInquiry) -> R,
    ) -> Result<Option<R>> {
        self.mutate(|store| {
            store
                .inquiries
                .iter_mut()
                .find(|i| i.id == inquiry_id)
                .map(f)
        })
    }

    pub fn get_inquiry(&self, inquiry_id: Uuid) -> Option<CustomerInquiry> {
        self.lock()
            .inquiries
            .iter()
            .find(|i| i.id == inquiry_id)
            .cloned()
    }

    pub fn list_inquiries(&self) -> Vec<CustomerInquiry> {
        self.lock().inquiries.clone()
    }

    // --- approvals ---

    pub fn create_approval_request(&self, request: ApprovalRequest) -> Result<()> {
        self.mutate(|store| store.approvals.push(request))
    }

    pub fn update_approval_status(
        &self,
        approval_id: Uuid,
        status: ApprovalStatus,
        responder: Option<String>,
    ) -> Result<()> {
        self.mutate(|store| {
            if let Some(approval) = store.approvals.iter_mut().find(|a| a.id == approval_id) {
                approval.status = status;
                approval.responded_at = Some(Utc::now());
                approval.responder = responder;
            }
        })
    }

    pub fn get_approval_request(&self, approval_id: Uuid) -> Option<ApprovalRequest> {
        self.lock()
            .approvals
            .iter()
            .find(|a| a.id == approval_id)
            .cloned()
    }

    /// Pending approvals, optionally for one execution
    pub fn get_pending_approvals(&self, execution_id: Option<Uuid>) -> Vec<ApprovalRequest> {
        self.lock()
            .approvals
            .iter()
            .filter(|a| {
                a.status == ApprovalStatus::Pending
                    && execution_id.map_or(true, |id| a.execution_id == id)
            })
            .cloned()
            .collect()
    }

    /// Query execution metrics, optionally for one workflow
    pub fn query_metrics(&self, workflow_id: Option<Uuid>) -> WorkflowMetrics {
        let store = self.lock();

        let executions: Vec<_> = store
            .executions
            .iter()
            .filter(|e| workflow_id.map_or(true, |id| e.workflow_id == id))
            .collect();

        let total = executions.len();
        let success = executions
            .iter()
            .filter(|e| e.status == ExecutionStatus::Completed)
            .count();
        let failed = executions
            .iter()
            .filter(|e| {
                matches!(
                    e.status,
                    ExecutionStatus::Failed | ExecutionStatus::Cancelled
                )
            })
            .count();

        let durations: Vec<u64> = executions.iter().filter_map(|e| e.duration_ms()).collect();

        let avg_duration_ms = if !durations.is_empty() {
            durations.iter().sum::<u64>() / durations.len() as u64
        } else {
            0
        };

        WorkflowMetrics {
            execution_count: total,
            success_count: success,
            failure_count: failed,
            avg_duration_ms,
        }
    }
}

/// Workflow execution metrics
#[derive(Debug, Clone)]
pub struct WorkflowMetrics {
    pub execution_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub avg_duration_ms: u64,
}

impl WorkflowMetrics {
    /// Percentage of failed executions (0.0 to 100.0); cancellations count as failures
    pub fn failure_rate(&self) -> f64 {
        if self.execution_count == 0 {
            return 0.0;
        }
        (self.failure_count as f64 / self.execution_count as f64) * 100.0
    }

    /// Percentage of successful executions (0.0 to 100.0)
    pub fn success_rate(&self) -> f64 {
        if self.execution_count == 0 {
            return 0.0;
        }
        (self.success_count as f64 / self.execution_count as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        StepType, WorkflowCategory, WorkflowStep, WorkflowType,
    };
    use serde_json::Map;
    use tempfile::tempdir;

    fn sample_workflow() -> WorkflowDefinition {
        let now = Utc::now();
        WorkflowDefinition {
            id: Uuid::new_v4(),
            name: "persisted".to_string(),
            description: String::new(),
            workflow_type: WorkflowType::Custom,
            category: WorkflowCategory::General,
            steps: vec![WorkflowStep::new("only", "Only", StepType::HumanApproval)],
            triggers: vec![],
            is_active: true,
            is_template: false,
            metadata: None,
            created_at: now,
            updated_at: now,
            created_by: "user".to_string(),
        }
    }

    #[test]
    fn test_persistence_initialization() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("nested").join("board.json");

        let persistence = BoardPersistence::new(&store_path).unwrap();

        assert!(store_path.parent().unwrap().exists());
        assert!(persistence.list_workflows().is_empty());
        assert!(persistence.list_executions(None).is_empty());
    }

    #[test]
    fn test_data_survives_reload() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("board.json");

        let workflow = sample_workflow();
        let execution = WorkflowExecution::new(&workflow, Map::new(), "tester");
        let execution_id = execution.id;
        {
            let persistence = BoardPersistence::new(&store_path).unwrap();
            persistence.insert_workflow(workflow.clone()).unwrap();
            persistence.create_execution(execution).unwrap();
        }

        let reloaded = BoardPersistence::new(&store_path).unwrap();
        assert_eq!(reloaded.get_workflow(workflow.id).unwrap().name, "persisted");
        let execution = reloaded.get_execution(execution_id).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert_eq!(reloaded.find_incomplete_executions().len(), 1);
    }

    #[test]
    fn test_save_execution_replaces_existing() {
        let dir = tempdir().unwrap();
        let persistence = BoardPersistence::new(dir.path().join("board.json")).unwrap();

        let workflow = sample_workflow();
        let mut execution = WorkflowExecution::new(&workflow, Map::new(), "tester");
        persistence.create_execution(execution.clone()).unwrap();

        execution.status = ExecutionStatus::Completed;
        execution.completed_at = Some(Utc::now());
        persistence.save_execution(&execution).unwrap();

        assert_eq!(persistence.list_executions(None).len(), 1);
        assert!(persistence.find_incomplete_executions().is_empty());

        let metrics = persistence.query_metrics(Some(workflow.id));
        assert_eq!(metrics.execution_count, 1);
        assert_eq!(metrics.success_count, 1);
        assert_eq!(metrics.success_rate(), 100.0);
        assert_eq!(metrics.failure_rate(), 0.0);
    }

    #[test]
    fn test_update_and_remove_workflow() {
        let dir = tempdir().unwrap();
        let persistence = BoardPersistence::new(dir.path().join("board.json")).unwrap();
        let workflow = sample_workflow();
        persistence.insert_workflow(workflow.clone()).unwrap();

        let updated = persistence
            .update_workflow(workflow.id, |w| w.is_active = false)
            .unwrap()
            .unwrap();
        assert!(!updated.is_active);
        assert!(persistence
            .update_workflow(Uuid::new_v4(), |w| w.is_active = true)
            .unwrap()
            .is_none());

        assert!(persistence.remove_workflow(workflow.id).unwrap());
        assert!(!persistence.remove_workflow(workflow.id).unwrap());
    }
}
