//! Approval request management for human approval steps

use crate::models::workflow::{ApprovalRequest, ApprovalStatus};
use crate::workflow::persistence::BoardPersistence;
use anyhow::{Context, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Response from an approval request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalResponse {
    /// Approval was granted
    Approved { responder: String },
    /// Approval was denied
    Denied { responder: String },
    /// Request timed out
    Timeout,
}

impl ApprovalResponse {
    fn status(&self) -> ApprovalStatus {
        match self {
            ApprovalResponse::Approved { .. } => ApprovalStatus::Approved,
            ApprovalResponse::Denied { .. } => ApprovalStatus::Denied,
            ApprovalResponse::Timeout => ApprovalStatus::Timeout,
        }
    }

    fn responder(&self) -> Option<String> {
        match self {
            ApprovalResponse::Approved { responder } | ApprovalResponse::Denied { responder } => {
                Some(responder.clone())
            }
            ApprovalResponse::Timeout => None,
        }
    }
}

/// Manages approval requests and responses
pub struct ApprovalManager {
    /// Persistence layer
    persistence: Arc<BoardPersistence>,
    /// Pending approval response channels
    pending_channels: Arc<DashMap<Uuid, oneshot::Sender<ApprovalResponse>>>,
}

impl ApprovalManager {
    /// Create new approval manager
    pub fn new(persistence: Arc<BoardPersistence>) -> Self {
        Self {
            persistence,
            pending_channels: Arc::new(DashMap::new()),
        }
    }

    /// Create and record an approval request
    pub async fn request_approval(
        &self,
        execution_id: Uuid,
        step_id: String,
        action_description: String,
        approvers: Vec<String>,
        timeout_seconds: u32,
    ) -> Result<(Uuid, oneshot::Receiver<ApprovalResponse>)> {
        let approval = ApprovalRequest {
            id: Uuid::new_v4(),
            execution_id,
            step_id,
            action_description,
            approvers,
            status: ApprovalStatus::Pending,
            requested_at: chrono::Utc::now(),
            responded_at: None,
            responder: None,
            timeout_seconds,
        };

        let approval_id = approval.id;

        self.persistence
            .create_approval_request(approval)
            .context("Failed to persist approval request")?;

        let (tx, rx) = oneshot::channel();
        self.pending_channels.insert(approval_id, tx);

        tracing::info!(
            "Approval request {} created for execution {}",
            approval_id,
            execution_id
        );

        Ok((approval_id, rx))
    }

    /// Record a decision and wake the waiting step, if any
    pub async fn respond_approval(
        &self,
        approval_id: Uuid,
        response: ApprovalResponse,
    ) -> Result<()> {
        self.persistence
            .update_approval_status(approval_id, response.status(), response.responder())
            .context("Failed to update approval status")?;

        if let Some((_key, tx)) = self.pending_channels.remove(&approval_id) {
            let _ = tx.send(response.clone());
            tracing::info!("Approval response sent for {}: {:?}", approval_id, response);
        }

        Ok(())
    }

    /// Settle a request nobody waits on anymore
    ///
    /// A request that already has a decision keeps it; one still pending is
    /// recorded as timed out.
    pub fn expire(&self, approval_id: Uuid) {
        self.pending_channels.remove(&approval_id);

        let pending = self
            .persistence
            .get_approval_request(approval_id)
            .is_some_and(|a| a.status == ApprovalStatus::Pending);
        if !pending {
            return;
        }

        match self
            .persistence
            .update_approval_status(approval_id, ApprovalStatus::Timeout, None)
        {
            Ok(()) => tracing::info!("Approval request {} expired", approval_id),
            Err(e) => tracing::warn!("Failed to expire approval {}: {:#}", approval_id, e),
        }
    }

    /// Number of requests whose step is still waiting in this process
    pub fn waiting_count(&self) -> usize {
        self.pending_channels.len()
    }

    /// Get approval request by ID
    pub fn get_approval_request(&self, approval_id: Uuid) -> Option<ApprovalRequest> {
        self.persistence.get_approval_request(approval_id)
    }

    /// Get pending approvals for execution
    pub fn get_pending_approvals(&self, execution_id: Uuid) -> Vec<ApprovalRequest> {
        self.persistence.get_pending_approvals(Some(execution_id))
    }

    /// List all pending approval requests
    pub fn list_all_pending(&self) -> Vec<ApprovalRequest> {
        self.persistence.get_pending_approvals(None)
    }
}
