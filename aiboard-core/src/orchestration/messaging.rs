//! Agent message bus backed by the board store

use crate::models::{
    AgentMessage, CommunicationChannel, MessageStatus, NewChannel, OutgoingMessage,
};
use crate::workflow::persistence::BoardPersistence;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// Sends, delivers and tracks agent messages
pub struct MessageBus {
    persistence: Arc<BoardPersistence>,
    /// Simulated transport latency before a message counts as delivered
    delivery_delay: Duration,
    /// Pending delivery tasks
    deliveries: TaskTracker,
}

impl MessageBus {
    pub fn new(persistence: Arc<BoardPersistence>, delivery_delay: Duration) -> Self {
        Self {
            persistence,
            delivery_delay,
            deliveries: TaskTracker::new(),
        }
    }

    /// Store a message as `sent` and schedule its delivery
    pub async fn send(&self, outgoing: OutgoingMessage) -> Result<AgentMessage> {
        let message = AgentMessage {
            id: Uuid::new_v4(),
            from_agent_id: outgoing.from_agent_id,
            to_agent_id: outgoing.to_agent_id,
            message_type: outgoing.message_type,
            subject: outgoing.subject,
            content: outgoing.content,
            data: outgoing.data,
            priority: outgoing.priority,
            status: MessageStatus::Sent,
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
            response_id: None,
        };

        self.persistence
            .insert_message(message.clone())
            .context("Failed to store message")?;

        tracing::debug!(
            "Message {} sent from {} to {}",
            message.id,
            message.from_agent_id,
            message.to_agent_id
        );

        let persistence = self.persistence.clone();
        let delay = self.delivery_delay;
        let message_id = message.id;
        self.deliveries.spawn(async move {
            tokio::time::sleep(delay).await;
            let delivered = persistence.update_message(message_id, |m| {
                // A message read before delivery fired keeps its later status
                if m.status == MessageStatus::Sent {
                    m.status = MessageStatus::Delivered;
                    m.delivered_at = Some(Utc::now());
                }
            });
            match delivered {
                Ok(_) => tracing::debug!("Message {} delivered", message_id),
                Err(e) => tracing::warn!("Failed to mark message {} delivered: {:#}", message_id, e),
            }
        });

        Ok(message)
    }

    /// Wait until every scheduled delivery has been recorded
    pub async fn flush(&self) {
        self.deliveries.close();
        self.deliveries.wait().await;
        self.deliveries.reopen();
    }

    /// Messages an agent sent or received, oldest first
    pub fn messages_for_agent(&self, agent_id: &str) -> Vec<AgentMessage> {
        self.persistence
            .list_messages()
            .into_iter()
            .filter(|m| m.involves(agent_id))
            .collect()
    }

    /// Mark a message read; `None` when it does not exist
    pub fn mark_read(&self, message_id: Uuid) -> Result<Option<AgentMessage>> {
        self.persistence.update_message(message_id, |m| {
            m.status = MessageStatus::Read;
            if m.delivered_at.is_none() {
                m.delivered_at = Some(Utc::now());
            }
            m.read_at = Some(Utc::now());
        })
    }

    pub fn get(&self, message_id: Uuid) -> Option<AgentMessage> {
        self.persistence.get_message(message_id)
    }

    pub fn list_messages(&self) -> Vec<AgentMessage> {
        self.persistence.list_messages()
    }

    pub fn create_channel(&self, channel: NewChannel) -> Result<CommunicationChannel> {
        let channel = CommunicationChannel {
            id: Uuid::new_v4(),
            name: channel.name,
            channel_type: channel.channel_type,
            participants: channel.participants,
            is_active: channel.is_active,
            metadata: channel.metadata,
            created_at: Utc::now(),
        };

        self.persistence
            .insert_channel(channel.clone())
            .context("Failed to store channel")?;

        Ok(channel)
    }

    pub fn list_channels(&self) -> Vec<CommunicationChannel> {
        self.persistence.list_channels()
    }
}
