//! Agent capability registry

use crate::models::CapabilityEntry;
use crate::workflow::persistence::BoardPersistence;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Maps capabilities to the agents that hold them
pub struct CapabilityRegistry {
    persistence: Arc<BoardPersistence>,
}

impl CapabilityRegistry {
    pub fn new(persistence: Arc<BoardPersistence>) -> Self {
        Self { persistence }
    }

    /// Grant a capability to an agent, creating the entry on first use
    pub fn register(&self, agent_id: &str, capability: &str, description: &str) -> Result<()> {
        self.persistence
            .update_capabilities(|entries| {
                let index = match entries.iter().position(|e| e.capability == capability) {
                    Some(index) => index,
                    None => {
                        entries.push(CapabilityEntry {
                            capability: capability.to_string(),
                            description: description.to_string(),
                            agent_ids: Vec::new(),
                            is_core: false,
                            examples: Vec::new(),
                        });
                        entries.len() - 1
                    }
                };

                let entry = &mut entries[index];
                if !entry.agent_ids.iter().any(|a| a == agent_id) {
                    entry.agent_ids.push(agent_id.to_string());
                }
            })
            .context("Failed to register agent capability")?;

        tracing::info!("Registered capability '{}' for agent {}", capability, agent_id);
        Ok(())
    }

    /// Agents holding a capability, in registration order
    pub fn find_agents(&self, capability: &str) -> Vec<String> {
        self.persistence
            .list_capabilities()
            .into_iter()
            .find(|e| e.capability == capability)
            .map(|e| e.agent_ids)
            .unwrap_or_default()
    }

    /// Agents holding every required capability
    ///
    /// With nothing required, every registered agent is returned once, in
    /// first-seen order.
    pub fn available_agents(&self, required: &[String]) -> Vec<String> {
        let entries = self.persistence.list_capabilities();

        let mut seen = HashSet::new();
        let all: Vec<String> = entries
            .iter()
            .flat_map(|e| e.agent_ids.iter())
            .filter(|a| seen.insert(a.as_str()))
            .cloned()
            .collect();

        if required.is_empty() {
            return all;
        }

        all.into_iter()
            .filter(|agent| {
                required.iter().all(|capability| {
                    entries
                        .iter()
                        .any(|e| &e.capability == capability && e.agent_ids.contains(agent))
                })
            })
            .collect()
    }

    pub fn entries(&self) -> Vec<CapabilityEntry> {
        self.persistence.list_capabilities()
    }
}
