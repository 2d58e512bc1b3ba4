//! Registry of the four agent channels.
//!
//! Holds the fixed channel set and applies cross-channel rules: the
//! chain-completion policy lives here because it spans channels.

use serde::Serialize;
use tracing::debug;

use common::AgentId;

use crate::channel::AgentChannel;

/// The four channels in pipeline order. All channel mutation goes
/// through this registry.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRegistry {
    channels: [AgentChannel; 4],
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            channels: AgentId::PIPELINE.map(AgentChannel::new),
        }
    }

    pub fn channel(&self, id: AgentId) -> &AgentChannel {
        &self.channels[id.index()]
    }

    pub fn channel_mut(&mut self, id: AgentId) -> &mut AgentChannel {
        &mut self.channels[id.index()]
    }

    pub fn channels(&self) -> &[AgentChannel; 4] {
        &self.channels
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    /// Chain-completion policy: when `current` starts thinking, every
    /// stage before it in the pipeline is force-completed. The upstream
    /// backend runs stages sequentially but only ever announces starts,
    /// so a later stage starting is the only available proof that the
    /// earlier stages finished.
    pub fn complete_predecessors(&mut self, current: AgentId) {
        for id in AgentId::PIPELINE.iter().take(current.index()) {
            if self.channel_mut(*id).force_complete() {
                debug!(completed = %id, trigger = %current, "chain-completed predecessor stage");
            }
        }
    }
}
