//! Per-agent channel state.
//!
//! One channel per pipeline stage, created once per session and reset
//! at the start of every run. All list fields are append-only within a
//! run and the status lattice is enforced here rather than trusted to
//! the feed.

use serde::Serialize;
use tracing::debug;

use common::{
    AgentId, AgentStatus, Citation, LogItem, Orderbook, PriceHistory, ReasoningItem, ToolCall,
    TradeBatch, Tweet,
};

pub const WAITING_MESSAGE: &str = "Waiting to start...";
pub const COMPLETION_MESSAGE: &str = "Analysis completed";

/// Run state of one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentChannel {
    pub id: AgentId,
    pub status: AgentStatus,
    pub status_message: String,
    /// Narrative text, concatenation-only within a run.
    pub accumulated_text: String,
    /// Conclusion from the agent's `tool_output`, if any.
    pub conclusion: Option<String>,
    pub tweets: Vec<Tweet>,
    pub tool_calls: Vec<ToolCall>,
    pub reasoning_items: Vec<ReasoningItem>,
    pub logs: Vec<LogItem>,
    pub orderbooks: Vec<Orderbook>,
    pub price_history: Vec<PriceHistory>,
    pub trade_batches: Vec<TradeBatch>,
    pub citations: Vec<Citation>,
    pub annotations: Vec<String>,
}

impl AgentChannel {
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            status: AgentStatus::Waiting,
            status_message: WAITING_MESSAGE.to_string(),
            accumulated_text: String::new(),
            conclusion: None,
            tweets: Vec::new(),
            tool_calls: Vec::new(),
            reasoning_items: Vec::new(),
            logs: Vec::new(),
            orderbooks: Vec::new(),
            price_history: Vec::new(),
            trade_batches: Vec::new(),
            citations: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Restore initial state for a new run. Channels are never
    /// destroyed, only reset.
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    /// Apply a status change under the monotonic lattice. A transition
    /// that would move the channel backwards is ignored. Returns
    /// whether the change was applied.
    pub fn set_status(&mut self, status: AgentStatus, message: impl Into<String>) -> bool {
        if self.status == status {
            self.status_message = message.into();
            return true;
        }
        if !self.status.can_advance_to(status) {
            debug!(
                agent = %self.id,
                from = ?self.status,
                to = ?status,
                "ignoring backwards status transition"
            );
            return false;
        }
        self.status = status;
        self.status_message = message.into();
        true
    }

    /// Mark the channel completed with the default message, unless it
    /// already is (or errored).
    pub fn force_complete(&mut self) -> bool {
        if self.status == AgentStatus::Completed {
            return false;
        }
        self.set_status(AgentStatus::Completed, COMPLETION_MESSAGE)
    }

    pub fn append_text(&mut self, text: &str) {
        self.accumulated_text.push_str(text);
    }
}
