//! Agent identities and per-run bookkeeping items.
//!
//! The backend runs exactly four specialist agents per analysis, in a
//! fixed pipeline order. Each agent's run state is tracked by the
//! stream consumer; the item types collected along the way (tweets,
//! tool calls, reasoning, logs) are defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// One of the four fixed analysis stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Social,
    News,
    Tech,
    Whales,
}

impl AgentId {
    /// Pipeline execution order. Chain completion and snapshot layout
    /// both rely on this ordering.
    pub const PIPELINE: [AgentId; 4] = [AgentId::Social, AgentId::News, AgentId::Tech, AgentId::Whales];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Social => "social",
            AgentId::News => "news",
            AgentId::Tech => "tech",
            AgentId::Whales => "whales",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentId::Social => "Social Agent",
            AgentId::News => "News Agent",
            AgentId::Tech => "Tech Agent",
            AgentId::Whales => "Whales Agent",
        }
    }

    /// Position in [`AgentId::PIPELINE`].
    pub fn index(&self) -> usize {
        match self {
            AgentId::Social => 0,
            AgentId::News => 1,
            AgentId::Tech => 2,
            AgentId::Whales => 3,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one agent within a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Waiting,
    Thinking,
    Completed,
    Error,
}

impl AgentStatus {
    /// Parse a wire status string. Unknown strings yield `None`.
    pub fn parse(s: &str) -> Option<AgentStatus> {
        match s {
            "waiting" => Some(AgentStatus::Waiting),
            "thinking" => Some(AgentStatus::Thinking),
            "completed" => Some(AgentStatus::Completed),
            "error" => Some(AgentStatus::Error),
            _ => None,
        }
    }

    /// Whether a transition to `next` is allowed under the monotonic
    /// `waiting -> thinking -> completed` lattice. `error` is reachable
    /// from any state and terminal until the next full reset.
    pub fn can_advance_to(self, next: AgentStatus) -> bool {
        match (self, next) {
            (AgentStatus::Error, _) => false,
            (_, AgentStatus::Error) => true,
            (AgentStatus::Completed, _) => false,
            (AgentStatus::Waiting, _) => true,
            (AgentStatus::Thinking, AgentStatus::Waiting) => false,
            (AgentStatus::Thinking, _) => true,
        }
    }
}

/// A tweet surfaced by an agent during its run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub author: String,
    pub username: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub link: Option<String>,
    pub timestamp: Option<String>,
    pub followers: Option<i64>,
    pub verified: bool,
    pub tweet_type: Option<String>,
    pub sentiment: Option<String>,
}

/// A tool invocation recorded from the feed. The output is attached
/// later if the feed echoes it back for the same call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    pub tool_input: Option<Value>,
    pub output: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ToolCall {
    pub fn new(id: Option<String>, tool_name: String, tool_input: Option<Value>) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            tool_name,
            tool_input,
            output: None,
            timestamp: Utc::now(),
        }
    }
}

/// One reasoning step emitted by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningItem {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ReasoningItem {
    pub fn new(id: Option<String>, content: String) -> Self {
        Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            content,
            timestamp: Utc::now(),
        }
    }
}

/// A diagnostic log line attributed to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogItem {
    pub id: String,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogItem {
    pub fn new(level: Option<String>, message: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            level: level.unwrap_or_else(|| "info".to_string()),
            message,
            timestamp: Utc::now(),
        }
    }
}
