//! Raw feed events and their classification.
//!
//! The analyze stream guarantees exactly one field per event: `type`.
//! Everything else is an open set that varies by event family, so the
//! wire model keeps the commonly used fields typed and spills the rest
//! into a flattened map. The `type` string is mapped onto a closed
//! [`EventKind`] union; the feed prefixes many types with the agent
//! name (`social_thinking`, `news_log`, ...), so classification works
//! on exact names and suffixes rather than a serde tag.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One decoded frame from the analyze stream.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub tool_name: Option<String>,
    pub status: Option<String>,
    pub message: Option<Value>,
    pub content: Option<Value>,
    pub data: Option<Value>,
    pub text: Option<Value>,
    pub output: Option<Value>,
    pub level: Option<String>,
    pub session_id: Option<String>,
    pub final_result: Option<String>,
    pub call_id: Option<String>,
    pub tool_call_id: Option<String>,
    pub arguments: Option<Value>,
    pub reasoning_item_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Closed classification of the open `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `agent_status` or `*_agent`: a stage lifecycle announcement.
    AgentStatus,
    /// `tweet` or `*_tweet`.
    Tweet,
    /// `thinking`, `*_thinking`, `*_content`, `*_agent_output`:
    /// narrative text for the resolved agent.
    Content,
    /// `question`: echo of the question under analysis.
    Question,
    /// `error`: session-level recoverable error.
    Error,
    /// Bare `tool_output`: an agent's conclusion.
    ToolOutput,
    /// `*_tool_output`: output echo for a recorded tool call.
    AgentToolOutput,
    /// `tool_called` or `*_tool_called`.
    ToolCalled,
    /// `reasoning_item_created` or `*_reasoning`.
    Reasoning,
    /// `log` or `*_log`: diagnostics, market data, citations,
    /// annotations -- disambiguated by `tool_name`.
    Log,
    /// `message_output_created` or `final_text`.
    FinalText,
    /// `done`: terminal event for the run.
    Done,
    /// `debug`: recorded in the trail, otherwise skipped.
    Debug,
    /// Anything else; treated as narrative text when it carries any
    /// content field.
    Other,
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        let t = self.event_type.as_str();
        match t {
            "done" => return EventKind::Done,
            "debug" => return EventKind::Debug,
            "error" => return EventKind::Error,
            "question" => return EventKind::Question,
            "agent_status" => return EventKind::AgentStatus,
            "tweet" => return EventKind::Tweet,
            "thinking" => return EventKind::Content,
            "tool_output" => return EventKind::ToolOutput,
            "tool_called" => return EventKind::ToolCalled,
            "reasoning_item_created" => return EventKind::Reasoning,
            "log" => return EventKind::Log,
            "message_output_created" | "final_text" => return EventKind::FinalText,
            _ => {}
        }
        if t.ends_with("_agent") {
            EventKind::AgentStatus
        } else if t.ends_with("_tweet") {
            EventKind::Tweet
        } else if t.ends_with("_thinking") || t.ends_with("_content") || t.ends_with("_agent_output") {
            EventKind::Content
        } else if t.ends_with("_tool_output") {
            EventKind::AgentToolOutput
        } else if t.ends_with("_tool_called") {
            EventKind::ToolCalled
        } else if t.ends_with("_reasoning") {
            EventKind::Reasoning
        } else if t.ends_with("_log") {
            EventKind::Log
        } else {
            EventKind::Other
        }
    }

    /// Look up a payload field by wire name, covering both the typed
    /// fields and the flattened remainder.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let typed = match name {
            "message" => self.message.as_ref(),
            "content" => self.content.as_ref(),
            "data" => self.data.as_ref(),
            "text" => self.text.as_ref(),
            "output" => self.output.as_ref(),
            "arguments" => self.arguments.as_ref(),
            _ => None,
        };
        typed.or_else(|| self.extra.get(name))
    }

    /// First of `names` that holds a string value.
    pub fn str_field(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .find_map(|n| self.field(n).and_then(Value::as_str).map(str::to_string))
    }

    pub fn int_field(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(Value::as_i64)
    }

    pub fn bool_field(&self, name: &str) -> bool {
        self.field(name).and_then(Value::as_bool).unwrap_or(false)
    }
}
