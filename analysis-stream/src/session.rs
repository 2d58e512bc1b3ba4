//! Session aggregation: the per-frame reducer.
//!
//! [`AnalysisSession`] owns the agent registry and the cross-agent
//! session record and applies one decoded event at a time, strictly in
//! arrival order. Every mutation is synchronous and deterministic;
//! after each applied frame an immutable [`Snapshot`] can be taken for
//! a renderer to project.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use common::{AgentId, AgentStatus, LogItem, ReasoningItem, ToolCall, Tweet};

use crate::channel::AgentChannel;
use crate::event::{EventKind, RawEvent};
use crate::normalize::{first_text, normalize, stringify, NormalizedContent};
use crate::registry::AgentRegistry;
use crate::resolve::{resolve_agent, resolve_conclusion_agent};

pub const DEBUG_TRAIL_CAPACITY: usize = 50;

const GENERIC_ERROR_MESSAGE: &str = "Analysis failed";

/// Cross-agent state for one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// The agent that most recently entered thinking. Consumers may
    /// override via [`AnalysisSession::select_agent`]; auto-follow
    /// keeps updating it afterwards.
    pub active_agent: AgentId,
    pub is_streaming: bool,
    pub question: String,
    pub final_text: String,
    pub final_result: String,
    pub session_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            active_agent: AgentId::Social,
            is_streaming: false,
            question: String::new(),
            final_text: String::new(),
            final_result: String::new(),
            session_id: None,
            start_time: None,
            end_time: None,
            last_error: None,
        }
    }
}

/// One retained raw event, for diagnostics only.
#[derive(Debug, Clone, Serialize)]
pub struct DebugEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub tool_name: Option<String>,
    pub message_preview: String,
}

/// Immutable view published after each processed frame.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub agents: [AgentChannel; 4],
    pub session: Session,
}

/// The reducer: four agent channels plus the session record, mutated
/// one event at a time.
#[derive(Debug)]
pub struct AnalysisSession {
    registry: AgentRegistry,
    session: Session,
    debug_trail: VecDeque<DebugEntry>,
    trail_capacity: usize,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::with_trail_capacity(DEBUG_TRAIL_CAPACITY)
    }

    pub fn with_trail_capacity(trail_capacity: usize) -> Self {
        Self {
            registry: AgentRegistry::new(),
            session: Session::default(),
            debug_trail: VecDeque::with_capacity(trail_capacity),
            trail_capacity,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn debug_trail(&self) -> &VecDeque<DebugEntry> {
        &self.debug_trail
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            agents: self.registry.channels().clone(),
            session: self.session.clone(),
        }
    }

    /// Reset everything for a new run. Must only be called once any
    /// previous transport stream has been aborted.
    pub fn begin_run(&mut self, question: Option<String>) {
        self.registry.reset();
        self.debug_trail.clear();
        self.session = Session {
            active_agent: AgentId::Social,
            is_streaming: true,
            question: question.unwrap_or_default(),
            start_time: Some(Utc::now()),
            ..Session::default()
        };
        info!("analysis run started");
    }

    /// Transport-level failure: fatal for the run, surfaced to the
    /// subscriber, never thrown.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "analysis run failed");
        self.session.is_streaming = false;
        self.session.end_time = Some(Utc::now());
        self.session.last_error = Some(message);
    }

    /// Natural end of input without a terminal `done` event.
    pub fn finish(&mut self) {
        if self.session.is_streaming {
            self.session.is_streaming = false;
            self.session.end_time = Some(Utc::now());
        }
    }

    /// Consumer-driven selection override.
    pub fn select_agent(&mut self, agent: AgentId) {
        self.session.active_agent = agent;
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: &RawEvent) {
        self.push_debug(event);
        let kind = event.kind();
        if kind == EventKind::Debug {
            return;
        }
        let agent = resolve_agent(&event.event_type, event.tool_name.as_deref());

        match kind {
            EventKind::AgentStatus => self.on_agent_status(agent, event),
            EventKind::Tweet => self.registry.channel_mut(agent).tweets.push(build_tweet(event)),
            EventKind::Content | EventKind::Other => self.on_content(agent, event),
            EventKind::Question => {
                if let Some(question) = first_text(event, &["content", "question"]) {
                    self.session.question = question;
                }
            }
            EventKind::Error => {
                // Recoverable: agents may continue independently.
                self.session.last_error = Some(
                    first_text(event, &["message"]).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
                );
            }
            EventKind::ToolOutput => self.on_conclusion(event),
            EventKind::AgentToolOutput => self.on_tool_call_output(agent, event),
            EventKind::ToolCalled => self.on_tool_called(agent, event),
            EventKind::Reasoning => {
                if let Some(NormalizedContent::Reasoning { id, content }) = normalize(event) {
                    self.registry
                        .channel_mut(agent)
                        .reasoning_items
                        .push(ReasoningItem::new(id, content));
                }
            }
            EventKind::Log => self.on_log(agent, event),
            EventKind::FinalText => self.on_final_text(event),
            EventKind::Done => self.on_done(event),
            EventKind::Debug => unreachable!("handled above"),
        }
    }

    fn on_agent_status(&mut self, agent: AgentId, event: &RawEvent) {
        let status = event
            .status
            .as_deref()
            .and_then(AgentStatus::parse)
            .unwrap_or(AgentStatus::Thinking);
        let message = first_text(event, &["message", "content"]).unwrap_or_default();

        if status == AgentStatus::Thinking {
            self.registry.complete_predecessors(agent);
            self.session.active_agent = agent;
        }
        self.registry.channel_mut(agent).set_status(status, message);
    }

    fn on_content(&mut self, agent: AgentId, event: &RawEvent) {
        // By upstream convention the news stage writing output proves
        // the social stage is done.
        if event.event_type == "news_agent_output" {
            self.registry.channel_mut(AgentId::Social).force_complete();
        }

        match normalize(event) {
            Some(NormalizedContent::Text(text)) => {
                self.registry.channel_mut(agent).append_text(&text);
            }
            Some(NormalizedContent::Metadata(_)) => {
                debug!(agent = %agent, event_type = %event.event_type, "skipping structured echo");
            }
            _ => {}
        }
    }

    fn on_conclusion(&mut self, event: &RawEvent) {
        let Some(tool) = event.tool_name.as_deref() else {
            return;
        };
        let Some(agent) = resolve_conclusion_agent(tool) else {
            return;
        };
        let conclusion = event.output.as_ref().map(stringify).unwrap_or_default();
        let channel = self.registry.channel_mut(agent);
        channel.force_complete();
        channel.conclusion = Some(conclusion);
    }

    fn on_tool_call_output(&mut self, agent: AgentId, event: &RawEvent) {
        let Some(call_id) = event.tool_call_id.as_deref().or(event.call_id.as_deref()) else {
            return;
        };
        let channel = self.registry.channel_mut(agent);
        if let Some(call) = channel.tool_calls.iter_mut().find(|c| c.id == call_id) {
            call.output = event.output.clone();
        }
    }

    fn on_tool_called(&mut self, agent: AgentId, event: &RawEvent) {
        let Some(NormalizedContent::ToolCall { id, name, input }) = normalize(event) else {
            return;
        };
        let channel = self.registry.channel_mut(agent);
        let first_call = channel.tool_calls.is_empty();
        channel.tool_calls.push(ToolCall::new(id, name.clone(), input));

        // The first tool call is the earliest sign of life for an
        // agent the feed never announced.
        if first_call && channel.status == AgentStatus::Waiting {
            channel.set_status(AgentStatus::Thinking, format!("Calling {name}..."));
            self.session.active_agent = agent;
        }
    }

    fn on_log(&mut self, agent: AgentId, event: &RawEvent) {
        match normalize(event) {
            Some(NormalizedContent::Orderbook(book)) => {
                self.registry.channel_mut(agent).orderbooks.push(book);
                // Market data retrieval implies the news stage finished.
                self.registry.channel_mut(AgentId::News).force_complete();
            }
            Some(NormalizedContent::PriceHistory(history)) => {
                self.registry.channel_mut(agent).price_history.push(history);
                self.registry.channel_mut(AgentId::News).force_complete();
            }
            Some(NormalizedContent::Trades(batch)) => {
                if !batch.is_empty() {
                    self.registry.channel_mut(agent).trade_batches.push(batch);
                }
                self.registry.channel_mut(AgentId::Whales).force_complete();
            }
            Some(NormalizedContent::Citation(citation)) => {
                let channel = self.registry.channel_mut(agent);
                let first_citation = channel.citations.is_empty();
                channel.citations.push(citation);
                if first_citation && agent == AgentId::Social {
                    channel.force_complete();
                }
            }
            Some(NormalizedContent::Annotation(text)) => {
                self.registry.channel_mut(agent).annotations.push(text);
            }
            Some(NormalizedContent::Text(text)) => {
                self.registry.channel_mut(agent).append_text(&text);
            }
            Some(NormalizedContent::Metadata(_)) => {
                debug!(agent = %agent, "skipping structured echo in log");
            }
            Some(NormalizedContent::LogEntry { level, message }) => {
                self.registry
                    .channel_mut(agent)
                    .logs
                    .push(LogItem::new(level, message));
            }
            _ => {}
        }
    }

    fn on_final_text(&mut self, event: &RawEvent) {
        self.session.final_text = first_text(event, &["data", "content"]).unwrap_or_default();
        // Final output means the whole pipeline, including its last
        // stage, has run to completion.
        self.registry.channel_mut(AgentId::Whales).force_complete();
    }

    fn on_done(&mut self, event: &RawEvent) {
        self.session.is_streaming = false;
        self.session.end_time = Some(Utc::now());
        if let Some(result) = &event.final_result {
            self.session.final_result = result.clone();
        }
        if let Some(id) = &event.session_id {
            self.session.session_id = Some(id.clone());
        }
        self.registry.channel_mut(AgentId::Whales).force_complete();
        info!(session_id = ?self.session.session_id, "analysis run completed");
    }

    fn push_debug(&mut self, event: &RawEvent) {
        if self.trail_capacity == 0 {
            return;
        }
        while self.debug_trail.len() >= self.trail_capacity {
            self.debug_trail.pop_front();
        }
        let preview: String = event
            .message
            .as_ref()
            .map(stringify)
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        self.debug_trail.push_back(DebugEntry {
            timestamp: Utc::now(),
            event_type: event.event_type.clone(),
            tool_name: event.tool_name.clone(),
            message_preview: preview,
        });
    }
}

fn build_tweet(event: &RawEvent) -> Tweet {
    Tweet {
        id: event
            .str_field(&["tweet_id", "id"])
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        author: event
            .str_field(&["author", "author_name"])
            .unwrap_or_else(|| "Unknown".to_string()),
        username: event.str_field(&["username", "author_username"]),
        content: event.str_field(&["content", "text"]).unwrap_or_default(),
        image_url: event.str_field(&["image_url", "imageUrl", "media_url"]),
        link: event.str_field(&["link", "url"]),
        timestamp: event.str_field(&["timestamp", "created_at"]),
        followers: event.int_field("followers"),
        verified: event.bool_field("verified"),
        tweet_type: event.str_field(&["tweet_type"]).or_else(|| Some(event.event_type.clone())),
        sentiment: event.str_field(&["sentiment"]),
    }
}
