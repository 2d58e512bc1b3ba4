//! Streaming analysis client.
//!
//! [`AnalysisClient`] owns one [`AnalysisSession`] and at most one live
//! stream at a time. `submit` opens the SSE connection and spawns a
//! pump task that decodes frames, applies them to the session, and
//! publishes a [`Snapshot`] after every processed frame. Subscribers
//! receive snapshots over a broadcast channel; a new `submit` or a
//! `cancel` aborts the pump before the session is touched, so no frame
//! from an old stream can land in a new run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::decoder::FrameDecoder;
use crate::session::{AnalysisSession, Snapshot};

/// Body of the analyze request. Absent fields are omitted from the
/// JSON body entirely.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyzeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AnalyzeRequest {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }
}

/// Source of raw text chunks, as delivered by the transport. Chunk
/// boundaries carry no meaning; frames may split anywhere.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk, `Ok(None)` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<String>>;
}

/// HTTP SSE body as a chunk source. Byte chunks may split UTF-8
/// sequences, so incomplete trailing bytes are carried into the next
/// chunk.
pub struct HttpChunkSource {
    stream: futures_util::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    carry: Vec<u8>,
}

impl HttpChunkSource {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            stream: response.bytes_stream().boxed(),
            carry: Vec::new(),
        }
    }
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<String>> {
        loop {
            let Some(chunk) = self.stream.next().await else {
                if !self.carry.is_empty() {
                    warn!(bytes = self.carry.len(), "stream ended inside a UTF-8 sequence");
                    self.carry.clear();
                }
                return Ok(None);
            };
            let chunk = chunk.context("reading analyze stream")?;
            self.carry.extend_from_slice(&chunk);

            let valid_len = match std::str::from_utf8(&self.carry) {
                Ok(_) => self.carry.len(),
                Err(e) => e.valid_up_to(),
            };
            if valid_len == 0 {
                continue;
            }
            let rest = self.carry.split_off(valid_len);
            let text = String::from_utf8(std::mem::replace(&mut self.carry, rest))
                .expect("validated prefix");
            return Ok(Some(text));
        }
    }
}

/// Handle to a spawned pump task.
struct RunHandle {
    task: JoinHandle<()>,
}

impl RunHandle {
    fn abort(&self) {
        self.task.abort();
    }
}

/// Client for the multi-agent analyze stream.
pub struct AnalysisClient {
    config: ClientConfig,
    http: reqwest::Client,
    state: Arc<RwLock<AnalysisSession>>,
    snapshots: broadcast::Sender<Arc<Snapshot>>,
    current_run: Mutex<Option<RunHandle>>,
}

impl AnalysisClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("building HTTP client")?;
        let (snapshots, _) = broadcast::channel(config.snapshot_capacity);
        let state = Arc::new(RwLock::new(AnalysisSession::with_trail_capacity(
            config.debug_trail_capacity,
        )));
        Ok(Self {
            config,
            http,
            state,
            snapshots,
            current_run: Mutex::new(None),
        })
    }

    /// Subscribe to the snapshot feed. One snapshot is published per
    /// processed frame, plus one on run start, failure, and end.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.snapshots.subscribe()
    }

    /// Current state, outside the snapshot feed.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot()
    }

    /// Start a new analysis run, aborting any run in flight. The old
    /// stream is torn down before the session is reset.
    pub async fn submit(&self, request: AnalyzeRequest) -> Result<()> {
        self.abort_current().await;

        {
            let mut state = self.state.write().await;
            state.begin_run(request.query.clone());
        }
        self.publish().await;

        match self.open_stream(&request).await {
            Ok(response) => {
                info!(url = %self.config.analyze_url, "analyze stream opened");
                self.spawn_pump(HttpChunkSource::new(response)).await;
                Ok(())
            }
            Err(e) => {
                self.state.write().await.fail(format!("{e:#}"));
                self.publish().await;
                Err(e)
            }
        }
    }

    async fn open_stream(&self, request: &AnalyzeRequest) -> Result<reqwest::Response> {
        self.http
            .post(&self.config.analyze_url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .context("opening analyze stream")?
            .error_for_status()
            .context("analyze endpoint refused the request")
    }

    /// Stop the current run, if any. The session keeps whatever state
    /// the last processed frame left; `finish` marks it no longer
    /// streaming.
    pub async fn cancel(&self) {
        if self.abort_current().await {
            self.state.write().await.finish();
            self.publish().await;
            info!("analysis run cancelled");
        }
    }

    /// Consumer-driven focus override; published like any other change.
    pub async fn select_agent(&self, agent: common::AgentId) {
        self.state.write().await.select_agent(agent);
        self.publish().await;
    }

    /// Drive the session from an already-open chunk source. Used by
    /// `submit` and directly by tests and replay tooling.
    pub async fn run_stream<S: ChunkSource + 'static>(&self, source: S) {
        self.abort_current().await;
        {
            let mut state = self.state.write().await;
            state.begin_run(None);
        }
        self.publish().await;
        self.spawn_pump(source).await;
    }

    /// Wait for the current run's pump task to exit.
    pub async fn join(&self) {
        let handle = self.current_run.lock().await.take();
        if let Some(handle) = handle {
            // Abort-cancelled tasks surface a JoinError; either way the
            // task is gone.
            let _ = handle.task.await;
        }
    }

    async fn abort_current(&self) -> bool {
        let mut current = self.current_run.lock().await;
        if let Some(run) = current.take() {
            run.abort();
            true
        } else {
            false
        }
    }

    async fn spawn_pump<S: ChunkSource + 'static>(&self, source: S) {
        let state = Arc::clone(&self.state);
        let snapshots = self.snapshots.clone();
        let task = tokio::spawn(pump(source, state, snapshots));
        *self.current_run.lock().await = Some(RunHandle { task });
    }

    async fn publish(&self) {
        let snapshot = Arc::new(self.state.read().await.snapshot());
        let _ = self.snapshots.send(snapshot);
    }
}

/// The pump: chunks in, frames applied, snapshots out. Transport
/// errors end the run via [`AnalysisSession::fail`] and are never
/// propagated; the subscriber sees them in the final snapshot.
async fn pump<S: ChunkSource>(
    mut source: S,
    state: Arc<RwLock<AnalysisSession>>,
    snapshots: broadcast::Sender<Arc<Snapshot>>,
) {
    let mut decoder = FrameDecoder::new();
    loop {
        let chunk = match source.next_chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                debug!("analyze stream ended");
                let mut session = state.write().await;
                session.finish();
                let _ = snapshots.send(Arc::new(session.snapshot()));
                return;
            }
            Err(e) => {
                let mut session = state.write().await;
                session.fail(format!("{e:#}"));
                let _ = snapshots.send(Arc::new(session.snapshot()));
                return;
            }
        };

        for event in decoder.feed(&chunk) {
            let mut session = state.write().await;
            session.apply(&event);
            let _ = snapshots.send(Arc::new(session.snapshot()));
        }
        if decoder.is_done() {
            debug!("terminal frame received, closing stream");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AgentId, AgentStatus};

    /// Replays a fixed list of chunks, then ends.
    struct ScriptedSource {
        chunks: std::vec::IntoIter<Result<String>>,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<&str>) -> Self {
            Self {
                chunks: chunks
                    .into_iter()
                    .map(|c| Ok(c.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            }
        }

        fn failing(chunks: Vec<&str>, error: &str) -> Self {
            let mut items: Vec<Result<String>> =
                chunks.into_iter().map(|c| Ok(c.to_string())).collect();
            items.push(Err(anyhow::anyhow!("{error}")));
            Self {
                chunks: items.into_iter(),
            }
        }
    }

    #[async_trait]
    impl ChunkSource for ScriptedSource {
        async fn next_chunk(&mut self) -> Result<Option<String>> {
            self.chunks.next().transpose()
        }
    }

    fn client() -> AnalysisClient {
        AnalysisClient::new(ClientConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_scripted_run_to_done() {
        let c = client();
        c.run_stream(ScriptedSource::new(vec![
            "data: {\"type\":\"social_agent\",\"status\":\"thinking\",\"message\":\"scanning\"}\n\n",
            "data: {\"type\":\"news_agent\",\"status\":\"thi",
            "nking\"}\n\ndata: {\"type\":\"done\",\"session_id\":\"s1\"}\n\n",
        ]))
        .await;
        c.join().await;

        let snapshot = c.snapshot().await;
        assert!(!snapshot.session.is_streaming);
        assert_eq!(snapshot.session.session_id.as_deref(), Some("s1"));
        assert_eq!(snapshot.agents[AgentId::Social.index()].status, AgentStatus::Completed);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_frame() {
        let c = client();
        let mut rx = c.subscribe();
        c.run_stream(ScriptedSource::new(vec![
            "data: {\"type\":\"social_thinking\",\"message\":\"a\"}\n\ndata: {\"type\":\"done\"}\n\n",
        ]))
        .await;
        c.join().await;

        // begin_run, two frames; the stream closed on done before EOF.
        let mut count = 0;
        while let Ok(snapshot) = rx.try_recv() {
            count += 1;
            assert_eq!(snapshot.agents.len(), 4);
        }
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_transport_error_fails_run() {
        let c = client();
        c.run_stream(ScriptedSource::failing(
            vec!["data: {\"type\":\"social_thinking\",\"message\":\"a\"}\n\n"],
            "connection reset",
        ))
        .await;
        c.join().await;

        let snapshot = c.snapshot().await;
        assert!(!snapshot.session.is_streaming);
        assert_eq!(snapshot.session.last_error.as_deref(), Some("connection reset"));
        // State from before the error survives.
        assert_eq!(snapshot.agents[AgentId::Social.index()].accumulated_text, "a");
    }

    #[tokio::test]
    async fn test_eof_without_done_finishes_cleanly() {
        let c = client();
        c.run_stream(ScriptedSource::new(vec![
            "data: {\"type\":\"social_thinking\",\"message\":\"partial\"}\n\n",
        ]))
        .await;
        c.join().await;

        let snapshot = c.snapshot().await;
        assert!(!snapshot.session.is_streaming);
        assert!(snapshot.session.last_error.is_none());
    }

    #[tokio::test]
    async fn test_new_run_resets_old_state() {
        let c = client();
        c.run_stream(ScriptedSource::new(vec![
            "data: {\"type\":\"social_thinking\",\"message\":\"old\"}\n\ndata: {\"type\":\"done\"}\n\n",
        ]))
        .await;
        c.join().await;

        c.run_stream(ScriptedSource::new(vec![
            "data: {\"type\":\"news_thinking\",\"message\":\"new\"}\n\n",
        ]))
        .await;
        c.join().await;

        let snapshot = c.snapshot().await;
        assert!(snapshot.agents[AgentId::Social.index()].accumulated_text.is_empty());
        assert_eq!(snapshot.agents[AgentId::News.index()].accumulated_text, "new");
    }

    #[tokio::test]
    async fn test_cancel_without_run_is_noop() {
        let c = client();
        c.cancel().await;
        let snapshot = c.snapshot().await;
        assert!(!snapshot.session.is_streaming);
    }

    #[test]
    fn test_analyze_request_omits_absent_fields() {
        let body = serde_json::to_string(&AnalyzeRequest::query("Will X happen?")).unwrap();
        assert_eq!(body, r#"{"query":"Will X happen?"}"#);

        let empty = serde_json::to_string(&AnalyzeRequest::default()).unwrap();
        assert_eq!(empty, "{}");
    }
}
