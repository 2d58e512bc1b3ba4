//! Streaming client and reducer for the multi-agent market analysis
//! feed.
//!
//! The analyze endpoint runs a fixed pipeline of four agents (social,
//! news, tech, whales) over a prediction-market question and streams
//! progress as SSE frames. This crate decodes those frames, normalizes
//! their loosely typed payloads into domain data, and folds them into
//! a deterministic per-run [`session::Snapshot`] that a dashboard can
//! render directly.

pub mod channel;
pub mod client;
pub mod config;
pub mod decoder;
pub mod event;
pub mod normalize;
pub mod registry;
pub mod resolve;
pub mod session;

pub use channel::AgentChannel;
pub use client::{AnalysisClient, AnalyzeRequest, ChunkSource};
pub use config::ClientConfig;
pub use decoder::FrameDecoder;
pub use event::{EventKind, RawEvent};
pub use normalize::NormalizedContent;
pub use registry::AgentRegistry;
pub use session::{AnalysisSession, Session, Snapshot};
