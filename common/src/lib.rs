//! Shared domain types for the analysis dashboard workspace.
//!
//! Everything the stream consumer and any future presentation layer
//! agree on lives here: the four fixed agent identities, per-run
//! bookkeeping items, and the market/social payload shapes decoded
//! from the agent tool feed.

pub mod agent;
pub mod market;
pub mod social;

pub use agent::{AgentId, AgentStatus, LogItem, ReasoningItem, ToolCall, Tweet};
pub use market::{BookLevel, MarketTrades, Orderbook, PriceHistory, PricePoint, Trade, TradeBatch, TradeSide};
pub use social::Citation;
