//! Market data payload shapes decoded from agent tool logs.
//!
//! These mirror what the backend tools emit: `fetch_current_orderbook`
//! and `fetch_price_history` feed the tech agent, `fetch_top_trades`
//! feeds the whales agent.

use serde::{Deserialize, Serialize};

/// Orderbook snapshot as emitted by `fetch_current_orderbook`.
///
/// Price levels arrive as strings on the wire and are kept as such;
/// the consumer renders them without re-interpreting precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orderbook {
    pub market: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

/// One price level of an orderbook side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: String,
    pub size: String,
}

/// Price history series from `fetch_price_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    #[serde(default)]
    pub history: Vec<PricePoint>,
}

/// A single `{t, p}` sample: unix timestamp and price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub t: i64,
    pub p: f64,
}

/// Trade direction as reported by the whale trades feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One whale trade from `fetch_top_trades` (the current array format).
///
/// `side` and `price` are the only fields the format detector requires;
/// everything else is tolerated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "proxyWallet", default)]
    pub proxy_wallet: String,
    pub side: TradeSide,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub size: f64,
    pub price: f64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(rename = "outcomeIndex", default)]
    pub outcome_index: i64,
}

/// Trades of one batch grouped per market title.
///
/// Buckets appear in first-seen order and trades keep their arrival
/// order inside each bucket, so this is a `Vec` rather than a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeBatch {
    pub markets: Vec<MarketTrades>,
}

/// All trades of one batch that share a market title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrades {
    pub title: String,
    pub trades: Vec<Trade>,
}

impl TradeBatch {
    /// Group a flat trade list by market title, preserving order.
    pub fn group(trades: Vec<Trade>) -> Self {
        let mut markets: Vec<MarketTrades> = Vec::new();
        for trade in trades {
            match markets.iter_mut().find(|m| m.title == trade.title) {
                Some(bucket) => bucket.trades.push(trade),
                None => markets.push(MarketTrades {
                    title: trade.title.clone(),
                    trades: vec![trade],
                }),
            }
        }
        Self { markets }
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Total number of trades across all buckets.
    pub fn trade_count(&self) -> usize {
        self.markets.iter().map(|m| m.trades.len()).sum()
    }
}
