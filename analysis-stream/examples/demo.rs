//! Replays a canned analyze transcript through the client and prints
//! the final per-agent state.
//!
//! ```bash
//! cargo run --example demo
//! ```

use anyhow::Result;
use async_trait::async_trait;
use tracing::Level;

use analysis_stream::{AnalysisClient, ChunkSource, ClientConfig};
use common::AgentId;

const TRANSCRIPT: &[&str] = &[
    "data: {\"type\":\"question\",\"content\":\"Will BTC close above $100k this month?\"}\n\n",
    "data: {\"type\":\"social_agent\",\"status\":\"thinking\",\"message\":\"Scanning social chatter...\"}\n\n",
    "data: {\"type\":\"social_thinking\",\"message\":\"Volume of bullish posts is up 40% day over day. \"}\n\n",
    "data: {\"type\":\"social_tweet\",\"tweet_id\":\"t1\",\"author\":\"trader_jane\",\"content\":\"calling the breakout now\",\"followers\":120000,\"verified\":true}\n\n",
    "data: {\"type\":\"news_agent\",\"status\":\"thinking\",\"message\":\"Reading headlines...\"}\n\n",
    "data: {\"type\":\"news_thinking\",\"message\":\"Two ETF inflow stories dominate coverage. \"}\n\n",
    "data: {\"type\":\"log\",\"tool_name\":\"fetch_current_orderbook\",\"message\":\"{'market': 'btc-100k', 'asset_id': '77', 'timestamp': '1724630400', 'bids': [{'price': '0.62', 'size': '1500'}], 'asks': [{'price': '0.64', 'size': '900'}]}\"}\n\n",
    "data: {\"type\":\"whales_tool_called\",\"tool_name\":\"fetch_top_trades\",\"call_id\":\"c1\",\"arguments\":{\"limit\":5}}\n\n",
    "data: {\"type\":\"log\",\"tool_name\":\"fetch_top_trades\",\"message\":[{\"side\":\"BUY\",\"price\":0.63,\"size\":5000,\"title\":\"BTC above $100k\"}]}\n\n",
    "data: {\"type\":\"message_output_created\",\"data\":\"Market pricing and flow both lean yes; confidence moderate.\"}\n\n",
    "data: {\"type\":\"done\",\"session_id\":\"demo-session\",\"final_result\":\"Lean YES at ~63%.\"}\n\n",
];

struct Replay(std::vec::IntoIter<String>);

#[async_trait]
impl ChunkSource for Replay {
    async fn next_chunk(&mut self) -> Result<Option<String>> {
        Ok(self.0.next())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let client = AnalysisClient::new(ClientConfig::default())?;
    let mut snapshots = client.subscribe();

    client
        .run_stream(Replay(
            TRANSCRIPT.iter().map(|c| c.to_string()).collect::<Vec<_>>().into_iter(),
        ))
        .await;

    while let Ok(snapshot) = snapshots.recv().await {
        if !snapshot.session.is_streaming {
            break;
        }
    }
    client.join().await;

    let snapshot = client.snapshot().await;
    println!("question: {}", snapshot.session.question);
    for agent in AgentId::PIPELINE {
        let channel = &snapshot.agents[agent.index()];
        println!(
            "{:<18} {:<10} text={}B tweets={} books={} trades={}",
            channel.id.display_name(),
            format!("{:?}", channel.status).to_lowercase(),
            channel.accumulated_text.len(),
            channel.tweets.len(),
            channel.orderbooks.len(),
            channel.trade_batches.len(),
        );
    }
    println!("final: {}", snapshot.session.final_result);
    Ok(())
}
