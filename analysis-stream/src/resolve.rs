//! Agent channel resolution.
//!
//! Events do not name their agent directly; the channel is inferred
//! from `tool_name` and `type` substrings with a fixed precedence.
//! Market-data tools always win over a literal agent name embedded in
//! the same tool name, so the token tables below must be checked in
//! order.

use common::AgentId;

/// Tool tokens that route to the tech channel (market data retrieval).
const TECH_TOOL_TOKENS: [&str; 5] = [
    "fetch_price_history",
    "fetch_current_orderbook",
    "fetch_market",
    "price_",
    "orderbook",
];

/// Tool tokens that route to the whales channel (holder/trade data).
const WHALES_TOOL_TOKENS: [&str; 3] = ["fetch_top_trades", "holders", "whale"];

/// Resolve the agent channel for an event. Defaults to `social` when
/// nothing matches, mirroring the upstream convention that untagged
/// narration belongs to the first pipeline stage.
pub fn resolve_agent(event_type: &str, tool_name: Option<&str>) -> AgentId {
    if let Some(tool) = tool_name {
        if TECH_TOOL_TOKENS.iter().any(|t| tool.contains(t)) {
            return AgentId::Tech;
        }
        if WHALES_TOOL_TOKENS.iter().any(|t| tool.contains(t)) {
            return AgentId::Whales;
        }
        if tool.contains("social") {
            return AgentId::Social;
        }
        if tool.contains("news") {
            return AgentId::News;
        }
        if tool.contains("tech") {
            return AgentId::Tech;
        }
    }

    if event_type.contains("social") {
        AgentId::Social
    } else if event_type.contains("news") {
        AgentId::News
    } else if event_type.contains("tech") {
        AgentId::Tech
    } else if event_type.contains("whale") {
        AgentId::Whales
    } else {
        AgentId::Social
    }
}

/// Narrow matcher used only for bare `tool_output` conclusions: a
/// plain agent-name lookup with no market-data precedence and no
/// default. Unmatched tools produce no state change.
pub fn resolve_conclusion_agent(tool_name: &str) -> Option<AgentId> {
    if tool_name.contains("social") {
        Some(AgentId::Social)
    } else if tool_name.contains("news") {
        Some(AgentId::News)
    } else if tool_name.contains("tech") {
        Some(AgentId::Tech)
    } else if tool_name.contains("whale") {
        Some(AgentId::Whales)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_data_tools_route_to_tech() {
        assert_eq!(resolve_agent("log", Some("fetch_current_orderbook")), AgentId::Tech);
        assert_eq!(resolve_agent("log", Some("fetch_price_history")), AgentId::Tech);
        assert_eq!(resolve_agent("log", Some("price_feed")), AgentId::Tech);
    }

    #[test]
    fn test_market_tokens_beat_embedded_agent_names() {
        // Contains both "news" and an orderbook token; the market-data
        // rule has precedence.
        assert_eq!(resolve_agent("log", Some("news_orderbook_probe")), AgentId::Tech);
        assert_eq!(resolve_agent("log", Some("social_whale_scan")), AgentId::Whales);
    }

    #[test]
    fn test_holder_tools_route_to_whales() {
        assert_eq!(resolve_agent("log", Some("fetch_top_trades")), AgentId::Whales);
        assert_eq!(resolve_agent("log", Some("top_holders")), AgentId::Whales);
    }

    #[test]
    fn test_type_fallback_and_default() {
        assert_eq!(resolve_agent("news_thinking", None), AgentId::News);
        assert_eq!(resolve_agent("whales_log", None), AgentId::Whales);
        assert_eq!(resolve_agent("whale_alert", None), AgentId::Whales);
        assert_eq!(resolve_agent("thinking", None), AgentId::Social);
    }

    #[test]
    fn test_conclusion_matcher_has_no_default() {
        assert_eq!(resolve_conclusion_agent("social_agent"), Some(AgentId::Social));
        assert_eq!(resolve_conclusion_agent("whale_agent"), Some(AgentId::Whales));
        assert_eq!(resolve_conclusion_agent("fetch_current_orderbook"), None);
    }
}
