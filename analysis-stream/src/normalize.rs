//! Payload normalization.
//!
//! The feed reuses one loosely typed `message` field for prose,
//! JSON-echoed metadata, and Python-repr dumps of market data, keyed
//! only by `tool_name`. This module turns that field into structured
//! domain data where a decoder matches, and classifies everything else
//! as narrative text or filtered metadata. Decoding is deterministic:
//! normalizing the same event twice yields the same output.

use serde_json::Value;
use tracing::{debug, warn};

use common::{Citation, Orderbook, PriceHistory, Trade, TradeBatch};

use crate::event::{EventKind, RawEvent};

/// Keys that mark a JSON payload as a structured echo rather than
/// narration. Prose that merely looks like JSON stays included.
const METADATA_KEYS: [&str; 7] = [
    "event", "tweets", "metadata", "raw_data", "history", "market", "holders",
];

/// Structured interpretation of one event's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedContent {
    /// Narrative text to accumulate for the resolved agent.
    Text(String),
    /// Structured echo excluded from narrative accumulation.
    Metadata(Value),
    Orderbook(Orderbook),
    PriceHistory(PriceHistory),
    Trades(TradeBatch),
    Citation(Citation),
    /// Final-result narrative from `news_agent_annotation`.
    Annotation(String),
    /// Plain diagnostic log line.
    LogEntry {
        level: Option<String>,
        message: String,
    },
    ToolCall {
        id: Option<String>,
        name: String,
        input: Option<Value>,
    },
    Reasoning {
        id: Option<String>,
        content: String,
    },
}

/// Best-effort string rendering of a loosely typed payload value.
/// Null maps to the empty string, strings pass through, everything
/// else serializes to JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First of `names` that renders to non-empty text.
pub fn first_text(event: &RawEvent, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| event.field(n).map(stringify).filter(|s| !s.is_empty()))
}

/// Convert a Python-repr dict/list literal to JSON: single quotes to
/// double quotes, `True`/`False` to `true`/`false`. Deliberately
/// narrow -- it corrupts string values that contain an apostrophe --
/// because that is the exact format the backend tools emit and a
/// smarter conversion would change behavior on real payloads.
pub fn pyrepr_to_json(s: &str) -> String {
    s.replace('\'', "\"")
        .replace("True", "true")
        .replace("False", "false")
}

/// Interpret one event's payload according to its kind and tool.
/// Returns `None` when the event carries nothing usable (or the
/// payload failed to decode; failures are logged and dropped).
pub fn normalize(event: &RawEvent) -> Option<NormalizedContent> {
    match event.kind() {
        EventKind::Log => normalize_log(event),
        EventKind::Content | EventKind::Other => {
            classify(first_text(event, &["message", "content", "data", "text", "output"])?)
        }
        EventKind::ToolCalled => Some(NormalizedContent::ToolCall {
            id: event.call_id.clone().or_else(|| event.tool_call_id.clone()),
            name: event.tool_name.clone().unwrap_or_else(|| "unknown".to_string()),
            input: event.arguments.clone(),
        }),
        EventKind::Reasoning => Some(NormalizedContent::Reasoning {
            id: event.reasoning_item_id.clone(),
            content: first_text(event, &["content"]).unwrap_or_default(),
        }),
        _ => None,
    }
}

fn normalize_log(event: &RawEvent) -> Option<NormalizedContent> {
    let tool = event.tool_name.as_deref().unwrap_or("");

    if tool.contains("fetch_current_orderbook") {
        return decode_orderbook(event);
    }
    if tool.contains("fetch_price_history") {
        return decode_price_history(event);
    }
    if tool.contains("fetch_top_trades") {
        return decode_trades(event);
    }
    if tool == "news_agent_annotation" {
        // Always narrative, never metadata-filtered.
        return first_text(event, &["message"]).map(NormalizedContent::Annotation);
    }
    if tool == "social_citations" {
        return decode_citation(event);
    }
    if tool.contains("content") || tool.contains("agent_output") || tool.contains("_output") {
        return classify(first_text(event, &["message", "content"])?);
    }

    Some(NormalizedContent::LogEntry {
        level: event.level.clone(),
        message: first_text(event, &["message", "content"]).unwrap_or_default(),
    })
}

/// The generic text/metadata classifier. A payload is metadata only
/// when it parses as a JSON object carrying one of the reserved keys;
/// JSON arrays key by index and therefore never match, and prose that
/// fails to parse is always text.
fn classify(text: String) -> Option<NormalizedContent> {
    if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
        if let Value::Object(map) = &parsed {
            if METADATA_KEYS.iter().any(|k| map.contains_key(*k)) {
                return Some(NormalizedContent::Metadata(parsed));
            }
        }
    }
    Some(NormalizedContent::Text(text))
}

fn decode_orderbook(event: &RawEvent) -> Option<NormalizedContent> {
    let raw = first_text(event, &["message"])?;
    match serde_json::from_str::<Orderbook>(&pyrepr_to_json(&raw)) {
        Ok(book) => Some(NormalizedContent::Orderbook(book)),
        Err(e) => {
            warn!(error = %e, "dropping undecodable orderbook payload");
            None
        }
    }
}

fn decode_price_history(event: &RawEvent) -> Option<NormalizedContent> {
    let raw = first_text(event, &["message"])?;
    match serde_json::from_str::<PriceHistory>(&pyrepr_to_json(&raw)) {
        Ok(history) => Some(NormalizedContent::PriceHistory(history)),
        Err(e) => {
            warn!(error = %e, "dropping undecodable price history payload");
            None
        }
    }
}

/// Trades arrive either as a ready JSON array of `side`/`price`
/// objects, as a Python-repr string of the same, or (legacy) as a
/// holder-list shape that is recognized and skipped.
fn decode_trades(event: &RawEvent) -> Option<NormalizedContent> {
    let message = event.message.as_ref()?;
    let value = match message {
        Value::Array(_) => message.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(&pyrepr_to_json(s)) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "dropping undecodable trades payload");
                return None;
            }
        },
        _ => {
            debug!("skipping legacy holder payload");
            return None;
        }
    };

    let is_trade_array = value
        .as_array()
        .and_then(|items| items.first())
        .map(|first| first.get("side").is_some() && first.get("price").is_some())
        .unwrap_or(false);
    if !is_trade_array {
        debug!("skipping legacy holder payload");
        return None;
    }

    match serde_json::from_value::<Vec<Trade>>(value) {
        Ok(trades) => Some(NormalizedContent::Trades(TradeBatch::group(trades))),
        Err(e) => {
            warn!(error = %e, "dropping trades payload with unexpected shape");
            None
        }
    }
}

fn decode_citation(event: &RawEvent) -> Option<NormalizedContent> {
    let message = event.message.as_ref()?;
    let result = match message {
        Value::Object(_) => serde_json::from_value::<Citation>(message.clone()),
        Value::String(s) => serde_json::from_str::<Citation>(&pyrepr_to_json(s)),
        _ => return None,
    };
    match result {
        Ok(citation) => Some(NormalizedContent::Citation(citation)),
        Err(e) => {
            warn!(error = %e, "dropping undecodable citation payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> RawEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&Value::Null), "");
        assert_eq!(stringify(&Value::String("hi".into())), "hi");
        assert_eq!(stringify(&serde_json::json!(42)), "42");
        assert_eq!(stringify(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_metadata_filter() {
        let echo = event(r#"{"type":"thinking","message":"{\"event\":\"x\",\"tweets\":[1,2]}"}"#);
        assert!(matches!(normalize(&echo), Some(NormalizedContent::Metadata(_))));

        let prose = event(r#"{"type":"thinking","message":"Looking at volume spikes in the last hour"}"#);
        assert_eq!(
            normalize(&prose),
            Some(NormalizedContent::Text("Looking at volume spikes in the last hour".into()))
        );
    }

    #[test]
    fn test_json_without_reserved_keys_stays_text() {
        let e = event(r#"{"type":"thinking","message":"{\"note\":\"still prose\"}"}"#);
        assert_eq!(normalize(&e), Some(NormalizedContent::Text(r#"{"note":"still prose"}"#.into())));
    }

    #[test]
    fn test_json_array_is_never_metadata() {
        let e = event(r#"{"type":"thinking","message":"[1,2,3]"}"#);
        assert_eq!(normalize(&e), Some(NormalizedContent::Text("[1,2,3]".into())));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let e = event(r#"{"type":"log","tool_name":"fetch_current_orderbook","message":"{'market':'X','asset_id':'1','timestamp':'0','bids':[],'asks':[]}"}"#);
        assert_eq!(normalize(&e), normalize(&e));
    }

    #[test]
    fn test_orderbook_pyrepr_decode() {
        let e = event(r#"{"type":"log","tool_name":"fetch_current_orderbook","message":"{'market':'X','asset_id':'1','timestamp':'0','bids':[{'price':'0.5','size':'10'}],'asks':[]}"}"#);
        match normalize(&e) {
            Some(NormalizedContent::Orderbook(book)) => {
                assert_eq!(book.market, "X");
                assert_eq!(book.bids.len(), 1);
                assert!(book.asks.is_empty());
            }
            other => panic!("expected orderbook, got {other:?}"),
        }
    }

    #[test]
    fn test_orderbook_parse_failure_is_dropped() {
        let e = event(r#"{"type":"log","tool_name":"fetch_current_orderbook","message":"not a dict"}"#);
        assert_eq!(normalize(&e), None);
    }

    #[test]
    fn test_price_history_pyrepr_decode() {
        let e = event(r#"{"type":"log","tool_name":"fetch_price_history","message":"{'history': [{'t': 1, 'p': 0.4}, {'t': 2, 'p': 0.5}]}"}"#);
        match normalize(&e) {
            Some(NormalizedContent::PriceHistory(h)) => {
                assert_eq!(h.history.len(), 2);
                assert_eq!(h.history[1].p, 0.5);
            }
            other => panic!("expected price history, got {other:?}"),
        }
    }

    #[test]
    fn test_trades_new_format_array() {
        let e = event(
            r#"{"type":"log","tool_name":"fetch_top_trades","message":[
                {"side":"BUY","price":0.6,"title":"A","size":100},
                {"side":"SELL","price":0.4,"title":"B","size":50},
                {"side":"BUY","price":0.7,"title":"A","size":10}
            ]}"#,
        );
        match normalize(&e) {
            Some(NormalizedContent::Trades(batch)) => {
                assert_eq!(batch.markets.len(), 2);
                assert_eq!(batch.markets[0].title, "A");
                assert_eq!(batch.markets[0].trades.len(), 2);
                assert_eq!(batch.markets[1].trades.len(), 1);
            }
            other => panic!("expected trades, got {other:?}"),
        }
    }

    #[test]
    fn test_trades_pyrepr_string() {
        let e = event(r#"{"type":"log","tool_name":"fetch_top_trades","message":"[{'side': 'BUY', 'price': 0.6, 'title': 'A'}]"}"#);
        match normalize(&e) {
            Some(NormalizedContent::Trades(batch)) => assert_eq!(batch.trade_count(), 1),
            other => panic!("expected trades, got {other:?}"),
        }
    }

    #[test]
    fn test_trades_legacy_holder_shape_skipped() {
        let e = event(r#"{"type":"log","tool_name":"fetch_top_trades","message":{"token":"x","holders":[]}}"#);
        assert_eq!(normalize(&e), None);
    }

    #[test]
    fn test_citation_from_object_and_repr() {
        let obj = event(r#"{"type":"log","tool_name":"social_citations","message":{"id_str":"1","full_text":"t","user_screen_name":"u"}}"#);
        assert!(matches!(normalize(&obj), Some(NormalizedContent::Citation(_))));

        let repr = event(r#"{"type":"log","tool_name":"social_citations","message":"{'id_str': '2', 'full_text': 'big if true', 'favorite_count': 3}"}"#);
        match normalize(&repr) {
            Some(NormalizedContent::Citation(c)) => {
                assert_eq!(c.id_str, "2");
                assert_eq!(c.favorite_count, 3);
            }
            other => panic!("expected citation, got {other:?}"),
        }
    }

    #[test]
    fn test_annotation_is_verbatim_even_when_json_shaped() {
        let e = event(r#"{"type":"news_log","tool_name":"news_agent_annotation","message":"{\"event\":\"x\"}"}"#);
        assert_eq!(normalize(&e), Some(NormalizedContent::Annotation(r#"{"event":"x"}"#.into())));
    }

    #[test]
    fn test_plain_log_becomes_log_entry() {
        let e = event(r#"{"type":"social_log","level":"warning","message":"rate limited"}"#);
        assert_eq!(
            normalize(&e),
            Some(NormalizedContent::LogEntry {
                level: Some("warning".into()),
                message: "rate limited".into()
            })
        );
    }

    #[test]
    fn test_log_with_output_tool_goes_through_classifier() {
        let e = event(r#"{"type":"log","tool_name":"social_agent_output","message":"partial analysis text"}"#);
        assert_eq!(normalize(&e), Some(NormalizedContent::Text("partial analysis text".into())));
    }

    #[test]
    fn test_pyrepr_limitation_is_narrow() {
        // An apostrophe inside a value corrupts the conversion; the
        // payload is dropped rather than half-decoded.
        let e = event(r#"{"type":"log","tool_name":"fetch_current_orderbook","message":"{'market': 'won't resolve'}"}"#);
        assert_eq!(normalize(&e), None);
    }
}
