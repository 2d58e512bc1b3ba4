//! Client configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint that accepts an analysis request and answers with an
    /// SSE stream.
    #[serde(default = "default_analyze_url")]
    pub analyze_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Buffered snapshots per subscriber before lagging.
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_capacity: usize,
    #[serde(default = "default_debug_trail_capacity")]
    pub debug_trail_capacity: usize,
}

fn default_analyze_url() -> String {
    "http://localhost:8000/analyze".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_snapshot_capacity() -> usize {
    256
}

fn default_debug_trail_capacity() -> usize {
    crate::session::DEBUG_TRAIL_CAPACITY
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            analyze_url: default_analyze_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            snapshot_capacity: default_snapshot_capacity(),
            debug_trail_capacity: default_debug_trail_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.analyze_url, "http://localhost:8000/analyze");
        assert_eq!(config.connect_timeout_secs, 30);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"analyze_url":"https://api.example.com/analyze"}"#).unwrap();
        assert_eq!(config.analyze_url, "https://api.example.com/analyze");
        assert_eq!(config.snapshot_capacity, 256);
    }
}
