//! Social payload shapes.

use serde::{Deserialize, Serialize};

/// A tweet citation attached by the social agent's `social_citations`
/// tool. Every field is optional on the wire; absent counts default to
/// zero rather than failing the decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub id_str: String,
    #[serde(default)]
    pub favorite_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub quote_count: i64,
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub user_screen_name: String,
    #[serde(default)]
    pub user_icon: String,
    #[serde(default)]
    pub url: String,
}
