// Backend chat reply envelope and its tolerant inner decode

use serde::Deserialize;
use serde_json::Value;

use crate::config::ChartConfig;
use crate::data::Table;
use crate::error::{ConfigError, DecodeError};

pub const NO_TEXT_ANSWER: &str = "⚠️ Backend returned no user‑visible text.";

/// Outer envelope of a `/chat/response` reply. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub chart_config: Option<Value>,
    #[serde(default)]
    pub summarized_output: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

impl ChatResponse {
    /// Decode the outer envelope from a JSON value
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Raw `content` text, when the backend sent a string
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_ref().and_then(Value::as_str)
    }

    /// Parse `content` as a JSON array of row objects.
    pub fn rows(&self) -> Result<Table, DecodeError> {
        let raw = self
            .content_text()
            .filter(|s| !s.is_empty())
            .ok_or(DecodeError::NoContent)?;
        let parsed: Value = serde_json::from_str(raw)?;
        Table::from_json(&parsed)
    }

    /// User-visible text: the summary, else the raw content, else a notice
    pub fn answer(&self) -> String {
        self.summarized_output
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.content_text().filter(|s| !s.is_empty()))
            .unwrap_or(NO_TEXT_ANSWER)
            .to_string()
    }

    /// Chart configuration, if the backend supplied one. An empty object counts as none.
    pub fn chart_config(&self) -> Option<Result<ChartConfig, ConfigError>> {
        match &self.chart_config {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(value) => Some(ChartConfig::from_json(value)),
        }
    }

    /// Chat identifier to continue the conversation with, if non-empty
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref().filter(|id| !id.is_empty())
    }
}
