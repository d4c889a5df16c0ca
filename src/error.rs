/// Chart configuration could not be applied to the result table.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no series defined")]
    NoSeries,

    #[error("column '{column}' not found in result table")]
    MissingColumn { column: String },

    #[error("malformed chart_config: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The backend `content` field did not hold a tabular JSON payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("response has no textual content")]
    NoContent,

    #[error("content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("content is not an array of objects")]
    NotTabular,

    #[error("content holds no rows")]
    Empty,
}

/// Outbound backend call failed. Covers transport errors, timeouts,
/// non-2xx statuses and undecodable envelopes.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response envelope: {reason}")]
    Envelope { reason: String },
}
