//! Backend client.
//!
//! One blocking POST per question, fixed timeout, no retry. Every failure
//! surfaces as a [`BackendError`].

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::response::ChatResponse;

/// Route the backend dispatches chat questions on
pub const CHAT_PATH: &str = "/chat/response";

/// A single question within a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Empty on the first question of a new chat
    pub chat_id: String,
    pub customer_id: String,
    pub message: String,
}

/// Anything that can answer a chat question
pub trait Backend {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    path: &'a str,
    body: EnvelopeBody<'a>,
}

#[derive(Serialize)]
struct EnvelopeBody<'a> {
    chat_id: &'a str,
    user_id: &'a str,
    customer_id: &'a str,
    message: &'a str,
}

/// HTTP backend behind a single gateway endpoint
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
    auth_token: String,
    user_id: String,
}

impl HttpBackend {
    pub fn new(
        endpoint: &str,
        auth_token: &str,
        user_id: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            auth_token: auth_token.to_string(),
            user_id: user_id.to_string(),
        })
    }

    pub fn from_settings(settings: &crate::settings::Settings) -> Result<Self, BackendError> {
        Self::new(
            &settings.api_url,
            &settings.auth_token,
            &settings.user_id,
            settings.chat_timeout(),
        )
    }
}

impl Backend for HttpBackend {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        let envelope = Envelope {
            path: CHAT_PATH,
            body: EnvelopeBody {
                chat_id: &request.chat_id,
                user_id: &self.user_id,
                customer_id: &request.customer_id,
                message: &request.message,
            },
        };

        info!(
            chat_id = %request.chat_id,
            customer_id = %request.customer_id,
            "sending question to backend"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.auth_token)
            .header(CONTENT_TYPE, "application/json")
            .json(&envelope)
            .send()
            .inspect_err(|e| warn!(error = %e, "backend request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "backend returned an error status");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json()?;
        debug!(reply = %value, "backend reply");
        ChatResponse::from_json(value).map_err(|e| BackendError::Envelope {
            reason: e.to_string(),
        })
    }
}
