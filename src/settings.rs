// Application settings: TOML file, then environment overrides

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::session::CustomerDirectory;
use crate::RenderOptions;

pub const ENV_API_URL: &str = "ASKCHART_API_URL";
pub const ENV_AUTH_TOKEN: &str = "ASKCHART_AUTH_TOKEN";
pub const ENV_USER_ID: &str = "ASKCHART_USER_ID";

/// Columns charted when a tabular reply carries no chart config
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FallbackChart {
    pub label_column: String,
    pub value_column: String,
}

impl Default for FallbackChart {
    fn default() -> Self {
        Self {
            label_column: "Document_Status".to_string(),
            value_column: "Employee_Count".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,
    /// Upload calls are slower than chat; collaborators implementing
    /// uploads read their timeout from here
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
    #[serde(default)]
    pub customers: CustomerDirectory,
    #[serde(default)]
    pub render: RenderOptions,
    #[serde(default = "default_fallback_chart")]
    pub fallback_chart: Option<FallbackChart>,
}

fn default_chat_timeout() -> u64 { 30 }
fn default_upload_timeout() -> u64 { 120 }
fn default_fallback_chart() -> Option<FallbackChart> { Some(FallbackChart::default()) }

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            auth_token: String::new(),
            user_id: String::new(),
            chat_timeout_secs: default_chat_timeout(),
            upload_timeout_secs: default_upload_timeout(),
            customers: CustomerDirectory::default(),
            render: RenderOptions::default(),
            fallback_chart: default_fallback_chart(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, apply environment overrides, validate
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file at {}", path.display()))?;
        let mut settings = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse settings file at {}", path.display()))?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace connection fields with any non-empty override from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            (ENV_API_URL, &mut self.api_url),
            (ENV_AUTH_TOKEN, &mut self.auth_token),
            (ENV_USER_ID, &mut self.user_id),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(anyhow!("api_url is not set (settings file or {})", ENV_API_URL));
        }
        if self.user_id.is_empty() {
            return Err(anyhow!("user_id is not set (settings file or {})", ENV_USER_ID));
        }
        if self.chat_timeout_secs == 0 {
            return Err(anyhow!("chat_timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}
