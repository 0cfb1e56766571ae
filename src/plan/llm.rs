//! LLM-backed plan generator using the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::PlanGenerator;
use super::prompts;
use crate::config::parse_var;
use crate::error::{ConfigError, PlanError};
use crate::registration::model::UserProfile;

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for plan generation.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub api_key: SecretString,
    pub model: String,
    /// Max tokens for the LLM response.
    pub max_tokens: u32,
    /// LLM temperature for plan generation.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// API root, overridable for tests.
    pub base_url: String,
}

impl PlanConfig {
    /// Build from a key with every other setting at its default.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// Read from the environment. Returns `Ok(None)` when
    /// `ANTHROPIC_API_KEY` is not set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = var("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let defaults = Self::new(api_key);

        let model = var("NUTRI_BOT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.model.clone());

        let max_tokens: u32 = parse_var(
            "NUTRI_BOT_PLAN_MAX_TOKENS",
            var("NUTRI_BOT_PLAN_MAX_TOKENS"),
            defaults.max_tokens,
        )?;

        let temperature: f32 = parse_var(
            "NUTRI_BOT_PLAN_TEMPERATURE",
            var("NUTRI_BOT_PLAN_TEMPERATURE"),
            defaults.temperature,
        )?;

        Ok(Some(Self {
            model,
            max_tokens,
            temperature,
            ..defaults
        }))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Generates meal plans by prompting an LLM.
pub struct LlmPlanGenerator {
    client: reqwest::Client,
    config: PlanConfig,
}

impl LlmPlanGenerator {
    pub fn new(config: PlanConfig) -> Result<Self, PlanError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlanError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        info!(model = %config.model, "Using Anthropic for plan generation");
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, profile: &UserProfile) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": prompts::SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": prompts::plan_request(profile) }
            ]
        })
    }
}

/// Join every text block of a Messages API response.
fn collect_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl PlanGenerator for LlmPlanGenerator {
    async fn generate(&self, profile: &UserProfile) -> Result<String, PlanError> {
        debug!(user_id = profile.user_id, model = %self.config.model, "Requesting meal plan");

        let resp = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(profile))
            .send()
            .await
            .map_err(|e| PlanError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PlanError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after(resp.headers());
            warn!(?retry_after, "Plan generation rate limited");
            return Err(PlanError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlanError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: MessagesResponse =
            resp.json().await.map_err(|e| PlanError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let plan = collect_text(parsed);
        if plan.is_empty() {
            return Err(PlanError::EmptyPlan {
                provider: PROVIDER.to_string(),
            });
        }

        info!(
            user_id = profile.user_id,
            chars = plan.chars().count(),
            "Meal plan generated"
        );
        Ok(plan)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
