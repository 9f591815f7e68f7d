use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use shared::shared_wheel_game::{RewardTier, Slice};
use tracing::{info, warn};

pub const DEFAULT_CONGRATS_URL: &str = "https://api.together.xyz/v1/chat/completions";
pub const DEFAULT_CONGRATS_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

#[derive(Debug, Clone)]
pub struct CongratsSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for CongratsSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CONGRATS_URL.to_string(),
            api_key: None,
            model: DEFAULT_CONGRATS_MODEL.to_string(),
            timeout: Duration::from_millis(4000),
        }
    }
}

#[derive(Debug)]
pub enum CongratsError {
    MissingKey,
    Http(reqwest::Error),
    Status(u16),
    EmptyResponse,
}

impl fmt::Display for CongratsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => write!(f, "no API key configured"),
            Self::Http(e) => write!(f, "request failed: {}", e),
            Self::Status(code) => write!(f, "API returned status {}", code),
            Self::EmptyResponse => write!(f, "API returned no text"),
        }
    }
}

impl std::error::Error for CongratsError {}

impl From<reqwest::Error> for CongratsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

/// Local message used whenever the text service is unavailable.
pub fn fallback_message(slice: &Slice) -> String {
    match slice.tier() {
        RewardTier::Nothing => format!("So close! You landed on {}. Spin again soon! 🍀", slice.label),
        RewardTier::Small => format!("Nice one! You've just unlocked {}! 🎉", slice.label),
        RewardTier::Medium => format!("Fantastic! You've just unlocked {}! 🥳", slice.label),
        RewardTier::Big => format!("WOW! You've just won {}! 🏆", slice.label),
    }
}

pub fn prompt_for(slice: &Slice) -> String {
    if slice.reward == 0 {
        format!(
            "A person just spun a wheel and landed on \"{}\". Write a very short, friendly, encouraging 1-sentence message.",
            slice.label
        )
    } else {
        format!(
            "A user just won \"{}\" on a prize wheel. Write a short, exciting congratulatory 1-sentence message under 15 words.",
            slice.label
        )
    }
}

/// Congratulation text from an OpenAI-compatible chat endpoint, with a local
/// fallback. Never fails.
#[derive(Clone)]
pub struct CongratsService {
    client: Client,
    settings: CongratsSettings,
}

impl CongratsService {
    pub fn new(settings: CongratsSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub async fn message_for(&self, slice: &Slice) -> String {
        match self.generate(slice).await {
            Ok(text) => text,
            Err(CongratsError::MissingKey) => fallback_message(slice),
            Err(e) => {
                warn!("Congratulation text unavailable, using fallback: {}", e);
                fallback_message(slice)
            }
        }
    }

    async fn generate(&self, slice: &Slice) -> Result<String, CongratsError> {
        let api_key = self.settings.api_key.as_deref().ok_or(CongratsError::MissingKey)?;

        let response = self
            .client
            .post(&self.settings.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.settings.model,
                "messages": [{ "role": "user", "content": prompt_for(slice) }],
                "max_tokens": 60,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CongratsError::Status(status.as_u16()));
        }

        let body = response.json::<serde_json::Value>().await?;
        let text = body
            .get("choices")
            .and_then(|c| c[0]["message"]["content"].as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(CongratsError::EmptyResponse)?;

        info!("Generated congratulation for {}", slice.label);
        Ok(text)
    }
}
