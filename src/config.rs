use std::env;

use anyhow::Result;

/// Default minimum interval between requests to either API, in seconds.
/// Both services throttle around 1 QPS on their free/default tiers.
pub const DEFAULT_RATE_INTERVAL_SECS: f64 = 1.0;

/// Default number of attempts per request (1 initial + 2 retries).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of posts per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    pub openai_api_key: String,
    pub perspective_api_key: String,
    pub db_path: String,
    /// Path to the collected posts file (the scraper's final_collection.json).
    pub input_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only the paths have defaults — the API keys are required for
    /// anything beyond `init` and `status`.
    pub fn load() -> Result<Self> {
        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            perspective_api_key: env::var("PERSPECTIVE_API_KEY").unwrap_or_default(),
            db_path: env::var("CROSSMOD_DB_PATH").unwrap_or_else(|_| "./crossmod.db".to_string()),
            input_path: env::var("CROSSMOD_INPUT")
                .unwrap_or_else(|_| "./data/final_collection.json".to_string()),
        })
    }

    /// Check that the OpenAI API key is configured.
    /// Call this before any operation that submits posts to the Moderation API.
    pub fn require_openai(&self) -> Result<()> {
        if self.openai_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that the Perspective API key is configured.
    /// Call this before any operation that submits posts to Perspective.
    pub fn require_perspective(&self) -> Result<()> {
        if self.perspective_api_key.is_empty() {
            anyhow::bail!(
                "PERSPECTIVE_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Validate that both service credentials are present.
    pub fn require_services(&self) -> Result<()> {
        self.require_openai()?;
        self.require_perspective()
    }
}
