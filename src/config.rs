// src/config.rs
// Engine configuration and credential resolution

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const INITIAL_POLL_DELAY_MS: u64 = 100;
pub const MAX_POLL_DELAY_MS: u64 = 20_000;
pub const MAX_PAYLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

// Flash-tier list prices, USD per 1K tokens
const DEFAULT_PROMPT_COST_PER_1K_TOKENS: f64 = 0.0003;
const DEFAULT_OUTPUT_COST_PER_1K_TOKENS: f64 = 0.0025;

/// Tunables for one orchestration engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model_id: String,
    pub initial_poll_delay_ms: u64,
    pub max_poll_delay_ms: u64,
    pub max_payload_bytes: u64,
    /// None = poll until the remote service settles the file
    pub max_poll_attempts: Option<u32>,
    pub prompt_cost_per_1k_tokens_usd: f64,
    pub output_cost_per_1k_tokens_usd: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL.to_string(),
            initial_poll_delay_ms: INITIAL_POLL_DELAY_MS,
            max_poll_delay_ms: MAX_POLL_DELAY_MS,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            max_poll_attempts: None,
            prompt_cost_per_1k_tokens_usd: DEFAULT_PROMPT_COST_PER_1K_TOKENS,
            output_cost_per_1k_tokens_usd: DEFAULT_OUTPUT_COST_PER_1K_TOKENS,
        }
    }
}

/// Read the inference API key from the environment (a local .env is honored)
pub fn api_key_from_env() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var(API_KEY_ENV_VAR)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
