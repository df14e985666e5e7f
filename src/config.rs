use anyhow::{anyhow, Context};
use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub model_api_key: String,
    pub model_api_base: String,
    pub chat_model: String,
    pub report_model: String,
    pub jwt_secret: String,
    pub push_endpoint: String,
    pub push_secret: String,
    /// Seconds between pending-analysis ticks. 0 disables the background job.
    pub analysis_interval_secs: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self, anyhow::Error> {
        let database_url = require("DATABASE_URL")?;
        let model_api_key = require("MODEL_API_KEY")?;
        let model_api_base =
            env::var("MODEL_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let report_model = env::var("REPORT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let jwt_secret = require("JWT_SECRET")?;
        let push_endpoint = require("PUSH_ENDPOINT")?;
        let push_secret = require("PUSH_SECRET")?;
        let analysis_interval_secs = env::var("ANALYSIS_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .context("ANALYSIS_INTERVAL_SECS is not a number")?;

        Ok(AppConfig {
            database_url,
            model_api_key,
            model_api_base,
            chat_model,
            report_model,
            jwt_secret,
            push_endpoint,
            push_secret,
            analysis_interval_secs,
        })
    }
}

fn require(key: &str) -> Result<String, anyhow::Error> {
    env::var(key).map_err(|_| anyhow!("{} not found", key))
}
