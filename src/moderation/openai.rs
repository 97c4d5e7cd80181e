// OpenAI Moderation API client.
//
// One text body per call; the response carries a per-category score map
// and an overall flagged verdict. The endpoint is free but throttled, so
// requests go through the shared rate limiter.
//
// API docs: https://platform.openai.com/docs/api-reference/moderations

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::warn;

use super::error::ServiceError;
use super::rate_limiter::RateLimiter;
use super::retry::submit_with_retry;
use super::traits::{ModerationResult, ModerationService, ScoredResponse, Service};
use super::truncate_content;
use crate::store::models::Post;

const MODERATIONS_URL: &str = "https://api.openai.com/v1/moderations";

/// OpenAI caps moderation input length; longer bodies are truncated.
const MAX_CONTENT_CHARS: usize = 8192;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
    max_retries: u32,
}

impl OpenAiClient {
    pub fn new(api_key: String, interval_secs: f64, max_retries: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            rate_limiter: RateLimiter::new(interval_secs),
            max_retries,
        }
    }

    async fn request(&self, text: &str) -> Result<ScoredResponse, ServiceError> {
        let response = self
            .client
            .post(MODERATIONS_URL)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&ModerationRequest { input: text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status.as_u16(), body));
        }

        let raw: serde_json::Value = response.json().await?;

        parse_response(raw)
    }
}

/// Pull the flagged bit and category scores out of the response body.
/// The full body is retained as raw_response for downstream analysis.
fn parse_response(raw: serde_json::Value) -> Result<ScoredResponse, ServiceError> {
    let result = raw
        .get("results")
        .and_then(|r| r.get(0))
        .ok_or_else(|| ServiceError::MalformedResponse("missing results[0]".to_string()))?;

    let flagged = result
        .get("flagged")
        .and_then(|f| f.as_bool())
        .ok_or_else(|| ServiceError::MalformedResponse("missing flagged".to_string()))?;

    let mut category_scores = BTreeMap::new();
    if let Some(scores) = result.get("category_scores").and_then(|s| s.as_object()) {
        for (category, value) in scores {
            if let Some(score) = value.as_f64() {
                category_scores.insert(category.clone(), score);
            }
        }
    }

    Ok(ScoredResponse {
        category_scores,
        flagged,
        raw_response: raw,
    })
}

#[async_trait]
impl ModerationService for OpenAiClient {
    async fn submit(&self, post: &Post) -> ModerationResult {
        if post.content.trim().is_empty() {
            return ModerationResult::skipped(post.post_id, Service::OpenAi, "empty content");
        }

        let text = truncate_content(&post.content, MAX_CONTENT_CHARS);
        if text.len() < post.content.len() {
            warn!(
                post_id = post.post_id,
                original = post.content.chars().count(),
                "Content truncated for OpenAI"
            );
        }

        submit_with_retry(
            Service::OpenAi,
            post.post_id,
            &self.rate_limiter,
            self.max_retries,
            || self.request(&text),
        )
        .await
    }
}

#[derive(Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
}
