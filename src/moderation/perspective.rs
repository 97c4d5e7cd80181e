// Google Perspective API client.
//
// Perspective analyzes text for toxicity, identity attacks, insults, etc.
// It's free to use but rate-limited to ~1 QPS. Unlike OpenAI it has no
// overall flagged bit, so we derive one from the TOXICITY summary score.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

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

const ANALYZE_URL: &str =
    "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Perspective caps comment length; longer bodies are truncated.
const MAX_CONTENT_CHARS: usize = 20480;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A comment counts as flagged when its TOXICITY summary score reaches this.
const FLAG_THRESHOLD: f64 = 0.5;

/// The attributes requested on every call.
const ATTRIBUTES: [&str; 6] = [
    "TOXICITY",
    "SEVERE_TOXICITY",
    "IDENTITY_ATTACK",
    "INSULT",
    "PROFANITY",
    "THREAT",
];

pub struct PerspectiveClient {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
    max_retries: u32,
}

impl PerspectiveClient {
    pub fn new(api_key: String, interval_secs: f64, max_retries: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            rate_limiter: RateLimiter::new(interval_secs),
            max_retries,
        }
    }

    async fn request(&self, text: &str) -> Result<ScoredResponse, ServiceError> {
        let request = AnalyzeRequest::for_text(text);

        let response = self
            .client
            .post(ANALYZE_URL)
            .query(&[("key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
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

/// Pull each requested attribute's summary score out of the response body.
fn parse_response(raw: serde_json::Value) -> Result<ScoredResponse, ServiceError> {
    let attribute_scores = raw
        .get("attributeScores")
        .and_then(|a| a.as_object())
        .ok_or_else(|| ServiceError::MalformedResponse("missing attributeScores".to_string()))?;

    let mut category_scores = BTreeMap::new();
    for attribute in ATTRIBUTES {
        if let Some(value) = attribute_scores
            .get(attribute)
            .and_then(|a| a.get("summaryScore"))
            .and_then(|s| s.get("value"))
            .and_then(|v| v.as_f64())
        {
            category_scores.insert(attribute.to_string(), value);
        }
    }

    let toxicity = *category_scores.get("TOXICITY").ok_or_else(|| {
        ServiceError::MalformedResponse("missing TOXICITY summary score".to_string())
    })?;

    Ok(ScoredResponse {
        category_scores,
        flagged: toxicity >= FLAG_THRESHOLD,
        raw_response: raw,
    })
}

#[async_trait]
impl ModerationService for PerspectiveClient {
    async fn submit(&self, post: &Post) -> ModerationResult {
        if post.content.trim().is_empty() {
            return ModerationResult::skipped(post.post_id, Service::Perspective, "empty content");
        }

        let text = truncate_content(&post.content, MAX_CONTENT_CHARS);
        if text.len() < post.content.len() {
            warn!(
                post_id = post.post_id,
                original = post.content.chars().count(),
                "Content truncated for Perspective"
            );
        }

        submit_with_retry(
            Service::Perspective,
            post.post_id,
            &self.rate_limiter,
            self.max_retries,
            || self.request(&text),
        )
        .await
    }
}

// --- Perspective API request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    comment: Comment<'a>,
    requested_attributes: BTreeMap<&'static str, AttributeConfig>,
    do_not_store: bool,
}

impl<'a> AnalyzeRequest<'a> {
    fn for_text(text: &'a str) -> Self {
        Self {
            comment: Comment { text },
            requested_attributes: ATTRIBUTES
                .iter()
                .map(|a| (*a, AttributeConfig {}))
                .collect(),
            do_not_store: true,
        }
    }
}

#[derive(Serialize)]
struct Comment<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_toxicity(toxicity: f64) -> serde_json::Value {
        serde_json::json!({
            "attributeScores": {
                "TOXICITY": {"summaryScore": {"value": toxicity}},
                "INSULT": {"summaryScore": {"value": 0.2}},
                "THREAT": {"summaryScore": {"value": 0.05}}
            },
            "languages": ["en"]
        })
    }

    #[test]
    fn test_parse_response_extracts_summary_scores() {
        let scored = parse_response(response_with_toxicity(0.73)).unwrap();
        assert_eq!(scored.category_scores["TOXICITY"], 0.73);
        assert_eq!(scored.category_scores["INSULT"], 0.2);
        // Attributes absent from the response are simply omitted
        assert!(!scored.category_scores.contains_key("PROFANITY"));
    }

    #[test]
    fn test_flagged_follows_toxicity_threshold() {
        assert!(parse_response(response_with_toxicity(0.51)).unwrap().flagged);
        assert!(!parse_response(response_with_toxicity(0.49)).unwrap().flagged);
    }

    #[test]
    fn test_missing_toxicity_is_malformed() {
        let raw = serde_json::json!({"attributeScores": {}});
        let err = parse_response(raw).unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
    }

    #[test]
    fn test_analyze_request_shape() {
        let request = AnalyzeRequest::for_text("some comment");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["comment"]["text"], "some comment");
        assert_eq!(json["doNotStore"], true);
        assert!(json["requestedAttributes"]["TOXICITY"].is_object());
        assert!(json["requestedAttributes"]["SEVERE_TOXICITY"].is_object());
    }
}
