// Moderation service trait and the per-item result type.
//
// Exactly two services exist (OpenAI Moderation, Google Perspective), so
// this is a closed capability contract, not a plugin interface. submit()
// is deliberately infallible: every outcome — scored, failed after
// retries, skipped — is a ModerationResult. Nothing a service does can
// abort the run.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::store::models::Post;

/// Which moderation service produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    OpenAi,
    Perspective,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::OpenAi => "openai",
            Service::Perspective => "perspective",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
    Skipped,
}

/// The scored payload of a successful API call, before it's wrapped
/// into a ModerationResult.
#[derive(Debug, Clone)]
pub struct ScoredResponse {
    /// Category name → score in [0, 1].
    pub category_scores: BTreeMap<String, f64>,
    /// The service's overall flagged verdict.
    pub flagged: bool,
    /// Full response body, kept for downstream analysis.
    pub raw_response: serde_json::Value,
}

/// One service's verdict for one post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationResult {
    pub post_id: i64,
    pub service: Service,
    pub category_scores: BTreeMap<String, f64>,
    pub flagged: bool,
    pub raw_response: Option<serde_json::Value>,
    pub status: ResultStatus,
    /// Present iff status != Success.
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ModerationResult {
    pub fn success(
        post_id: i64,
        service: Service,
        scored: ScoredResponse,
        elapsed: std::time::Duration,
    ) -> Self {
        Self {
            post_id,
            service,
            category_scores: scored.category_scores,
            flagged: scored.flagged,
            raw_response: Some(scored.raw_response),
            status: ResultStatus::Success,
            error: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failed(
        post_id: i64,
        service: Service,
        error: String,
        elapsed: std::time::Duration,
    ) -> Self {
        Self {
            post_id,
            service,
            category_scores: BTreeMap::new(),
            flagged: false,
            raw_response: None,
            status: ResultStatus::Failed,
            error: Some(error),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn skipped(post_id: i64, service: Service, reason: &str) -> Self {
        Self {
            post_id,
            service,
            category_scores: BTreeMap::new(),
            flagged: false,
            raw_response: None,
            status: ResultStatus::Skipped,
            error: Some(reason.to_string()),
            elapsed_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Trait for submitting a post to a moderation service. Implementations
/// must be async because both providers are HTTP APIs.
#[async_trait]
pub trait ModerationService: Send + Sync {
    /// Submit one post for scoring. Rate limiting, retries, and error
    /// absorption all happen inside; the caller always gets a result.
    async fn submit(&self, post: &Post) -> ModerationResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scored() -> ScoredResponse {
        let mut scores = BTreeMap::new();
        scores.insert("toxicity".to_string(), 0.9);
        ScoredResponse {
            category_scores: scores,
            flagged: true,
            raw_response: serde_json::json!({"ok": true}),
        }
    }

    #[test]
    fn test_success_result_has_no_error() {
        let r = ModerationResult::success(1, Service::OpenAi, scored(), Duration::from_millis(12));
        assert!(r.is_success());
        assert!(r.error.is_none());
        assert!(r.raw_response.is_some());
        assert_eq!(r.category_scores["toxicity"], 0.9);
    }

    #[test]
    fn test_failed_result_carries_error_detail() {
        let r = ModerationResult::failed(
            1,
            Service::Perspective,
            "server error (HTTP 503)".to_string(),
            Duration::from_secs(3),
        );
        assert!(!r.is_success());
        assert_eq!(r.error.as_deref(), Some("server error (HTTP 503)"));
        assert!(r.category_scores.is_empty());
    }

    #[test]
    fn test_skipped_result_is_not_success() {
        let r = ModerationResult::skipped(2, Service::OpenAi, "empty content");
        assert_eq!(r.status, ResultStatus::Skipped);
        assert!(!r.is_success());
        assert_eq!(r.error.as_deref(), Some("empty content"));
    }

    #[test]
    fn test_result_json_roundtrip() {
        let r = ModerationResult::success(42, Service::Perspective, scored(), Duration::ZERO);
        let json = serde_json::to_string(&r).unwrap();
        let back: ModerationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.post_id, 42);
        assert_eq!(back.service, Service::Perspective);
        assert_eq!(back.status, ResultStatus::Success);
    }
}
