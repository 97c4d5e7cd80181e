// Shared retry loop for both API clients.
//
// Transient failures are retried with exponential backoff starting at the
// service's rate-limit interval (interval, 2x, 4x, ...). Permanent failures
// return immediately. Either way the caller gets a ModerationResult, never
// an error.

use std::future::Future;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::ServiceError;
use super::rate_limiter::RateLimiter;
use super::traits::{ModerationResult, ScoredResponse, Service};

pub async fn submit_with_retry<F, Fut>(
    service: Service,
    post_id: i64,
    limiter: &RateLimiter,
    max_retries: u32,
    mut call: F,
) -> ModerationResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ScoredResponse, ServiceError>>,
{
    let started = Instant::now();
    let base = limiter.interval().await;
    let mut last_error = String::from("no attempts made");

    for attempt in 0..max_retries.max(1) {
        limiter.acquire().await;

        match call().await {
            Ok(scored) => {
                debug!(%service, post_id, attempt, "Post scored");
                return ModerationResult::success(post_id, service, scored, started.elapsed());
            }
            Err(err) => {
                last_error = err.to_string();

                if !err.is_transient() {
                    warn!(%service, post_id, error = %err, "Permanent failure, not retrying");
                    return ModerationResult::failed(
                        post_id,
                        service,
                        last_error,
                        started.elapsed(),
                    );
                }

                if attempt + 1 < max_retries {
                    let backoff = base * 2u32.pow(attempt);
                    warn!(
                        %service,
                        post_id,
                        attempt,
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    warn!(%service, post_id, error = %last_error, "Retries exhausted");
    ModerationResult::failed(post_id, service, last_error, started.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ok_response() -> ScoredResponse {
        ScoredResponse {
            category_scores: BTreeMap::new(),
            flagged: false,
            raw_response: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_transient_errors_retry_up_to_limit() {
        let limiter = RateLimiter::new(0.005);
        let attempts = AtomicU32::new(0);

        let result = submit_with_retry(Service::OpenAi, 1, &limiter, 3, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::Server(503)) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_permanent_error_fails_without_retry() {
        let limiter = RateLimiter::new(0.005);
        let attempts = AtomicU32::new(0);

        let result = submit_with_retry(Service::Perspective, 2, &limiter, 3, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ServiceError::Rejected {
                    status: 400,
                    detail: "comment must be non-empty".to_string(),
                })
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("400"));
    }

    #[tokio::test]
    async fn test_recovery_after_transient_failure() {
        let limiter = RateLimiter::new(0.005);
        let attempts = AtomicU32::new(0);

        let result = submit_with_retry(Service::OpenAi, 3, &limiter, 3, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ServiceError::RateLimited)
                } else {
                    Ok(ok_response())
                }
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(result.is_success());
    }
}
