//! Bounded retry on rate limits.
//!
//! Only [`Attempt::RateLimited`] is retried, with a fixed wait between
//! attempts. Once the budget is spent the block is recorded as failed
//! (`("", false)`) instead of aborting the run. A reply that is empty after
//! cleanup fails the block the same way.

use super::Attempt;
use crate::config::TranslatorConfig;
use crate::error::GatewayError;
use crate::pipeline::postprocess;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Attempts per request and the wait between rate-limited attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_secs(config.rate_limit_backoff_secs),
        }
    }
}

/// Drive `attempt` until it succeeds, fails for good, or the rate-limit
/// budget runs out.
pub async fn request_with_retry<F, Fut>(
    backend: &str,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<(String, bool), GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt>,
{
    let max_attempts = policy.max_attempts.max(1);

    for n in 1..=max_attempts {
        match attempt().await {
            Attempt::Success(text) => {
                debug!("{backend}: reply received on attempt {n}");
                let cleaned = postprocess::clean_reply(&text);
                if cleaned.is_empty() {
                    warn!("{backend}: reply was empty after cleanup");
                    return Ok((String::new(), false));
                }
                return Ok((cleaned, true));
            }
            Attempt::RateLimited(detail) => {
                if n < max_attempts {
                    warn!(
                        "{backend}: rate limit reached ({detail}). Waiting {}s before retry {}/{}",
                        policy.backoff.as_secs(),
                        n + 1,
                        max_attempts
                    );
                    sleep(policy.backoff).await;
                } else {
                    warn!("{backend}: rate limit reached. Maximum attempts ({max_attempts}) exceeded");
                }
            }
            Attempt::Rejected(detail) => {
                warn!("{backend}: request rejected: {detail}");
                return Ok((String::new(), false));
            }
            Attempt::Fatal(e) => return Err(e),
        }
    }

    Ok((String::new(), false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn scripted(
        calls: &AtomicUsize,
        rate_limited_first: usize,
    ) -> impl FnMut() -> std::future::Ready<Attempt> + '_ {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n <= rate_limited_first {
                Attempt::RateLimited("HTTP 429".into())
            } else {
                Attempt::Success("  bonjour \n".into())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn two_rate_limits_then_success_waits_twice() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        let result = request_with_retry("test", &RetryPolicy::default(), scripted(&calls, 2))
            .await
            .unwrap();

        assert_eq!(result, ("bonjour".to_string(), true));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(120), "waited {waited:?}");
        assert!(waited < Duration::from_secs(180), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_every_time_gives_up_quietly() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        let result = request_with_retry("test", &RetryPolicy::default(), scripted(&calls, usize::MAX))
            .await
            .unwrap();

        assert_eq!(result, (String::new(), false));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(120), "waited {waited:?}");
        assert!(waited < Duration::from_secs(180), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn first_try_success_never_sleeps() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();
        let result = request_with_retry("test", &RetryPolicy::default(), scripted(&calls, 0))
            .await
            .unwrap();
        assert!(result.1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn rejected_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result = request_with_retry("test", &RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Attempt::Rejected("HTTP 500".into()))
        })
        .await
        .unwrap();
        assert_eq!(result, (String::new(), false));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_reply_counts_as_failed_block() {
        let calls = AtomicUsize::new(0);
        let result = request_with_retry("test", &RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Attempt::Success("```\n```".into()))
        })
        .await
        .unwrap();
        assert_eq!(result, (String::new(), false));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fatal_is_propagated_without_retry() {
        let calls = AtomicUsize::new(0);
        let result = request_with_retry("test", &RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Attempt::Fatal(GatewayError::Connection {
                backend: "test".into(),
                detail: "connection refused".into(),
            }))
        })
        .await;
        assert!(matches!(result, Err(GatewayError::Connection { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_from_config() {
        let config = TranslatorConfig::builder()
            .max_attempts(5)
            .rate_limit_backoff_secs(2)
            .build()
            .unwrap();
        let p = RetryPolicy::from_config(&config);
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.backoff, Duration::from_secs(2));
    }
}
