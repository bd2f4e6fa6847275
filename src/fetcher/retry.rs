use std::time::Duration;

use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::fetch::{Fetch, Phase as FetchPhase};

use super::source::{ListingPage, ListingSource};

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per page, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Pause after each successful request.
    pub request_delay: Duration,
}

impl RetryPolicy {
    /// Wait before the next attempt after `failures` consecutive failures (1-based):
    /// `base * 2^(failures-1)`, capped at `max_delay`.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Next state after attempt number `attempt` failed.
    pub fn after_failure(&self, attempt: u32, reason: String) -> PageState {
        if attempt >= self.max_attempts {
            PageState::PermanentlyFailed { attempts: attempt, reason }
        } else {
            PageState::RetryWait { attempt, delay: self.backoff_delay(attempt), reason }
        }
    }

    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy { max_attempts, base_delay: Duration::ZERO, max_delay: Duration::ZERO, request_delay: Duration::ZERO }
    }
}

/// Per-page request lifecycle.
#[derive(Debug)]
pub enum PageState {
    Pending,
    Requesting { attempt: u32 },
    RetryWait { attempt: u32, delay: Duration, reason: String },
    Succeeded { page: ListingPage, attempts: u32 },
    PermanentlyFailed { attempts: u32, reason: String },
}

#[derive(Debug)]
pub enum PageOutcome {
    Fetched { page: ListingPage, attempts: u32 },
    Failed { attempts: u32, reason: String },
}

/// Drive one page through the state machine until it succeeds or runs out of attempts.
/// An empty page counts as a transient failure unless `accept_empty` is set.
pub async fn fetch_with_retry(
    source: &dyn ListingSource,
    index: u32,
    page_size: u32,
    policy: &RetryPolicy,
    accept_empty: bool,
    log: &LogCtx<Fetch>,
) -> PageOutcome {
    let mut state = PageState::Pending;
    loop {
        state = match state {
            PageState::Pending => PageState::Requesting { attempt: 1 },
            PageState::Requesting { attempt } => {
                log.info(format!("📥 Fetching page {} (attempt {}/{})", index, attempt, policy.max_attempts));
                match source.fetch_page(index, page_size).await {
                    Ok(page) if page.items.is_empty() && !accept_empty => {
                        log.warn_kv("⚠️ empty page", [("page", index.to_string()), ("attempt", attempt.to_string())]);
                        policy.after_failure(attempt, "empty page".to_string())
                    }
                    Ok(page) => PageState::Succeeded { page, attempts: attempt },
                    Err(err) => {
                        log.warn_kv("⚠️ page request failed", [
                            ("page", index.to_string()),
                            ("attempt", attempt.to_string()),
                            ("error", err.to_string()),
                        ]);
                        policy.after_failure(attempt, err.to_string())
                    }
                }
            }
            PageState::RetryWait { attempt, delay, reason } => {
                let _s = log.span_kv(&FetchPhase::Backoff, [("page", index.to_string()), ("delay_ms", delay.as_millis().to_string())]).entered();
                log.debug_kv("⏳ retry wait", [("page", index.to_string()), ("reason", reason)]);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                PageState::Requesting { attempt: attempt + 1 }
            }
            PageState::Succeeded { page, attempts } => return PageOutcome::Fetched { page, attempts },
            PageState::PermanentlyFailed { attempts, reason } => return PageOutcome::Failed { attempts, reason },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::source::mock::ScriptedSource;
    use crate::telemetry;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            request_delay: Duration::from_secs(1),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(p.backoff_delay(2), Duration::from_secs(10));
        assert_eq!(p.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(p.backoff_delay(5), Duration::from_secs(60));
        assert_eq!(p.backoff_delay(200), Duration::from_secs(60));
    }

    #[test]
    fn failure_transitions_respect_the_bound() {
        let p = policy();
        assert!(matches!(p.after_failure(1, "x".into()), PageState::RetryWait { attempt: 1, .. }));
        assert!(matches!(p.after_failure(2, "x".into()), PageState::RetryWait { attempt: 2, .. }));
        assert!(matches!(p.after_failure(3, "x".into()), PageState::PermanentlyFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn page_recovers_before_the_bound() {
        let src = ScriptedSource::catalog(45, 1).fail_times(2, 2);
        let out = fetch_with_retry(&src, 2, 20, &RetryPolicy::immediate(3), false, &telemetry::fetch()).await;
        match out {
            PageOutcome::Fetched { page, attempts } => {
                assert_eq!(attempts, 3);
                assert_eq!(page.items.len(), 20);
            }
            other => panic!("expected page, got {other:?}"),
        }
        assert_eq!(src.calls(), vec![2, 2, 2]);
    }

    #[tokio::test]
    async fn page_fails_permanently_at_the_bound() {
        let src = ScriptedSource::catalog(45, 1).fail_times(2, 3);
        let out = fetch_with_retry(&src, 2, 20, &RetryPolicy::immediate(3), false, &telemetry::fetch()).await;
        assert!(matches!(out, PageOutcome::Failed { attempts: 3, .. }));
        assert_eq!(src.calls().len(), 3);
    }

    #[tokio::test]
    async fn empty_page_is_retried_unless_accepted() {
        let src = ScriptedSource::catalog(45, 1).empty_times(3, 1);
        let out = fetch_with_retry(&src, 3, 20, &RetryPolicy::immediate(3), false, &telemetry::fetch()).await;
        assert!(matches!(out, PageOutcome::Fetched { attempts: 2, ref page } if page.items.len() == 5));

        let src = ScriptedSource::catalog(45, 1).empty_times(1, 1);
        let out = fetch_with_retry(&src, 1, 20, &RetryPolicy::immediate(3), true, &telemetry::fetch()).await;
        assert!(matches!(out, PageOutcome::Fetched { attempts: 1, ref page } if page.items.is_empty()));
    }
}
