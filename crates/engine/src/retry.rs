//! Retry Policy.

use crate::graph::RetryConfig;

/// What the retry policy decided for a just-terminated computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Insert a fresh `not_set` successor scheduled this many seconds out.
    Retry { scheduled_time: i64 },
    /// Attempts exhausted; the node stays terminally failed.
    GiveUp,
}

/// Decide whether node N gets a retry successor, given the number of
/// terminal attempts since its last success (or ever, if it has never
/// succeeded) and the current time.
pub fn decide(retry: &RetryConfig, attempts_since_last_success: usize, now: i64) -> RetryDecision {
    if attempts_since_last_success < retry.max_retries as usize {
        let backoff = retry.backoff_for(attempts_since_last_success);
        RetryDecision::Retry { scheduled_time: now + backoff.as_secs() as i64 }
    } else {
        RetryDecision::GiveUp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_config(max_retries: u32, backoff_ms: Vec<u64>) -> RetryConfig {
        RetryConfig {
            max_retries,
            backoff_strategy_ms: backoff_ms,
            abandon_after_seconds: 300,
            heartbeat_interval_seconds: None,
            heartbeat_timeout_seconds: None,
        }
    }

    #[test]
    fn retries_until_max_then_gives_up() {
        let retry = retry_config(2, vec![1_000, 2_000]);
        assert_eq!(decide(&retry, 0, 100), RetryDecision::Retry { scheduled_time: 101 });
        assert_eq!(decide(&retry, 1, 100), RetryDecision::Retry { scheduled_time: 102 });
        assert_eq!(decide(&retry, 2, 100), RetryDecision::GiveUp);
    }

    #[test]
    fn backoff_clamps_to_last_element_past_list_length() {
        let retry = retry_config(5, vec![1_000]);
        assert_eq!(decide(&retry, 3, 100), RetryDecision::Retry { scheduled_time: 101 });
    }

    #[test]
    fn zero_max_retries_always_gives_up() {
        let retry = retry_config(0, vec![1_000]);
        assert_eq!(decide(&retry, 0, 100), RetryDecision::GiveUp);
    }
}
