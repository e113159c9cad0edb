use super::config::PracticeConfig;
use super::types::{Decision, Verdict};

/// Stateless retry/advance decision. The attempt count is owned by the session.
pub fn decide(score: f32, attempt_count: u32, threshold: f32, max_attempts: u32) -> Decision {
    if score >= threshold {
        Decision::Correct
    } else if attempt_count < max_attempts {
        Decision::Retry
    } else {
        Decision::Abandon
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub threshold: f32,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(threshold: f32, max_attempts: u32) -> Self {
        Self {
            threshold,
            max_attempts,
        }
    }

    pub fn verdict(&self, score: f32, attempt_count: u32) -> Verdict {
        Verdict {
            score,
            decision: decide(score, attempt_count, self.threshold, self.max_attempts),
        }
    }
}

impl From<&PracticeConfig> for RetryPolicy {
    fn from(config: &PracticeConfig) -> Self {
        Self::new(config.similarity_threshold, config.max_attempts_per_word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(decide(0.8, 1, 0.8, 3), Decision::Correct);
        assert_eq!(decide(1.0, 3, 0.8, 3), Decision::Correct);
    }

    #[test]
    fn retries_until_attempts_are_exhausted() {
        assert_eq!(decide(0.5, 1, 0.8, 3), Decision::Retry);
        assert_eq!(decide(0.5, 2, 0.8, 3), Decision::Retry);
        assert_eq!(decide(0.5, 3, 0.8, 3), Decision::Abandon);
        assert_eq!(decide(0.0, 7, 0.8, 3), Decision::Abandon);
    }

    #[test]
    fn single_attempt_policy_abandons_immediately() {
        let policy = RetryPolicy::new(0.9, 1);
        let verdict = policy.verdict(0.4, 1);
        assert_eq!(verdict.decision, Decision::Abandon);
        assert_eq!(verdict.score, 0.4);
    }

    #[test]
    fn builds_from_config() {
        let policy = RetryPolicy::from(&PracticeConfig::default());
        assert_eq!(policy, RetryPolicy::new(0.8, 3));
    }
}
