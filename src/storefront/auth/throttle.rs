//! Daily lockout decision for login failures.

use crate::storefront::audit::FailureTally;

/// The failure that reaches this count is the one that locks the identity.
pub const DEFAULT_MAX_FAILED_LOGINS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Blocked,
}

impl ThrottleDecision {
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottlePolicy {
    max_failures: usize,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILED_LOGINS)
    }
}

impl ThrottlePolicy {
    #[must_use]
    pub const fn new(max_failures: usize) -> Self {
        Self { max_failures }
    }

    #[must_use]
    pub const fn max_failures(&self) -> usize {
        self.max_failures
    }

    /// A degraded tally (audit log unavailable) is never blocked.
    #[must_use]
    pub const fn decide(&self, tally: FailureTally) -> ThrottleDecision {
        match tally {
            FailureTally::Counted(failures) if failures >= self.max_failures => {
                ThrottleDecision::Blocked
            }
            FailureTally::Counted(_) | FailureTally::Degraded => ThrottleDecision::Allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_five_failures_are_allowed() {
        let policy = ThrottlePolicy::default();
        for failures in 0..5 {
            assert_eq!(
                policy.decide(FailureTally::Counted(failures)),
                ThrottleDecision::Allowed
            );
        }
    }

    #[test]
    fn fifth_failure_blocks() {
        let policy = ThrottlePolicy::default();
        assert!(policy.decide(FailureTally::Counted(5)).is_blocked());
        assert!(policy.decide(FailureTally::Counted(12)).is_blocked());
    }

    #[test]
    fn degraded_tally_fails_open() {
        let policy = ThrottlePolicy::new(0);
        assert_eq!(
            policy.decide(FailureTally::Degraded),
            ThrottleDecision::Allowed
        );
    }

    #[test]
    fn custom_limit() {
        let policy = ThrottlePolicy::new(3);
        assert_eq!(policy.max_failures(), 3);
        assert!(!policy.decide(FailureTally::Counted(2)).is_blocked());
        assert!(policy.decide(FailureTally::Counted(3)).is_blocked());
    }
}
