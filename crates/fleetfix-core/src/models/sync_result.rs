//! Drain pass summary

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Counters produced by one drain pass. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// Records accepted by the server and removed from the queue
    pub succeeded: usize,
    /// Records abandoned after exceeding the retry ceiling, or undecodable
    pub permanently_failed: usize,
    /// Records that failed and stay queued for a later pass
    pub retried: usize,
}

impl SyncResult {
    /// Number of records the pass looked at.
    pub const fn processed(&self) -> usize {
        self.succeeded + self.permanently_failed + self.retried
    }

    /// Whether the pass touched nothing.
    pub const fn is_empty(&self) -> bool {
        self.processed() == 0
    }
}

impl AddAssign for SyncResult {
    fn add_assign(&mut self, rhs: Self) {
        self.succeeded += rhs.succeeded;
        self.permanently_failed += rhs.permanently_failed;
        self.retried += rhs.retried;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let result = SyncResult::default();
        assert!(result.is_empty());
        assert_eq!(result.processed(), 0);
    }

    #[test]
    fn test_add_assign_merges_counters() {
        let mut total = SyncResult {
            succeeded: 1,
            permanently_failed: 0,
            retried: 2,
        };
        total += SyncResult {
            succeeded: 3,
            permanently_failed: 1,
            retried: 0,
        };
        assert_eq!(total.succeeded, 4);
        assert_eq!(total.permanently_failed, 1);
        assert_eq!(total.retried, 2);
        assert_eq!(total.processed(), 7);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(SyncResult {
            succeeded: 1,
            permanently_failed: 2,
            retried: 0,
        })
        .unwrap();
        assert_eq!(json["permanentlyFailed"], 2);
    }
}
