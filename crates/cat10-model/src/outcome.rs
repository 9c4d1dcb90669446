//! Validation outcomes. The engine collapses every failure cause into a
//! single unspecified-failure verdict plus the failed fare-usage pair.

use serde::{Deserialize, Serialize};

use crate::arena::FareUsageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Passed,
    UnspecifiedFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub verdict: Verdict,
    /// The fare usage whose rule produced the failure.
    pub failed_source: Option<FareUsageId>,
    /// The fare usage it could not be combined with.
    pub failed_target: Option<FareUsageId>,
}

impl ValidationOutcome {
    pub fn passed() -> Self {
        Self {
            verdict: Verdict::Passed,
            failed_source: None,
            failed_target: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            verdict: Verdict::UnspecifiedFailure,
            failed_source: None,
            failed_target: None,
        }
    }

    pub fn failed_pair(source: FareUsageId, target: FareUsageId) -> Self {
        Self {
            verdict: Verdict::UnspecifiedFailure,
            failed_source: Some(source),
            failed_target: Some(target),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}
