//! Engine configuration, passed explicitly at construction.

use serde::{Deserialize, Serialize};

/// Tuning switches for the combinability engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Report the failed fare-usage pair from pricing-unit validation so
    /// callers can skip combinations that reuse it.
    pub reuse_failed_pair_pu: bool,
    /// Same, for fare-path (end-on-end) validation.
    pub reuse_failed_pair_fp: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reuse_failed_pair_pu: true,
            reuse_failed_pair_fp: true,
        }
    }
}
