//! Category 10 combinability validation.
//!
//! Validates whether the fares of a priced itinerary may be combined:
//! within each pricing unit (round trip, circle trip, open jaw) and
//! end-on-end across the fare path. The engine interprets the rule
//! records' data strings; table lookups and the per-table match logic sit
//! behind the [`Collaborators`] seams so callers can wire in real filed
//! data or the permissive defaults.
//!
//! ```
//! use cat10_model::{EngineConfig, FareUsageArena};
//! use cat10_rules::NoRefData;
//! use cat10_validate::{Collaborators, CombinabilityEngine, PermissiveTables};
//!
//! let tables = PermissiveTables;
//! let engine = CombinabilityEngine::new(
//!     EngineConfig::default(),
//!     Collaborators {
//!         records: &NoRefData,
//!         sales_restrictions: &NoRefData,
//!         carrier_preferences: &NoRefData,
//!         minor: &tables,
//!         major: &tables,
//!     },
//! );
//! let arena = FareUsageArena::new();
//! assert!(arena.is_empty());
//! let _ = engine;
//! ```

pub mod diag;
pub mod directionality;
pub mod engine;
pub mod match_state;
pub mod scoreboard;
pub mod subcat;

pub use diag::DiagCollector;
pub use directionality::{DirectionalityInfo, ValidationScope, direction_matches};
pub use engine::{Collaborators, CombinabilityEngine};
pub use match_state::{MatchCode, MatchSlot, ValidationElement, ValidationFareComponents};
pub use scoreboard::{Scoreboard, ScoreboardCheck, is_mirror_image};
pub use subcat::{
    MajorRestrictions, MinorMatch, MinorSubCategories, PermissiveTables, SubCatContext,
};
