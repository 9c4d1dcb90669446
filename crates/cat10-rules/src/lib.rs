//! ATPCO Category 10 (combinability) rule data.
//!
//! A rule record carries header permission tags for each combination type
//! and an ordered list of datasets. Each dataset is pre-split at load time
//! into its major items and an optional minor clause of OR alternatives,
//! so the validation engine never re-parses relational indicators.

pub mod error;
pub mod item;
pub mod record;
pub mod refdata;
pub mod tree;

pub use error::RuleTreeError;
pub use item::{
    AllSegmentsIndicator, Directionality, InOut, Relation, RuleCategory, RuleItem,
};
pub use record::{EndOnEndTag, PermissionTag, RoundTripTag, RuleRecord, RuleRecordKind};
pub use refdata::{
    CarrierPreference, CarrierPreferenceSource, NoRefData, RuleRecordSource, SalesRestriction,
    SalesRestrictionSource, VendorCrossRef,
};
pub use tree::{Dataset, MinorClause, build_datasets};
