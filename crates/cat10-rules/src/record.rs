//! The Category 10 rule record: header permission tags plus the tagged
//! dataset tree.

use serde::{Deserialize, Serialize};

use crate::item::{RuleCategory, RuleItem};
use crate::tree::Dataset;

/// Which record family a rule record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleRecordKind {
    /// Record filed against a fare rule.
    FareRule,
    /// Record filed as a combinability rule proper.
    CombinabilityRule,
}

/// Header-level permission for one combination type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionTag {
    Permitted,
    NotPermitted,
    /// Permitted subject to the data-string restrictions.
    Restrictions,
}

/// Round-trip permission; the mirror-image bit is filed in the same header
/// character and split out here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTripTag {
    pub combination: PermissionTag,
    pub mirror_image_permitted: bool,
}

impl RoundTripTag {
    pub fn permitted() -> Self {
        Self {
            combination: PermissionTag::Permitted,
            mirror_image_permitted: true,
        }
    }
}

/// End-on-end permission; unlike the other tags it can demand a combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndOnEndTag {
    Permitted,
    NotPermitted,
    Restrictions,
    Required,
}

/// A complete Category 10 rule record for one fare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub vendor: String,
    pub kind: RuleRecordKind,
    pub single_open_jaw: PermissionTag,
    pub double_open_jaw: PermissionTag,
    pub round_trip: RoundTripTag,
    pub circle_trip: PermissionTag,
    pub end_on_end: EndOnEndTag,
    pub datasets: Vec<Dataset>,
}

impl RuleRecord {
    /// A record that permits everything and files no data strings.
    pub fn permissive(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            kind: RuleRecordKind::CombinabilityRule,
            single_open_jaw: PermissionTag::Permitted,
            double_open_jaw: PermissionTag::Permitted,
            round_trip: RoundTripTag::permitted(),
            circle_trip: PermissionTag::Permitted,
            end_on_end: EndOnEndTag::Permitted,
            datasets: Vec::new(),
        }
    }

    pub fn with_datasets(mut self, datasets: Vec<Dataset>) -> Self {
        self.datasets = datasets;
        self
    }

    /// All items of every dataset, majors and minors, in filed order.
    pub fn items(&self) -> impl Iterator<Item = &RuleItem> {
        self.datasets.iter().flat_map(|dataset| {
            dataset.majors.iter().chain(
                dataset
                    .minor
                    .iter()
                    .flat_map(|minor| minor.alternatives.iter().flatten()),
            )
        })
    }

    /// First item of the given category, searching majors then minors.
    pub fn find_item(&self, category: RuleCategory) -> Option<&RuleItem> {
        self.items().find(|item| item.category == category)
    }
}
