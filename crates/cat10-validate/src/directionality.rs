//! Directional gating of rule items.
//!
//! An item applies to a fare usage only when its in/out indicator matches
//! the fare's direction and its directional label matches the geography the
//! record was matched with. Labels 1/2 compare against the record's
//! location-swapped bit; the origin labels 3/4 additionally consult the
//! fare's direction and only carry meaning at fare-path scope.

use cat10_model::{FareDirection, FareUsage};
use cat10_rules::{Directionality, InOut, RuleItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    PricingUnit,
    FarePath,
}

/// Scope context threaded through dataset validation.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalityInfo {
    pub scope: ValidationScope,
    pub level_label: &'static str,
}

impl DirectionalityInfo {
    pub fn pricing_unit() -> Self {
        Self {
            scope: ValidationScope::PricingUnit,
            level_label: "PU",
        }
    }

    pub fn fare_path() -> Self {
        Self {
            scope: ValidationScope::FarePath,
            level_label: "FAREPATH",
        }
    }
}

/// True when the item's directional filing applies to this fare usage.
pub fn direction_matches(item: &RuleItem, fare_usage: &FareUsage, info: &DirectionalityInfo) -> bool {
    match item.in_out {
        InOut::Always => {}
        InOut::Outbound => {
            if fare_usage.direction != FareDirection::Outbound {
                return false;
            }
        }
        InOut::Inbound => {
            if fare_usage.direction != FareDirection::Inbound {
                return false;
            }
        }
    }

    match item.directionality {
        Directionality::Unrestricted => true,
        Directionality::Loc1ToLoc2 => !fare_usage.record_loc_swapped,
        Directionality::Loc2ToLoc1 => fare_usage.record_loc_swapped,
        Directionality::OriginLoc1 | Directionality::OriginLoc2 => {
            if info.scope == ValidationScope::PricingUnit {
                // Origin labels bind at fare-path scope only.
                return true;
            }
            let origin_label = match fare_usage.direction {
                FareDirection::Outbound => Directionality::OriginLoc1,
                FareDirection::Inbound => Directionality::OriginLoc2,
            };
            (item.directionality == origin_label) != fare_usage.record_loc_swapped
        }
    }
}
