//! Fares and fare usages as seen by combinability validation.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use cat10_rules::RuleRecord;

/// One-way/round-trip indicator filed on a fare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owrt {
    OneWayMayBeDoubled,
    RoundTripMayNotBeHalved,
    OneWayMayNotBeDoubled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffVisibility {
    Public,
    Private,
}

/// Direction of travel of a fare component within its pricing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FareDirection {
    Outbound,
    Inbound,
}

/// The fare-level attributes combinability validation reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fare {
    pub carrier: String,
    pub vendor: String,
    pub fare_class: String,
    pub fare_type: String,
    pub rule_number: String,
    pub rule_tariff: i32,
    pub owrt: Owrt,
    pub visibility: TariffVisibility,
}

impl Fare {
    pub fn is_public(&self) -> bool {
        self.visibility == TariffVisibility::Public
    }
}

/// A fare applied to a stretch of the itinerary.
///
/// Cross-references between fare usages travel as [`FareUsageId`] arena
/// indices rather than pointers; see [`crate::arena::FareUsageArena`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareUsage {
    pub fare: Fare,
    /// For rule-created fares, the base fare the combinability rules of
    /// which apply. Swapped in for the duration of validation.
    pub base_fare: Option<Fare>,
    pub direction: FareDirection,
    pub board_city: String,
    pub off_city: String,
    /// Position of the first travel segment on the line of flight.
    pub itin_order: u32,
    pub departure: NaiveDate,
    /// Set when the itinerary keeps this fare from a previous pricing.
    pub keep_fare: bool,
    /// The fare's own Category 10 record, when one was retrieved.
    pub rule_record: Option<Arc<RuleRecord>>,
    /// True when the record matched the fare market with its geography
    /// reversed; flips the meaning of the directional labels.
    pub record_loc_swapped: bool,
    /// Written back during fare-path validation: an end-on-end data string
    /// demanded combination for this fare.
    pub end_on_end_required: bool,
    /// Item numbers of the 104 items that passed for this fare.
    pub passed_end_on_end_items: Vec<u32>,
    /// Keep-fare downgrade: rules failed but the fare is retained soft.
    pub soft_pass_keep_fare: bool,
}

impl FareUsage {
    pub fn new(fare: Fare, direction: FareDirection) -> Self {
        Self {
            fare,
            base_fare: None,
            direction,
            board_city: String::new(),
            off_city: String::new(),
            itin_order: 0,
            departure: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default(),
            keep_fare: false,
            rule_record: None,
            record_loc_swapped: false,
            end_on_end_required: false,
            passed_end_on_end_items: Vec::new(),
            soft_pass_keep_fare: false,
        }
    }

    pub fn with_market(mut self, board_city: impl Into<String>, off_city: impl Into<String>) -> Self {
        self.board_city = board_city.into();
        self.off_city = off_city.into();
        self
    }

    pub fn with_itin_order(mut self, itin_order: u32) -> Self {
        self.itin_order = itin_order;
        self
    }

    pub fn with_rule_record(mut self, record: Arc<RuleRecord>) -> Self {
        self.rule_record = Some(record);
        self
    }

    /// Swap a rule-created fare for its base fare. Returns true when a swap
    /// happened so the caller can undo it.
    pub fn swap_to_base_fare(&mut self) -> bool {
        match self.base_fare.take() {
            Some(base) => {
                self.base_fare = Some(std::mem::replace(&mut self.fare, base));
                true
            }
            None => false,
        }
    }

    /// Undo [`Self::swap_to_base_fare`].
    pub fn restore_rule_based_fare(&mut self) {
        if let Some(original) = self.base_fare.take() {
            self.base_fare = Some(std::mem::replace(&mut self.fare, original));
        }
    }

    pub fn shares_city_with(&self, other: &FareUsage) -> bool {
        self.board_city == other.board_city
            || self.board_city == other.off_city
            || self.off_city == other.board_city
            || self.off_city == other.off_city
    }
}
