//! Reference-data boundary: the lookups the engine consumes but does not
//! implement. Production wiring backs these with table storage; tests back
//! them with in-memory maps.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::RuleRecord;

/// Category 15 sales-restriction table row, reduced to the fields the
/// combinability engine inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRestriction {
    /// Non-blank when the restriction validates per ticketing carrier.
    pub validation_indicator: Option<char>,
}

/// One vendor-pair row of a carrier's combinability preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCrossRef {
    pub vendor_a: String,
    pub vendor_b: String,
}

/// Carrier preference record: which vendor pairs the carrier allows its
/// fares to be combined across.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarrierPreference {
    pub permitted_vendor_pairs: Vec<VendorCrossRef>,
}

impl CarrierPreference {
    pub fn permits(&self, vendor_a: &str, vendor_b: &str) -> bool {
        self.permitted_vendor_pairs.iter().any(|pair| {
            (pair.vendor_a == vendor_a && pair.vendor_b == vendor_b)
                || (pair.vendor_a == vendor_b && pair.vendor_b == vendor_a)
        })
    }
}

/// Supplies Category 10 rule records for fares that were priced without one.
pub trait RuleRecordSource {
    fn rule_record(
        &self,
        vendor: &str,
        carrier: &str,
        rule_tariff: i32,
        rule_number: &str,
    ) -> Option<Arc<RuleRecord>>;
}

/// Supplies Category 15 sales-restriction rows referenced by data strings.
pub trait SalesRestrictionSource {
    fn sales_restriction(&self, vendor: &str, item_no: u32) -> Option<SalesRestriction>;
}

/// Supplies carrier combinability preferences.
pub trait CarrierPreferenceSource {
    fn carrier_preference(
        &self,
        carrier: &str,
        travel_date: NaiveDate,
    ) -> Option<Arc<CarrierPreference>>;
}

/// Empty reference data; every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRefData;

impl RuleRecordSource for NoRefData {
    fn rule_record(&self, _: &str, _: &str, _: i32, _: &str) -> Option<Arc<RuleRecord>> {
        None
    }
}

impl SalesRestrictionSource for NoRefData {
    fn sales_restriction(&self, _: &str, _: u32) -> Option<SalesRestriction> {
        None
    }
}

impl CarrierPreferenceSource for NoRefData {
    fn carrier_preference(&self, _: &str, _: NaiveDate) -> Option<Arc<CarrierPreference>> {
        None
    }
}
