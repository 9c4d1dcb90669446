//! Pricing units and fare paths.

use serde::{Deserialize, Serialize};

use crate::arena::FareUsageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenJawSubtype {
    /// Surface break at the origin end.
    Origin,
    /// Surface break at the turnaround end.
    Destination,
    /// Surface breaks at both ends.
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuKind {
    OneWay,
    RoundTrip,
    CircleTrip,
    OpenJaw(OpenJawSubtype),
}

/// A priced pricing unit awaiting combinability validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingUnit {
    pub kind: PuKind,
    pub fare_usages: Vec<FareUsageId>,
    /// Candidate validating carriers; failing carriers are removed during
    /// validation.
    pub validating_carriers: Vec<String>,
    /// Set when a keep-fare component failed rules but was retained.
    pub soft_pass_keep_fare: bool,
}

impl PricingUnit {
    pub fn new(kind: PuKind, fare_usages: Vec<FareUsageId>) -> Self {
        Self {
            kind,
            fare_usages,
            validating_carriers: Vec::new(),
            soft_pass_keep_fare: false,
        }
    }

    pub fn with_validating_carriers(mut self, carriers: Vec<String>) -> Self {
        self.validating_carriers = carriers;
        self
    }

    pub fn contains(&self, id: FareUsageId) -> bool {
        self.fare_usages.contains(&id)
    }
}

/// A complete priced itinerary: the pricing units to be combined end-on-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarePath {
    pub pricing_units: Vec<PricingUnit>,
    pub validating_carriers: Vec<String>,
}

impl FarePath {
    pub fn new(pricing_units: Vec<PricingUnit>) -> Self {
        Self {
            pricing_units,
            validating_carriers: Vec::new(),
        }
    }

    pub fn with_validating_carriers(mut self, carriers: Vec<String>) -> Self {
        self.validating_carriers = carriers;
        self
    }

    pub fn fare_usage_ids(&self) -> impl Iterator<Item = FareUsageId> + '_ {
        self.pricing_units
            .iter()
            .flat_map(|pu| pu.fare_usages.iter().copied())
    }
}
