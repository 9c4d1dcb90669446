//! Per-pair match state for one source fare usage.
//!
//! A [`ValidationFareComponents`] accumulator holds one
//! [`ValidationElement`] per source/target pair. Sub-category evaluators
//! write slot codes; the aggregation methods fold them into per-element
//! minor/major pass bits and an overall answer.

use std::sync::Arc;

use cat10_model::{Fare, FareUsageId};
use cat10_rules::{CarrierPreference, CarrierPreferenceSource, RuleCategory};
use chrono::NaiveDate;

/// Result and match codes stored in the accumulator slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchCode {
    #[default]
    NotSet,
    /// Minor item matched the pair.
    Matched,
    /// Minor item did not match the pair.
    NotMatched,
    /// Major restriction passed.
    PassComb,
    /// Major restriction failed hard; stop scanning datasets.
    FailComb,
    /// Major restriction did not apply to this pair.
    NoMatch,
    /// Major restriction table matched but its conditions failed.
    MajorNoMatch,
    /// Fatal failure; no later dataset may rescue the combination.
    StopComb,
    /// Data error in the rule filing.
    Abort,
    /// Restriction processed per element; aggregate to find the answer.
    Idle,
}

/// Accumulator slot, one per sub-category the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSlot {
    Carrier,
    TariffRule,
    FareClassType,
    OpenJawSet,
    Eligibility,
    FlightApplication,
    MinimumStay,
    MaximumStay,
    TravelRestriction,
    SalesRestriction,
    OpenJaw,
    RoundTrip,
    CircleTrip,
    EndOnEnd,
}

impl MatchSlot {
    pub const COUNT: usize = 14;
    const MINOR: std::ops::Range<usize> = 0..10;
    const MAJOR: std::ops::Range<usize> = 10..14;

    fn index(self) -> usize {
        match self {
            Self::Carrier => 0,
            Self::TariffRule => 1,
            Self::FareClassType => 2,
            Self::OpenJawSet => 3,
            Self::Eligibility => 4,
            Self::FlightApplication => 5,
            Self::MinimumStay => 6,
            Self::MaximumStay => 7,
            Self::TravelRestriction => 8,
            Self::SalesRestriction => 9,
            Self::OpenJaw => 10,
            Self::RoundTrip => 11,
            Self::CircleTrip => 12,
            Self::EndOnEnd => 13,
        }
    }

    /// Slot for a minor (qualifying) category.
    pub fn minor(category: RuleCategory) -> Option<Self> {
        match category {
            RuleCategory::Carrier => Some(Self::Carrier),
            RuleCategory::TariffRule => Some(Self::TariffRule),
            RuleCategory::FareClassType => Some(Self::FareClassType),
            RuleCategory::OpenJawSet => Some(Self::OpenJawSet),
            RuleCategory::Eligibility => Some(Self::Eligibility),
            RuleCategory::FlightApplication => Some(Self::FlightApplication),
            RuleCategory::MinimumStay => Some(Self::MinimumStay),
            RuleCategory::MaximumStay => Some(Self::MaximumStay),
            RuleCategory::TravelRestriction => Some(Self::TravelRestriction),
            RuleCategory::SalesRestriction => Some(Self::SalesRestriction),
            _ => None,
        }
    }

    /// Slot for a major category; 105 carries no restrictions and has none.
    pub fn major(category: RuleCategory) -> Option<Self> {
        match category {
            RuleCategory::OpenJaw => Some(Self::OpenJaw),
            RuleCategory::RoundTrip => Some(Self::RoundTrip),
            RuleCategory::CircleTrip => Some(Self::CircleTrip),
            RuleCategory::EndOnEnd => Some(Self::EndOnEnd),
            _ => None,
        }
    }
}

/// Match state for one source/target fare-usage pair.
#[derive(Debug, Clone)]
pub struct ValidationElement {
    pub source: FareUsageId,
    pub target: FareUsageId,
    pub passed_minor: bool,
    pub passed_major: bool,
    slots: [MatchCode; MatchSlot::COUNT],
}

impl ValidationElement {
    pub fn new(source: FareUsageId, target: FareUsageId) -> Self {
        Self {
            source,
            target,
            passed_minor: false,
            passed_major: false,
            slots: [MatchCode::NotSet; MatchSlot::COUNT],
        }
    }

    pub fn initialize(&mut self, source: FareUsageId, target: FareUsageId) {
        self.source = source;
        self.target = target;
        self.reset();
    }

    pub fn slot(&self, slot: MatchSlot) -> MatchCode {
        self.slots[slot.index()]
    }

    pub fn set_slot(&mut self, slot: MatchSlot, code: MatchCode) {
        self.slots[slot.index()] = code;
    }

    /// Clears every slot and both pass bits.
    pub fn reset(&mut self) {
        self.reset_all();
        self.passed_major = false;
    }

    /// Clears every slot and the minor pass bit, leaving the major bit.
    pub fn reset_all(&mut self) {
        self.slots = [MatchCode::NotSet; MatchSlot::COUNT];
        self.passed_minor = false;
    }

    /// Folds the minor slots: every one must be other than `NotMatched`.
    pub fn set_pass_minor(&mut self) {
        self.passed_minor = self.slots[MatchSlot::MINOR]
            .iter()
            .all(|code| *code != MatchCode::NotMatched);
    }

    /// Folds the major slots: none may be `FailComb`, `Abort`, or
    /// `MajorNoMatch`.
    pub fn set_pass_major(&mut self) {
        self.passed_major = self.slots[MatchSlot::MAJOR].iter().all(|code| {
            !matches!(
                code,
                MatchCode::FailComb | MatchCode::Abort | MatchCode::MajorNoMatch
            )
        });
    }
}

/// The accumulator for one source fare usage against its targets.
#[derive(Debug, Clone, Default)]
pub struct ValidationFareComponents {
    pub elements: Vec<ValidationElement>,
    force_pass: bool,
    has_one_carrier: bool,
    has_one_vendor: bool,
    all_public_fares: bool,
    need_all_pass_same_major_item: bool,
    any_passed_minor: bool,
    validating_carrier: Option<String>,
    carrier_pref: Option<Arc<CarrierPreference>>,
}

impl ValidationFareComponents {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            force_pass: false,
            has_one_carrier: true,
            has_one_vendor: true,
            all_public_fares: false,
            need_all_pass_same_major_item: true,
            any_passed_minor: false,
            validating_carrier: None,
            carrier_pref: None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn force_pass(&self) -> bool {
        self.force_pass
    }

    pub fn set_force_pass(&mut self, flag: bool) {
        self.force_pass = flag;
    }

    pub fn has_one_carrier(&self) -> bool {
        self.has_one_carrier
    }

    pub fn set_has_one_carrier(&mut self, flag: bool) {
        self.has_one_carrier = flag;
    }

    pub fn has_one_vendor(&self) -> bool {
        self.has_one_vendor
    }

    pub fn set_has_one_vendor(&mut self, flag: bool) {
        self.has_one_vendor = flag;
    }

    pub fn all_public_fares(&self) -> bool {
        self.all_public_fares
    }

    pub fn set_all_public_fares(&mut self, flag: bool) {
        self.all_public_fares = flag;
    }

    pub fn need_all_pass_same_major_item(&self) -> bool {
        self.need_all_pass_same_major_item
    }

    pub fn set_need_all_pass_same_major_item(&mut self, flag: bool) {
        self.need_all_pass_same_major_item = flag;
    }

    pub fn any_passed_minor(&self) -> bool {
        self.any_passed_minor
    }

    pub fn set_any_passed_minor(&mut self, flag: bool) {
        self.any_passed_minor = flag;
    }

    pub fn validating_carrier(&self) -> Option<&str> {
        self.validating_carrier.as_deref()
    }

    pub fn set_validating_carrier(&mut self, carrier: Option<String>) {
        self.validating_carrier = carrier;
    }

    /// One preference verification is needed only when fares cross carriers
    /// or vendors.
    pub fn must_verify_carrier_preference(&self) -> bool {
        !self.has_one_carrier || !self.has_one_vendor
    }

    pub fn reset_carrier_pref(&mut self) {
        self.has_one_carrier = true;
        self.has_one_vendor = true;
        self.all_public_fares = true;
        self.carrier_pref = None;
    }

    /// Clears every element plus the carrier context.
    pub fn reset(&mut self) {
        for element in &mut self.elements {
            element.reset();
        }
        self.any_passed_minor = false;
        self.validating_carrier = None;
    }

    /// Clears minor state on every element, leaving major pass bits.
    pub fn reset_minor(&mut self) {
        for element in &mut self.elements {
            element.reset_all();
        }
        self.any_passed_minor = false;
    }

    /// Clears major state ahead of the next end-on-end item.
    pub fn reset_major(&mut self) {
        self.any_passed_minor = false;
        for element in &mut self.elements {
            if !self.need_all_pass_same_major_item {
                if !element.passed_major {
                    element.reset();
                }
                continue;
            }
            element.set_slot(MatchSlot::EndOnEnd, MatchCode::NotSet);
        }
    }

    /// Marks the minor clause satisfied for every unfinished element;
    /// used when a dataset has no minor clause at all.
    pub fn set_minor_pass(&mut self) {
        for element in &mut self.elements {
            if !element.passed_major {
                element.passed_minor = true;
            }
        }
    }

    /// No element may carry `NotMatched` in the given slot.
    pub fn evaluate(&self, slot: MatchSlot) -> bool {
        if self.force_pass {
            return true;
        }
        self.elements
            .iter()
            .all(|element| element.slot(slot) != MatchCode::NotMatched)
    }

    /// Folds minor results. With `need_all_pass_same_major_item` every
    /// element must pass; otherwise one passing unfinished element is
    /// progress.
    pub fn evaluate_minor(&mut self) -> bool {
        if self.force_pass {
            return true;
        }

        if !self.need_all_pass_same_major_item {
            self.any_passed_minor = false;
            for element in &mut self.elements {
                if element.passed_major {
                    continue;
                }
                element.set_pass_minor();
                if element.passed_minor {
                    self.any_passed_minor = true;
                }
            }
            return self.any_passed_minor;
        }

        for element in &mut self.elements {
            element.set_pass_minor();
            if !element.passed_minor {
                return false;
            }
        }
        true
    }

    /// Negative-application rescue: the prohibition applies only to the
    /// element(s) the table matched. Returns the first matched element so
    /// the major evaluation can fail that pair specifically.
    pub fn evaluate_minor_neg_appl(&mut self) -> Option<usize> {
        if self.force_pass {
            return None;
        }
        for (index, element) in self.elements.iter_mut().enumerate() {
            element.set_pass_minor();
            if element.passed_minor {
                return Some(index);
            }
        }
        None
    }

    /// First element whose minor and major both failed; feeds the failed
    /// pair at fare-path scope.
    pub fn failed_in_minor(&mut self) -> Option<(FareUsageId, FareUsageId)> {
        if self.force_pass {
            return None;
        }
        for element in &mut self.elements {
            element.set_pass_minor();
            if !element.passed_minor && !element.passed_major {
                return Some((element.source, element.target));
            }
        }
        None
    }

    /// Folds major results across elements, recording the failed pair when
    /// a restriction slot failed outright.
    pub fn evaluate_major(&mut self) -> (bool, Option<(FareUsageId, FareUsageId)>) {
        if self.force_pass {
            return (true, None);
        }

        let mut result = true;
        let mut pair = None;
        let need_all = self.need_all_pass_same_major_item;

        for element in &mut self.elements {
            if element.passed_major {
                continue;
            }
            if !need_all && !element.passed_minor {
                // can wait for the next major item
                result = false;
                continue;
            }
            element.set_pass_major();
            if !element.passed_major {
                result = false;
                let hard = [MatchSlot::OpenJaw, MatchSlot::CircleTrip]
                    .iter()
                    .any(|slot| {
                        matches!(
                            element.slot(*slot),
                            MatchCode::FailComb | MatchCode::Abort | MatchCode::MajorNoMatch
                        )
                    })
                    || matches!(
                        element.slot(MatchSlot::EndOnEnd),
                        MatchCode::FailComb | MatchCode::Abort
                    );
                if hard {
                    pair = Some((element.source, element.target));
                }
            }
        }
        (result, pair)
    }

    /// An always-satisfied major item folds each element's slots; an
    /// element whose slots already hard-failed is rescued only by an
    /// actual minor pass.
    pub fn evaluate_major_by_passed_minor(&mut self) -> bool {
        if self.force_pass {
            return true;
        }

        let mut result = true;
        for element in &mut self.elements {
            element.set_pass_major();
            if !element.passed_major {
                element.passed_major = element.passed_minor;
                if !element.passed_major {
                    result = false;
                }
            }
        }
        result
    }

    /// Last element whose major gate never passed; names the unfinished
    /// end-on-end pair.
    pub fn not_passed_pair(&self) -> Option<(FareUsageId, FareUsageId)> {
        self.elements
            .iter()
            .rev()
            .find(|element| !element.passed_major)
            .map(|element| (element.source, element.target))
    }

    /// Detaches one element into a single-element accumulator so a
    /// minor-overflow run can qualify it in isolation. Carrier context is
    /// carried over; the element's slots are cleared.
    pub fn sub_for_element(&self, index: usize) -> Self {
        let mut sub = Self::new();
        sub.has_one_carrier = self.has_one_carrier;
        sub.has_one_vendor = self.has_one_vendor;
        sub.all_public_fares = self.all_public_fares;
        sub.validating_carrier = self.validating_carrier.clone();
        sub.carrier_pref = self.carrier_pref.clone();
        if let Some(element) = self.elements.get(index) {
            let mut element = element.clone();
            element.reset_all();
            sub.elements.push(element);
        }
        sub
    }

    /// Checks the source carrier's vendor-pair preferences against the
    /// target fare. The preference table is fetched once per accumulator.
    pub fn validate_carrier_preference(
        &mut self,
        lookup: &dyn CarrierPreferenceSource,
        source_fare: &Fare,
        source_departure: NaiveDate,
        target_fare: &Fare,
    ) -> bool {
        if self.carrier_pref.is_none() {
            self.carrier_pref = lookup.carrier_preference(&source_fare.carrier, source_departure);
        }
        match &self.carrier_pref {
            Some(pref) => pref.permits(&source_fare.vendor, &target_fare.vendor),
            None => false,
        }
    }
}
