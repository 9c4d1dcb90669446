//! Individual Category 10 rule items as filed inside a record's data strings.

use serde::{Deserialize, Serialize};

/// Sub-categories that may appear in a Category 10 data string.
///
/// 101-105 are the major combinability sub-categories, 106-109 the minor
/// (qualifying) ones, and the small numbers are the fare-rule categories a
/// data string may reference as additional qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleCategory {
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
    AddOn,
    Carrier,
    TariffRule,
    FareClassType,
    OpenJawSet,
}

impl RuleCategory {
    /// Maps the filed category number to its variant.
    pub fn from_number(number: u16) -> Option<Self> {
        match number {
            1 => Some(Self::Eligibility),
            4 => Some(Self::FlightApplication),
            6 => Some(Self::MinimumStay),
            7 => Some(Self::MaximumStay),
            14 => Some(Self::TravelRestriction),
            15 => Some(Self::SalesRestriction),
            101 => Some(Self::OpenJaw),
            102 => Some(Self::RoundTrip),
            103 => Some(Self::CircleTrip),
            104 => Some(Self::EndOnEnd),
            105 => Some(Self::AddOn),
            106 => Some(Self::Carrier),
            107 => Some(Self::TariffRule),
            108 => Some(Self::FareClassType),
            109 => Some(Self::OpenJawSet),
            _ => None,
        }
    }

    pub fn number(self) -> u16 {
        match self {
            Self::Eligibility => 1,
            Self::FlightApplication => 4,
            Self::MinimumStay => 6,
            Self::MaximumStay => 7,
            Self::TravelRestriction => 14,
            Self::SalesRestriction => 15,
            Self::OpenJaw => 101,
            Self::RoundTrip => 102,
            Self::CircleTrip => 103,
            Self::EndOnEnd => 104,
            Self::AddOn => 105,
            Self::Carrier => 106,
            Self::TariffRule => 107,
            Self::FareClassType => 108,
            Self::OpenJawSet => 109,
        }
    }

    /// True for 101-105, the sub-categories that gate a combination type.
    pub fn is_major(self) -> bool {
        matches!(
            self,
            Self::OpenJaw | Self::RoundTrip | Self::CircleTrip | Self::EndOnEnd | Self::AddOn
        )
    }
}

/// Relational indicator linking an item to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Then,
    If,
    Or,
    And,
}

/// Directional restriction filed on an item.
///
/// `Loc1ToLoc2`/`Loc2ToLoc1` are interpreted against the pricing-unit
/// reference points, `OriginLoc1`/`OriginLoc2` against the fare-path origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directionality {
    Unrestricted,
    Loc1ToLoc2,
    Loc2ToLoc1,
    OriginLoc1,
    OriginLoc2,
}

/// Inbound/outbound gate filed on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InOut {
    Always,
    Outbound,
    Inbound,
}

/// End-on-end target scoping, filed on 104 items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllSegmentsIndicator {
    /// Every fare component of every other pricing unit is a target.
    AllSegments,
    /// Targets must share a board or off city with the source.
    CommonPoint,
    /// Targets must be adjacent on the line of flight.
    Adjacent,
}

/// One item of a Category 10 data string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleItem {
    pub category: RuleCategory,
    /// Table item number; 0 marks an always-satisfied item.
    pub item_no: u32,
    pub relation: Relation,
    pub directionality: Directionality,
    pub in_out: InOut,
    /// Free-text-only filing, satisfied without table lookup.
    pub text_only: bool,
    /// Only meaningful on end-on-end items.
    pub all_segments: AllSegmentsIndicator,
}

impl RuleItem {
    pub fn new(category: RuleCategory, item_no: u32, relation: Relation) -> Self {
        Self {
            category,
            item_no,
            relation,
            directionality: Directionality::Unrestricted,
            in_out: InOut::Always,
            text_only: false,
            all_segments: AllSegmentsIndicator::Adjacent,
        }
    }

    pub fn with_directionality(mut self, directionality: Directionality) -> Self {
        self.directionality = directionality;
        self
    }

    pub fn with_in_out(mut self, in_out: InOut) -> Self {
        self.in_out = in_out;
        self
    }

    pub fn with_all_segments(mut self, all_segments: AllSegmentsIndicator) -> Self {
        self.all_segments = all_segments;
        self
    }

    pub fn text_only(mut self) -> Self {
        self.text_only = true;
        self
    }

    /// Satisfied without consulting any table data.
    pub fn is_always_satisfied(&self) -> bool {
        self.item_no == 0 || self.text_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_numbers_round_trip() {
        for number in [1u16, 4, 6, 7, 14, 15, 101, 102, 103, 104, 105, 106, 107, 108, 109] {
            let category = RuleCategory::from_number(number).expect("known category");
            assert_eq!(category.number(), number);
        }
        assert!(RuleCategory::from_number(10).is_none());
    }

    #[test]
    fn major_split() {
        assert!(RuleCategory::EndOnEnd.is_major());
        assert!(!RuleCategory::Carrier.is_major());
        assert!(!RuleCategory::SalesRestriction.is_major());
    }

    #[test]
    fn always_satisfied_items() {
        let zero = RuleItem::new(RuleCategory::RoundTrip, 0, Relation::Then);
        assert!(zero.is_always_satisfied());
        let text = RuleItem::new(RuleCategory::RoundTrip, 88, Relation::Then).text_only();
        assert!(text.is_always_satisfied());
        let tabled = RuleItem::new(RuleCategory::RoundTrip, 88, Relation::Then);
        assert!(!tabled.is_always_satisfied());
    }
}
