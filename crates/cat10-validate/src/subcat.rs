//! Sub-category evaluator seams.
//!
//! The engine interprets the data-string structure; the per-table checks
//! (carrier combinations, open-jaw sets, tariff/rule, fare class/type, the
//! qualifying fare-rule categories, and the major restriction tables) live
//! behind these traits. Production wiring supplies table-backed
//! implementations; [`PermissiveTables`] passes everything and is the
//! default for rules whose tables are not loaded.

use cat10_model::{FarePath, FareUsageArena, FareUsageId, PricingUnit};
use cat10_rules::RuleCategory;

use crate::directionality::ValidationScope;
use crate::match_state::{MatchCode, MatchSlot, ValidationFareComponents};

/// Everything a table evaluator may inspect. Fare usages are reached
/// read-only through the arena.
#[derive(Clone, Copy)]
pub struct SubCatContext<'a> {
    pub vendor: &'a str,
    pub item_no: u32,
    pub scope: ValidationScope,
    pub pricing_unit: &'a PricingUnit,
    pub fare_path: Option<&'a FarePath>,
    pub source: FareUsageId,
    pub arena: &'a FareUsageArena,
}

/// Outcome of one minor-table evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinorMatch {
    /// False on a data error or a table the pair could not satisfy at all.
    pub ok: bool,
    /// The table applies negatively; a matched element is prohibited.
    pub negative: bool,
}

impl MinorMatch {
    pub fn passed() -> Self {
        Self {
            ok: true,
            negative: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            ok: false,
            negative: false,
        }
    }
}

/// Writes a minor slot code on every element still in play.
pub fn mark_minor(acc: &mut ValidationFareComponents, slot: MatchSlot, code: MatchCode) {
    let skip_passed = !acc.need_all_pass_same_major_item();
    for element in &mut acc.elements {
        if skip_passed && element.passed_major {
            continue;
        }
        element.set_slot(slot, code);
    }
}

/// Minor (qualifying) sub-category tables: 106-109 plus the fare-rule
/// categories a data string may reference.
pub trait MinorSubCategories {
    /// Carrier combination table (106).
    fn carrier_combination(
        &self,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MinorMatch {
        mark_minor(acc, MatchSlot::Carrier, MatchCode::Matched);
        MinorMatch::passed()
    }

    /// Open-jaw set table (109).
    fn open_jaw_set(
        &self,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MinorMatch {
        mark_minor(acc, MatchSlot::OpenJawSet, MatchCode::Matched);
        MinorMatch::passed()
    }

    /// Tariff/rule combination table (107).
    fn tariff_rule(
        &self,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MinorMatch {
        mark_minor(acc, MatchSlot::TariffRule, MatchCode::Matched);
        MinorMatch::passed()
    }

    /// Fare class/type combination table (108).
    fn fare_class_type(
        &self,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MinorMatch {
        mark_minor(acc, MatchSlot::FareClassType, MatchCode::Matched);
        MinorMatch::passed()
    }

    /// Qualifying fare-rule categories 1, 4, 6, 7, 14, 15.
    fn qualifying(
        &self,
        category: RuleCategory,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MinorMatch {
        if let Some(slot) = MatchSlot::minor(category) {
            mark_minor(acc, slot, MatchCode::Matched);
        }
        MinorMatch::passed()
    }
}

/// Major restriction tables 101-104.
pub trait MajorRestrictions {
    fn open_jaw(&self, _ctx: &SubCatContext<'_>, acc: &mut ValidationFareComponents) -> MatchCode {
        pass_first(acc, MatchSlot::OpenJaw);
        MatchCode::PassComb
    }

    fn round_trip(
        &self,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MatchCode {
        pass_first(acc, MatchSlot::RoundTrip);
        MatchCode::PassComb
    }

    fn circle_trip(
        &self,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MatchCode {
        pass_first(acc, MatchSlot::CircleTrip);
        MatchCode::PassComb
    }

    /// End-on-end table (104); evaluated per element at fare-path scope.
    fn end_on_end(
        &self,
        _ctx: &SubCatContext<'_>,
        acc: &mut ValidationFareComponents,
    ) -> MatchCode {
        for element in &mut acc.elements {
            if !element.passed_major {
                element.set_slot(MatchSlot::EndOnEnd, MatchCode::PassComb);
            }
        }
        MatchCode::PassComb
    }
}

fn pass_first(acc: &mut ValidationFareComponents, slot: MatchSlot) {
    if let Some(element) = acc.elements.first_mut() {
        element.set_slot(slot, MatchCode::PassComb);
    }
}

/// Passes every table check. Stands in where table data is out of scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveTables;

impl MinorSubCategories for PermissiveTables {}
impl MajorRestrictions for PermissiveTables {}
