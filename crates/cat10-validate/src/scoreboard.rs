//! Header-tag pre-validation.
//!
//! Before the engine walks any data string it screens the combination
//! against the record headers alone. Most filings either permit a
//! combination type outright or forbid it outright, so this pass settles
//! the bulk of candidates without touching the dataset tree.

use cat10_model::{
    Cat10Error, FarePath, FareUsageArena, FareUsageId, OpenJawSubtype, Owrt, PricingUnit, PuKind,
    Result,
};
use cat10_rules::{EndOnEndTag, PermissionTag, RuleRecordSource};

use crate::diag::DiagCollector;

/// What the header screen decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreboardCheck {
    /// A header tag forbids the combination; skip the data strings.
    Failed(FareUsageId),
    /// Headers do not settle it; run full dataset validation.
    Continue,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Scoreboard;

impl Scoreboard {
    /// Screens every fare of a pricing unit against its record header.
    pub fn check_pricing_unit(
        &self,
        pricing_unit: &PricingUnit,
        arena: &FareUsageArena,
        records: &dyn RuleRecordSource,
        diag: &mut DiagCollector,
    ) -> Result<ScoreboardCheck> {
        if pricing_unit.fare_usages.is_empty() {
            return Err(Cat10Error::EmptyPricingUnit);
        }

        let mirror = is_mirror_image(pricing_unit, arena)?;

        for &id in &pricing_unit.fare_usages {
            let fare_usage = arena.get(id)?;
            let fare = &fare_usage.fare;
            let record = match &fare_usage.rule_record {
                Some(record) => record.clone(),
                None => match records.rule_record(
                    &fare.vendor,
                    &fare.carrier,
                    fare.rule_tariff,
                    &fare.rule_number,
                ) {
                    Some(record) => record,
                    None => {
                        // No record filed at all: the system assumption
                        // lets a lone fare or a mirror-image round trip
                        // stand on its own.
                        if pricing_unit.fare_usages.len() == 1 || mirror {
                            diag.note(format!("SYSTEM ASSUMPTION - {id}"));
                            continue;
                        }
                        diag.note(format!("NO REC2 CAT10 FOR {}", fare.fare_class));
                        return Ok(ScoreboardCheck::Failed(id));
                    }
                },
            };

            let forbidden = match pricing_unit.kind {
                PuKind::OneWay => false,
                PuKind::RoundTrip => {
                    record.round_trip.combination == PermissionTag::NotPermitted
                        && !(mirror && record.round_trip.mirror_image_permitted)
                }
                PuKind::CircleTrip => record.circle_trip == PermissionTag::NotPermitted,
                PuKind::OpenJaw(subtype) => {
                    let tag = match subtype {
                        OpenJawSubtype::Double => record.double_open_jaw,
                        _ => record.single_open_jaw,
                    };
                    tag == PermissionTag::NotPermitted
                }
            };
            if forbidden {
                diag.note(format!("HEADER TAG NOT PERMITTED - {id}"));
                return Ok(ScoreboardCheck::Failed(id));
            }
        }

        Ok(ScoreboardCheck::Continue)
    }

    /// Screens the fare path's one-way pricing units against the end-on-end
    /// header tags.
    pub fn check_fare_path(
        &self,
        fare_path: &FarePath,
        arena: &FareUsageArena,
        records: &dyn RuleRecordSource,
        diag: &mut DiagCollector,
    ) -> Result<ScoreboardCheck> {
        let single_unit = fare_path.pricing_units.len() == 1;

        for id in fare_path.fare_usage_ids() {
            let fare_usage = arena.get(id)?;
            let fare = &fare_usage.fare;
            let record = match &fare_usage.rule_record {
                Some(record) => record.clone(),
                None => match records.rule_record(
                    &fare.vendor,
                    &fare.carrier,
                    fare.rule_tariff,
                    &fare.rule_number,
                ) {
                    Some(record) => record,
                    None => {
                        diag.note(format!("SYSTEM ASSUMPTION - {id}"));
                        continue;
                    }
                },
            };

            match record.end_on_end {
                EndOnEndTag::Required if single_unit => {
                    // The fare demands an end-on-end combination that this
                    // path cannot provide.
                    diag.note(format!("END-ON-END REQUIRED - {id}"));
                    return Ok(ScoreboardCheck::Failed(id));
                }
                EndOnEndTag::NotPermitted if !single_unit => {
                    diag.note(format!("END-ON-END NOT PERMITTED - {id}"));
                    return Ok(ScoreboardCheck::Failed(id));
                }
                _ => {}
            }
        }

        Ok(ScoreboardCheck::Continue)
    }
}

/// A mirror-image round trip: two halves of the same round-trip fare.
pub fn is_mirror_image(pricing_unit: &PricingUnit, arena: &FareUsageArena) -> Result<bool> {
    if pricing_unit.kind != PuKind::RoundTrip || pricing_unit.fare_usages.len() != 2 {
        return Ok(false);
    }
    let out = arena.get(pricing_unit.fare_usages[0])?;
    let inb = arena.get(pricing_unit.fare_usages[1])?;
    Ok(out.fare.owrt == Owrt::RoundTripMayNotBeHalved
        && inb.fare.owrt == Owrt::RoundTripMayNotBeHalved
        && out.fare.fare_class == inb.fare.fare_class
        && out.fare.carrier == inb.fare.carrier
        && out.fare.rule_number == inb.fare.rule_number
        && out.fare.rule_tariff == inb.fare.rule_tariff)
}
