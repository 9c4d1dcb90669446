//! The combinability engine: walks Category 10 data strings against a
//! pricing unit or a whole fare path.
//!
//! The engine owns the interpretation of the dataset structure (relational
//! indicators, directionality, minor-overflow runs, negative application)
//! and delegates every table lookup to the [`Collaborators`] seams. Callers
//! hand in a mutable fare-usage arena; the engine writes back end-on-end
//! obligations, keep-fare soft passes, and freshly fetched rule records.

use tracing::debug;

use cat10_model::{
    EngineConfig, FarePath, FareUsageArena, FareUsageId, OpenJawSubtype, PricingUnit, PuKind,
    Result, ValidationOutcome,
};
use cat10_rules::{
    AllSegmentsIndicator, CarrierPreferenceSource, Dataset, EndOnEndTag, MinorClause,
    PermissionTag, Relation, RuleCategory, RuleItem, RuleRecord, RuleRecordSource,
    SalesRestrictionSource,
};

use crate::diag::DiagCollector;
use crate::directionality::{DirectionalityInfo, ValidationScope, direction_matches};
use crate::match_state::{MatchCode, MatchSlot, ValidationElement, ValidationFareComponents};
use crate::scoreboard::{Scoreboard, ScoreboardCheck, is_mirror_image};
use crate::subcat::{MajorRestrictions, MinorMatch, MinorSubCategories, SubCatContext, mark_minor};

/// The lookups and table evaluators the engine is wired to.
pub struct Collaborators<'a> {
    pub records: &'a dyn RuleRecordSource,
    pub sales_restrictions: &'a dyn SalesRestrictionSource,
    pub carrier_preferences: &'a dyn CarrierPreferenceSource,
    pub minor: &'a dyn MinorSubCategories,
    pub major: &'a dyn MajorRestrictions,
}

pub struct CombinabilityEngine<'a> {
    config: EngineConfig,
    collab: Collaborators<'a>,
    scoreboard: Scoreboard,
}

/// Everything one data-string walk needs to know about where it runs.
struct StringScope<'a> {
    source: FareUsageId,
    target_cat: RuleCategory,
    info: DirectionalityInfo,
    pricing_unit: &'a PricingUnit,
    fare_path: Option<&'a FarePath>,
}

struct MinorOutcome {
    passed: bool,
    /// Index of the element a negative-application table matched.
    neg_matched: Option<usize>,
    failed_pair: Option<(FareUsageId, FareUsageId)>,
}

impl<'a> CombinabilityEngine<'a> {
    pub fn new(config: EngineConfig, collab: Collaborators<'a>) -> Self {
        Self {
            config,
            collab,
            scoreboard: Scoreboard,
        }
    }

    /// Validates the fares of one pricing unit against each other.
    pub fn validate_pricing_unit(
        &self,
        pricing_unit: &mut PricingUnit,
        arena: &mut FareUsageArena,
        diag: &mut DiagCollector,
    ) -> Result<ValidationOutcome> {
        debug!(fares = pricing_unit.fare_usages.len(), kind = ?pricing_unit.kind, "validating pricing unit");
        let ids = pricing_unit.fare_usages.clone();
        self.fetch_missing_records(&ids, arena)?;

        if let ScoreboardCheck::Failed(id) =
            self.scoreboard
                .check_pricing_unit(pricing_unit, arena, self.collab.records, diag)?
        {
            debug!(%id, "pricing unit failed header screen");
            return Ok(ValidationOutcome::failed());
        }

        if is_mirror_image(pricing_unit, arena)? && self.mirror_permitted(pricing_unit, arena)? {
            diag.note("MIRROR IMAGE RT");
            return Ok(ValidationOutcome::passed());
        }

        let swapped = self.swap_base_fares(&ids, arena)?;
        let result = self.validate_unit_with_carriers(pricing_unit, arena, diag);
        self.restore_base_fares(&swapped, arena)?;

        let (outcome, soft) = result?;
        if soft {
            pricing_unit.soft_pass_keep_fare = true;
        }
        Ok(outcome)
    }

    /// Validates the end-on-end combination of every pricing unit in the
    /// fare path.
    pub fn validate_fare_path(
        &self,
        fare_path: &mut FarePath,
        arena: &mut FareUsageArena,
        diag: &mut DiagCollector,
    ) -> Result<ValidationOutcome> {
        debug!(units = fare_path.pricing_units.len(), "validating fare path");
        let ids: Vec<FareUsageId> = fare_path.fare_usage_ids().collect();
        self.fetch_missing_records(&ids, arena)?;

        if let ScoreboardCheck::Failed(id) =
            self.scoreboard
                .check_fare_path(fare_path, arena, self.collab.records, diag)?
        {
            debug!(%id, "fare path failed header screen");
            return Ok(ValidationOutcome::failed());
        }

        let swapped = self.swap_base_fares(&ids, arena)?;
        let result = self.validate_path_with_carriers(fare_path, arena, diag);
        self.restore_base_fares(&swapped, arena)?;

        let (outcome, soft_units) = result?;
        for index in soft_units {
            if let Some(unit) = fare_path.pricing_units.get_mut(index) {
                unit.soft_pass_keep_fare = true;
            }
        }
        Ok(outcome)
    }

    /// Carrier-combination check in isolation: walks only the 106 items of
    /// each record's minor clauses. Shopping paths use this to discard
    /// carrier-incompatible combinations before full validation.
    pub fn validate_carrier_combination(
        &self,
        pricing_unit: &PricingUnit,
        arena: &FareUsageArena,
        diag: &mut DiagCollector,
    ) -> Result<ValidationOutcome> {
        for &source in &pricing_unit.fare_usages {
            let fare_usage = arena.get(source)?;
            let Some(record) = fare_usage.rule_record.clone() else {
                diag.note(format!(
                    "NO REC2 CAT10 FOR {}",
                    fare_usage.fare.fare_class
                ));
                return Ok(self.outcome_for_failure(ValidationScope::PricingUnit, None));
            };
            let mut acc = self.populate_unit_accumulator(source, pricing_unit, arena)?;
            if acc.force_pass() {
                continue;
            }
            let ctx = StringScope {
                source,
                target_cat: target_category(pricing_unit.kind),
                info: DirectionalityInfo::pricing_unit(),
                pricing_unit,
                fare_path: None,
            };

            let mut checked = false;
            let mut passed = false;
            for dataset in &record.datasets {
                let Some(minor) = &dataset.minor else { continue };
                for alternative in &minor.alternatives {
                    acc.reset_minor();
                    let mut alternative_ok = true;
                    for item in alternative {
                        if item.category != RuleCategory::Carrier {
                            continue;
                        }
                        checked = true;
                        let matched = self.process_minor_item(item, &ctx, &record, arena, &mut acc)?;
                        if !matched.ok
                            || (!matched.negative && !acc.evaluate(MatchSlot::Carrier))
                        {
                            alternative_ok = false;
                            break;
                        }
                    }
                    if alternative_ok && acc.evaluate(MatchSlot::Carrier) {
                        passed = true;
                        break;
                    }
                }
                if passed {
                    break;
                }
            }
            // A record that never filed a 106 item cannot clear this screen.
            if !checked || !passed {
                diag.note(format!("FAILED CARRIER COMBINATION - {source}"));
                let pair = acc
                    .elements
                    .first()
                    .map(|element| (element.source, element.target));
                return Ok(self.outcome_for_failure(ValidationScope::PricingUnit, pair));
            }
        }
        Ok(ValidationOutcome::passed())
    }

    fn validate_unit_with_carriers(
        &self,
        pricing_unit: &mut PricingUnit,
        arena: &mut FareUsageArena,
        diag: &mut DiagCollector,
    ) -> Result<(ValidationOutcome, bool)> {
        let gate = self.multi_carrier_applies(
            &pricing_unit.fare_usages,
            arena,
            &pricing_unit.validating_carriers,
        )?;
        if !gate {
            return self.validate_unit_once(pricing_unit, arena, None, diag);
        }

        let carriers = pricing_unit.validating_carriers.clone();
        let mut survivors = Vec::new();
        let mut soft = false;
        let mut failures = Vec::new();
        for carrier in &carriers {
            let (outcome, carrier_soft) =
                self.validate_unit_once(pricing_unit, arena, Some(carrier), diag)?;
            soft |= carrier_soft;
            if outcome.is_passed() {
                survivors.push(carrier.clone());
            } else {
                diag.note(format!("FAILED FOR VAL-CXR {carrier}"));
                failures.push(outcome.failed_source.zip(outcome.failed_target));
            }
        }
        if survivors.is_empty() {
            return Ok((collapse_carrier_failures(&failures), soft));
        }
        pricing_unit.validating_carriers = survivors;
        Ok((ValidationOutcome::passed(), soft))
    }

    fn validate_path_with_carriers(
        &self,
        fare_path: &mut FarePath,
        arena: &mut FareUsageArena,
        diag: &mut DiagCollector,
    ) -> Result<(ValidationOutcome, Vec<usize>)> {
        let ids: Vec<FareUsageId> = fare_path.fare_usage_ids().collect();
        let gate = self.multi_carrier_applies(&ids, arena, &fare_path.validating_carriers)?;
        if !gate {
            return self.validate_path_once(fare_path, arena, None, diag);
        }

        let carriers = fare_path.validating_carriers.clone();
        let mut survivors = Vec::new();
        let mut soft_units = Vec::new();
        let mut failures = Vec::new();
        for carrier in &carriers {
            let (outcome, soft) =
                self.validate_path_once(fare_path, arena, Some(carrier), diag)?;
            soft_units.extend(soft);
            if outcome.is_passed() {
                survivors.push(carrier.clone());
            } else {
                diag.note(format!("FAILED FOR VAL-CXR {carrier}"));
                failures.push(outcome.failed_source.zip(outcome.failed_target));
            }
        }
        if survivors.is_empty() {
            return Ok((collapse_carrier_failures(&failures), soft_units));
        }
        fare_path.validating_carriers = survivors;
        Ok((ValidationOutcome::passed(), soft_units))
    }

    fn validate_unit_once(
        &self,
        pricing_unit: &PricingUnit,
        arena: &mut FareUsageArena,
        carrier: Option<&str>,
        diag: &mut DiagCollector,
    ) -> Result<(ValidationOutcome, bool)> {
        let mut soft = false;
        let target_cat = target_category(pricing_unit.kind);

        for &source in &pricing_unit.fare_usages {
            if arena.get(source)?.rule_record.is_none() {
                // Already vetted by the header screen.
                diag.note(format!("SYSTEM ASSUMPTION - {source}"));
                continue;
            }
            let mut acc = self.populate_unit_accumulator(source, pricing_unit, arena)?;
            if acc.force_pass() {
                continue;
            }
            acc.set_validating_carrier(carrier.map(str::to_string));

            let ctx = StringScope {
                source,
                target_cat,
                info: DirectionalityInfo::pricing_unit(),
                pricing_unit,
                fare_path: None,
            };
            let outcome = self.data_string_validation(&ctx, arena, &mut acc, diag)?;
            if !outcome.is_passed() {
                let fare_usage = arena.get_mut(source)?;
                if fare_usage.keep_fare {
                    fare_usage.soft_pass_keep_fare = true;
                    soft = true;
                    diag.note(format!("KEEP FARE SOFT PASS - {source}"));
                    continue;
                }
                // Name the last pair that never cleared its gate.
                let outcome = if outcome.failed_source.is_none() && self.config.reuse_failed_pair_pu
                {
                    match acc.not_passed_pair() {
                        Some((s, t)) => ValidationOutcome::failed_pair(s, t),
                        None => outcome,
                    }
                } else {
                    outcome
                };
                return Ok((outcome, soft));
            }
        }
        Ok((ValidationOutcome::passed(), soft))
    }

    fn validate_path_once(
        &self,
        fare_path: &FarePath,
        arena: &mut FareUsageArena,
        carrier: Option<&str>,
        diag: &mut DiagCollector,
    ) -> Result<(ValidationOutcome, Vec<usize>)> {
        let mut soft_units = Vec::new();

        for (unit_index, pricing_unit) in fare_path.pricing_units.iter().enumerate() {
            for &source in &pricing_unit.fare_usages {
                if arena.get(source)?.rule_record.is_none() {
                    diag.note(format!("SYSTEM ASSUMPTION - {source}"));
                    continue;
                }
                let mut acc =
                    self.populate_path_accumulator(source, unit_index, fare_path, arena)?;
                if acc.force_pass() {
                    continue;
                }
                acc.set_validating_carrier(carrier.map(str::to_string));

                let ctx = StringScope {
                    source,
                    target_cat: RuleCategory::EndOnEnd,
                    info: DirectionalityInfo::fare_path(),
                    pricing_unit,
                    fare_path: Some(fare_path),
                };
                let outcome = self.data_string_validation(&ctx, arena, &mut acc, diag)?;
                if !outcome.is_passed() {
                    let fare_usage = arena.get_mut(source)?;
                    if fare_usage.keep_fare {
                        fare_usage.soft_pass_keep_fare = true;
                        soft_units.push(unit_index);
                        diag.note(format!("KEEP FARE SOFT PASS - {source}"));
                        continue;
                    }
                    // Name the last pair that never cleared its gate.
                    let outcome = if outcome.failed_source.is_none()
                        && self.config.reuse_failed_pair_fp
                    {
                        match acc.not_passed_pair() {
                            Some((s, t)) => ValidationOutcome::failed_pair(s, t),
                            None => outcome,
                        }
                    } else {
                        outcome
                    };
                    return Ok((outcome, soft_units));
                }
            }
        }
        Ok((ValidationOutcome::passed(), soft_units))
    }

    /// The dataset loop: walks the record's data strings for the target
    /// major category until one settles the combination.
    fn data_string_validation(
        &self,
        ctx: &StringScope<'_>,
        arena: &mut FareUsageArena,
        acc: &mut ValidationFareComponents,
        diag: &mut DiagCollector,
    ) -> Result<ValidationOutcome> {
        let Some(record) = arena.get(ctx.source)?.rule_record.clone() else {
            diag.note(format!("SYSTEM ASSUMPTION - {}", ctx.source));
            return Ok(ValidationOutcome::passed());
        };

        match header_tag(&record, ctx.target_cat, ctx.pricing_unit.kind) {
            PermissionTag::Permitted => return Ok(ValidationOutcome::passed()),
            PermissionTag::NotPermitted => {
                diag.note(format!("NOT PERMITTED BY TAG - {}", ctx.source));
                return Ok(self.outcome_for_failure(ctx.info.scope, None));
            }
            PermissionTag::Restrictions => {}
        }
        if record.datasets.is_empty() {
            // Restrictions tag with nothing filed behind it.
            diag.note(format!("RESTRICTION TAG WITHOUT DATA - {}", ctx.source));
            return Ok(self.outcome_for_failure(ctx.info.scope, None));
        }

        let validating_carrier = acc.validating_carrier().map(str::to_string);
        let mut failed_pair: Option<(FareUsageId, FareUsageId)> = None;
        let mut force_failure = false;
        let mut need_then = false;
        let mut any_major_found = false;
        let mut index = 0;

        while index < record.datasets.len() {
            let dataset = &record.datasets[index];
            if index > 0 {
                if acc.need_all_pass_same_major_item() {
                    acc.reset();
                    acc.set_validating_carrier(validating_carrier.clone());
                } else {
                    acc.reset_minor();
                }
            }

            // Contiguous datasets filing the same majors form one
            // minor-overflow run.
            let mut run_end = index + 1;
            if acc.len() > 1 {
                while run_end < record.datasets.len()
                    && dataset.same_major_items(&record.datasets[run_end])
                {
                    run_end += 1;
                }
            }
            let overflow = run_end - index > 1;

            let mut major_found = false;
            let mut skip_dataset = false;
            let mut have_no_match = false;
            let mut gate_settled = false;
            let mut pending_eoe_items: Vec<u32> = Vec::new();

            for (pos, item) in dataset.majors.iter().enumerate() {
                if item.category != ctx.target_cat {
                    if item.relation == Relation::Then {
                        need_then = false;
                    }
                    continue;
                }
                major_found = true;
                any_major_found = true;
                if need_then && item.relation != Relation::Then {
                    force_failure = true;
                    break;
                }
                need_then = false;

                let fare_usage = arena.get(ctx.source)?;
                if !direction_matches(item, fare_usage, &ctx.info) {
                    let next_is_or = dataset
                        .majors
                        .get(pos + 1)
                        .is_some_and(|next| next.relation == Relation::Or);
                    if next_is_or {
                        continue;
                    }
                    skip_dataset = true;
                    break;
                }

                let code = self.process_major_item(item, ctx, &record, arena, acc)?;
                match code {
                    MatchCode::Idle => {
                        let (major_ok, pair) = acc.evaluate_major();
                        if pair.is_some() {
                            failed_pair = pair;
                        }
                        gate_settled = major_ok;
                        if major_ok {
                            have_no_match = false;
                        }
                    }
                    MatchCode::PassComb => {
                        gate_settled = true;
                        have_no_match = false;
                        if ctx.info.scope == ValidationScope::FarePath
                            && item.category == RuleCategory::EndOnEnd
                        {
                            // Written back only once the dataset passes.
                            pending_eoe_items.push(item.item_no);
                        }
                        if let Some(slot) = MatchSlot::major(item.category) {
                            for element in &mut acc.elements {
                                if element.slot(slot) == MatchCode::NotSet {
                                    element.set_slot(slot, MatchCode::PassComb);
                                }
                            }
                        }
                    }
                    MatchCode::StopComb => {
                        let (_, pair) = acc.evaluate_major();
                        failed_pair = pair.or_else(|| {
                            acc.elements
                                .first()
                                .map(|element| (element.source, element.target))
                        });
                        force_failure = true;
                    }
                    MatchCode::FailComb | MatchCode::Abort => {
                        failed_pair = acc
                            .elements
                            .first()
                            .map(|element| (element.source, element.target));
                        force_failure = true;
                    }
                    MatchCode::NoMatch => {
                        let more = dataset.majors[pos + 1..]
                            .iter()
                            .any(|next| next.category == ctx.target_cat);
                        if !more {
                            have_no_match = true;
                            acc.reset_major();
                        }
                    }
                    MatchCode::MajorNoMatch => {
                        if let Some(slot) = MatchSlot::major(item.category)
                            && let Some(element) = acc.elements.first_mut()
                        {
                            element.set_slot(slot, MatchCode::MajorNoMatch);
                        }
                        have_no_match = true;
                    }
                    _ => {}
                }
                if force_failure || gate_settled {
                    // A settled gate makes the remaining OR alternatives moot.
                    break;
                }
            }

            if force_failure {
                break;
            }
            if skip_dataset || !major_found || have_no_match {
                // Minors that matched under a no-match major still demand a
                // THEN-led continuation.
                if have_no_match
                    && !overflow
                    && let Some(minor) = &dataset.minor
                {
                    let outcome = self.process_minor_clause(minor, ctx, &record, arena, acc)?;
                    if outcome.passed || outcome.neg_matched.is_some() {
                        need_then = true;
                    }
                }
                index = if overflow { run_end } else { index + 1 };
                continue;
            }

            let mut minor_ok = true;
            if let Some(minor) = &dataset.minor {
                if overflow {
                    minor_ok = self.process_minor_overflow(
                        &record.datasets[index..run_end],
                        ctx,
                        &record,
                        arena,
                        acc,
                    )?;
                } else {
                    let outcome = self.process_minor_clause(minor, ctx, &record, arena, acc)?;
                    minor_ok = outcome.passed;
                    if let Some(element_index) = outcome.neg_matched {
                        // The prohibition matched: that pair cannot stand.
                        let element = &mut acc.elements[element_index];
                        let pair = (element.source, element.target);
                        if let Some(slot) = MatchSlot::major(ctx.target_cat) {
                            element.set_slot(slot, MatchCode::FailComb);
                        }
                        failed_pair = Some(pair);
                        force_failure = true;
                        break;
                    }
                    if outcome.failed_pair.is_some() {
                        failed_pair = outcome.failed_pair;
                    }
                }
            } else {
                acc.set_minor_pass();
            }

            if minor_ok {
                let (major_ok, pair) = acc.evaluate_major();
                if pair.is_some() {
                    failed_pair = pair;
                }
                if major_ok {
                    if !pending_eoe_items.is_empty() {
                        let fu = arena.get_mut(ctx.source)?;
                        fu.end_on_end_required = true;
                        for item_no in pending_eoe_items {
                            if !fu.passed_end_on_end_items.contains(&item_no) {
                                fu.passed_end_on_end_items.push(item_no);
                            }
                        }
                    }
                    return Ok(ValidationOutcome::passed());
                }
            }
            if dataset.minor.is_some() && minor_ok {
                need_then = true;
            }
            index = if overflow { run_end } else { index + 1 };
        }

        if !any_major_found {
            // Nothing filed for this combination type; it is unrestricted.
            return Ok(ValidationOutcome::passed());
        }
        Ok(self.outcome_for_failure(ctx.info.scope, failed_pair))
    }

    fn process_major_item(
        &self,
        item: &RuleItem,
        ctx: &StringScope<'_>,
        record: &RuleRecord,
        arena: &FareUsageArena,
        acc: &mut ValidationFareComponents,
    ) -> Result<MatchCode> {
        // Item 0 and text-only filings are satisfied without table data;
        // open-jaw text still needs its geography checked.
        if item.item_no == 0 || (item.text_only && item.category != RuleCategory::OpenJaw) {
            if !acc.need_all_pass_same_major_item() {
                let code = if acc.evaluate_major_by_passed_minor() {
                    MatchCode::PassComb
                } else {
                    MatchCode::MajorNoMatch
                };
                return Ok(code);
            }
            return Ok(MatchCode::PassComb);
        }

        let sub_ctx = SubCatContext {
            vendor: &record.vendor,
            item_no: item.item_no,
            scope: ctx.info.scope,
            pricing_unit: ctx.pricing_unit,
            fare_path: ctx.fare_path,
            source: ctx.source,
            arena,
        };

        let code = match (ctx.info.scope, item.category) {
            (ValidationScope::PricingUnit, RuleCategory::OpenJaw) => {
                let tag = match ctx.pricing_unit.kind {
                    PuKind::OpenJaw(OpenJawSubtype::Double) => record.double_open_jaw,
                    _ => record.single_open_jaw,
                };
                match tag {
                    PermissionTag::Permitted => MatchCode::PassComb,
                    PermissionTag::NotPermitted => MatchCode::FailComb,
                    PermissionTag::Restrictions => self.collab.major.open_jaw(&sub_ctx, acc),
                }
            }
            (ValidationScope::PricingUnit, RuleCategory::RoundTrip) => {
                match record.round_trip.combination {
                    PermissionTag::Permitted => MatchCode::PassComb,
                    PermissionTag::NotPermitted => MatchCode::FailComb,
                    PermissionTag::Restrictions => self.collab.major.round_trip(&sub_ctx, acc),
                }
            }
            (ValidationScope::PricingUnit, RuleCategory::CircleTrip) => match record.circle_trip {
                PermissionTag::Permitted => MatchCode::PassComb,
                PermissionTag::NotPermitted => MatchCode::FailComb,
                PermissionTag::Restrictions => self.collab.major.circle_trip(&sub_ctx, acc),
            },
            (ValidationScope::PricingUnit, RuleCategory::AddOn) => MatchCode::PassComb,
            (ValidationScope::FarePath, RuleCategory::EndOnEnd) => match record.end_on_end {
                EndOnEndTag::Permitted | EndOnEndTag::Required => MatchCode::PassComb,
                EndOnEndTag::NotPermitted => MatchCode::StopComb,
                EndOnEndTag::Restrictions => self.collab.major.end_on_end(&sub_ctx, acc),
            },
            (ValidationScope::FarePath, _) => MatchCode::PassComb,
            _ => MatchCode::NoMatch,
        };
        Ok(code)
    }

    fn process_minor_clause(
        &self,
        clause: &MinorClause,
        ctx: &StringScope<'_>,
        record: &RuleRecord,
        arena: &FareUsageArena,
        acc: &mut ValidationFareComponents,
    ) -> Result<MinorOutcome> {
        let mut negative = false;

        for (alt_index, alternative) in clause.alternatives.iter().enumerate() {
            if alt_index > 0 {
                if acc.evaluate_minor() {
                    break;
                }
                acc.reset_minor();
            }
            for item in alternative {
                let matched = self.process_minor_item(item, ctx, record, arena, acc)?;
                negative |= matched.negative;
                if !matched.ok {
                    break;
                }
                if matched.negative {
                    continue;
                }
                if let Some(slot) = MatchSlot::minor(item.category)
                    && !acc.evaluate(slot)
                {
                    if acc.need_all_pass_same_major_item() {
                        // Try the next OR alternative.
                        break;
                    }
                    acc.evaluate_minor();
                }
            }
        }

        if negative {
            if let Some(index) = acc.evaluate_minor_neg_appl() {
                return Ok(MinorOutcome {
                    passed: false,
                    neg_matched: Some(index),
                    failed_pair: None,
                });
            }
            return Ok(MinorOutcome {
                passed: true,
                neg_matched: None,
                failed_pair: None,
            });
        }

        let passed = acc.evaluate_minor();
        let failed_pair = if !passed && ctx.info.scope == ValidationScope::FarePath {
            acc.failed_in_minor()
        } else {
            None
        };
        Ok(MinorOutcome {
            passed,
            neg_matched: None,
            failed_pair,
        })
    }

    /// Qualifies each unfinished element against every minor clause of the
    /// overflow run; one passing clause per element suffices.
    fn process_minor_overflow(
        &self,
        run: &[Dataset],
        ctx: &StringScope<'_>,
        record: &RuleRecord,
        arena: &FareUsageArena,
        acc: &mut ValidationFareComponents,
    ) -> Result<bool> {
        let need_all = acc.need_all_pass_same_major_item();
        let mut any_pass = false;

        for index in 0..acc.len() {
            if acc.elements[index].passed_major {
                continue;
            }
            let mut sub = acc.sub_for_element(index);
            let mut passed = false;
            for dataset in run {
                let Some(minor) = &dataset.minor else { continue };
                sub.reset_minor();
                let outcome = self.process_minor_clause(minor, ctx, record, arena, &mut sub)?;
                if outcome.neg_matched.is_some() {
                    break;
                }
                if outcome.passed {
                    passed = true;
                    break;
                }
            }
            if let Some(element) = sub.elements.pop() {
                acc.elements[index] = element;
            }
            if passed {
                acc.elements[index].passed_minor = true;
                any_pass = true;
            } else if need_all {
                return Ok(false);
            }
        }
        Ok(if need_all { true } else { any_pass })
    }

    fn process_minor_item(
        &self,
        item: &RuleItem,
        ctx: &StringScope<'_>,
        record: &RuleRecord,
        arena: &FareUsageArena,
        acc: &mut ValidationFareComponents,
    ) -> Result<MinorMatch> {
        let Some(slot) = MatchSlot::minor(item.category) else {
            return Ok(MinorMatch::passed());
        };

        let fare_usage = arena.get(ctx.source)?;
        if !direction_matches(item, fare_usage, &ctx.info) {
            mark_minor(acc, slot, MatchCode::NotMatched);
            return Ok(MinorMatch::passed());
        }
        if item.is_always_satisfied() {
            mark_minor(acc, slot, MatchCode::Matched);
            return Ok(MinorMatch::passed());
        }

        if item.category == RuleCategory::Carrier && acc.must_verify_carrier_preference() {
            self.verify_carrier_preference(ctx, arena, acc, slot)?;
        }

        let sub_ctx = SubCatContext {
            vendor: &record.vendor,
            item_no: item.item_no,
            scope: ctx.info.scope,
            pricing_unit: ctx.pricing_unit,
            fare_path: ctx.fare_path,
            source: ctx.source,
            arena,
        };
        let matched = match item.category {
            RuleCategory::Carrier => self.collab.minor.carrier_combination(&sub_ctx, acc),
            RuleCategory::TariffRule => self.collab.minor.tariff_rule(&sub_ctx, acc),
            RuleCategory::FareClassType => self.collab.minor.fare_class_type(&sub_ctx, acc),
            RuleCategory::OpenJawSet => self.collab.minor.open_jaw_set(&sub_ctx, acc),
            other => self.collab.minor.qualifying(other, &sub_ctx, acc),
        };
        Ok(matched)
    }

    /// Fares crossing carriers or vendors must clear the source carrier's
    /// vendor-pair preferences before any 106 table applies.
    fn verify_carrier_preference(
        &self,
        ctx: &StringScope<'_>,
        arena: &FareUsageArena,
        acc: &mut ValidationFareComponents,
        slot: MatchSlot,
    ) -> Result<()> {
        let pairs: Vec<(usize, FareUsageId, FareUsageId)> = acc
            .elements
            .iter()
            .enumerate()
            .filter(|(_, element)| !element.passed_major)
            .map(|(index, element)| (index, element.source, element.target))
            .collect();
        for (index, source, target) in pairs {
            let source_fu = arena.get(source)?;
            let target_fu = arena.get(target)?;
            let permitted = acc.validate_carrier_preference(
                self.collab.carrier_preferences,
                &source_fu.fare,
                source_fu.departure,
                &target_fu.fare,
            );
            if !permitted {
                acc.elements[index].set_slot(slot, MatchCode::NotMatched);
            }
        }
        Ok(())
    }

    fn populate_unit_accumulator(
        &self,
        source: FareUsageId,
        pricing_unit: &PricingUnit,
        arena: &FareUsageArena,
    ) -> Result<ValidationFareComponents> {
        let mut acc = ValidationFareComponents::new();
        let source_fu = arena.get(source)?;
        let mut one_carrier = true;
        let mut one_vendor = true;
        let mut all_public = source_fu.fare.is_public();

        for &target in &pricing_unit.fare_usages {
            if target == source {
                continue;
            }
            let target_fu = arena.get(target)?;
            one_carrier &= target_fu.fare.carrier == source_fu.fare.carrier;
            one_vendor &= target_fu.fare.vendor == source_fu.fare.vendor;
            all_public &= target_fu.fare.is_public();
            acc.elements.push(ValidationElement::new(source, target));
        }
        if acc.is_empty() {
            acc.elements.push(ValidationElement::new(source, source));
            acc.set_force_pass(true);
        }
        acc.set_has_one_carrier(one_carrier);
        acc.set_has_one_vendor(one_vendor);
        acc.set_all_public_fares(all_public);
        Ok(acc)
    }

    fn populate_path_accumulator(
        &self,
        source: FareUsageId,
        unit_index: usize,
        fare_path: &FarePath,
        arena: &FareUsageArena,
    ) -> Result<ValidationFareComponents> {
        let mut acc = ValidationFareComponents::new();
        let source_fu = arena.get(source)?;
        let indicator = source_fu
            .rule_record
            .as_ref()
            .map(|record| all_segments_indicator(record))
            .unwrap_or(AllSegmentsIndicator::Adjacent);

        let mut one_carrier = true;
        let mut one_vendor = true;
        let mut all_public = source_fu.fare.is_public();

        for (index, unit) in fare_path.pricing_units.iter().enumerate() {
            if index == unit_index {
                continue;
            }
            for &target in &unit.fare_usages {
                let target_fu = arena.get(target)?;
                let include = match indicator {
                    AllSegmentsIndicator::AllSegments => true,
                    AllSegmentsIndicator::CommonPoint => source_fu.shares_city_with(target_fu),
                    AllSegmentsIndicator::Adjacent => {
                        source_fu.itin_order.abs_diff(target_fu.itin_order) == 1
                    }
                };
                if !include {
                    continue;
                }
                one_carrier &= target_fu.fare.carrier == source_fu.fare.carrier;
                one_vendor &= target_fu.fare.vendor == source_fu.fare.vendor;
                all_public &= target_fu.fare.is_public();
                acc.elements.push(ValidationElement::new(source, target));
            }
        }
        if acc.is_empty() {
            acc.elements.push(ValidationElement::new(source, source));
            acc.set_force_pass(true);
        }
        if acc.len() > 1 {
            // With several targets, each may satisfy a different 104 item.
            acc.set_need_all_pass_same_major_item(false);
        }
        acc.set_has_one_carrier(one_carrier);
        acc.set_has_one_vendor(one_vendor);
        acc.set_all_public_fares(all_public);
        Ok(acc)
    }

    /// Per-ticketing-carrier validation applies only when the itinerary
    /// carries candidate carriers and some record's category 15 qualifier
    /// validates per carrier.
    fn multi_carrier_applies(
        &self,
        ids: &[FareUsageId],
        arena: &FareUsageArena,
        carriers: &[String],
    ) -> Result<bool> {
        if carriers.is_empty() {
            return Ok(false);
        }
        for &id in ids {
            let fare_usage = arena.get(id)?;
            let Some(record) = &fare_usage.rule_record else {
                continue;
            };
            for item in record.items() {
                if item.category != RuleCategory::SalesRestriction {
                    continue;
                }
                if let Some(row) = self
                    .collab
                    .sales_restrictions
                    .sales_restriction(&record.vendor, item.item_no)
                    && row.validation_indicator.is_some_and(|c| c != ' ')
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn mirror_permitted(
        &self,
        pricing_unit: &PricingUnit,
        arena: &FareUsageArena,
    ) -> Result<bool> {
        for &id in &pricing_unit.fare_usages {
            if let Some(record) = &arena.get(id)?.rule_record
                && !record.round_trip.mirror_image_permitted
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn fetch_missing_records(
        &self,
        ids: &[FareUsageId],
        arena: &mut FareUsageArena,
    ) -> Result<()> {
        for &id in ids {
            let fare_usage = arena.get(id)?;
            if fare_usage.rule_record.is_some() {
                continue;
            }
            let fare = fare_usage.fare.clone();
            if let Some(record) = self.collab.records.rule_record(
                &fare.vendor,
                &fare.carrier,
                fare.rule_tariff,
                &fare.rule_number,
            ) {
                arena.get_mut(id)?.rule_record = Some(record);
            }
        }
        Ok(())
    }

    fn swap_base_fares(
        &self,
        ids: &[FareUsageId],
        arena: &mut FareUsageArena,
    ) -> Result<Vec<FareUsageId>> {
        let mut swapped = Vec::new();
        for &id in ids {
            if arena.get_mut(id)?.swap_to_base_fare() {
                swapped.push(id);
            }
        }
        Ok(swapped)
    }

    fn restore_base_fares(&self, ids: &[FareUsageId], arena: &mut FareUsageArena) -> Result<()> {
        for &id in ids {
            arena.get_mut(id)?.restore_rule_based_fare();
        }
        Ok(())
    }

    fn outcome_for_failure(
        &self,
        scope: ValidationScope,
        pair: Option<(FareUsageId, FareUsageId)>,
    ) -> ValidationOutcome {
        let report = match scope {
            ValidationScope::PricingUnit => self.config.reuse_failed_pair_pu,
            ValidationScope::FarePath => self.config.reuse_failed_pair_fp,
        };
        match pair {
            Some((source, target)) if report => ValidationOutcome::failed_pair(source, target),
            _ => ValidationOutcome::failed(),
        }
    }
}

/// Major category a pricing-unit kind validates against.
fn target_category(kind: PuKind) -> RuleCategory {
    match kind {
        PuKind::RoundTrip => RuleCategory::RoundTrip,
        PuKind::CircleTrip => RuleCategory::CircleTrip,
        PuKind::OpenJaw(_) => RuleCategory::OpenJaw,
        PuKind::OneWay => RuleCategory::EndOnEnd,
    }
}

fn header_tag(record: &RuleRecord, target_cat: RuleCategory, kind: PuKind) -> PermissionTag {
    match target_cat {
        RuleCategory::OpenJaw => match kind {
            PuKind::OpenJaw(OpenJawSubtype::Double) => record.double_open_jaw,
            _ => record.single_open_jaw,
        },
        RuleCategory::RoundTrip => record.round_trip.combination,
        RuleCategory::CircleTrip => record.circle_trip,
        RuleCategory::EndOnEnd => match record.end_on_end {
            EndOnEndTag::Permitted | EndOnEndTag::Required => PermissionTag::Permitted,
            EndOnEndTag::NotPermitted => PermissionTag::NotPermitted,
            EndOnEndTag::Restrictions => PermissionTag::Restrictions,
        },
        _ => PermissionTag::Permitted,
    }
}

/// First 104 item wins for scoping; item 0 and text-only filings open every
/// segment up as a target.
fn all_segments_indicator(record: &RuleRecord) -> AllSegmentsIndicator {
    let mut result = AllSegmentsIndicator::Adjacent;
    for item in record.items() {
        if item.category != RuleCategory::EndOnEnd {
            continue;
        }
        if item.is_always_satisfied() || item.all_segments == AllSegmentsIndicator::AllSegments {
            return AllSegmentsIndicator::AllSegments;
        }
        if item.all_segments == AllSegmentsIndicator::CommonPoint {
            result = AllSegmentsIndicator::CommonPoint;
        }
    }
    result
}

fn collapse_carrier_failures(
    failures: &[Option<(FareUsageId, FareUsageId)>],
) -> ValidationOutcome {
    let Some(&first) = failures.first() else {
        return ValidationOutcome::failed();
    };
    let uniform = failures.iter().all(|pair| *pair == first);
    match first {
        Some((source, target)) if uniform => ValidationOutcome::failed_pair(source, target),
        _ => ValidationOutcome::failed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cat10_model::{Fare, FareDirection, FareUsage, Owrt, TariffVisibility};
    use cat10_rules::{
        Directionality, NoRefData, RoundTripTag, SalesRestriction, build_datasets,
    };

    use crate::subcat::PermissiveTables;

    fn fare(carrier: &str, class: &str, fare_type: &str) -> Fare {
        Fare {
            carrier: carrier.to_string(),
            vendor: "ATP".to_string(),
            fare_class: class.to_string(),
            fare_type: fare_type.to_string(),
            rule_number: "2000".to_string(),
            rule_tariff: 4,
            owrt: Owrt::OneWayMayBeDoubled,
            visibility: TariffVisibility::Public,
        }
    }

    fn usage(fare: Fare, direction: FareDirection, order: u32) -> FareUsage {
        FareUsage::new(fare, direction).with_itin_order(order)
    }

    fn rt_record(raw_sets: Vec<Vec<RuleItem>>) -> Arc<RuleRecord> {
        let mut record = RuleRecord::permissive("ATP");
        record.round_trip = RoundTripTag {
            combination: PermissionTag::Restrictions,
            mirror_image_permitted: false,
        };
        record.datasets = build_datasets(raw_sets).expect("well-formed datasets");
        Arc::new(record)
    }

    fn rt_unit(arena: &mut FareUsageArena, record: &Arc<RuleRecord>) -> PricingUnit {
        let out = arena.insert(
            usage(fare("AA", "YRT", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone()),
        );
        let inb = arena.insert(
            usage(fare("AA", "BRT", "EU"), FareDirection::Inbound, 1)
                .with_rule_record(record.clone()),
        );
        PricingUnit::new(PuKind::RoundTrip, vec![out, inb])
    }

    fn collaborators<'c>(
        minor: &'c dyn MinorSubCategories,
        major: &'c dyn MajorRestrictions,
        sales: &'c dyn SalesRestrictionSource,
    ) -> Collaborators<'c> {
        Collaborators {
            records: &NoRefData,
            sales_restrictions: sales,
            carrier_preferences: &NoRefData,
            minor,
            major,
        }
    }

    #[test]
    fn restriction_dataset_passes_through_tables() {
        let record = rt_record(vec![vec![RuleItem::new(
            RuleCategory::RoundTrip,
            5,
            Relation::Then,
        )]]);
        let mut arena = FareUsageArena::new();
        let mut pu = rt_unit(&mut arena, &record);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
    }

    #[test]
    fn failing_major_table_reports_the_pair() {
        struct HardFail;
        impl MinorSubCategories for HardFail {}
        impl MajorRestrictions for HardFail {
            fn round_trip(
                &self,
                _: &SubCatContext<'_>,
                _: &mut ValidationFareComponents,
            ) -> MatchCode {
                MatchCode::FailComb
            }
        }

        let record = rt_record(vec![vec![RuleItem::new(
            RuleCategory::RoundTrip,
            5,
            Relation::Then,
        )]]);
        let mut arena = FareUsageArena::new();
        let mut pu = rt_unit(&mut arena, &record);

        let tables = HardFail;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());
        assert_eq!(outcome.failed_source, Some(pu.fare_usages[0]));
        assert_eq!(outcome.failed_target, Some(pu.fare_usages[1]));
    }

    /// 108 qualifier that requires source and target fare types to agree.
    struct FareTypeTables;
    impl MinorSubCategories for FareTypeTables {
        fn fare_class_type(
            &self,
            ctx: &SubCatContext<'_>,
            acc: &mut ValidationFareComponents,
        ) -> MinorMatch {
            for element in &mut acc.elements {
                let same = match (ctx.arena.get(element.source), ctx.arena.get(element.target)) {
                    (Ok(source), Ok(target)) => source.fare.fare_type == target.fare.fare_type,
                    _ => false,
                };
                let code = if same {
                    MatchCode::Matched
                } else {
                    MatchCode::NotMatched
                };
                element.set_slot(MatchSlot::FareClassType, code);
            }
            MinorMatch::passed()
        }
    }
    impl MajorRestrictions for FareTypeTables {}

    fn qualified_rt_record() -> Arc<RuleRecord> {
        rt_record(vec![vec![
            RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then),
            RuleItem::new(RuleCategory::FareClassType, 8, Relation::If),
        ]])
    }

    #[test]
    fn minor_qualifier_fails_differing_fare_types() {
        let record = qualified_rt_record();
        let mut arena = FareUsageArena::new();
        let out = arena.insert(
            usage(fare("AA", "YRT", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone()),
        );
        let inb = arena.insert(
            usage(fare("AA", "BRT", "BU"), FareDirection::Inbound, 1)
                .with_rule_record(record.clone()),
        );
        let mut pu = PricingUnit::new(PuKind::RoundTrip, vec![out, inb]);

        let tables = FareTypeTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());
        assert_eq!(outcome.failed_source, Some(out));
        assert_eq!(outcome.failed_target, Some(inb));
    }

    #[test]
    fn minor_qualifier_passes_matching_fare_types() {
        let record = qualified_rt_record();
        let mut arena = FareUsageArena::new();
        let mut pu = rt_unit(&mut arena, &record);

        let tables = FareTypeTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
    }

    #[test]
    fn or_linked_major_retries_other_direction() {
        let record = rt_record(vec![vec![
            RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then)
                .with_directionality(Directionality::Loc1ToLoc2),
            RuleItem::new(RuleCategory::RoundTrip, 6, Relation::Or)
                .with_directionality(Directionality::Loc2ToLoc1),
        ]]);
        let mut arena = FareUsageArena::new();
        let out = arena.insert({
            let mut fu = usage(fare("AA", "YRT", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone());
            fu.record_loc_swapped = true;
            fu
        });
        let inb = arena.insert(
            usage(fare("AA", "BRT", "EU"), FareDirection::Inbound, 1)
                .with_rule_record(record.clone()),
        );
        let mut pu = PricingUnit::new(PuKind::RoundTrip, vec![out, inb]);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
    }

    #[test]
    fn directionality_without_or_fallback_skips_the_dataset() {
        let record = rt_record(vec![vec![
            RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then)
                .with_directionality(Directionality::Loc1ToLoc2),
        ]]);
        let mut arena = FareUsageArena::new();
        let out = arena.insert({
            let mut fu = usage(fare("AA", "YRT", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone());
            fu.record_loc_swapped = true;
            fu
        });
        let inb = arena.insert(
            usage(fare("AA", "BRT", "EU"), FareDirection::Inbound, 1)
                .with_rule_record(record.clone()),
        );
        let mut pu = PricingUnit::new(PuKind::RoundTrip, vec![out, inb]);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());
    }

    #[test]
    fn mirror_image_round_trip_short_circuits() {
        struct NeverCalled;
        impl MinorSubCategories for NeverCalled {}
        impl MajorRestrictions for NeverCalled {
            fn round_trip(
                &self,
                _: &SubCatContext<'_>,
                _: &mut ValidationFareComponents,
            ) -> MatchCode {
                MatchCode::FailComb
            }
        }

        let mut record = RuleRecord::permissive("ATP");
        record.round_trip = RoundTripTag {
            combination: PermissionTag::Restrictions,
            mirror_image_permitted: true,
        };
        record.datasets = build_datasets(vec![vec![RuleItem::new(
            RuleCategory::RoundTrip,
            5,
            Relation::Then,
        )]])
        .expect("well-formed dataset");
        let record = Arc::new(record);

        let mut arena = FareUsageArena::new();
        let mut rt_fare = fare("AA", "YRT", "EU");
        rt_fare.owrt = Owrt::RoundTripMayNotBeHalved;
        let out = arena.insert(
            usage(rt_fare.clone(), FareDirection::Outbound, 0).with_rule_record(record.clone()),
        );
        let inb =
            arena.insert(usage(rt_fare, FareDirection::Inbound, 1).with_rule_record(record));
        let mut pu = PricingUnit::new(PuKind::RoundTrip, vec![out, inb]);

        let tables = NeverCalled;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::enabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
        assert!(diag.contains("MIRROR IMAGE RT"));
    }

    /// Qualifier that refuses one specific validating carrier.
    struct CarrierSensitive;
    impl MinorSubCategories for CarrierSensitive {
        fn qualifying(
            &self,
            category: RuleCategory,
            _: &SubCatContext<'_>,
            acc: &mut ValidationFareComponents,
        ) -> MinorMatch {
            if let Some(slot) = MatchSlot::minor(category) {
                let code = if acc.validating_carrier() == Some("XX") {
                    MatchCode::NotMatched
                } else {
                    MatchCode::Matched
                };
                mark_minor(acc, slot, code);
            }
            MinorMatch::passed()
        }
    }
    impl MajorRestrictions for CarrierSensitive {}

    struct TicketingValidated;
    impl SalesRestrictionSource for TicketingValidated {
        fn sales_restriction(&self, _: &str, _: u32) -> Option<SalesRestriction> {
            Some(SalesRestriction {
                validation_indicator: Some('X'),
            })
        }
    }

    #[test]
    fn failing_validating_carrier_is_removed() {
        let record = rt_record(vec![vec![
            RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then),
            RuleItem::new(RuleCategory::SalesRestriction, 40, Relation::If),
        ]]);
        let mut arena = FareUsageArena::new();
        let mut pu = rt_unit(&mut arena, &record)
            .with_validating_carriers(vec!["XX".to_string(), "YY".to_string()]);

        let tables = CarrierSensitive;
        let sales = TicketingValidated;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &sales),
        );
        let mut diag = DiagCollector::enabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
        assert_eq!(pu.validating_carriers, vec!["YY".to_string()]);
        assert!(diag.contains("FAILED FOR VAL-CXR XX"));
    }

    #[test]
    fn end_on_end_pass_writes_back_obligations() {
        let mut record = RuleRecord::permissive("ATP");
        record.end_on_end = EndOnEndTag::Restrictions;
        record.datasets = build_datasets(vec![vec![RuleItem::new(
            RuleCategory::EndOnEnd,
            7,
            Relation::Then,
        )]])
        .expect("well-formed dataset");
        let record = Arc::new(record);

        let mut arena = FareUsageArena::new();
        let first = arena.insert(
            usage(fare("AA", "Y1", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone()),
        );
        let second = arena.insert(
            usage(fare("AA", "Y2", "EU"), FareDirection::Outbound, 1)
                .with_rule_record(record.clone()),
        );
        let mut path = FarePath::new(vec![
            PricingUnit::new(PuKind::OneWay, vec![first]),
            PricingUnit::new(PuKind::OneWay, vec![second]),
        ]);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_fare_path(&mut path, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());

        let fu = arena.get(first).unwrap();
        assert!(fu.end_on_end_required);
        assert_eq!(fu.passed_end_on_end_items, vec![7]);
    }

    #[test]
    fn carrier_combination_only_walks_106_items() {
        struct No106;
        impl MinorSubCategories for No106 {
            fn carrier_combination(
                &self,
                _: &SubCatContext<'_>,
                acc: &mut ValidationFareComponents,
            ) -> MinorMatch {
                mark_minor(acc, MatchSlot::Carrier, MatchCode::NotMatched);
                MinorMatch::passed()
            }
        }
        impl MajorRestrictions for No106 {}

        let record = rt_record(vec![vec![
            RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then),
            RuleItem::new(RuleCategory::Carrier, 12, Relation::If),
        ]]);
        let mut arena = FareUsageArena::new();
        let pu = rt_unit(&mut arena, &record);

        let tables = No106;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::enabled();
        let outcome = engine
            .validate_carrier_combination(&pu, &arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());
        assert!(diag.contains("FAILED CARRIER COMBINATION"));
    }

    #[test]
    fn keep_fare_downgrades_to_soft_pass() {
        struct HardFail;
        impl MinorSubCategories for HardFail {}
        impl MajorRestrictions for HardFail {
            fn round_trip(
                &self,
                _: &SubCatContext<'_>,
                _: &mut ValidationFareComponents,
            ) -> MatchCode {
                MatchCode::FailComb
            }
        }

        let record = rt_record(vec![vec![RuleItem::new(
            RuleCategory::RoundTrip,
            5,
            Relation::Then,
        )]]);
        let mut arena = FareUsageArena::new();
        let out = arena.insert({
            let mut fu = usage(fare("AA", "YRT", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone());
            fu.keep_fare = true;
            fu
        });
        let inb = arena.insert({
            let mut fu = usage(fare("AA", "BRT", "EU"), FareDirection::Inbound, 1)
                .with_rule_record(record.clone());
            fu.keep_fare = true;
            fu
        });
        let mut pu = PricingUnit::new(PuKind::RoundTrip, vec![out, inb]);

        let tables = HardFail;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::enabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
        assert!(pu.soft_pass_keep_fare);
        assert!(arena.get(out).unwrap().soft_pass_keep_fare);
        assert!(diag.contains("KEEP FARE SOFT PASS"));
    }

    #[test]
    fn unrelated_major_category_passes_the_unit() {
        // A restrictions-tagged record that files only open-jaw data leaves
        // the round trip unrestricted.
        let record = rt_record(vec![vec![RuleItem::new(
            RuleCategory::OpenJaw,
            3,
            Relation::Then,
        )]]);
        let mut arena = FareUsageArena::new();
        let mut pu = rt_unit(&mut arena, &record);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
    }

    #[test]
    fn failed_minor_leaves_no_end_on_end_obligation() {
        let mut record = RuleRecord::permissive("ATP");
        record.end_on_end = EndOnEndTag::Restrictions;
        record.datasets = build_datasets(vec![vec![
            RuleItem::new(RuleCategory::EndOnEnd, 7, Relation::Then),
            RuleItem::new(RuleCategory::FareClassType, 8, Relation::If),
        ]])
        .expect("well-formed dataset");
        let record = Arc::new(record);

        let mut arena = FareUsageArena::new();
        let first = arena.insert(
            usage(fare("AA", "Y1", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone()),
        );
        let second = arena.insert(
            usage(fare("AA", "Y2", "BU"), FareDirection::Outbound, 1)
                .with_rule_record(record.clone()),
        );
        let mut path = FarePath::new(vec![
            PricingUnit::new(PuKind::OneWay, vec![first]),
            PricingUnit::new(PuKind::OneWay, vec![second]),
        ]);

        let tables = FareTypeTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_fare_path(&mut path, &mut arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());

        let fu = arena.get(first).unwrap();
        assert!(!fu.end_on_end_required);
        assert!(fu.passed_end_on_end_items.is_empty());
    }

    #[test]
    fn failed_minor_does_not_demand_then_continuation() {
        let record = rt_record(vec![
            vec![
                RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then),
                RuleItem::new(RuleCategory::FareClassType, 8, Relation::If),
            ],
            vec![RuleItem::new(RuleCategory::RoundTrip, 6, Relation::And)],
        ]);
        let mut arena = FareUsageArena::new();
        let out = arena.insert(
            usage(fare("AA", "YRT", "EU"), FareDirection::Outbound, 0)
                .with_rule_record(record.clone()),
        );
        let inb = arena.insert(
            usage(fare("AA", "BRT", "BU"), FareDirection::Inbound, 1)
                .with_rule_record(record.clone()),
        );
        let mut pu = PricingUnit::new(PuKind::RoundTrip, vec![out, inb]);

        let tables = FareTypeTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
    }

    /// 102 table that finds no match for item 5 and passes any other item.
    struct NoMatchItem5;
    impl MinorSubCategories for NoMatchItem5 {}
    impl MajorRestrictions for NoMatchItem5 {
        fn round_trip(
            &self,
            ctx: &SubCatContext<'_>,
            _: &mut ValidationFareComponents,
        ) -> MatchCode {
            if ctx.item_no == 5 {
                MatchCode::MajorNoMatch
            } else {
                MatchCode::PassComb
            }
        }
    }

    fn no_match_then_record(second_relation: Relation) -> Arc<RuleRecord> {
        rt_record(vec![
            vec![
                RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then),
                RuleItem::new(RuleCategory::FareClassType, 8, Relation::If),
            ],
            vec![RuleItem::new(RuleCategory::RoundTrip, 6, second_relation)],
        ])
    }

    #[test]
    fn no_match_set_with_matched_minor_demands_then_continuation() {
        let record = no_match_then_record(Relation::And);
        let mut arena = FareUsageArena::new();
        let mut pu = rt_unit(&mut arena, &record);

        let tables = NoMatchItem5;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());
    }

    #[test]
    fn no_match_set_accepts_then_led_continuation() {
        let record = no_match_then_record(Relation::Then);
        let mut arena = FareUsageArena::new();
        let mut pu = rt_unit(&mut arena, &record);

        let tables = NoMatchItem5;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_pricing_unit(&mut pu, &mut arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
    }

    #[test]
    fn carrier_combination_fails_without_record() {
        let mut arena = FareUsageArena::new();
        let out = arena.insert(usage(fare("AA", "YRT", "EU"), FareDirection::Outbound, 0));
        let inb = arena.insert(usage(fare("AA", "BRT", "EU"), FareDirection::Inbound, 1));
        let pu = PricingUnit::new(PuKind::RoundTrip, vec![out, inb]);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::enabled();
        let outcome = engine
            .validate_carrier_combination(&pu, &arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());
        assert!(diag.contains("NO REC2 CAT10"));
    }

    #[test]
    fn carrier_combination_fails_without_filed_106() {
        let record = rt_record(vec![vec![RuleItem::new(
            RuleCategory::RoundTrip,
            5,
            Relation::Then,
        )]]);
        let mut arena = FareUsageArena::new();
        let pu = rt_unit(&mut arena, &record);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::enabled();
        let outcome = engine
            .validate_carrier_combination(&pu, &arena, &mut diag)
            .unwrap();
        assert!(!outcome.is_passed());
        assert!(diag.contains("FAILED CARRIER COMBINATION"));
    }

    #[test]
    fn carrier_combination_passes_matched_106() {
        let record = rt_record(vec![vec![
            RuleItem::new(RuleCategory::RoundTrip, 5, Relation::Then),
            RuleItem::new(RuleCategory::Carrier, 12, Relation::If),
        ]]);
        let mut arena = FareUsageArena::new();
        let pu = rt_unit(&mut arena, &record);

        let tables = PermissiveTables;
        let engine = CombinabilityEngine::new(
            EngineConfig::default(),
            collaborators(&tables, &tables, &NoRefData),
        );
        let mut diag = DiagCollector::disabled();
        let outcome = engine
            .validate_carrier_combination(&pu, &arena, &mut diag)
            .unwrap();
        assert!(outcome.is_passed());
    }
}
