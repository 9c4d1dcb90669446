//! Tagged rule tree: the record's data strings pre-split into datasets with
//! their major items and minor clause separated at load time, so evaluation
//! never re-parses relational indicators.

use serde::{Deserialize, Serialize};

use crate::error::RuleTreeError;
use crate::item::{Relation, RuleItem};

/// Minor clause of a dataset: the qualifying items after the IF marker,
/// split into OR alternatives. Items inside one alternative are AND-linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinorClause {
    pub alternatives: Vec<Vec<RuleItem>>,
}

impl MinorClause {
    pub fn is_empty(&self) -> bool {
        self.alternatives.iter().all(Vec::is_empty)
    }
}

/// One dataset of a record: ordered major items plus an optional minor
/// clause. The first item's relation records whether the dataset leads with
/// THEN (a continuation candidate) or starts a fresh string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub majors: Vec<RuleItem>,
    pub minor: Option<MinorClause>,
}

impl Dataset {
    /// True when both datasets file the same major items and both carry a
    /// minor clause; such contiguous datasets form a minor-overflow run
    /// whose minors apply to the same major gate.
    pub fn same_major_items(&self, other: &Dataset) -> bool {
        if self.minor.is_none() || other.minor.is_none() {
            return false;
        }
        if self.majors.len() != other.majors.len() {
            return false;
        }
        self.majors.iter().zip(other.majors.iter()).all(|(a, b)| {
            a.category == b.category && a.item_no == b.item_no && a.relation == b.relation
        })
    }
}

/// Splits raw data strings into the tagged tree.
///
/// Each input slice is one dataset as filed: major items up to the first IF
/// item, then the minor clause. Minor items linked by OR open a new
/// alternative; THEN/AND/IF extend the current one.
pub fn build_datasets(raw_sets: Vec<Vec<RuleItem>>) -> Result<Vec<Dataset>, RuleTreeError> {
    let mut datasets = Vec::with_capacity(raw_sets.len());
    for (index, raw) in raw_sets.into_iter().enumerate() {
        datasets.push(build_dataset(index, raw)?);
    }
    Ok(datasets)
}

fn build_dataset(index: usize, raw: Vec<RuleItem>) -> Result<Dataset, RuleTreeError> {
    if raw.is_empty() {
        return Err(RuleTreeError::EmptyDataset { index });
    }

    let mut majors = Vec::new();
    let mut minor: Option<MinorClause> = None;

    for item in raw {
        match &mut minor {
            None => {
                if item.relation == Relation::If {
                    if majors.is_empty() {
                        return Err(RuleTreeError::MinorBeforeMajor { index });
                    }
                    minor = Some(MinorClause {
                        alternatives: vec![vec![item]],
                    });
                } else {
                    majors.push(item);
                }
            }
            Some(clause) => {
                // Already inside the minor clause, so OR opens a new
                // alternative and THEN/AND/IF extend the current one.
                match clause.alternatives.last_mut() {
                    Some(current) if item.relation != Relation::Or => current.push(item),
                    _ => clause.alternatives.push(vec![item]),
                }
            }
        }
    }

    Ok(Dataset { majors, minor })
}
