//! Arena storage for fare usages. Pricing units, fare paths, and the
//! validation accumulator all refer to fare usages by [`FareUsageId`], so
//! the engine never holds two live references into the same allocation.

use serde::{Deserialize, Serialize};

use crate::error::{Cat10Error, Result};
use crate::fare::FareUsage;

/// Index handle into a [`FareUsageArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FareUsageId(pub u32);

impl std::fmt::Display for FareUsageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FU{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FareUsageArena {
    items: Vec<FareUsage>,
}

impl FareUsageArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fare_usage: FareUsage) -> FareUsageId {
        let id = FareUsageId(self.items.len() as u32);
        self.items.push(fare_usage);
        id
    }

    pub fn get(&self, id: FareUsageId) -> Result<&FareUsage> {
        self.items
            .get(id.0 as usize)
            .ok_or(Cat10Error::UnknownFareUsage(id))
    }

    pub fn get_mut(&mut self, id: FareUsageId) -> Result<&mut FareUsage> {
        self.items
            .get_mut(id.0 as usize)
            .ok_or(Cat10Error::UnknownFareUsage(id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FareUsageId> + use<> {
        (0..self.items.len() as u32).map(FareUsageId)
    }
}
