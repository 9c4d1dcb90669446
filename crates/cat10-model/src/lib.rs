//! Itinerary domain model for combinability validation.

pub mod arena;
pub mod config;
pub mod error;
pub mod fare;
pub mod journey;
pub mod outcome;

pub use arena::{FareUsageArena, FareUsageId};
pub use config::EngineConfig;
pub use error::{Cat10Error, Result};
pub use fare::{Fare, FareDirection, FareUsage, Owrt, TariffVisibility};
pub use journey::{FarePath, OpenJawSubtype, PricingUnit, PuKind};
pub use outcome::{ValidationOutcome, Verdict};
