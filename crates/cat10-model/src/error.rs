use thiserror::Error;

use crate::arena::FareUsageId;

#[derive(Debug, Error)]
pub enum Cat10Error {
    #[error("unknown fare usage {0}")]
    UnknownFareUsage(FareUsageId),
    #[error("pricing unit has no fare usages")]
    EmptyPricingUnit,
}

pub type Result<T> = std::result::Result<T, Cat10Error>;
