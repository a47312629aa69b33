//! Imputation module for filling blank values from related records.
//!
//! - Status imputation from a country's other years
//! - Life expectancy interpolation from adjacent years

mod interpolation;
mod status;

pub use interpolation::LifeExpectancyInterpolator;
pub use status::StatusImputer;
