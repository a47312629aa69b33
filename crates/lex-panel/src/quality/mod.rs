//! Data quality analysis module.
//!
//! This module provides blank-value summaries of a panel and checks of the
//! invariants a cleaned panel should satisfy.

mod analyzer;

pub use analyzer::QualityAnalyzer;
