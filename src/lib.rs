//! cohortbal: Cohort Balancing Library
//!
//! Balances two patient or imaging-study cohorts on their demographic mix by
//! inverse-frequency weighted undersampling of the larger cohort.

pub mod cli;
pub mod download;
pub mod pipeline;
pub mod report;
pub mod utils;
