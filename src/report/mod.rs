//! Report module - summarizing balancing results

pub mod balance_report;
pub mod summary;

pub use balance_report::*;
pub use summary::*;
