//! Pipeline module - the balancing stages and dataset I/O

pub mod assemble;
pub mod balance;
pub mod binning;
pub mod error;
pub mod loader;
pub mod record;
pub mod sampler;
pub mod strata;
pub mod weights;

pub use assemble::*;
pub use balance::*;
pub use binning::*;
pub use error::*;
pub use loader::*;
pub use record::*;
pub use sampler::*;
pub use strata::*;
pub use weights::*;
