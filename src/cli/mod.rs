//! CLI module - argument parsing, prompts and command runners

mod args;
pub mod balance;
pub mod download;
mod prompts;
pub mod strata;

pub use args::{sibling_path, Cli, ColumnArgs, Commands};
pub use prompts::*;
