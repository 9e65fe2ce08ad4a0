//! CLI module - argument parsing and interactive prompts

mod args;
mod prompts;

pub use args::{derive_scored_path, Cli, EstimatorKind};
pub use prompts::*;
