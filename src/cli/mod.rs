//! Command-line interface module.

mod args;
pub mod bundle;
pub mod serve;

pub use args::{Cli, Commands};
