//! CLI subcommand implementations.

pub mod run;
pub mod sessions;
mod util;
