//! Top-tracks CLI library.
//!
//! This crate provides the CLI interface for top-tracks reports.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, InputArgs, RunArgs, SessionsArgs};
pub use config::Config;
