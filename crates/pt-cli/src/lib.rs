//! Press tool cycle tracker CLI library.
//!
//! This crate provides the CLI interface for the cycle tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, CyclesAction, RegenAction, ToolsAction, UsersAction};
pub use config::Config;
