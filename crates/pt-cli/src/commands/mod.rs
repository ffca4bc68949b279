//! CLI subcommand implementations.

pub mod cycles;
pub mod overlaps;
pub mod regen;
pub mod report;
pub mod tools;
pub mod users;
mod util;
