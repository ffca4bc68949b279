//! Core domain logic for press tool cycle tracking.
//!
//! This crate contains the fundamental types and computations:
//! - Partial cycles: deriving the incremental count of a ledger record
//! - Consolidation: reconstructing tool-usage periods per press position
//! - Overlap detection: flagging a tool active on two presses at once
//! - Regeneration: the state machine resetting a tool's counting lineage

mod error;

pub mod cycle;
pub mod ids;
pub mod overlap;
pub mod position;
pub mod press;
pub mod regen;
pub mod summary;
pub mod tool;
pub mod user;

pub use cycle::{annotate, partial_cycles, AnnotatedCycle, Cycle};
pub use error::{Error, Result};
pub use ids::{CycleId, RegenerationId, ToolId, UserId};
pub use overlap::{detect_overlapping_tools, OverlapInstance, OverlappingTool};
pub use position::Position;
pub use press::{PressNumber, VALID_PRESS_NUMBERS};
pub use regen::{
    CycleSource, Regeneration, RegenerationStore, RegenerationTracker, ToolDirectory, ToolLocks,
};
pub use summary::{consolidate, PressStats, ToolSummary};
pub use tool::{Format, Tool, ToolStatus, TOOL_CYCLE_ERROR, TOOL_CYCLE_WARNING};
pub use user::{User, UserDirectory};
