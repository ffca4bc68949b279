//! Consolidation of ledger records into tool-usage periods.
//!
//! The ledger only records counter readings, never the instant a tool was
//! swapped. Consolidation reconstructs the occupancy timeline per position:
//! consecutive readings of the same tool collapse into one usage period, and
//! the start of every later period is inferred from the end of the one
//! before it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::AnnotatedCycle;
use crate::ids::ToolId;
use crate::position::Position;
use crate::tool::Tool;

/// One reconstructed usage period of a tool at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub tool_id: ToolId,
    pub tool_code: String,
    pub position: Position,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Highest cumulative counter reading seen during the period.
    pub max_cycles: i64,
    /// Sum of the partial cycles of the merged records.
    pub total_partial: i64,
    /// True when the start date was observed rather than inferred from the
    /// previous tool's end.
    pub is_first_appearance: bool,
}

/// Display code for a tool, falling back to its id when the tool is unknown.
pub fn tool_code(tool_id: ToolId, tools: &HashMap<ToolId, Tool>) -> String {
    tools
        .get(&tool_id)
        .map_or_else(|| format!("Tool ID {tool_id}"), Tool::display_code)
}

/// Consolidates annotated ledger records (typically all records for one
/// press) into usage-period summaries.
///
/// The output is sorted ascending by maximum cumulative cycles, lowest wear
/// first, with ties broken by position order. The computation is pure; the
/// same input always yields the same output, ordering included.
pub fn consolidate(cycles: &[AnnotatedCycle], tools: &HashMap<ToolId, Tool>) -> Vec<ToolSummary> {
    let mut summaries = initial_summaries(cycles, tools);
    sort_chronologically(&mut summaries);
    let mut consolidated = merge_consecutive(summaries);
    adjust_start_dates(&mut consolidated);
    sort_by_cycles(&mut consolidated);
    consolidated
}

fn initial_summaries(cycles: &[AnnotatedCycle], tools: &HashMap<ToolId, Tool>) -> Vec<ToolSummary> {
    cycles
        .iter()
        .map(|record| ToolSummary {
            tool_id: record.cycle.tool_id,
            tool_code: tool_code(record.cycle.tool_id, tools),
            position: record.cycle.position,
            start_date: record.cycle.date,
            end_date: record.cycle.date,
            max_cycles: record.cycle.total_cycles,
            total_partial: record.partial_cycles,
            is_first_appearance: false,
        })
        .collect()
}

fn sort_chronologically(summaries: &mut [ToolSummary]) {
    summaries.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.position.sort_order().cmp(&b.position.sort_order()))
            .then_with(|| a.end_date.cmp(&b.end_date))
    });
}

/// Single chronological pass: a record of the tool currently tracked at its
/// position merges into the open summary, any other tool opens a new one.
fn merge_consecutive(summaries: Vec<ToolSummary>) -> Vec<ToolSummary> {
    let mut consolidated: Vec<ToolSummary> = Vec::new();
    let mut open_by_position: HashMap<Position, usize> = HashMap::new();

    for summary in summaries {
        let open = open_by_position
            .get(&summary.position)
            .copied()
            .filter(|&index| consolidated[index].tool_id == summary.tool_id);

        if let Some(index) = open {
            merge_into(&mut consolidated[index], &summary);
        } else {
            open_by_position.insert(summary.position, consolidated.len());
            consolidated.push(summary);
        }
    }

    consolidated
}

fn merge_into(existing: &mut ToolSummary, incoming: &ToolSummary) {
    if incoming.start_date < existing.start_date {
        existing.start_date = incoming.start_date;
    }
    if incoming.end_date > existing.end_date {
        existing.end_date = incoming.end_date;
    }
    existing.max_cycles = existing.max_cycles.max(incoming.max_cycles);
    existing.total_partial += incoming.total_partial;
}

/// Per position, in chronological order: the first period's start was
/// actually observed; every later period's start is overwritten with the
/// previous period's end, since the ledger never records the swap instant.
fn adjust_start_dates(summaries: &mut [ToolSummary]) {
    for position in Position::ALL {
        let mut indexes: Vec<usize> = summaries
            .iter()
            .enumerate()
            .filter(|(_, summary)| summary.position == position)
            .map(|(index, _)| index)
            .collect();
        indexes.sort_by_key(|&index| summaries[index].start_date);

        for (order, &index) in indexes.iter().enumerate() {
            if order == 0 {
                summaries[index].is_first_appearance = true;
            } else {
                let previous_end = summaries[indexes[order - 1]].end_date;
                summaries[index].start_date = previous_end;
                summaries[index].is_first_appearance = false;
            }
        }
    }
}

fn sort_by_cycles(summaries: &mut [ToolSummary]) {
    summaries.sort_by(|a, b| {
        a.max_cycles
            .cmp(&b.max_cycles)
            .then_with(|| a.position.sort_order().cmp(&b.position.sort_order()))
    });
}

/// Aggregate statistics over one press's annotated ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressStats {
    /// Highest cumulative counter reading on the press.
    pub total_cycles: i64,
    /// Sum of all derived partial cycles.
    pub total_partial_cycles: i64,
    /// Number of distinct tools that appear in the ledger.
    pub active_tools: i64,
    /// Number of ledger entries.
    pub entries: i64,
}

impl PressStats {
    pub fn from_cycles(cycles: &[AnnotatedCycle]) -> Self {
        let mut stats = Self::default();
        let mut seen_tools: HashSet<ToolId> = HashSet::new();

        for record in cycles {
            stats.total_cycles = stats.total_cycles.max(record.cycle.total_cycles);
            stats.total_partial_cycles += record.partial_cycles;
            seen_tools.insert(record.cycle.tool_id);
        }

        stats.active_tools = seen_tools.len() as i64;
        stats.entries = cycles.len() as i64;
        stats
    }
}
