//! Cross-press overlap detection.
//!
//! A tool is mounted on at most one press at a time, so two usage periods of
//! the same tool on different presses with intersecting time spans signal a
//! data-integrity problem in the ledger, not a normal state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ids::ToolId;
use crate::position::Position;
use crate::press::PressNumber;
use crate::summary::ToolSummary;

/// One usage period participating in an overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapInstance {
    pub press: PressNumber,
    pub position: Position,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// A tool whose usage periods intersect across presses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingTool {
    pub tool_id: ToolId,
    pub tool_code: String,
    /// Union span of the conflicting periods.
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub overlaps: Vec<OverlapInstance>,
}

/// Half-open interval test: periods touching only at a boundary do not
/// overlap.
fn periods_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// Scans per-press consolidated summaries for tools active on two presses at
/// once.
///
/// Tools appearing on fewer than two presses are skipped. For the rest,
/// every cross-press pair of periods is tested; periods involved in at least
/// one overlap are collected, deduplicated, into one report per tool. The
/// per-tool scan is independent and runs in parallel; output is sorted by
/// tool id for determinism.
pub fn detect_overlapping_tools(
    by_press: &HashMap<PressNumber, Vec<ToolSummary>>,
) -> Vec<OverlappingTool> {
    let mut groups: HashMap<ToolId, Vec<(PressNumber, &ToolSummary)>> = HashMap::new();
    for (&press, summaries) in by_press {
        for summary in summaries {
            groups.entry(summary.tool_id).or_default().push((press, summary));
        }
    }

    let candidates: Vec<(ToolId, Vec<(PressNumber, &ToolSummary)>)> = groups
        .into_iter()
        .filter(|(_, periods)| {
            let mut presses: Vec<PressNumber> =
                periods.iter().map(|(press, _)| *press).collect();
            presses.sort_unstable();
            presses.dedup();
            presses.len() >= 2
        })
        .collect();

    let mut report: Vec<OverlappingTool> = candidates
        .par_iter()
        .filter_map(|(tool_id, periods)| check_tool(*tool_id, periods))
        .collect();

    report.sort_by_key(|tool| tool.tool_id);
    report
}

fn check_tool(
    tool_id: ToolId,
    periods: &[(PressNumber, &ToolSummary)],
) -> Option<OverlappingTool> {
    let mut overlaps: Vec<OverlapInstance> = Vec::new();

    for (index, &(press1, summary1)) in periods.iter().enumerate() {
        for &(press2, summary2) in &periods[index + 1..] {
            if press1 == press2 {
                continue;
            }
            if periods_overlap(
                summary1.start_date,
                summary1.end_date,
                summary2.start_date,
                summary2.end_date,
            ) {
                push_unique(&mut overlaps, instance(press1, summary1));
                push_unique(&mut overlaps, instance(press2, summary2));
            }
        }
    }

    if overlaps.is_empty() {
        return None;
    }

    overlaps.sort_by(|a, b| {
        a.press
            .cmp(&b.press)
            .then_with(|| a.position.sort_order().cmp(&b.position.sort_order()))
            .then_with(|| a.start_date.cmp(&b.start_date))
    });

    // union span over the periods actually in conflict
    let start_date = overlaps
        .iter()
        .map(|instance| instance.start_date)
        .min()?;
    let end_date = overlaps.iter().map(|instance| instance.end_date).max()?;

    Some(OverlappingTool {
        tool_id,
        tool_code: describe_tool(tool_id, periods, &overlaps),
        start_date,
        end_date,
        overlaps,
    })
}

fn instance(press: PressNumber, summary: &ToolSummary) -> OverlapInstance {
    OverlapInstance {
        press,
        position: summary.position,
        start_date: summary.start_date,
        end_date: summary.end_date,
    }
}

fn push_unique(overlaps: &mut Vec<OverlapInstance>, candidate: OverlapInstance) {
    if !overlaps.contains(&candidate) {
        overlaps.push(candidate);
    }
}

/// Display code with the conflicting positions appended, e.g.
/// "100x200 G01 (top, bottom)".
fn describe_tool(
    tool_id: ToolId,
    periods: &[(PressNumber, &ToolSummary)],
    overlaps: &[OverlapInstance],
) -> String {
    let fallback = format!("Tool ID {tool_id}");
    let code = periods
        .iter()
        .map(|(_, summary)| summary.tool_code.as_str())
        .find(|code| !code.is_empty() && **code != fallback)
        .unwrap_or(&fallback);

    let mut positions: Vec<&str> = Vec::new();
    for instance in overlaps {
        let name = instance.position.as_str();
        if !positions.contains(&name) {
            positions.push(name);
        }
    }

    if positions.is_empty() {
        code.to_string()
    } else {
        format!("{} ({})", code, positions.join(", "))
    }
}
