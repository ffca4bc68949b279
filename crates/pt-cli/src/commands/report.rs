//! Press report command: usage summaries plus aggregate statistics.

use std::fmt::Write;

use anyhow::Result;
use pt_core::{PressNumber, PressStats, ToolSummary, TOOL_CYCLE_ERROR, TOOL_CYCLE_WARNING};
use pt_db::Database;
use serde::Serialize;

use super::util::{format_date, parse_press};

/// Full report for one press.
#[derive(Debug, Serialize)]
pub struct PressReport {
    pub press: PressNumber,
    pub stats: PressStats,
    pub summaries: Vec<ToolSummary>,
}

pub fn build(db: &Database, press: PressNumber) -> Result<PressReport> {
    Ok(PressReport {
        press,
        stats: db.press_stats(press)?,
        summaries: db.press_summaries(press)?,
    })
}

/// Runs the report command.
pub fn run(db: &Database, press: u8, json: bool) -> Result<()> {
    let report = build(db, parse_press(press)?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

fn format_report(report: &PressReport) -> String {
    let mut output = String::new();

    writeln!(output, "PRESS {}", report.press).unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "Entries: {}   Tools: {}   Max total: {}   Partial sum: {}",
        report.stats.entries,
        report.stats.active_tools,
        report.stats.total_cycles,
        report.stats.total_partial_cycles,
    )
    .unwrap();
    writeln!(output).unwrap();

    if report.summaries.is_empty() {
        writeln!(output, "No usage periods recorded.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<20}  {:<13}  {:<16}  {:<16}  {:>10}  {:>10}",
        "Tool", "Position", "From", "To", "Max", "Partial"
    )
    .unwrap();
    for summary in &report.summaries {
        // inferred starts are marked with a tilde
        let from = if summary.is_first_appearance {
            format_date(summary.start_date)
        } else {
            format!("~{}", format_date(summary.start_date))
        };
        writeln!(
            output,
            "{:<20}  {:<13}  {:<16}  {:<16}  {:>10}  {:>10}{}",
            summary.tool_code,
            summary.position.as_str(),
            from,
            format_date(summary.end_date),
            summary.max_cycles,
            summary.total_partial,
            wear_marker(summary.max_cycles),
        )
        .unwrap();
    }

    output
}

/// Flags tools nearing or past their refurbishment threshold.
const fn wear_marker(max_cycles: i64) -> &'static str {
    if max_cycles >= TOOL_CYCLE_ERROR {
        "  !!"
    } else if max_cycles >= TOOL_CYCLE_WARNING {
        "  !"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pt_core::{Cycle, Position, Tool, ToolId, User, UserDirectory};

    fn seeded_db() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user_id = db.add_user("dana").unwrap();
        let actor = db.user(user_id).unwrap();
        (db, actor)
    }

    fn press(number: u8) -> PressNumber {
        PressNumber::new(number).unwrap()
    }

    #[test]
    fn report_on_empty_press() {
        let (db, _actor) = seeded_db();
        let report = build(&db, press(2)).unwrap();
        let output = format_report(&report);
        assert!(output.contains("PRESS 2"));
        assert!(output.contains("No usage periods recorded."));
    }

    #[test]
    fn report_marks_inferred_starts() {
        let (db, actor) = seeded_db();
        let tool_a = db
            .add_tool(&Tool::new(
                Position::Bottom,
                pt_core::Format::new(100, 200),
                "G01",
                "FC",
            ))
            .unwrap();
        let tool_b = db
            .add_tool(&Tool::new(
                Position::Bottom,
                pt_core::Format::new(100, 200),
                "G02",
                "FC",
            ))
            .unwrap();

        for (tool, total, day) in [(tool_a, 1000, 1), (tool_a, 1500, 2), (tool_b, 100, 3)] {
            let cycle = Cycle::new(
                press(0),
                ToolId(tool.get()),
                Position::Bottom,
                total,
                Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap(),
                actor.id,
            );
            db.add_cycle(&cycle, &actor).unwrap();
        }

        let report = build(&db, press(0)).unwrap();
        let output = format_report(&report);

        // observed start for tool A, inferred start for tool B
        assert!(output.contains("100x200 G01"));
        assert!(output.contains("~2024-03-02 08:00"));
        assert!(output.contains("Entries: 3"));
    }

    #[test]
    fn wear_markers_follow_the_thresholds() {
        assert_eq!(wear_marker(1500), "");
        assert_eq!(wear_marker(TOOL_CYCLE_WARNING), "  !");
        assert_eq!(wear_marker(TOOL_CYCLE_ERROR), "  !!");
    }
}
