//! Cycle ledger commands: append, list, delete.

use std::fmt::Write;

use anyhow::{Context, Result};
use pt_core::{AnnotatedCycle, Cycle, CycleId, ToolId};
use pt_db::Database;

use super::util::{format_date, parse_date, parse_position, parse_press, resolve_actor};

/// Appends a cycle observation and prints the assigned id.
pub fn add(
    db: &Database,
    press: u8,
    tool: i64,
    position: &str,
    total: i64,
    user: i64,
    date: Option<&str>,
) -> Result<()> {
    let actor = resolve_actor(db, user)?;
    let cycle = Cycle::new(
        parse_press(press)?,
        ToolId(tool),
        parse_position(position)?,
        total,
        parse_date(date)?,
        actor.id,
    );

    let id = db
        .add_cycle(&cycle, &actor)
        .context("failed to add press cycle")?;
    println!("{id}");
    Ok(())
}

/// Lists ledger records for a press or a tool, newest first.
pub fn list(
    db: &Database,
    press: Option<u8>,
    tool: Option<i64>,
    limit: Option<i64>,
    offset: Option<i64>,
    json: bool,
) -> Result<()> {
    let records = match (press, tool) {
        (Some(press), None) => db.cycles_for_press(parse_press(press)?, limit, offset)?,
        (None, Some(tool)) => db.cycles_for_tool(ToolId(tool))?,
        _ => anyhow::bail!("pass exactly one of --press or --tool"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", format_records(&records));
    }
    Ok(())
}

/// Removes a ledger record.
pub fn delete(db: &Database, id: i64) -> Result<()> {
    db.delete_cycle(CycleId(id))
        .context("failed to delete press cycle")?;
    println!("deleted cycle {id}");
    Ok(())
}

fn format_records(records: &[AnnotatedCycle]) -> String {
    let mut output = String::new();

    if records.is_empty() {
        writeln!(output, "No cycle records.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:>6}  {:<16}  {:>5}  {:>6}  {:<13}  {:>10}  {:>8}",
        "ID", "Date", "Press", "Tool", "Position", "Total", "Partial"
    )
    .unwrap();
    for record in records {
        writeln!(
            output,
            "{:>6}  {:<16}  {:>5}  {:>6}  {:<13}  {:>10}  {:>8}",
            record.cycle.id,
            format_date(record.cycle.date),
            record.cycle.press,
            record.cycle.tool_id,
            record.cycle.position.as_str(),
            record.cycle.total_cycles,
            record.partial_cycles,
        )
        .unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pt_core::{Position, PressNumber, UserId};

    fn annotated(id: i64, total: i64, partial: i64) -> AnnotatedCycle {
        let mut cycle = Cycle::new(
            PressNumber::new(2).unwrap(),
            ToolId(7),
            Position::Top,
            total,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            UserId(1),
        );
        cycle.id = CycleId(id);
        AnnotatedCycle {
            cycle,
            partial_cycles: partial,
        }
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(format_records(&[]), "No cycle records.\n");
    }

    #[test]
    fn listing_shows_totals_and_partials() {
        let output = format_records(&[annotated(1, 1500, 500)]);
        assert!(output.contains("1500"));
        assert!(output.contains("500"));
        assert!(output.contains("2024-03-01 08:00"));
        assert!(output.contains("top"));
    }
}
