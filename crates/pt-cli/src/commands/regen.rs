//! Regeneration commands: start, stop, abort, history.

use std::fmt::Write;

use anyhow::{Context, Result};
use pt_core::{Regeneration, RegenerationTracker, ToolId, ToolLocks};
use pt_db::Database;

use super::util::resolve_actor;

/// Starts a regeneration and prints the record id.
pub fn start(db: &Database, tool: i64, reason: &str, user: i64) -> Result<()> {
    let actor = resolve_actor(db, user)?;
    let locks = ToolLocks::new();
    let tracker = RegenerationTracker::new(db, db, db, &locks);

    let id = tracker
        .start(ToolId(tool), reason, &actor)
        .context("failed to start regeneration")?;
    println!("{id}");
    Ok(())
}

/// Finishes a regeneration, keeping its history.
pub fn stop(db: &Database, tool: i64, user: i64) -> Result<()> {
    let actor = resolve_actor(db, user)?;
    let locks = ToolLocks::new();
    let tracker = RegenerationTracker::new(db, db, db, &locks);

    tracker
        .stop(ToolId(tool), &actor)
        .context("failed to stop regeneration")?;
    println!("stopped regeneration of tool {tool}");
    Ok(())
}

/// Cancels an in-progress regeneration.
pub fn abort(db: &Database, tool: i64, user: i64) -> Result<()> {
    let actor = resolve_actor(db, user)?;
    let locks = ToolLocks::new();
    let tracker = RegenerationTracker::new(db, db, db, &locks);

    tracker
        .abort(ToolId(tool), &actor)
        .context("failed to abort regeneration")?;
    println!("aborted regeneration of tool {tool}");
    Ok(())
}

/// Prints a tool's regeneration history, newest first.
pub fn history(db: &Database, tool: i64, json: bool) -> Result<()> {
    let records = db.regeneration_history(ToolId(tool))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", format_history(&records));
    }
    Ok(())
}

fn format_history(records: &[Regeneration]) -> String {
    let mut output = String::new();

    if records.is_empty() {
        writeln!(output, "No regenerations recorded.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:>6}  {:>8}  {:>8}  Reason",
        "ID", "Cycle", "By"
    )
    .unwrap();
    for record in records {
        let by = record
            .performed_by
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        writeln!(
            output,
            "{:>6}  {:>8}  {:>8}  {}",
            record.id, record.cycle_id, by, record.reason
        )
        .unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::{CycleId, RegenerationId, UserId};

    #[test]
    fn empty_history_says_so() {
        assert_eq!(format_history(&[]), "No regenerations recorded.\n");
    }

    #[test]
    fn history_lists_anchor_and_operator() {
        let mut record = Regeneration::new(
            ToolId(7),
            CycleId(42),
            "worn edges",
            Some(UserId(1)),
        );
        record.id = RegenerationId(3);

        let output = format_history(&[record]);
        assert!(output.contains("42"));
        assert!(output.contains("worn edges"));
    }
}
