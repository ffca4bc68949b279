//! Cross-press overlap report command.

use std::fmt::Write;

use anyhow::Result;
use pt_core::OverlappingTool;
use pt_db::Database;

use super::util::format_date;

/// Runs the overlaps command.
pub fn run(db: &Database, json: bool) -> Result<()> {
    let report = db.overlapping_tools()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_overlaps(&report));
    }
    Ok(())
}

fn format_overlaps(report: &[OverlappingTool]) -> String {
    let mut output = String::new();

    if report.is_empty() {
        writeln!(output, "No overlapping tools found.").unwrap();
        return output;
    }

    for tool in report {
        writeln!(
            output,
            "{} (tool {}): {} .. {}",
            tool.tool_code,
            tool.tool_id,
            format_date(tool.start_date),
            format_date(tool.end_date),
        )
        .unwrap();
        for instance in &tool.overlaps {
            writeln!(
                output,
                "  press {}  {:<13}  {} .. {}",
                instance.press,
                instance.position.as_str(),
                format_date(instance.start_date),
                format_date(instance.end_date),
            )
            .unwrap();
        }
        writeln!(output).unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pt_core::{OverlapInstance, Position, PressNumber, ToolId};

    #[test]
    fn empty_report_says_so() {
        assert_eq!(format_overlaps(&[]), "No overlapping tools found.\n");
    }

    #[test]
    fn report_lists_every_instance() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let report = vec![OverlappingTool {
            tool_id: ToolId(7),
            tool_code: "100x200 G01 (top)".to_string(),
            start_date: start,
            end_date: end,
            overlaps: vec![
                OverlapInstance {
                    press: PressNumber::new(2).unwrap(),
                    position: Position::Top,
                    start_date: start,
                    end_date: end,
                },
                OverlapInstance {
                    press: PressNumber::new(3).unwrap(),
                    position: Position::Top,
                    start_date: start,
                    end_date: end,
                },
            ],
        }];

        let output = format_overlaps(&report);
        assert!(output.contains("100x200 G01 (top) (tool 7)"));
        assert!(output.contains("press 2"));
        assert!(output.contains("press 3"));
    }
}
