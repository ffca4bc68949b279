//! Tool management commands.

use std::fmt::Write;

use anyhow::{Context, Result};
use pt_core::{Format, PressNumber, Tool, ToolId};
use pt_db::Database;

use super::util::{parse_position, parse_press, resolve_actor};

/// Adds a tool and prints the assigned id.
pub fn add(
    db: &Database,
    position: &str,
    width: i64,
    height: i64,
    code: &str,
    kind: &str,
) -> Result<()> {
    let tool = Tool::new(
        parse_position(position)?,
        Format::new(width, height),
        code,
        kind,
    );
    let id = db.add_tool(&tool).context("failed to add tool")?;
    println!("{id}");
    Ok(())
}

/// Lists all tools with their derived status.
pub fn list(db: &Database, json: bool) -> Result<()> {
    let tools = db.tools()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
    } else {
        print!("{}", format_tools(&tools));
    }
    Ok(())
}

/// Mounts a tool on a press, or takes it off when `press` is `None`.
pub fn set_press(db: &Database, tool: i64, press: Option<u8>, user: i64) -> Result<()> {
    let actor = resolve_actor(db, user)?;
    let press: Option<PressNumber> = press.map(parse_press).transpose()?;

    db.set_press(ToolId(tool), press, &actor)
        .context("failed to update press assignment")?;
    match press {
        Some(press) => println!("tool {tool} mounted on press {press}"),
        None => println!("tool {tool} taken off press"),
    }
    Ok(())
}

/// Marks a tool dead.
pub fn mark_dead(db: &Database, tool: i64, user: i64) -> Result<()> {
    let actor = resolve_actor(db, user)?;
    db.mark_dead(ToolId(tool), &actor)
        .context("failed to mark tool dead")?;
    println!("tool {tool} marked dead");
    Ok(())
}

/// Brings a dead tool back.
pub fn revive(db: &Database, tool: i64, user: i64) -> Result<()> {
    let actor = resolve_actor(db, user)?;
    db.revive(ToolId(tool), &actor)
        .context("failed to revive tool")?;
    println!("tool {tool} revived");
    Ok(())
}

fn format_tools(tools: &[Tool]) -> String {
    let mut output = String::new();

    if tools.is_empty() {
        writeln!(output, "No tools registered.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:>6}  {:<20}  {:<13}  {:<12}  Press",
        "ID", "Code", "Position", "Status"
    )
    .unwrap();
    for tool in tools {
        let press = tool
            .press
            .map_or_else(|| "-".to_string(), |press| press.to_string());
        writeln!(
            output,
            "{:>6}  {:<20}  {:<13}  {:<12}  {}",
            tool.id,
            tool.display_code(),
            tool.position.as_str(),
            tool.status().as_str(),
            press,
        )
        .unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::{Position, ToolDirectory};

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(format_tools(&[]), "No tools registered.\n");
    }

    #[test]
    fn listing_shows_status_and_press() {
        let mut tool = Tool::new(Position::Top, Format::new(100, 200), "G01", "FC");
        tool.id = ToolId(7);
        tool.press = Some(PressNumber::new(4).unwrap());

        let output = format_tools(&[tool]);
        assert!(output.contains("100x200 G01"));
        assert!(output.contains("active"));
        assert!(output.contains('4'));
    }

    #[test]
    fn add_and_list_round_trip() {
        let db = Database::open_in_memory().unwrap();
        add(&db, "top", 100, 200, "G01", "FC").unwrap();

        let tools = db.tools().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].code, "G01");
        let _ = db.tool(tools[0].id).unwrap();
    }
}
