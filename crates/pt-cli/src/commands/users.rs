//! Operator management commands.

use std::fmt::Write;

use anyhow::{Context, Result};
use pt_core::{User, UserDirectory};
use pt_db::Database;

/// Adds an operator and prints the assigned id.
pub fn add(db: &Database, name: &str) -> Result<()> {
    let id = db.add_user(name).context("failed to add operator")?;
    println!("{id}");
    Ok(())
}

/// Lists all operators.
pub fn list(db: &Database, json: bool) -> Result<()> {
    let users = db.users()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else {
        print!("{}", format_users(&users));
    }
    Ok(())
}

fn format_users(users: &[User]) -> String {
    let mut output = String::new();

    if users.is_empty() {
        writeln!(output, "No operators registered.").unwrap();
        return output;
    }

    writeln!(output, "{:>6}  Name", "ID").unwrap();
    for user in users {
        writeln!(output, "{:>6}  {}", user.id, user.name).unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(format_users(&[]), "No operators registered.\n");
    }

    #[test]
    fn add_and_list_round_trip() {
        let db = Database::open_in_memory().unwrap();
        add(&db, "dana").unwrap();

        let users = db.users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "dana");

        let output = format_users(&users);
        assert!(output.contains("dana"));
    }
}
