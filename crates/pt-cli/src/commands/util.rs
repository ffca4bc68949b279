//! Shared helpers for command implementations.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pt_core::{Position, PressNumber, User, UserDirectory, UserId};
use pt_db::Database;

/// Looks up the acting operator by id.
pub fn resolve_actor(db: &Database, id: i64) -> Result<User> {
    db.user(UserId(id))
        .with_context(|| format!("failed to resolve operator {id}"))
}

/// Validates a press number argument.
pub fn parse_press(number: u8) -> Result<PressNumber> {
    PressNumber::new(number).context("invalid --press value")
}

/// Parses a position argument (top, "cassette top", bottom).
pub fn parse_position(raw: &str) -> Result<Position> {
    raw.parse().context("invalid --position value")
}

/// Parses an RFC 3339 timestamp argument, defaulting to now.
pub fn parse_date(raw: Option<&str>) -> Result<DateTime<Utc>> {
    raw.map_or_else(
        || Ok(Utc::now()),
        |value| {
            DateTime::parse_from_rfc3339(value)
                .map(|parsed| parsed.with_timezone(&Utc))
                .with_context(|| format!("invalid --date value: {value}"))
        },
    )
}

/// Compact timestamp for table output.
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_defaults_to_now() {
        assert!(parse_date(None).is_ok());
    }

    #[test]
    fn parse_date_accepts_rfc3339() {
        let parsed = parse_date(Some("2024-03-01T08:00:00Z")).unwrap();
        assert_eq!(format_date(parsed), "2024-03-01 08:00");
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date(Some("yesterday")).is_err());
    }

    #[test]
    fn parse_position_accepts_all_slots() {
        assert_eq!(parse_position("top").unwrap(), Position::Top);
        assert_eq!(parse_position("cassette top").unwrap(), Position::TopCassette);
        assert_eq!(parse_position("bottom").unwrap(), Position::Bottom);
        assert!(parse_position("middle").is_err());
    }
}
