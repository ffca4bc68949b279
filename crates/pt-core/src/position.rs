//! Tool mounting positions on a press.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The slot a tool occupies on a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Top,
    TopCassette,
    Bottom,
}

impl Position {
    /// String representation for database storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::TopCassette => "cassette top",
            Self::Bottom => "bottom",
        }
    }

    /// Fixed sort order used for tie-breaks: top < cassette top < bottom.
    pub const fn sort_order(self) -> u8 {
        match self {
            Self::Top => 1,
            Self::TopCassette => 2,
            Self::Bottom => 3,
        }
    }

    /// All positions, in sort order.
    pub const ALL: [Self; 3] = [Self::Top, Self::TopCassette, Self::Bottom];
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Self::Top),
            "cassette top" | "top cassette" => Ok(Self::TopCassette),
            "bottom" => Ok(Self::Bottom),
            _ => Err(Error::Validation(format!("unknown tool position: {s}"))),
        }
    }
}

impl Serialize for Position {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Position {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Position {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        raw.parse()
            .map_err(|err: Error| FromSqlError::Other(Box::new(err)))
    }
}
