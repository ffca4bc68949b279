//! Press numbers and the valid press set.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The presses currently in service. Press 1 was retired and its number is
/// never reused, so the set is enumerated rather than a contiguous range.
pub const VALID_PRESS_NUMBERS: [u8; 5] = [0, 2, 3, 4, 5];

/// A validated press number.
///
/// Construction goes through [`PressNumber::new`], so a value of this type
/// always names a press in [`VALID_PRESS_NUMBERS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PressNumber(u8);

impl PressNumber {
    /// Validates `number` against the press set.
    pub fn new(number: u8) -> Result<Self> {
        if VALID_PRESS_NUMBERS.contains(&number) {
            Ok(Self(number))
        } else {
            Err(Error::Validation(format!("invalid press number: {number}")))
        }
    }

    /// The raw press number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// All presses in service, in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        VALID_PRESS_NUMBERS.into_iter().map(Self)
    }
}

impl fmt::Display for PressNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for PressNumber {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PressNumber> for u8 {
    fn from(press: PressNumber) -> Self {
        press.0
    }
}

impl ToSql for PressNumber {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.0)))
    }
}

impl FromSql for PressNumber {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        u8::try_from(raw)
            .ok()
            .and_then(|number| Self::new(number).ok())
            .ok_or(FromSqlError::OutOfRange(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_presses_in_service() {
        for number in VALID_PRESS_NUMBERS {
            let press = PressNumber::new(number).expect("valid press");
            assert_eq!(press.get(), number);
        }
    }

    #[test]
    fn rejects_retired_press_one() {
        assert!(PressNumber::new(1).is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(PressNumber::new(6).is_err());
        assert!(PressNumber::new(255).is_err());
    }

    #[test]
    fn all_lists_the_valid_set() {
        let all: Vec<u8> = PressNumber::all().map(PressNumber::get).collect();
        assert_eq!(all, VALID_PRESS_NUMBERS);
    }
}
