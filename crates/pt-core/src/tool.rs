//! Tools and their derived status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::ToolId;
use crate::position::Position;
use crate::press::PressNumber;

/// Cycle counts at which a tool's wear becomes a warning / an error.
pub const TOOL_CYCLE_WARNING: i64 = 800_000;
pub const TOOL_CYCLE_ERROR: i64 = 1_000_000;

/// Plate format of a tool, e.g. 100x200.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    pub width: i64,
    pub height: i64,
}

impl Format {
    pub const fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 && self.height == 0
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            Ok(())
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}

/// Derived tool status. At most one non-dead status holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Available,
    Active,
    Regenerating,
    Dead,
}

impl ToolStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Active => "active",
            Self::Regenerating => "regenerating",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A press tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub id: ToolId,
    pub position: Position,
    pub format: Format,
    /// Tool type, e.g. FC, GTC, MASS.
    pub kind: String,
    /// Tool code, e.g. G01.
    pub code: String,
    pub regenerating: bool,
    pub dead: bool,
    /// Press the tool is mounted on while active.
    pub press: Option<PressNumber>,
}

impl Tool {
    pub fn new(position: Position, format: Format, code: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: ToolId(0),
            position,
            format,
            kind: kind.into(),
            code: code.into(),
            regenerating: false,
            dead: false,
            press: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(Error::Validation("tool code cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Derived status; dead wins over regenerating wins over active.
    pub const fn status(&self) -> ToolStatus {
        if self.dead {
            ToolStatus::Dead
        } else if self.regenerating {
            ToolStatus::Regenerating
        } else if self.press.is_some() {
            ToolStatus::Active
        } else {
            ToolStatus::Available
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(self.status(), ToolStatus::Active)
    }

    /// Display code used in summaries and reports, e.g. "100x200 G01".
    pub fn display_code(&self) -> String {
        if self.format.is_empty() {
            self.code.clone()
        } else {
            format!("{} {}", self.format, self.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> Tool {
        Tool::new(Position::Top, Format::new(100, 200), "G01", "FC")
    }

    #[test]
    fn status_precedence() {
        let mut t = tool();
        assert_eq!(t.status(), ToolStatus::Available);

        t.press = Some(PressNumber::new(2).unwrap());
        assert_eq!(t.status(), ToolStatus::Active);
        assert!(t.is_active());

        t.regenerating = true;
        assert_eq!(t.status(), ToolStatus::Regenerating);

        t.dead = true;
        assert_eq!(t.status(), ToolStatus::Dead);
    }

    #[test]
    fn display_code_includes_format() {
        assert_eq!(tool().display_code(), "100x200 G01");

        let bare = Tool::new(Position::Bottom, Format::default(), "G02", "");
        assert_eq!(bare.display_code(), "G02");
    }

    #[test]
    fn empty_code_rejected() {
        let mut t = tool();
        t.code = String::new();
        assert!(t.validate().is_err());
    }
}
