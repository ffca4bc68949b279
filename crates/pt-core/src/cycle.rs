//! The append-only cycle ledger and partial-cycle derivation.
//!
//! A [`Cycle`] records a press counter reading for one tool at one position.
//! The counter is cumulative per press, so the number of cycles a single
//! record contributed (its partial cycles) has to be derived against the
//! rest of the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{CycleId, ToolId, UserId};
use crate::position::Position;
use crate::press::PressNumber;

/// One counter observation in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub press: PressNumber,
    pub tool_id: ToolId,
    pub position: Position,
    /// Cumulative press counter at the time of the observation.
    pub total_cycles: i64,
    pub date: DateTime<Utc>,
    pub performed_by: UserId,
}

impl Cycle {
    pub fn new(
        press: PressNumber,
        tool_id: ToolId,
        position: Position,
        total_cycles: i64,
        date: DateTime<Utc>,
        performed_by: UserId,
    ) -> Self {
        Self {
            id: CycleId(0),
            press,
            tool_id,
            position,
            total_cycles,
            date,
            performed_by,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tool_id.is_assigned() {
            return Err(Error::Validation(format!(
                "invalid tool id: {}",
                self.tool_id
            )));
        }
        if self.total_cycles <= 0 {
            return Err(Error::Validation(format!(
                "total cycles must be positive, got {}",
                self.total_cycles
            )));
        }
        if self.date.timestamp_millis() == 0 {
            return Err(Error::Validation("cycle date is not set".to_string()));
        }
        Ok(())
    }
}

/// A ledger record together with its derived partial cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedCycle {
    #[serde(flatten)]
    pub cycle: Cycle,
    /// Cycles this record contributed on top of the preceding reading.
    pub partial_cycles: i64,
}

/// Derives the partial cycles of `current` against `history`.
///
/// The baseline is the highest counter reading strictly below the current
/// one, taken on the same press and position, regardless of which tool was
/// mounted. With no such reading the record is the first on its slot and
/// contributes its full counter value.
pub fn partial_cycles(current: &Cycle, history: &[Cycle]) -> i64 {
    history
        .iter()
        .filter(|prior| {
            prior.id != current.id
                && prior.press == current.press
                && prior.position == current.position
                && prior.total_cycles < current.total_cycles
        })
        .map(|prior| prior.total_cycles)
        .max()
        .map_or(current.total_cycles, |baseline| {
            current.total_cycles - baseline
        })
}

/// Annotates every record in `cycles` with its partial cycles.
///
/// Each record is evaluated against the full slice, so the input should be
/// the complete ledger for the presses involved.
pub fn annotate(cycles: Vec<Cycle>) -> Vec<AnnotatedCycle> {
    cycles
        .iter()
        .map(|cycle| AnnotatedCycle {
            cycle: cycle.clone(),
            partial_cycles: partial_cycles(cycle, &cycles),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn cycle(id: i64, tool: i64, position: Position, total: i64, hour: u32) -> Cycle {
        let mut c = Cycle::new(
            PressNumber::new(2).unwrap(),
            ToolId(tool),
            position,
            total,
            at(hour),
            UserId(1),
        );
        c.id = CycleId(id);
        c
    }

    #[test]
    fn first_record_contributes_full_counter() {
        let c = cycle(1, 10, Position::Top, 1000, 8);
        assert_eq!(partial_cycles(&c, &[c.clone()]), 1000);
    }

    #[test]
    fn baseline_is_highest_lower_reading_on_slot() {
        let history = vec![
            cycle(1, 10, Position::Top, 1000, 8),
            cycle(2, 10, Position::Top, 1500, 9),
            cycle(3, 11, Position::Top, 2200, 10),
        ];
        assert_eq!(partial_cycles(&history[1], &history), 500);
        // tool changed, baseline still comes from the previous tool
        assert_eq!(partial_cycles(&history[2], &history), 700);
    }

    #[test]
    fn other_positions_do_not_contribute() {
        let history = vec![
            cycle(1, 10, Position::Bottom, 900, 8),
            cycle(2, 10, Position::Top, 1000, 9),
        ];
        assert_eq!(partial_cycles(&history[1], &history), 1000);
    }

    #[test]
    fn higher_readings_are_ignored() {
        // late entry of an older, lower reading
        let history = vec![
            cycle(1, 10, Position::Top, 5000, 10),
            cycle(2, 10, Position::Top, 3000, 8),
        ];
        assert_eq!(partial_cycles(&history[1], &history), 3000);
        assert_eq!(partial_cycles(&history[0], &history), 2000);
    }

    #[test]
    fn annotate_covers_every_record() {
        let history = vec![
            cycle(1, 10, Position::Top, 1000, 8),
            cycle(2, 10, Position::Top, 1500, 9),
        ];
        let annotated = annotate(history);
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].partial_cycles, 1000);
        assert_eq!(annotated[1].partial_cycles, 500);
    }

    #[test]
    fn validate_rejects_bad_records() {
        let mut c = cycle(0, 0, Position::Top, 100, 8);
        assert!(c.validate().is_err());

        c.tool_id = ToolId(10);
        c.total_cycles = 0;
        assert!(c.validate().is_err());

        c.total_cycles = 100;
        c.date = Utc.timestamp_millis_opt(0).unwrap();
        assert!(c.validate().is_err());

        c.date = at(8);
        assert!(c.validate().is_ok());
    }
}
