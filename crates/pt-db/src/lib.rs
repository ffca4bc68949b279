//! Storage layer for the press tool cycle tracker.
//!
//! Provides persistence for the cycle ledger, tools, operators, and
//! regeneration records using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 format (e.g.
//! `2024-01-15T10:30:00.000Z`), so lexicographic ordering matches
//! chronological ordering and values stay human-readable. Enumerated domain
//! values (positions, press numbers) are stored in their canonical string or
//! integer form and validated on the way back out.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use pt_core::{
    consolidate, detect_overlapping_tools, AnnotatedCycle, Cycle, CycleId, CycleSource, Error,
    OverlappingTool, Position, PressNumber, PressStats, Regeneration, RegenerationId,
    RegenerationStore, Result, Tool, ToolDirectory, ToolId, ToolSummary, User, UserDirectory,
    UserId,
};

/// Database connection wrapper.
///
/// Implements the `pt-core` capability traits, so it can be handed directly
/// to the regeneration tracker.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(Error::Sqlite)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::Sqlite)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tools (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                position TEXT NOT NULL,
                width INTEGER NOT NULL DEFAULT 0,
                height INTEGER NOT NULL DEFAULT 0,
                type TEXT NOT NULL DEFAULT '',
                code TEXT NOT NULL,
                regenerating INTEGER NOT NULL DEFAULT 0,
                dead INTEGER NOT NULL DEFAULT 0,
                press INTEGER
            );

            CREATE TABLE IF NOT EXISTS press_cycles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                press_number INTEGER NOT NULL CHECK(press_number >= 0 AND press_number <= 5),
                tool_id INTEGER NOT NULL,
                tool_position TEXT NOT NULL,
                total_cycles INTEGER NOT NULL DEFAULT 0,
                date TEXT NOT NULL,
                performed_by INTEGER NOT NULL,
                FOREIGN KEY (tool_id) REFERENCES tools(id),
                FOREIGN KEY (performed_by) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_press_cycles_tool_id ON press_cycles(tool_id);
            CREATE INDEX IF NOT EXISTS idx_press_cycles_tool_position ON press_cycles(tool_position);
            CREATE INDEX IF NOT EXISTS idx_press_cycles_press_number ON press_cycles(press_number);

            CREATE TABLE IF NOT EXISTS tool_regenerations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tool_id INTEGER NOT NULL,
                cycle_id INTEGER NOT NULL,
                reason TEXT,
                performed_by INTEGER,
                FOREIGN KEY (tool_id) REFERENCES tools(id)
            );

            CREATE INDEX IF NOT EXISTS idx_tool_regenerations_tool_id ON tool_regenerations(tool_id);
            ",
        )?;
        Ok(())
    }

    // Cycle ledger

    /// Appends a cycle observation and returns its id.
    ///
    /// The record and the acting operator are validated before any write.
    pub fn add_cycle(&self, cycle: &Cycle, actor: &User) -> Result<CycleId> {
        tracing::debug!(
            actor = %actor.name,
            tool_id = %cycle.tool_id,
            press = %cycle.press,
            position = %cycle.position,
            total_cycles = cycle.total_cycles,
            "adding press cycle"
        );
        cycle.validate()?;
        actor.validate()?;

        self.conn.execute(
            "
            INSERT INTO press_cycles (press_number, tool_id, tool_position, total_cycles, date, performed_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                cycle.press,
                cycle.tool_id,
                cycle.position,
                cycle.total_cycles,
                format_timestamp(cycle.date),
                cycle.performed_by,
            ],
        )?;
        Ok(CycleId(self.conn.last_insert_rowid()))
    }

    /// Fetches a single ledger record, annotated with its partial cycles.
    pub fn cycle(&self, id: CycleId) -> Result<AnnotatedCycle> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, press_number, tool_id, tool_position, total_cycles, date, performed_by
                FROM press_cycles
                WHERE id = ?1
                ",
                params![id],
                CycleRow::from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("press cycle {id}")))?;
        self.annotate_cycle(row.into_cycle()?)
    }

    /// All ledger records for a tool, newest first, annotated.
    pub fn cycles_for_tool(&self, tool_id: ToolId) -> Result<Vec<AnnotatedCycle>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, press_number, tool_id, tool_position, total_cycles, date, performed_by
            FROM press_cycles
            WHERE tool_id = ?1
            ORDER BY date DESC, id DESC
            ",
        )?;
        let rows = stmt.query_map(params![tool_id], CycleRow::from_row)?;
        self.collect_annotated(rows)
    }

    /// Ledger records for a press, newest first, with optional pagination.
    pub fn cycles_for_press(
        &self,
        press: PressNumber,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<AnnotatedCycle>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, press_number, tool_id, tool_position, total_cycles, date, performed_by
            FROM press_cycles
            WHERE press_number = ?1
            ORDER BY date DESC, id DESC
            LIMIT ?2 OFFSET ?3
            ",
        )?;
        let rows = stmt.query_map(
            params![press, limit.unwrap_or(-1), offset.unwrap_or(0)],
            CycleRow::from_row,
        )?;
        self.collect_annotated(rows)
    }

    /// Overwrites a ledger record. Administrative escape hatch; the ledger
    /// is append-only in normal operation.
    pub fn update_cycle(&self, cycle: &Cycle, actor: &User) -> Result<()> {
        tracing::debug!(actor = %actor.name, cycle_id = %cycle.id, "updating press cycle");
        cycle.validate()?;
        actor.validate()?;

        let changed = self.conn.execute(
            "
            UPDATE press_cycles
            SET press_number = ?1, tool_id = ?2, tool_position = ?3, total_cycles = ?4,
                date = ?5, performed_by = ?6
            WHERE id = ?7
            ",
            params![
                cycle.press,
                cycle.tool_id,
                cycle.position,
                cycle.total_cycles,
                format_timestamp(cycle.date),
                cycle.performed_by,
                cycle.id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("press cycle {}", cycle.id)));
        }
        Ok(())
    }

    /// Removes a ledger record. Administrative escape hatch; refused while a
    /// regeneration anchors to the record.
    pub fn delete_cycle(&self, id: CycleId) -> Result<()> {
        tracing::debug!(cycle_id = %id, "deleting press cycle");
        if self.has_regenerations_for_cycle(id)? {
            return Err(Error::Validation(format!(
                "press cycle {id} anchors a regeneration record"
            )));
        }
        let changed = self
            .conn
            .execute("DELETE FROM press_cycles WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("press cycle {id}")));
        }
        Ok(())
    }

    /// Aggregate statistics over a press's ledger.
    pub fn press_stats(&self, press: PressNumber) -> Result<PressStats> {
        let cycles = self.cycles_for_press(press, None, None)?;
        Ok(PressStats::from_cycles(&cycles))
    }

    /// Consolidated tool-usage summaries for one press.
    pub fn press_summaries(&self, press: PressNumber) -> Result<Vec<ToolSummary>> {
        let cycles = self.cycles_for_press(press, None, None)?;
        let tools = self.tools_by_id()?;
        Ok(consolidate(&cycles, &tools))
    }

    /// Cross-press overlap report over all presses in service.
    pub fn overlapping_tools(&self) -> Result<Vec<OverlappingTool>> {
        let mut by_press = HashMap::new();
        for press in PressNumber::all() {
            let summaries = self.press_summaries(press)?;
            if !summaries.is_empty() {
                by_press.insert(press, summaries);
            }
        }
        Ok(detect_overlapping_tools(&by_press))
    }

    /// The largest total-cycles value below `cycle`'s on the same press and
    /// position, regardless of tool.
    fn previous_total(&self, cycle: &Cycle) -> Result<Option<i64>> {
        let previous = self
            .conn
            .query_row(
                "
                SELECT total_cycles
                FROM press_cycles
                WHERE press_number = ?1 AND tool_id > 0 AND tool_position = ?2
                      AND total_cycles < ?3
                ORDER BY total_cycles DESC
                LIMIT 1
                ",
                params![cycle.press, cycle.position, cycle.total_cycles],
                |row| row.get(0),
            )
            .optional()?;
        Ok(previous)
    }

    fn annotate_cycle(&self, cycle: Cycle) -> Result<AnnotatedCycle> {
        let partial_cycles = self
            .previous_total(&cycle)?
            .map_or(cycle.total_cycles, |previous| {
                cycle.total_cycles - previous
            });
        Ok(AnnotatedCycle {
            cycle,
            partial_cycles,
        })
    }

    fn collect_annotated(
        &self,
        rows: impl Iterator<Item = rusqlite::Result<CycleRow>>,
    ) -> Result<Vec<AnnotatedCycle>> {
        let mut cycles = Vec::new();
        for row in rows {
            cycles.push(self.annotate_cycle(row?.into_cycle()?)?);
        }
        Ok(cycles)
    }

    // Tools

    /// Adds a tool and returns its id.
    pub fn add_tool(&self, tool: &Tool) -> Result<ToolId> {
        tracing::debug!(code = %tool.code, position = %tool.position, "adding tool");
        tool.validate()?;

        self.conn.execute(
            "
            INSERT INTO tools (position, width, height, type, code, regenerating, dead, press)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                tool.position,
                tool.format.width,
                tool.format.height,
                tool.kind,
                tool.code,
                tool.regenerating,
                tool.dead,
                tool.press,
            ],
        )?;
        Ok(ToolId(self.conn.last_insert_rowid()))
    }

    /// Lists all tools, ordered by id.
    pub fn tools(&self) -> Result<Vec<Tool>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, position, width, height, type, code, regenerating, dead, press
            FROM tools
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([], tool_from_row)?;
        let mut tools = Vec::new();
        for row in rows {
            tools.push(row?);
        }
        Ok(tools)
    }

    /// All tools keyed by id, for display-code lookups during consolidation.
    pub fn tools_by_id(&self) -> Result<HashMap<ToolId, Tool>> {
        Ok(self
            .tools()?
            .into_iter()
            .map(|tool| (tool.id, tool))
            .collect())
    }

    /// Overwrites a tool's metadata.
    pub fn update_tool(&self, tool: &Tool, actor: &User) -> Result<()> {
        tracing::debug!(actor = %actor.name, tool_id = %tool.id, "updating tool");
        tool.validate()?;
        actor.validate()?;

        let changed = self.conn.execute(
            "
            UPDATE tools
            SET position = ?1, width = ?2, height = ?3, type = ?4, code = ?5,
                regenerating = ?6, dead = ?7, press = ?8
            WHERE id = ?9
            ",
            params![
                tool.position,
                tool.format.width,
                tool.format.height,
                tool.kind,
                tool.code,
                tool.regenerating,
                tool.dead,
                tool.press,
                tool.id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("tool {}", tool.id)));
        }
        Ok(())
    }

    /// Mounts the tool on a press, or takes it off with `None`.
    pub fn set_press(
        &self,
        tool_id: ToolId,
        press: Option<PressNumber>,
        actor: &User,
    ) -> Result<()> {
        tracing::debug!(actor = %actor.name, %tool_id, ?press, "updating tool press assignment");
        actor.validate()?;

        let changed = self.conn.execute(
            "UPDATE tools SET press = ?1 WHERE id = ?2",
            params![press, tool_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("tool {tool_id}")));
        }
        Ok(())
    }

    /// Marks a tool dead. Refused while the tool is mounted on a press.
    pub fn mark_dead(&self, tool_id: ToolId, actor: &User) -> Result<()> {
        tracing::debug!(actor = %actor.name, %tool_id, "marking tool dead");
        actor.validate()?;

        let tool = self.tool(tool_id)?;
        if let Some(press) = tool.press {
            return Err(Error::Validation(format!(
                "tool {tool_id} is active on press {press} and cannot be marked dead"
            )));
        }
        self.conn.execute(
            "UPDATE tools SET dead = 1 WHERE id = ?1",
            params![tool_id],
        )?;
        Ok(())
    }

    /// Reverses [`Database::mark_dead`].
    pub fn revive(&self, tool_id: ToolId, actor: &User) -> Result<()> {
        tracing::debug!(actor = %actor.name, %tool_id, "reviving tool");
        actor.validate()?;

        let changed = self.conn.execute(
            "UPDATE tools SET dead = 0 WHERE id = ?1",
            params![tool_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("tool {tool_id}")));
        }
        Ok(())
    }

    // Users

    /// Adds an operator and returns the assigned id.
    pub fn add_user(&self, name: &str) -> Result<UserId> {
        if name.trim().is_empty() {
            return Err(Error::Validation("user name cannot be empty".to_string()));
        }
        self.conn
            .execute("INSERT INTO users (name) VALUES (?1)", params![name])?;
        Ok(UserId(self.conn.last_insert_rowid()))
    }

    // Regenerations

    /// Fetches a regeneration record by id.
    pub fn regeneration(&self, id: RegenerationId) -> Result<Regeneration> {
        self.conn
            .query_row(
                "
                SELECT id, tool_id, cycle_id, reason, performed_by
                FROM tool_regenerations
                WHERE id = ?1
                ",
                params![id],
                regeneration_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("regeneration {id}")))
    }

    /// A tool's regeneration history, newest first.
    pub fn regeneration_history(&self, tool_id: ToolId) -> Result<Vec<Regeneration>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, tool_id, cycle_id, reason, performed_by
            FROM tool_regenerations
            WHERE tool_id = ?1
            ORDER BY id DESC
            ",
        )?;
        let rows = stmt.query_map(params![tool_id], regeneration_from_row)?;
        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }

    /// Whether any regeneration anchors to the given ledger record.
    pub fn has_regenerations_for_cycle(&self, cycle_id: CycleId) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tool_regenerations WHERE cycle_id = ?1",
            params![cycle_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl ToolDirectory for Database {
    /// Fetches a single tool. Unknown ids are a [`Error::NotFound`].
    fn tool(&self, id: ToolId) -> Result<Tool> {
        self.conn
            .query_row(
                "
                SELECT id, position, width, height, type, code, regenerating, dead, press
                FROM tools
                WHERE id = ?1
                ",
                params![id],
                tool_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("tool {id}")))
    }

    fn set_regenerating(&self, id: ToolId, regenerating: bool, actor: &User) -> Result<()> {
        tracing::debug!(actor = %actor.name, tool_id = %id, regenerating, "updating regenerating flag");
        actor.validate()?;

        let changed = self.conn.execute(
            "UPDATE tools SET regenerating = ?1 WHERE id = ?2",
            params![regenerating, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("tool {id}")));
        }
        Ok(())
    }
}

impl CycleSource for Database {
    fn last_cycle_for_tool(&self, id: ToolId) -> Result<Option<Cycle>> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, press_number, tool_id, tool_position, total_cycles, date, performed_by
                FROM press_cycles
                WHERE tool_id = ?1
                ORDER BY date DESC, id DESC
                LIMIT 1
                ",
                params![id],
                CycleRow::from_row,
            )
            .optional()?;
        row.map(CycleRow::into_cycle).transpose()
    }
}

impl RegenerationStore for Database {
    fn insert(&self, regeneration: &Regeneration) -> Result<RegenerationId> {
        regeneration.validate()?;
        self.conn.execute(
            "
            INSERT INTO tool_regenerations (tool_id, cycle_id, reason, performed_by)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                regeneration.tool_id,
                regeneration.cycle_id,
                regeneration.reason,
                regeneration.performed_by,
            ],
        )?;
        Ok(RegenerationId(self.conn.last_insert_rowid()))
    }

    fn remove(&self, id: RegenerationId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tool_regenerations WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("regeneration {id}")));
        }
        Ok(())
    }

    fn last_for_tool(&self, id: ToolId) -> Result<Option<Regeneration>> {
        let last = self
            .conn
            .query_row(
                "
                SELECT id, tool_id, cycle_id, reason, performed_by
                FROM tool_regenerations
                WHERE tool_id = ?1
                ORDER BY id DESC
                LIMIT 1
                ",
                params![id],
                regeneration_from_row,
            )
            .optional()?;
        Ok(last)
    }
}

impl UserDirectory for Database {
    fn user(&self, id: UserId) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, name FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }

    fn users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM users ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

/// A ledger row before its timestamp has been parsed.
struct CycleRow {
    id: CycleId,
    press: PressNumber,
    tool_id: ToolId,
    position: Position,
    total_cycles: i64,
    date: String,
    performed_by: UserId,
}

impl CycleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            press: row.get(1)?,
            tool_id: row.get(2)?,
            position: row.get(3)?,
            total_cycles: row.get(4)?,
            date: row.get(5)?,
            performed_by: row.get(6)?,
        })
    }

    fn into_cycle(self) -> Result<Cycle> {
        let date = parse_timestamp(&self.date, self.id)?;
        Ok(Cycle {
            id: self.id,
            press: self.press,
            tool_id: self.tool_id,
            position: self.position,
            total_cycles: self.total_cycles,
            date,
            performed_by: self.performed_by,
        })
    }
}

fn tool_from_row(row: &Row<'_>) -> rusqlite::Result<Tool> {
    Ok(Tool {
        id: row.get(0)?,
        position: row.get(1)?,
        format: pt_core::Format {
            width: row.get(2)?,
            height: row.get(3)?,
        },
        kind: row.get(4)?,
        code: row.get(5)?,
        regenerating: row.get(6)?,
        dead: row.get(7)?,
        press: row.get(8)?,
    })
}

fn regeneration_from_row(row: &Row<'_>) -> rusqlite::Result<Regeneration> {
    Ok(Regeneration {
        id: row.get(0)?,
        tool_id: row.get(1)?,
        cycle_id: row.get(2)?,
        reason: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        performed_by: row.get(4)?,
    })
}

fn parse_timestamp(timestamp: &str, id: CycleId) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| Error::TimestampParse {
            id: id.get(),
            value: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
