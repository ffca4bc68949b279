//! The regeneration state machine.
//!
//! Regenerating a tool resets its cycle-counting lineage: the record anchors
//! to the tool's last ledger entry, and later counter readings are treated
//! as a fresh baseline. The tracker operates over capability traits so the
//! storage layer (or a test stub) is injected at construction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::cycle::Cycle;
use crate::error::{Error, Result};
use crate::ids::{CycleId, RegenerationId, ToolId, UserId};
use crate::tool::Tool;
use crate::user::User;

/// A refurbishment event anchored to a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regeneration {
    pub id: RegenerationId,
    pub tool_id: ToolId,
    /// The last ledger entry before the reset.
    pub cycle_id: CycleId,
    pub reason: String,
    pub performed_by: Option<UserId>,
}

impl Regeneration {
    pub fn new(
        tool_id: ToolId,
        cycle_id: CycleId,
        reason: impl Into<String>,
        performed_by: Option<UserId>,
    ) -> Self {
        Self {
            id: RegenerationId(0),
            tool_id,
            cycle_id,
            reason: reason.into(),
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
        if !self.cycle_id.is_assigned() {
            return Err(Error::Validation(format!(
                "invalid cycle id: {}",
                self.cycle_id
            )));
        }
        Ok(())
    }
}

/// Tool metadata access and the only writer of the regenerating flag besides
/// this tracker.
pub trait ToolDirectory {
    fn tool(&self, id: ToolId) -> Result<Tool>;
    fn set_regenerating(&self, id: ToolId, regenerating: bool, actor: &User) -> Result<()>;
}

/// Ledger access limited to what the tracker needs.
pub trait CycleSource {
    fn last_cycle_for_tool(&self, id: ToolId) -> Result<Option<Cycle>>;
}

/// Persistence of regeneration records.
pub trait RegenerationStore {
    fn insert(&self, regeneration: &Regeneration) -> Result<RegenerationId>;
    fn remove(&self, id: RegenerationId) -> Result<()>;
    fn last_for_tool(&self, id: ToolId) -> Result<Option<Regeneration>>;
}

/// Per-tool mutual exclusion for flag-and-record mutations.
///
/// Two concurrent starts on the same tool would otherwise both pass the
/// already-regenerating check.
#[derive(Debug, Default)]
pub struct ToolLocks {
    locks: Mutex<HashMap<ToolId, Arc<Mutex<()>>>>,
}

impl ToolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for one tool; created on first use.
    pub fn acquire(&self, tool_id: ToolId) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(tool_id).or_default())
    }
}

/// Drives a tool through Available / Active / Regenerating / Dead.
pub struct RegenerationTracker<'a> {
    tools: &'a dyn ToolDirectory,
    cycles: &'a dyn CycleSource,
    store: &'a dyn RegenerationStore,
    locks: &'a ToolLocks,
}

impl<'a> RegenerationTracker<'a> {
    pub const fn new(
        tools: &'a dyn ToolDirectory,
        cycles: &'a dyn CycleSource,
        store: &'a dyn RegenerationStore,
        locks: &'a ToolLocks,
    ) -> Self {
        Self {
            tools,
            cycles,
            store,
            locks,
        }
    }

    /// Starts a regeneration: anchors to the tool's last ledger entry, sets
    /// the regenerating flag, then inserts the record.
    ///
    /// A tool without any ledger entries has no baseline to reset and is a
    /// [`Error::NotFound`]. If the insert fails after the flag was set, the
    /// flag is rolled back; a rollback failure is logged and the insert
    /// error returned.
    pub fn start(
        &self,
        tool_id: ToolId,
        reason: &str,
        actor: &User,
    ) -> Result<RegenerationId> {
        tracing::debug!(%tool_id, actor = %actor.name, "starting tool regeneration");
        actor.validate()?;

        let lock = self.locks.acquire(tool_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let anchor = self
            .cycles
            .last_cycle_for_tool(tool_id)?
            .ok_or_else(|| Error::NotFound(format!("cycles for tool {tool_id}")))?;

        let tool = self.tools.tool(tool_id)?;
        if tool.regenerating {
            return Err(Error::Validation(format!(
                "tool {tool_id} is already regenerating"
            )));
        }

        let regeneration = Regeneration::new(tool_id, anchor.id, reason, Some(actor.id));
        regeneration.validate()?;

        self.tools.set_regenerating(tool_id, true, actor)?;

        match self.store.insert(&regeneration) {
            Ok(id) => Ok(id),
            Err(insert_error) => {
                if let Err(rollback_error) = self.tools.set_regenerating(tool_id, false, actor) {
                    tracing::error!(
                        %tool_id,
                        error = %rollback_error,
                        "failed to roll back regenerating flag after insert failure"
                    );
                }
                Err(insert_error)
            }
        }
    }

    /// Completes a regeneration: clears the flag, history is retained.
    pub fn stop(&self, tool_id: ToolId, actor: &User) -> Result<()> {
        tracing::debug!(%tool_id, actor = %actor.name, "stopping tool regeneration");
        actor.validate()?;
        self.tools.set_regenerating(tool_id, false, actor)
    }

    /// Cancels a regeneration: deletes the latest record, then clears the
    /// flag. With no record to delete the flag is still cleared, so abort is
    /// idempotent.
    pub fn abort(&self, tool_id: ToolId, actor: &User) -> Result<()> {
        tracing::debug!(%tool_id, actor = %actor.name, "aborting tool regeneration");
        actor.validate()?;

        let lock = self.locks.acquire(tool_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = self.store.last_for_tool(tool_id)? {
            let tool = self.tools.tool(tool_id)?;
            if !tool.regenerating {
                return Err(Error::Validation(format!(
                    "tool {tool_id} is not regenerating"
                )));
            }
            self.store.remove(last.id)?;
        } else {
            tracing::debug!(%tool_id, "no regeneration record to abort");
        }

        self.tools.set_regenerating(tool_id, false, actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::press::PressNumber;
    use crate::tool::Format;
    use chrono::{TimeZone, Utc};
    use std::cell::{Cell, RefCell};

    struct Stub {
        tool: RefCell<Tool>,
        last_cycle: Option<Cycle>,
        records: RefCell<Vec<Regeneration>>,
        next_id: Cell<i64>,
        fail_insert: bool,
        fail_rollback: Cell<bool>,
    }

    impl Stub {
        fn new(with_cycle: bool) -> Self {
            let mut tool = Tool::new(Position::Top, Format::new(100, 200), "G01", "FC");
            tool.id = ToolId(7);

            let last_cycle = with_cycle.then(|| {
                let mut cycle = Cycle::new(
                    PressNumber::new(2).unwrap(),
                    ToolId(7),
                    Position::Top,
                    1500,
                    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
                    UserId(1),
                );
                cycle.id = CycleId(42);
                cycle
            });

            Self {
                tool: RefCell::new(tool),
                last_cycle,
                records: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                fail_insert: false,
                fail_rollback: Cell::new(false),
            }
        }

        fn regenerating(&self) -> bool {
            self.tool.borrow().regenerating
        }
    }

    impl ToolDirectory for Stub {
        fn tool(&self, _id: ToolId) -> Result<Tool> {
            Ok(self.tool.borrow().clone())
        }

        fn set_regenerating(&self, _id: ToolId, regenerating: bool, _actor: &User) -> Result<()> {
            if !regenerating && self.fail_rollback.get() {
                return Err(Error::Validation("directory unavailable".to_string()));
            }
            self.tool.borrow_mut().regenerating = regenerating;
            Ok(())
        }
    }

    impl CycleSource for Stub {
        fn last_cycle_for_tool(&self, _id: ToolId) -> Result<Option<Cycle>> {
            Ok(self.last_cycle.clone())
        }
    }

    impl RegenerationStore for Stub {
        fn insert(&self, regeneration: &Regeneration) -> Result<RegenerationId> {
            if self.fail_insert {
                return Err(Error::Validation("store unavailable".to_string()));
            }
            let id = RegenerationId(self.next_id.get());
            self.next_id.set(id.get() + 1);
            let mut stored = regeneration.clone();
            stored.id = id;
            self.records.borrow_mut().push(stored);
            Ok(id)
        }

        fn remove(&self, id: RegenerationId) -> Result<()> {
            self.records.borrow_mut().retain(|record| record.id != id);
            Ok(())
        }

        fn last_for_tool(&self, id: ToolId) -> Result<Option<Regeneration>> {
            Ok(self
                .records
                .borrow()
                .iter()
                .filter(|record| record.tool_id == id)
                .next_back()
                .cloned())
        }
    }

    fn actor() -> User {
        User::new(UserId(1), "dana")
    }

    fn tracker<'a>(stub: &'a Stub, locks: &'a ToolLocks) -> RegenerationTracker<'a> {
        // same stub serves all three capabilities
        RegenerationTracker::new(stub, stub, stub, locks)
    }

    #[test]
    fn start_anchors_to_the_last_cycle() {
        let stub = Stub::new(true);
        let locks = ToolLocks::new();
        let id = tracker(&stub, &locks)
            .start(ToolId(7), "worn edges", &actor())
            .unwrap();

        assert!(stub.regenerating());
        let records = stub.records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].cycle_id, CycleId(42));
        assert_eq!(records[0].performed_by, Some(UserId(1)));
    }

    #[test]
    fn start_without_cycles_is_not_found() {
        let stub = Stub::new(false);
        let locks = ToolLocks::new();
        let err = tracker(&stub, &locks)
            .start(ToolId(7), "worn edges", &actor())
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!stub.regenerating());
    }

    #[test]
    fn start_rejects_an_already_regenerating_tool() {
        let stub = Stub::new(true);
        stub.tool.borrow_mut().regenerating = true;
        let locks = ToolLocks::new();
        let err = tracker(&stub, &locks)
            .start(ToolId(7), "worn edges", &actor())
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(stub.records.borrow().is_empty());
    }

    #[test]
    fn failed_insert_rolls_the_flag_back() {
        let mut stub = Stub::new(true);
        stub.fail_insert = true;
        let locks = ToolLocks::new();
        let err = tracker(&stub, &locks)
            .start(ToolId(7), "worn edges", &actor())
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(!stub.regenerating());
        assert!(stub.records.borrow().is_empty());
    }

    #[test]
    fn failed_rollback_still_returns_the_insert_error() {
        let mut stub = Stub::new(true);
        stub.fail_insert = true;
        stub.fail_rollback.set(true);
        let locks = ToolLocks::new();
        let err = tracker(&stub, &locks)
            .start(ToolId(7), "worn edges", &actor())
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        // the rollback failed, so the flag is stuck set
        assert!(stub.regenerating());
    }

    #[test]
    fn stop_clears_the_flag_and_keeps_history() {
        let stub = Stub::new(true);
        let locks = ToolLocks::new();
        let tracker = tracker(&stub, &locks);

        tracker.start(ToolId(7), "worn edges", &actor()).unwrap();
        tracker.stop(ToolId(7), &actor()).unwrap();

        assert!(!stub.regenerating());
        assert_eq!(stub.records.borrow().len(), 1);
    }

    #[test]
    fn abort_deletes_the_record_and_clears_the_flag() {
        let stub = Stub::new(true);
        let locks = ToolLocks::new();
        let tracker = tracker(&stub, &locks);

        tracker.start(ToolId(7), "worn edges", &actor()).unwrap();
        tracker.abort(ToolId(7), &actor()).unwrap();

        assert!(!stub.regenerating());
        assert!(stub.records.borrow().is_empty());
    }

    #[test]
    fn abort_without_a_record_still_clears_the_flag() {
        let stub = Stub::new(true);
        stub.tool.borrow_mut().regenerating = true;
        let locks = ToolLocks::new();

        tracker(&stub, &locks).abort(ToolId(7), &actor()).unwrap();
        assert!(!stub.regenerating());
    }

    #[test]
    fn abort_with_a_record_but_cleared_flag_is_rejected() {
        let stub = Stub::new(true);
        let locks = ToolLocks::new();
        let tracker = tracker(&stub, &locks);

        tracker.start(ToolId(7), "worn edges", &actor()).unwrap();
        stub.tool.borrow_mut().regenerating = false;

        let err = tracker.abort(ToolId(7), &actor()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(stub.records.borrow().len(), 1);
    }

    #[test]
    fn invalid_actor_is_rejected_before_any_mutation() {
        let stub = Stub::new(true);
        let locks = ToolLocks::new();
        let err = tracker(&stub, &locks)
            .start(ToolId(7), "worn edges", &User::new(UserId(0), ""))
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(!stub.regenerating());
    }

    #[test]
    fn locks_are_shared_per_tool() {
        let locks = ToolLocks::new();
        let first = locks.acquire(ToolId(1));
        let again = locks.acquire(ToolId(1));
        let other = locks.acquire(ToolId(2));

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn regeneration_validation() {
        assert!(Regeneration::new(ToolId(1), CycleId(1), "r", None)
            .validate()
            .is_ok());
        assert!(Regeneration::new(ToolId(0), CycleId(1), "r", None)
            .validate()
            .is_err());
        assert!(Regeneration::new(ToolId(1), CycleId(0), "r", None)
            .validate()
            .is_err());
    }
}
