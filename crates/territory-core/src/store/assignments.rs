//! Assignment store: region -> representative mapping with undo/redo history
//! and debounced persistence.
//!
//! Every change to `present` goes through the history (`commit`, `undo`,
//! `redo`), and every one of them marks the store dirty and re-arms the
//! persistence timer. Mutators that would leave `present` unchanged are
//! no-ops: they neither push history nor arm the timer.
//!
//! The store never validates representative names; callers own that.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{self, now_utc, Assignment, AssignmentMap, ASSIGNMENTS_KEY};
use crate::store::debounce::{DebounceTimer, DEFAULT_DEBOUNCE};
use crate::store::history::{History, HISTORY_LIMIT};
use crate::store::kv::{self, KvStore};
use crate::store::reconcile::{self, Conflict};

pub struct AssignmentStore {
    history: History<AssignmentMap>,
    kv: Arc<dyn KvStore>,
    timer: DebounceTimer,
    last_saved_at: Option<DateTime<Utc>>,
    is_dirty: bool,
}

impl AssignmentStore {
    /// Load `present` from storage with the default debounce and history
    /// limit. Missing or malformed data yields an empty map.
    pub fn load(kv: Arc<dyn KvStore>) -> Self {
        Self::load_with(kv, DEFAULT_DEBOUNCE, HISTORY_LIMIT)
    }

    pub fn load_with(kv: Arc<dyn KvStore>, debounce: Duration, history_limit: usize) -> Self {
        let present: AssignmentMap = kv::load_json(kv.as_ref(), ASSIGNMENTS_KEY).unwrap_or_default();
        debug!("Loaded {} assignments from storage", present.len());
        Self {
            history: History::with_limit(present, history_limit),
            kv,
            timer: DebounceTimer::new(debounce),
            last_saved_at: None,
            is_dirty: false,
        }
    }

    // -----------------------------------------------------------------------
    // Snapshot accessors
    // -----------------------------------------------------------------------

    pub fn present(&self) -> &AssignmentMap {
        self.history.present()
    }

    pub fn get(&self, code: &str) -> Option<&Assignment> {
        self.present().get(code)
    }

    pub fn owned_by(&self, rep_name: &str) -> Vec<&str> {
        models::owned_by(self.present(), rep_name)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.past_len()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.future_len()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// When the pending write becomes due, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Desired codes that `sync_ownership` would take from other owners.
    pub fn conflicts<S: AsRef<str>>(&self, rep_name: &str, desired: &[S]) -> Vec<Conflict> {
        reconcile::conflicts(self.present(), rep_name, desired)
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Assign one region with a fresh timestamp.
    pub fn set_one(&mut self, code: &str, rep_name: &str) -> bool {
        if code.is_empty() {
            return false;
        }
        let mut next = self.present().clone();
        next.insert(code.to_string(), Assignment::new(rep_name, now_utc()));
        self.commit(next)
    }

    /// Unassign one region. Removing an absent code changes nothing and
    /// records no history.
    pub fn remove_one(&mut self, code: &str) -> bool {
        if !self.present().contains_key(code) {
            return false;
        }
        let mut next = self.present().clone();
        next.remove(code);
        self.commit(next)
    }

    /// Assign every code to `rep_name` with one shared timestamp, as a single
    /// history step.
    pub fn bulk_assign<S: AsRef<str>>(&mut self, codes: &[S], rep_name: &str) -> bool {
        let now = now_utc();
        let mut next = self.present().clone();
        for code in codes.iter().map(|c| c.as_ref()).filter(|c| !c.is_empty()) {
            next.insert(code.to_string(), Assignment::new(rep_name, now));
        }
        self.commit(next)
    }

    /// Make `rep_name` own exactly `desired`, taking regions from other
    /// owners where needed. One history step.
    pub fn sync_ownership<S: AsRef<str>>(&mut self, rep_name: &str, desired: &[S]) -> bool {
        let desired: Vec<&str> = desired
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !c.is_empty())
            .collect();
        let next = reconcile::sync_ownership(self.present(), rep_name, &desired[..], now_utc());
        self.commit(next)
    }

    /// Rewrite every assignment pointing at `old_name`. Returns how many
    /// assignments changed; history is only pushed when that is non-zero.
    pub fn rename_representative_everywhere(&mut self, old_name: &str, new_name: &str) -> usize {
        if old_name == new_name {
            return 0;
        }
        let mut next = self.present().clone();
        let mut changed = 0;
        for assignment in next.values_mut().filter(|a| a.rep_name == old_name) {
            assignment.rep_name = new_name.to_string();
            changed += 1;
        }
        if changed > 0 {
            self.commit(next);
        }
        changed
    }

    pub fn clear_all(&mut self) -> bool {
        self.commit(AssignmentMap::new())
    }

    /// Replace `present` with already-validated data.
    pub fn import_snapshot(&mut self, map: AssignmentMap) -> bool {
        self.commit(map)
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.mark_changed();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.mark_changed();
        }
        moved
    }

    fn commit(&mut self, next: AssignmentMap) -> bool {
        if next == *self.present() {
            return false;
        }
        self.history.push(next);
        self.mark_changed();
        true
    }

    fn mark_changed(&mut self) {
        self.is_dirty = true;
        self.timer.arm(Instant::now());
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write `present` if the debounce deadline has passed.
    pub fn poll_persist(&mut self) -> bool {
        self.poll_persist_at(Instant::now())
    }

    pub fn poll_persist_at(&mut self, now: Instant) -> bool {
        if self.timer.fire(now) {
            self.write();
            true
        } else {
            false
        }
    }

    /// Write immediately if there are unsaved changes.
    pub fn flush(&mut self) -> bool {
        if !self.is_dirty {
            return false;
        }
        self.timer.cancel();
        self.write();
        true
    }

    /// Failed writes are logged and otherwise treated as committed.
    fn write(&mut self) {
        match kv::save_json(self.kv.as_ref(), ASSIGNMENTS_KEY, self.present()) {
            Ok(()) => debug!("Persisted {} assignments", self.present().len()),
            Err(e) => warn!("Failed to persist assignments: {e}"),
        }
        self.last_saved_at = Some(now_utc());
        self.is_dirty = false;
    }
}

impl Drop for AssignmentStore {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{TerritoryError, TerritoryResult};
    use crate::store::kv::MemoryKv;

    struct FailingKv;

    impl KvStore for FailingKv {
        fn get(&self, _key: &str) -> TerritoryResult<Option<String>> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> TerritoryResult<()> {
            Err(TerritoryError::Database("disk full".into()))
        }
        fn remove(&self, _key: &str) -> TerritoryResult<()> {
            Ok(())
        }
    }

    fn store() -> (Arc<MemoryKv>, AssignmentStore) {
        let kv = Arc::new(MemoryKv::new());
        let store = AssignmentStore::load(kv.clone());
        (kv, store)
    }

    fn reps(map: &AssignmentMap) -> Vec<(&str, &str)> {
        map.iter()
            .map(|(c, a)| (c.as_str(), a.rep_name.as_str()))
            .collect()
    }

    #[test]
    fn concrete_bulk_sync_undo_scenario() {
        let (_kv, mut s) = store();
        assert!(s.bulk_assign(&["CA", "TX"], "Alice"));
        assert_eq!(reps(s.present()), vec![("CA", "Alice"), ("TX", "Alice")]);
        assert!(s.can_undo());
        assert!(!s.can_redo());
        let after_bulk = s.present().clone();

        assert!(s.sync_ownership("Alice", &["CA", "NY"]));
        assert_eq!(reps(s.present()), vec![("CA", "Alice"), ("NY", "Alice")]);

        assert!(s.undo());
        assert_eq!(*s.present(), after_bulk);
        assert!(s.can_redo());
    }

    #[test]
    fn bulk_assign_is_one_step_with_shared_timestamp() {
        let (_kv, mut s) = store();
        s.bulk_assign(&["CA", "TX", "NY"], "Bob");
        assert_eq!(s.undo_depth(), 1);
        let stamps: Vec<_> = s.present().values().map(|a| a.assigned_at).collect();
        assert!(stamps.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn empty_inputs_are_no_ops() {
        let (_kv, mut s) = store();
        assert!(!s.bulk_assign::<&str>(&[], "Bob"));
        assert!(!s.set_one("", "Bob"));
        assert!(!s.clear_all());
        assert!(!s.remove_one("CA"));
        assert!(!s.undo());
        assert!(!s.redo());
        assert!(!s.can_undo());
        assert!(!s.is_dirty());
    }

    #[test]
    fn remove_absent_code_does_not_pollute_history() {
        let (_kv, mut s) = store();
        s.set_one("CA", "Alice");
        assert!(!s.remove_one("TX"));
        assert_eq!(s.undo_depth(), 1);
        assert!(s.remove_one("CA"));
        assert_eq!(s.undo_depth(), 2);
        assert!(s.present().is_empty());
    }

    #[test]
    fn rename_propagation_pushes_exactly_once() {
        let (_kv, mut s) = store();
        s.set_one("CA", "Bob");
        s.set_one("TX", "Bob");
        s.set_one("NY", "Alice");
        let depth = s.undo_depth();
        let stamp = s.get("CA").unwrap().assigned_at;

        assert_eq!(s.rename_representative_everywhere("Bob", "Robert"), 2);
        assert_eq!(s.undo_depth(), depth + 1);
        assert_eq!(s.get("CA").unwrap().rep_name, "Robert");
        assert_eq!(s.get("CA").unwrap().assigned_at, stamp);
        assert_eq!(s.get("NY").unwrap().rep_name, "Alice");

        assert_eq!(s.rename_representative_everywhere("Nobody", "Someone"), 0);
        assert_eq!(s.undo_depth(), depth + 1);
    }

    #[test]
    fn history_is_bounded_and_recoverable() {
        let (_kv, mut s) = store();
        let mut states = vec![s.present().clone()];
        for i in 0..60 {
            s.set_one(&format!("R{i:02}"), "Alice");
            states.push(s.present().clone());
            assert!(s.undo_depth() <= HISTORY_LIMIT);
        }
        assert_eq!(s.undo_depth(), HISTORY_LIMIT);

        for expected in states.iter().rev().skip(1).take(HISTORY_LIMIT) {
            assert!(s.undo());
            assert_eq!(s.present(), expected);
        }
        assert!(!s.undo());
    }

    #[test]
    fn undo_then_redo_restores_exact_state() {
        let (_kv, mut s) = store();
        s.set_one("CA", "Alice");
        s.bulk_assign(&["TX", "NY"], "Bob");
        s.sync_ownership("Carol", &["NY", "FL"]);
        s.remove_one("CA");
        s.rename_representative_everywhere("Bob", "Robert");
        let final_state = s.present().clone();

        for _ in 0..5 {
            assert!(s.undo());
        }
        assert!(s.present().is_empty());
        for _ in 0..5 {
            assert!(s.redo());
        }
        assert_eq!(*s.present(), final_state);
    }

    #[test]
    fn mutation_after_undo_clears_redo() {
        let (_kv, mut s) = store();
        s.set_one("CA", "Alice");
        s.set_one("TX", "Alice");
        s.undo();
        s.undo();
        assert!(s.can_redo());
        s.set_one("NY", "Bob");
        assert!(!s.can_redo());
    }

    #[test]
    fn sync_leaves_other_owners_alone_and_steals_conflicts() {
        let (_kv, mut s) = store();
        s.bulk_assign(&["WA", "OR"], "Bob");
        let wa_before = s.get("WA").cloned();
        assert_eq!(s.conflicts("Alice", &["OR", "CA"]).len(), 1);

        s.sync_ownership("Alice", &["OR", "CA"]);
        assert_eq!(s.get("WA").cloned(), wa_before);
        assert_eq!(s.get("OR").unwrap().rep_name, "Alice");
        assert_eq!(s.owned_by("Alice"), vec!["CA", "OR"]);
    }

    #[test]
    fn changes_are_debounced_into_one_write() {
        let (kv, mut s) = store();
        s.set_one("CA", "Alice");
        s.set_one("TX", "Alice");
        s.set_one("NY", "Alice");
        assert!(s.is_dirty());
        assert_eq!(kv.get(ASSIGNMENTS_KEY).unwrap(), None);

        let deadline = s.next_deadline().unwrap();
        assert!(!s.poll_persist_at(deadline - Duration::from_millis(1)));
        assert!(s.poll_persist_at(deadline));
        assert!(!s.poll_persist_at(deadline + Duration::from_secs(1)));
        assert!(!s.is_dirty());
        assert!(s.last_saved_at().is_some());

        let stored: AssignmentMap =
            serde_json::from_str(&kv.get(ASSIGNMENTS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, *s.present());
    }

    #[test]
    fn undo_and_redo_also_mark_dirty() {
        let (_kv, mut s) = store();
        s.set_one("CA", "Alice");
        s.flush();
        assert!(!s.is_dirty());
        s.undo();
        assert!(s.is_dirty());
        s.flush();
        s.redo();
        assert!(s.is_dirty());
    }

    #[test]
    fn reload_restores_persisted_present() {
        let kv = Arc::new(MemoryKv::new());
        let saved = {
            let mut s = AssignmentStore::load(kv.clone());
            s.bulk_assign(&["ON", "QC"], "Dana");
            s.present().clone()
        };
        // Dropping the store flushed it.
        let reloaded = AssignmentStore::load(kv);
        assert_eq!(*reloaded.present(), saved);
        assert!(!reloaded.can_undo());
    }

    #[test]
    fn malformed_storage_loads_empty() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(ASSIGNMENTS_KEY, r#"{"CA": {"repName": 7}}"#).unwrap();
        let s = AssignmentStore::load(kv);
        assert!(s.present().is_empty());
    }

    #[test]
    fn failed_write_is_swallowed() {
        let mut s = AssignmentStore::load(Arc::new(FailingKv));
        s.set_one("CA", "Alice");
        assert!(s.flush());
        assert!(!s.is_dirty());
        assert!(s.last_saved_at().is_some());
    }
}
