//! Shift store capability shared by every persistence backend.
//!
//! The local ledger file, the HTTP remote and the in-memory store all expose
//! the same `get`/`save` contract over `DailyShift`, keyed by day id. `save`
//! is a full overwrite of that day's key, so repeating it is harmless.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::model::{DailyShift, DayId};

#[async_trait]
pub trait ShiftStore: Send + Sync {
    async fn get(&self, day: DayId) -> Result<Option<DailyShift>, StoreError>;

    async fn save(&self, shift: &DailyShift) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Volatile store with per-day failure injection and call counters.
///
/// Test double for the remote store in sync, console and report tests.
#[derive(Debug, Default)]
pub struct MemoryShiftStore {
    shifts: Mutex<BTreeMap<DayId, DailyShift>>,
    fail_get: Mutex<HashSet<DayId>>,
    fail_save: Mutex<HashSet<DayId>>,
    get_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

impl MemoryShiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a shift without counting it as a `save` call.
    pub fn insert(&self, shift: DailyShift) {
        if let Ok(mut shifts) = self.shifts.lock() {
            shifts.insert(shift.id, shift);
        }
    }

    pub fn fail_get_for(&self, day: DayId) {
        if let Ok(mut set) = self.fail_get.lock() {
            set.insert(day);
        }
    }

    pub fn fail_save_for(&self, day: DayId) {
        if let Ok(mut set) = self.fail_save.lock() {
            set.insert(day);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut set) = self.fail_get.lock() {
            set.clear();
        }
        if let Ok(mut set) = self.fail_save.lock() {
            set.clear();
        }
    }

    pub fn days(&self) -> Vec<DayId> {
        self.shifts
            .lock()
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    fn should_fail(set: &Mutex<HashSet<DayId>>, day: DayId) -> bool {
        set.lock().map(|s| s.contains(&day)).unwrap_or(false)
    }
}

#[async_trait]
impl ShiftStore for MemoryShiftStore {
    async fn get(&self, day: DayId) -> Result<Option<DailyShift>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if Self::should_fail(&self.fail_get, day) {
            return Err(StoreError::Backend(format!("read of day {day} failed")));
        }
        let shifts = self
            .shifts
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(shifts.get(&day).cloned())
    }

    async fn save(&self, shift: &DailyShift) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if Self::should_fail(&self.fail_save, shift.id) {
            return Err(StoreError::Backend(format!(
                "write of day {} failed",
                shift.id
            )));
        }
        let mut shifts = self
            .shifts
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        shifts.insert(shift.id, shift.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bill;

    #[tokio::test]
    async fn save_then_get_round_trips_sync_identity() {
        let store = MemoryShiftStore::new();
        let mut shift = DailyShift::new(1_704_067_200);
        shift.add_bill(Bill::with_id("a", 1));
        shift.add_bill(Bill::with_id("b", 2));

        store.save(&shift).await.unwrap();
        let back = store.get(shift.id).await.unwrap().expect("stored shift");

        assert_eq!(back.bill_count(), shift.bill_count());
        assert_eq!(back.last_bill_id(), shift.last_bill_id());
        assert!(shift.matches_remote(&back));
    }

    #[tokio::test]
    async fn repeated_save_overwrites_day() {
        let store = MemoryShiftStore::new();
        let mut shift = DailyShift::new(10);
        shift.add_bill(Bill::with_id("a", 1));
        store.save(&shift).await.unwrap();
        store.save(&shift).await.unwrap();

        assert_eq!(store.days(), vec![10]);
        assert_eq!(store.save_calls(), 2);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let store = MemoryShiftStore::new();
        store.fail_get_for(7);
        store.fail_save_for(7);

        assert!(store.get(7).await.is_err());
        assert!(store.save(&DailyShift::new(7)).await.is_err());
        assert!(store.get(8).await.unwrap().is_none());

        store.clear_failures();
        assert!(store.get(7).await.unwrap().is_none());
    }
}
