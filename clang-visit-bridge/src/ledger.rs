//! Allocation ledger for boxed records
//!
//! Counts how many records of each kind were boxed and disposed, so leaks
//! across the boundary show up as a non-zero live count. Counting is a
//! shared read of the kind table plus an atomic increment.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{const_rwlock, RwLock};
use serde::Serialize;

/// Box/dispose counters for one record kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    /// Records boxed so far
    pub boxed: u64,
    /// Records disposed so far
    pub disposed: u64,
}

impl KindStats {
    /// Records currently alive
    pub fn live(&self) -> i64 {
        self.boxed as i64 - self.disposed as i64
    }
}

/// Live counters for one kind; never freed once registered
#[derive(Default)]
struct Counters {
    boxed: AtomicU64,
    disposed: AtomicU64,
}

impl Counters {
    fn stats(&self) -> KindStats {
        // Disposed first: a record is always counted boxed before disposed
        let disposed = self.disposed.load(Ordering::Acquire);
        let boxed = self.boxed.load(Ordering::Acquire);
        KindStats { boxed, disposed }
    }
}

// Few kinds exist, so a linear table is enough. The lock is only taken
// exclusively the first time a kind shows up.
static LEDGER: RwLock<Vec<(&'static str, &'static Counters)>> = const_rwlock(Vec::new());

fn counters(kind: &'static str) -> &'static Counters {
    if let Some(counters) = find(&LEDGER.read(), kind) {
        return counters;
    }

    let mut table = LEDGER.write();
    if let Some(counters) = find(&table, kind) {
        return counters;
    }
    let counters: &'static Counters = Box::leak(Box::new(Counters::default()));
    table.push((kind, counters));
    counters
}

fn find(table: &[(&'static str, &'static Counters)], kind: &str) -> Option<&'static Counters> {
    table.iter().find(|(name, _)| *name == kind).map(|(_, counters)| *counters)
}

pub(crate) fn note_boxed(kind: &'static str) {
    counters(kind).boxed.fetch_add(1, Ordering::AcqRel);
}

pub(crate) fn note_disposed(kind: &'static str) {
    counters(kind).disposed.fetch_add(1, Ordering::AcqRel);
}

/// Counters for one kind (zero if never boxed)
pub fn snapshot(kind: &str) -> KindStats {
    find(&LEDGER.read(), kind).map(Counters::stats).unwrap_or_default()
}

/// Counters for every kind seen so far
pub fn snapshot_all() -> Vec<(&'static str, KindStats)> {
    LEDGER.read().iter().map(|(name, counters)| (*name, counters.stats())).collect()
}
