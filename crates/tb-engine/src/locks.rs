//! Per-character exclusive sections.
//!
//! Sections are created lazily on first use and dropped again when their
//! character is deleted. There is no global lock: work on different
//! characters runs in parallel.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tb_core::CharacterId;

/// A lock table keyed by character id.
#[derive(Debug, Default)]
pub struct LockTable {
    sections: DashMap<CharacterId, Arc<Mutex<()>>>,
}

impl LockTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, id: CharacterId) -> Arc<Mutex<()>> {
        // Clone the Arc out so the shard lock is released before blocking.
        Arc::clone(self.sections.entry(id).or_default().value())
    }

    /// Run `f` inside one character's section.
    ///
    /// A panic in an earlier holder does not poison the section: state is
    /// only ever swapped in after a successful save.
    pub fn with_section<T>(&self, id: CharacterId, f: impl FnOnce() -> T) -> T {
        let mutex = self.mutex(id);
        let _guard = mutex.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Run `f` inside two characters' sections, entered in ascending id order.
    ///
    /// The same id twice enters a single section.
    pub fn with_pair<T>(&self, a: CharacterId, b: CharacterId, f: impl FnOnce() -> T) -> T {
        if a == b {
            return self.with_section(a, f);
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let first = self.mutex(low);
        let second = self.mutex(high);
        let _first = first.lock().unwrap_or_else(PoisonError::into_inner);
        let _second = second.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Drop a character's section if nobody is inside or waiting on it.
    ///
    /// A section still in use is kept; the next removal will take it.
    pub fn remove(&self, id: CharacterId) -> bool {
        self.sections
            .remove_if(&id, |_, mutex| Arc::strong_count(mutex) == 1)
            .is_some()
    }

    /// Number of live sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether there are no live sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    #[test]
    fn sections_are_created_lazily() {
        let table = LockTable::new();
        assert!(table.is_empty());
        let a = CharacterId::new();
        assert_eq!(table.with_section(a, || 7), 7);
        table.with_section(a, || ());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removed_sections_are_dropped_unless_held() {
        let table = LockTable::new();
        let a = CharacterId::new();
        table.with_section(a, || assert!(!table.remove(a)));
        assert_eq!(table.len(), 1);
        assert!(table.remove(a));
        assert!(table.is_empty());
        assert!(!table.remove(a));
    }

    #[test]
    fn same_id_pair_does_not_deadlock() {
        let table = LockTable::new();
        let a = CharacterId::new();
        assert!(table.with_pair(a, a, || true));
    }

    #[test]
    fn sections_serialize_work_on_one_character() {
        let table = Arc::new(LockTable::new());
        let id = CharacterId::new();
        let inside = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    table.with_section(id, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn opposite_pairs_do_not_deadlock() {
        let table = Arc::new(LockTable::new());
        let a = CharacterId::new();
        let b = CharacterId::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    let (x, y) = if i % 2 == 0 { (a, b) } else { (b, a) };
                    table.with_pair(x, y, thread::yield_now);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(table.len(), 2);
    }
}
