//! Swappable, process-wide key material.
//!
//! Signing services read key material on every request and replace it only on
//! startup or an explicit reload. Readers clone an `Arc` to the current value
//! and never hold the lock while doing cryptographic work; a reload builds the
//! complete replacement first and installs it with a single pointer swap.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

/// Shared handle to a value that is replaced wholesale, never mutated in place.
#[derive(Debug)]
pub struct KeyHandle<T> {
    inner: Arc<RwLock<Slot<T>>>,
}

#[derive(Debug)]
struct Slot<T> {
    current: Arc<T>,
    generation: u64,
    last_rotated: Option<DateTime<Utc>>,
}

impl<T> Clone for KeyHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> KeyHandle<T> {
    /// Create a handle holding the initial value (generation 0).
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Slot {
                current: Arc::new(initial),
                generation: 0,
                last_rotated: None,
            })),
        }
    }

    /// Snapshot of the current value.
    ///
    /// The snapshot stays valid (and unchanged) even if a swap happens while
    /// the caller is still using it.
    pub fn load(&self) -> Arc<T> {
        let slot = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&slot.current)
    }

    /// Atomically replace the current value and return the previous one.
    pub fn swap(&self, replacement: T) -> Arc<T> {
        let replacement = Arc::new(replacement);
        let mut slot = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::mem::replace(&mut slot.current, replacement);
        slot.generation += 1;
        slot.last_rotated = Some(Utc::now());
        debug!(generation = slot.generation, "key material swapped");
        previous
    }

    /// Number of swaps performed since construction.
    pub fn generation(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .generation
    }

    /// Time of the last swap, if any.
    pub fn last_rotated(&self) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last_rotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_returns_initial_value() {
        let handle = KeyHandle::new(String::from("k1"));
        assert_eq!(handle.load().as_str(), "k1");
        assert_eq!(handle.generation(), 0);
        assert!(handle.last_rotated().is_none());
    }

    #[test]
    fn swap_is_visible_to_every_clone() {
        let handle = KeyHandle::new(1u32);
        let other = handle.clone();

        let previous = handle.swap(2);
        assert_eq!(*previous, 1);
        assert_eq!(*other.load(), 2);
        assert_eq!(other.generation(), 1);
        assert!(other.last_rotated().is_some());
    }

    #[test]
    fn snapshot_survives_swap() {
        let handle = KeyHandle::new(vec![1u8, 2, 3]);
        let snapshot = handle.load();
        handle.swap(vec![9u8]);

        assert_eq!(snapshot.as_slice(), &[1, 2, 3]);
        assert_eq!(handle.load().as_slice(), &[9]);
    }

    #[test]
    fn concurrent_readers_never_observe_partial_values() {
        let handle = KeyHandle::new((0u64, 0u64));
        let writer = {
            let handle = handle.clone();
            std::thread::spawn(move || {
                for i in 1..=500u64 {
                    handle.swap((i, i));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let pair = handle.load();
                        assert_eq!(pair.0, pair.1);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(handle.generation(), 500);
    }
}
