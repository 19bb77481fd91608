//! A one-slot signal.
//!
//! `acquire` waits until the permit is open and closes it again, taking
//! whatever value it was opened with. `release` opens it once; releasing
//! an already open permit changes nothing. This is a signal, not a lock:
//! the thread that waits is never the one that releases.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct Permit<T> {
    slot: Mutex<Option<T>>,
    opened: Condvar,
}

impl<T> Default for Permit<T> {
    fn default() -> Self {
        Permit {
            slot: Mutex::new(None),
            opened: Condvar::new(),
        }
    }
}

impl<T> Permit<T> {
    /// A closed permit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until released, then close and return the release value.
    pub fn acquire(&self) -> T {
        let mut slot = self.lock();
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            slot = self.opened.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Open the permit with `value`. Returns `false`, dropping `value`, if
    /// it is already open.
    pub fn release(&self, value: T) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        self.opened.notify_one();
        true
    }

    /// Open the permit with `value` even if it is already open, returning
    /// the release it displaced.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut slot = self.lock();
        let previous = slot.replace(value);
        self.opened.notify_one();
        previous
    }

    /// Close without waiting, discarding a stale release.
    pub fn clear(&self) {
        self.lock().take();
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn release_before_acquire_is_kept() {
        let permit = Permit::new();

        assert!(permit.release(1));
        assert!(permit.is_open());
        assert_eq!(permit.acquire(), 1);
        assert!(!permit.is_open());
    }

    #[test]
    fn second_release_is_ignored() {
        let permit = Permit::new();

        assert!(permit.release("first"));
        assert!(!permit.release("second"));
        assert_eq!(permit.acquire(), "first");
    }

    #[test]
    fn acquire_blocks_until_released() {
        let permit = Arc::new(Permit::new());

        let waiter = {
            let permit = permit.clone();
            thread::spawn(move || permit.acquire())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        permit.release(7);
        assert_eq!(waiter.join().unwrap(), 7);
    }

    #[test]
    fn replace_overrides_an_unconsumed_release() {
        let permit = Permit::new();

        assert_eq!(permit.replace("a"), None);
        assert_eq!(permit.replace("b"), Some("a"));
        assert_eq!(permit.acquire(), "b");
    }

    #[test]
    fn clear_drops_a_stale_release() {
        let permit = Permit::new();

        permit.release(1);
        permit.clear();
        permit.release(2);

        assert_eq!(permit.acquire(), 2);
    }
}
