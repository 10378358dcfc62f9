use crate::models::RequestId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const NO_REQUEST: RequestId = 0;

/// Single-flight guard keyed by request id.
///
/// Holds the id of the one operation allowed to be in flight, or nothing. Acquire and
/// release are compare-and-swap on that id, so a finished or aborted request can never
/// release the guard on behalf of a newer one. Clones share the same slot, which lets
/// workers check whether their result is still wanted.
#[derive(Debug, Clone, Default)]
pub struct SingleFlightGuard {
    active: Arc<AtomicU64>,
    next_id: Arc<AtomicU64>,
}

impl SingleFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh request id and take the guard with it.
    ///
    /// # Returns
    /// The new id, or `None` if another request already holds the guard
    pub fn try_acquire(&self) -> Option<RequestId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.active
            .compare_exchange(NO_REQUEST, id, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| id)
    }

    /// Release the guard if (and only if) `id` holds it
    pub fn release(&self, id: RequestId) -> bool {
        id != NO_REQUEST
            && self
                .active
                .compare_exchange(id, NO_REQUEST, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Id of the request holding the guard
    pub fn active(&self) -> Option<RequestId> {
        match self.active.load(Ordering::Acquire) {
            NO_REQUEST => None,
            id => Some(id),
        }
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        id != NO_REQUEST && self.active.load(Ordering::Acquire) == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_single_holder() {
        let guard = SingleFlightGuard::new();

        let first = guard.try_acquire().unwrap();
        assert!(guard.try_acquire().is_none());
        assert_eq!(guard.active(), Some(first));

        assert!(guard.release(first));
        assert_eq!(guard.active(), None);
    }

    #[test]
    fn test_ids_increase() {
        let guard = SingleFlightGuard::new();

        let first = guard.try_acquire().unwrap();
        guard.release(first);
        let second = guard.try_acquire().unwrap();

        assert!(second > first);
    }

    #[test]
    fn test_stale_release_is_ignored() {
        let guard = SingleFlightGuard::new();

        let old = guard.try_acquire().unwrap();
        guard.release(old);
        let new = guard.try_acquire().unwrap();

        assert!(!guard.release(old));
        assert!(guard.is_current(new));
        assert!(!guard.is_current(old));
    }

    #[test]
    fn test_release_of_zero_is_ignored() {
        let guard = SingleFlightGuard::new();
        assert!(!guard.release(0));
        assert!(!guard.is_current(0));
    }

    #[test]
    fn test_concurrent_acquire_has_one_winner() {
        let guard = SingleFlightGuard::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                thread::spawn(move || guard.try_acquire())
            })
            .collect();

        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(winners, 1);
    }
}
