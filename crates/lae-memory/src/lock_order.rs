//! Identity allocation and the global lock order.
//!
//! Identities come from one monotonically increasing counter shared by
//! vectors and matrices, so two distinct objects never compare equal. An
//! equal comparison therefore means an object is being combined with itself,
//! and those calls serialize through [`tie_guard`].

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{const_mutex, Mutex, MutexGuard};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static TIE_LOCK: Mutex<()> = const_mutex(());
static TIE_FALLBACKS: AtomicU64 = AtomicU64::new(0);

/// Which side of a two-object operation to lock first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOrder {
    /// The receiver has the lower identity.
    SelfFirst,
    /// The argument has the lower identity.
    OtherFirst,
    /// Both sides are the same object.
    Tie,
}

/// Compares two identities under the global order.
#[must_use]
pub fn order(this: u64, other: u64) -> LockOrder {
    match this.cmp(&other) {
        std::cmp::Ordering::Less => LockOrder::SelfFirst,
        std::cmp::Ordering::Greater => LockOrder::OtherFirst,
        std::cmp::Ordering::Equal => LockOrder::Tie,
    }
}

/// Number of times any operation fell back to the global tie lock.
#[must_use]
pub fn tie_fallbacks() -> u64 {
    TIE_FALLBACKS.load(Ordering::Relaxed)
}

pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn tie_guard() -> MutexGuard<'static, ()> {
    TIE_FALLBACKS.fetch_add(1, Ordering::Relaxed);
    TIE_LOCK.lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = next_id();
        let b = next_id();
        assert!(b > a);
        assert_eq!(order(a, b), LockOrder::SelfFirst);
        assert_eq!(order(b, a), LockOrder::OtherFirst);
        assert_eq!(order(a, a), LockOrder::Tie);
    }

    #[test]
    fn test_tie_guard_counts_fallbacks() {
        let before = tie_fallbacks();
        drop(tie_guard());
        assert!(tie_fallbacks() > before);
    }
}
