//! Debug-only guard against re-entering a map from its own `Ops` hooks.
//!
//! Hooks run while a bucket may be half moved (during a kind switch or a
//! rehash). A hook that reaches back into the same map would observe that
//! state, so every public map entry point holds a guard for its duration.
//! Debug builds panic on nested entry; release builds compile the guard
//! away.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
        }
    }

    /// Mark the map busy until the returned guard drops.
    #[inline]
    #[track_caller]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrancy detected: map entered again from inside an Ops hook"
            );
        }
        ReentrancyGuard {
            #[cfg(debug_assertions)]
            owner: self,
            _z: PhantomData,
        }
    }
}

pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_entries_are_ok() {
        let r = DebugReentrancy::new();
        drop(r.enter());
        let _g = r.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter();
            let _inner = r.enter();
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    /// Invariant: a panic while the guard is held releases it during unwinding.
    #[test]
    fn guard_released_by_unwinding() {
        let r = DebugReentrancy::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g = r.enter();
            panic!("hook failed");
        }));
        let _g = r.enter();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_entry_is_noop_in_release() {
        let r = DebugReentrancy::new();
        let _outer = r.enter();
        let _inner = r.enter();
    }
}
