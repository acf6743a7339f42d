//! Debug-only reentrancy check.
//!
//! Foreign runtimes run arbitrary code from hash functions and finalizers.
//! A listener set asks for hashes and releases references, so that code can
//! call back into the same set. `ReentrancyCheck` marks the sections where
//! the set's index and storage may disagree; entering one while another is
//! open panics in debug builds. In release builds it compiles to nothing.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-container busy flag. Guard structural sections with
/// `let _g = self.busy.enter("insert");`.
#[derive(Debug)]
pub(crate) struct ReentrancyCheck {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    _nosend: PhantomData<*mut ()>,
}

impl ReentrancyCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Open a guarded section named `op`. In debug builds, panics if a
    /// section is already open and names both operations.
    #[inline]
    #[allow(unused_variables)]
    pub(crate) fn enter(&self, op: &'static str) -> Section<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!("reentrant `{op}` while `{outer}` is in progress on a listener set");
            }
            self.active.set(Some(op));
            Section { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            Section { _z: PhantomData }
        }
    }
}

impl Default for ReentrancyCheck {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII section returned by `ReentrancyCheck::enter`.
pub(crate) struct Section<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ReentrancyCheck,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReentrancyCheck;

    #[test]
    fn sequential_sections_are_ok() {
        let r = ReentrancyCheck::new();
        {
            let _g = r.enter("insert");
        }
        let _g = r.enter("remove");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_section_panics_in_debug() {
        let r = ReentrancyCheck::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter("insert");
            let _inner = r.enter("remove");
        }));
        assert!(res.is_err(), "expected nested section to panic in debug builds");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_section_is_noop_in_release() {
        let r = ReentrancyCheck::new();
        let _outer = r.enter("insert");
        let _inner = r.enter("remove");
    }
}
