//! C7: the observer registry. Bounded, deterministic-order, and never
//! blocks a publisher on a sink.

use heapless::Vec;
use rot_host_api::Observer;

/// Maximum number of observers that may be registered on a single
/// `ObserverRegistry`. Sized generously for logging + metrics + an
/// operator console sink without needing a heap.
pub const MAX_OBSERVERS: usize = 8;

/// A bounded, ordered set of `&dyn Observer<E>` references. `publish`
/// notifies every registered observer, in registration order, once per
/// event; a registry at capacity refuses further registrations rather than
/// evicting an existing one.
pub struct ObserverRegistry<'o, E> {
    observers: Vec<&'o dyn Observer<E>, MAX_OBSERVERS>,
}

impl<'o, E: Copy> ObserverRegistry<'o, E> {
    pub const fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Register an observer. Returns `false` (and registers nothing) if the
    /// registry is already at `MAX_OBSERVERS`; a missing registration is
    /// simply an empty set, never a null pointer.
    pub fn register(&mut self, observer: &'o dyn Observer<E>) -> bool {
        self.observers.push(observer).is_ok()
    }

    /// Notify every registered observer of `event`, in registration order.
    /// A panic inside one observer is not caught in production (`no_std`
    /// has no `catch_unwind`); the contract is that `Observer::on_event`
    /// itself must not panic.
    pub fn publish(&self, event: E) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl<'o, E: Copy> Default for ObserverRegistry<'o, E> {
    fn default() -> Self {
        Self::new()
    }
}
