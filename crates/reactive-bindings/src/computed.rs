#![forbid(unsafe_code)]

//! Eagerly recomputed values derived from [`Observable`] dependencies.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a factory and its cached result in shared,
//! reference-counted storage. The factory runs once at construction, before
//! any dependency is wired, and then once per "updated" fire of any
//! dependency. Reads never recompute.
//!
//! # Invariants
//!
//! 1. The cached value is always the result of the most recent factory call.
//! 2. Exactly one subscription per dependency, all routed to one recompute
//!    handler.
//! 3. Own signals fire iff `comparison(old, new)` is false. Otherwise the
//!    cache is overwritten silently.
//! 4. `version()` increments by exactly 1 per recomputation that fired.
//!
//! # Failure Modes
//!
//! - **Factory panics**: the panic unwinds through the dependency's fire.
//!   The cache keeps the last value.
//! - **Dependency dropped**: the subscription becomes inert. The computed
//!   keeps its last value and never recomputes from that source again.
//! - **All handles dropped**: the dependency subscriptions are released with
//!   the shared state, so upstream signals stop calling into it.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::observable::{AsObservable, Observable};
use crate::signal::{Signal, Subscription};

struct ComputedState<T> {
    value: T,
    version: u64,
    subscriptions: Vec<Subscription>,
    disposed: bool,
}

/// Shared interior for [`Computed<T>`].
struct ComputedCore<T: 'static> {
    state: RefCell<ComputedState<T>>,
    factory: Box<dyn Fn() -> T>,
    comparison: Box<dyn Fn(&T, &T) -> bool>,
    updated: Signal,
    changed: Signal<T>,
}

impl<T: Clone + 'static> ComputedCore<T> {
    fn recompute(&self) {
        if self.state.borrow().disposed {
            return;
        }
        // No borrow is held while the factory runs. Reading this computed
        // from inside the factory yields the previous cached value.
        let next = (self.factory)();
        let broadcast = {
            let mut state = self.state.borrow_mut();
            let same = (self.comparison)(&state.value, &next);
            let broadcast = (!same).then(|| next.clone());
            state.value = next;
            if broadcast.is_some() {
                state.version += 1;
            }
            broadcast
        };
        trace!(changed = broadcast.is_some(), "computed.recompute");
        if let Some(value) = broadcast {
            self.updated.fire(&());
            self.changed.fire(&value);
        }
    }
}

/// A reactive value derived from other observables and recomputed on their
/// change.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T: 'static> {
    core: Rc<ComputedCore<T>>,
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    /// Create a computed value compared with `PartialEq`.
    ///
    /// `dependencies` are subscribed in order; any of them firing "updated"
    /// reruns `factory`.
    pub fn new(factory: impl Fn() -> T + 'static, dependencies: &[&dyn Observable]) -> Self {
        Self::with_comparison(factory, |a, b| a == b, dependencies)
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value with a custom comparison.
    ///
    /// A recomputation counts as a change when `comparison(old, new)` is
    /// false.
    pub fn with_comparison(
        factory: impl Fn() -> T + 'static,
        comparison: impl Fn(&T, &T) -> bool + 'static,
        dependencies: &[&dyn Observable],
    ) -> Self {
        let value = factory();
        let core = Rc::new(ComputedCore {
            state: RefCell::new(ComputedState {
                value,
                version: 0,
                subscriptions: Vec::with_capacity(dependencies.len()),
                disposed: false,
            }),
            factory: Box::new(factory),
            comparison: Box::new(comparison),
            updated: Signal::new(),
            changed: Signal::new(),
        });

        let subscriptions: Vec<Subscription> = dependencies
            .iter()
            .map(|dependency| {
                let weak: Weak<ComputedCore<T>> = Rc::downgrade(&core);
                dependency.updated().subscribe(move |_| {
                    if let Some(strong) = weak.upgrade() {
                        strong.recompute();
                    }
                })
            })
            .collect();
        core.state.borrow_mut().subscriptions = subscriptions;

        Self { core }
    }

    /// Get a clone of the cached value. Never recomputes.
    #[must_use]
    pub fn get(&self) -> T {
        self.core.state.borrow().value.clone()
    }
}

impl<T: 'static> Computed<T> {
    /// Access the cached value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.core.state.borrow().value)
    }

    /// The typed "changed to value" channel.
    #[must_use]
    pub fn changed(&self) -> &Signal<T> {
        &self.core.changed
    }

    /// Number of recomputations that produced a changed value.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.core.state.borrow().version
    }

    /// Number of dependencies still wired.
    ///
    /// A dependency that was dropped, disposed or already closed at
    /// construction no longer counts.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.core
            .state
            .borrow()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.is_active())
            .count()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.core.state.borrow().disposed
    }
}

impl<T: Default + 'static> Computed<T> {
    /// Detach from every dependency, drop subscribers and reset the cache to
    /// `T::default()`.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        let (subscriptions, previous) = {
            let mut state = self.core.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            (
                std::mem::take(&mut state.subscriptions),
                std::mem::take(&mut state.value),
            )
        };
        debug!(dependencies = subscriptions.len(), "computed.dispose");
        drop(subscriptions);
        drop(previous);
        self.core.updated.close();
        self.core.changed.close();
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.borrow();
        f.debug_struct("Computed")
            .field("cached", &state.value)
            .field("version", &state.version)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl<T: 'static> Observable for Computed<T> {
    fn updated(&self) -> &Signal {
        &self.core.updated
    }
}

impl<T: 'static> AsObservable for Computed<T> {
    fn as_observable(&self) -> Option<&dyn Observable> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
