#![forbid(unsafe_code)]

//! Subscriber registries used by every observable in the crate.
//!
//! A [`Signal<A>`] is an ordered list of handlers receiving `&A`. The
//! zero-argument "updated" channel is `Signal<()>`; typed "changed to value"
//! channels are `Signal<T>`.
//!
//! # Design
//!
//! `Signal` is a cheap, cloneable handle to shared `Rc<RefCell<..>>` storage.
//! The registry does not own subscriber lifetimes: [`subscribe`](Signal::subscribe)
//! returns a [`Subscription`] guard that detaches its handler when dropped
//! (or on [`Subscription::unsubscribe`]). The guard only holds a `Weak`
//! reference, so a subscription never keeps a signal alive.
//!
//! # Invariants
//!
//! 1. Handlers run in subscription order, synchronously, on the firing thread.
//! 2. Snapshot semantics: a handler subscribed while a fire is in progress is
//!    not invoked by that fire. A handler detached mid-fire that has not run
//!    yet is skipped.
//! 3. No registry borrow is held while a handler runs, so handlers may
//!    subscribe, unsubscribe or fire re-entrantly.
//! 4. After [`close`](Signal::close) the signal is inert: `subscribe` returns
//!    an inactive guard and `fire` is a no-op.
//!
//! # Failure Modes
//!
//! - **Handler panics**: the panic unwinds through `fire`; handlers later in
//!   the snapshot are not invoked for that fire. The registry itself stays
//!   consistent.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

/// Token identifying one handler inside one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

struct Slot<A> {
    id: SubscriptionId,
    active: Cell<bool>,
    handler: Box<dyn Fn(&A)>,
}

struct Registry<A> {
    next_id: u64,
    slots: Vec<Rc<Slot<A>>>,
    closed: bool,
}

impl<A> Registry<A> {
    fn new() -> Self {
        Self {
            next_id: 1,
            slots: Vec::new(),
            closed: false,
        }
    }

    fn take(&mut self, id: SubscriptionId) -> Option<Rc<Slot<A>>> {
        let pos = self.slots.iter().position(|slot| slot.id == id)?;
        Some(self.slots.remove(pos))
    }
}

/// Type-erased detach capability so [`Subscription`] is not generic.
trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
    fn is_attached(&self, id: SubscriptionId) -> bool;
}

impl<A> Detach for RefCell<Registry<A>> {
    fn detach(&self, id: SubscriptionId) -> bool {
        // Release the borrow before the handler (and whatever it captured) drops.
        let removed = self.borrow_mut().take(id);
        match removed {
            Some(slot) => {
                slot.active.set(false);
                true
            }
            None => false,
        }
    }

    fn is_attached(&self, id: SubscriptionId) -> bool {
        self.borrow().slots.iter().any(|slot| slot.id == id)
    }
}

/// An ordered, single-threaded subscriber list.
///
/// Cloning a `Signal` creates a new handle to the **same** registry.
pub struct Signal<A: 'static = ()> {
    registry: Rc<RefCell<Registry<A>>>,
}

impl<A: 'static> Signal<A> {
    /// Create an empty, open signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry::new())),
        }
    }

    /// Append `handler` to the subscriber list.
    ///
    /// The handler stays attached until the returned guard is dropped or
    /// [`Subscription::unsubscribe`]d. Call [`Subscription::detach`] to keep
    /// it attached for the lifetime of the signal instead.
    pub fn subscribe(&self, handler: impl Fn(&A) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        if registry.closed {
            return Subscription::inert();
        }
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.slots.push(Rc::new(Slot {
            id,
            active: Cell::new(true),
            handler: Box::new(handler),
        }));
        drop(registry);

        let weak: Weak<dyn Detach> = Rc::downgrade(&self.registry) as Weak<dyn Detach>;
        Subscription {
            id,
            registry: Some(weak),
        }
    }

    /// Remove the handler registered under `id`.
    ///
    /// Returns `false` if no such handler is attached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.detach(id)
    }

    /// Invoke every currently attached handler once, in subscription order.
    pub fn fire(&self, arg: &A) {
        let snapshot: Vec<Rc<Slot<A>>> = {
            let registry = self.registry.borrow();
            if registry.closed || registry.slots.is_empty() {
                return;
            }
            registry.slots.clone()
        };
        trace!(subscribers = snapshot.len(), "signal.fire");
        for slot in &snapshot {
            if slot.active.get() {
                (slot.handler)(arg);
            }
        }
    }

    /// Drop every subscriber and make the signal inert.
    ///
    /// Idempotent.
    pub fn close(&self) {
        let drained = {
            let mut registry = self.registry.borrow_mut();
            if registry.closed {
                return;
            }
            registry.closed = true;
            std::mem::take(&mut registry.slots)
        };
        debug!(subscribers = drained.len(), "signal.close");
        for slot in &drained {
            slot.active.set(false);
        }
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.registry.borrow().closed
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().slots.len()
    }

    /// A non-owning handle to this signal.
    #[must_use]
    pub fn downgrade(&self) -> WeakSignal<A> {
        WeakSignal {
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Whether two handles share one registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }

    pub(crate) fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.registry).cast()
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<A: 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("Signal")
            .field("subscribers", &registry.slots.len())
            .field("closed", &registry.closed)
            .finish()
    }
}

/// Non-owning handle to a [`Signal`], used for forwarding from nested values.
pub struct WeakSignal<A: 'static = ()> {
    registry: Weak<RefCell<Registry<A>>>,
}

impl<A: 'static> WeakSignal<A> {
    /// Upgrade to a strong handle if the signal is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Signal<A>> {
        self.registry.upgrade().map(|registry| Signal { registry })
    }

    /// Fire the signal if it is still alive. Returns whether it was.
    pub fn fire(&self, arg: &A) -> bool {
        match self.upgrade() {
            Some(signal) => {
                signal.fire(arg);
                true
            }
            None => false,
        }
    }
}

impl<A: 'static> Clone for WeakSignal<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Weak::clone(&self.registry),
        }
    }
}

impl<A: 'static> fmt::Debug for WeakSignal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSignal")
            .field("alive", &(self.registry.strong_count() > 0))
            .finish()
    }
}

/// RAII guard for one handler. Dropping it detaches the handler.
#[must_use = "dropping a Subscription detaches its handler immediately"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Option<Weak<dyn Detach>>,
}

impl Subscription {
    fn inert() -> Self {
        Self {
            id: SubscriptionId(0),
            registry: None,
        }
    }

    /// The token of the handler this guard controls.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the handler is still attached to a live signal.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|registry| registry.is_attached(self.id))
    }

    /// Detach the handler now. Returns `false` if it was already gone.
    pub fn unsubscribe(mut self) -> bool {
        match self.registry.take().and_then(|weak| weak.upgrade()) {
            Some(registry) => registry.detach(self.id),
            None => false,
        }
    }

    /// Forget the guard, leaving the handler attached until the signal is
    /// closed or dropped.
    pub fn detach(mut self) {
        self.registry = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
