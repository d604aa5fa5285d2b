#![forbid(unsafe_code)]

//! The observable capability and the capability query containers run on
//! every value they store.
//!
//! - [`Observable`]: anything exposing an "updated" [`Signal`].
//! - [`AsObservable`]: an explicit opt-in query. Containers call
//!   [`as_observable`](AsObservable::as_observable) when a value is inserted
//!   and, on `Some`, forward that value's "updated" channel to their own.
//! - [`Trigger`]: a value-less observable fired by hand.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::signal::{Signal, Subscription};

/// A value that announces changes to its own state.
pub trait Observable {
    /// The zero-argument "updated" channel.
    fn updated(&self) -> &Signal;

    /// Subscribe a zero-argument handler to [`updated`](Self::updated).
    fn subscribe_updated(&self, handler: impl Fn() + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.updated().subscribe(move |_| handler())
    }

    /// Chainable form of [`subscribe_updated`](Self::subscribe_updated): the
    /// handler stays attached for the lifetime of the observable.
    fn on_updated(&self, handler: impl Fn() + 'static) -> &Self
    where
        Self: Sized,
    {
        self.subscribe_updated(handler).detach();
        self
    }
}

/// Capability query: "is this stored value itself observable?"
///
/// The default answers `None`. Observable types answer `Some(self)`; wrapper
/// types forward to what they wrap.
pub trait AsObservable {
    fn as_observable(&self) -> Option<&dyn Observable> {
        None
    }
}

macro_rules! inert {
    ($($ty:ty),* $(,)?) => {
        $(impl AsObservable for $ty {})*
    };
}

inert!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
    std::path::PathBuf,
);

impl<T> AsObservable for Vec<T> {}

impl<A: AsObservable, B: AsObservable> AsObservable for (A, B) {}

impl<T: AsObservable + ?Sized> AsObservable for Box<T> {
    fn as_observable(&self) -> Option<&dyn Observable> {
        (**self).as_observable()
    }
}

impl<T: AsObservable + ?Sized> AsObservable for Rc<T> {
    fn as_observable(&self) -> Option<&dyn Observable> {
        (**self).as_observable()
    }
}

impl<T: AsObservable> AsObservable for Option<T> {
    fn as_observable(&self) -> Option<&dyn Observable> {
        self.as_ref().and_then(AsObservable::as_observable)
    }
}

/// A value-less observable. [`update`](Trigger::update) fires "updated".
///
/// Cloning creates a new handle to the same trigger. Equality and hashing
/// use identity, so triggers can live in sets.
#[derive(Clone, Default)]
pub struct Trigger {
    updated: Signal,
}

impl Trigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce that something changed.
    pub fn update(&self) {
        self.updated.fire(&());
    }

    /// Detach every subscriber; later updates are silent.
    pub fn dispose(&self) {
        self.updated.close();
    }
}

impl Observable for Trigger {
    fn updated(&self) -> &Signal {
        &self.updated
    }
}

impl AsObservable for Trigger {
    fn as_observable(&self) -> Option<&dyn Observable> {
        Some(self)
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        self.updated.ptr_eq(&other.updated)
    }
}

impl Eq for Trigger {}

impl Hash for Trigger {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.updated.as_ptr(), state);
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("subscribers", &self.updated.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn trigger_fires_updated() {
        let trigger = Trigger::new();
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        let _sub = trigger.subscribe_updated(move || h.set(h.get() + 1));

        trigger.update();
        trigger.update();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn on_updated_is_chainable() {
        let hits = Rc::new(Cell::new(0u32));
        let (h1, h2) = (Rc::clone(&hits), Rc::clone(&hits));
        let trigger = Trigger::new();
        trigger
            .on_updated(move || h1.set(h1.get() + 1))
            .on_updated(move || h2.set(h2.get() + 10));

        trigger.update();
        assert_eq!(hits.get(), 11);
    }

    #[test]
    fn disposed_trigger_is_silent() {
        let trigger = Trigger::new();
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        trigger.on_updated(move || h.set(h.get() + 1));

        trigger.dispose();
        trigger.update();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn trigger_identity() {
        let a = Trigger::new();
        let b = a.clone();
        let c = Trigger::new();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn capability_query() {
        assert!(5i32.as_observable().is_none());
        assert!("text".as_observable().is_none());
        assert!(String::from("text").as_observable().is_none());
        assert!(Trigger::new().as_observable().is_some());
        assert!(Some(Trigger::new()).as_observable().is_some());
        assert!(None::<Trigger>.as_observable().is_none());
        assert!(Rc::new(Trigger::new()).as_observable().is_some());
        assert!(Box::new(Trigger::new()).as_observable().is_some());
    }
}
