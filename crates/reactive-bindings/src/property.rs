#![forbid(unsafe_code)]

//! Stored reactive values.
//!
//! [`Property<T>`] holds a value directly and broadcasts on writes that
//! change it under its equality rule (default [`PartialEq`]).
//!
//! # Invariants
//!
//! 1. A write equal to the current value fires nothing.
//! 2. A changing write fires "updated" first, then "changed" with the new
//!    value, both after the value is stored.
//! 3. After [`dispose`](Property::dispose) the value is `T::default()` and
//!    both channels are closed; further writes are silent.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::observable::{AsObservable, Observable};
use crate::signal::Signal;

type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;

struct PropertyState<T> {
    value: T,
    disposed: bool,
}

/// A directly writable reactive value cell.
///
/// Cloning a `Property` creates a new handle to the **same** cell.
pub struct Property<T: 'static> {
    state: Rc<RefCell<PropertyState<T>>>,
    equality: Equality<T>,
    updated: Signal,
    changed: Signal<T>,
}

impl<T: 'static> Property<T> {
    /// Create a property with a custom equality rule.
    ///
    /// Writes for which `equality(current, new)` holds are not broadcast.
    pub fn with_equality(value: T, equality: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(PropertyState {
                value,
                disposed: false,
            })),
            equality: Rc::new(equality),
            updated: Signal::new(),
            changed: Signal::new(),
        }
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if the closure writes to the same property.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow().value)
    }

    /// The typed "changed to value" channel.
    #[must_use]
    pub fn changed(&self) -> &Signal<T> {
        &self.changed
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    /// Whether two handles share one cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl<T: PartialEq + 'static> Property<T> {
    /// Create a property compared with `PartialEq`.
    pub fn new(value: T) -> Self {
        Self::with_equality(value, |a, b| a == b)
    }
}

impl<T: Clone + 'static> Property<T> {
    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.state.borrow().value.clone()
    }

    /// Write a new value.
    ///
    /// An equal value (under the equality rule) is stored without any
    /// notification. Returns whether subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        let broadcast = {
            let mut state = self.state.borrow_mut();
            let same = (self.equality)(&state.value, &value);
            let broadcast = (!same && !state.disposed).then(|| value.clone());
            state.value = value;
            broadcast
        };
        match broadcast {
            Some(value) => {
                self.updated.fire(&());
                self.changed.fire(&value);
                true
            }
            None => false,
        }
    }

    /// Apply `f` to a copy of the current value and write the result.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.with(f);
        self.set(next)
    }
}

impl<T: Default + 'static> Property<T> {
    /// Detach every subscriber and reset the value to `T::default()`.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        let previous = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.value)
        };
        debug!(
            updated = self.updated.subscriber_count(),
            changed = self.changed.subscriber_count(),
            "property.dispose"
        );
        self.updated.close();
        self.changed.close();
        drop(previous);
    }
}

impl<T: Default + PartialEq + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: 'static> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            equality: Rc::clone(&self.equality),
            updated: self.updated.clone(),
            changed: self.changed.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Property")
            .field("value", &state.value)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl<T: 'static> Observable for Property<T> {
    fn updated(&self) -> &Signal {
        &self.updated
    }
}

impl<T: 'static> AsObservable for Property<T> {
    fn as_observable(&self) -> Option<&dyn Observable> {
        Some(self)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Property;

    impl<T: Serialize + 'static> Serialize for Property<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.with(|value| value.serialize(serializer))
        }
    }

    impl<'de, T> Deserialize<'de> for Property<T>
    where
        T: Deserialize<'de> + PartialEq + 'static,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            T::deserialize(deserializer).map(Property::new)
        }
    }
}
