#![forbid(unsafe_code)]

//! Derivation: building a [`Computed`] from an existing property.
//!
//! [`PropertyExt::map`] wires the source as the sole dependency of a new
//! computed whose factory reads the source and applies the mapping. A chain
//! of `map` calls forms a linear dependency graph; a write to the root
//! cascades through every link in one call stack.

use crate::computed::Computed;
use crate::observable::Observable;
use crate::property::Property;
use crate::signal::Signal;

/// Read access shared by stored and computed properties.
pub trait ReadProperty<T: 'static>: Observable + Clone + 'static {
    /// Access the current value by reference.
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// The typed "changed to value" channel.
    fn changed(&self) -> &Signal<T>;

    /// Get a clone of the current value.
    fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }
}

impl<T: 'static> ReadProperty<T> for Property<T> {
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Property::with(self, f)
    }

    fn changed(&self) -> &Signal<T> {
        Property::changed(self)
    }
}

impl<T: 'static> ReadProperty<T> for Computed<T> {
    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Computed::with(self, f)
    }

    fn changed(&self) -> &Signal<T> {
        Computed::changed(self)
    }
}

/// Combinators available on every [`ReadProperty`].
pub trait PropertyExt<T: 'static>: ReadProperty<T> {
    /// Derive a computed property `f(self)`, recomputed whenever `self`
    /// fires "updated".
    fn map<U, F>(&self, f: F) -> Computed<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let source = self.clone();
        let dependencies: [&dyn Observable; 1] = [self];
        Computed::new(move || source.with(&f), &dependencies)
    }

    /// Subscribe `handler` to the typed channel for the lifetime of the
    /// property. Chainable.
    fn on_changed(&self, handler: impl Fn(&T) + 'static) -> &Self {
        self.changed().subscribe(handler).detach();
        self
    }
}

impl<T: 'static, P: ReadProperty<T>> PropertyExt<T> for P {}
