#![forbid(unsafe_code)]

//! Observable collections and reactive properties with synchronous change
//! propagation.
//!
//! - [`Signal`]: ordered subscriber list; [`Subscription`] detaches on drop.
//! - [`Observable`] / [`AsObservable`]: the capability every observable type
//!   implements, and the query containers run on the values they store.
//! - [`ObservableDictionary`] / [`ObservableHashSet`]: containers that fire
//!   once per content-changing call and forward nested observables.
//! - [`Property`]: stored value cell with notification deduplication.
//! - [`Computed`]: cached value recomputed eagerly on dependency change.
//! - [`PropertyExt::map`]: derive a [`Computed`] from any property.
//!
//! # Architecture
//!
//! Every handle is `Rc<RefCell<..>>` based: single-threaded, cheap to
//! clone, `!Send`. A mutation fires its signals on the caller's stack after
//! the new state is visible, and dependents recompute before the call
//! returns. No internal borrow is held while handlers run.
//!
//! Forwarding subscriptions hold only weak references back to the
//! container, so nesting never creates reference cycles.
//!
//! # Example
//!
//! ```
//! use reactive_bindings::{Observable, Property, PropertyExt};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let price = Property::new(5);
//! let doubled = price.map(|p| p * 2);
//! assert_eq!(doubled.get(), 10);
//!
//! let fires = Rc::new(Cell::new(0));
//! let f = Rc::clone(&fires);
//! doubled.on_updated(move || f.set(f.get() + 1));
//!
//! price.set(7);
//! assert_eq!(doubled.get(), 14);
//! price.set(7);
//! assert_eq!(fires.get(), 1);
//! ```

pub mod collections;
pub mod computed;
pub mod derive;
pub mod error;
pub mod observable;
pub mod property;
pub mod signal;

pub use collections::{Cursor, ObservableDictionary, ObservableHashSet};
pub use computed::Computed;
pub use derive::{PropertyExt, ReadProperty};
pub use error::{ReactiveError, Result};
pub use observable::{AsObservable, Observable, Trigger};
pub use property::Property;
pub use signal::{Signal, Subscription, SubscriptionId, WeakSignal};
