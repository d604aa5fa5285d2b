#![forbid(unsafe_code)]

//! A set whose mutations, including set algebra, are broadcast as deltas.
//!
//! Every mutating operation first computes its membership delta against the
//! current contents, applies it in one step, (un)wires forwarding only for
//! the elements actually added or removed, and fires at most once, only if
//! the delta was non-empty.
//!
//! Two channels fire, in order: "updated" (no argument), then "changed"
//! carrying a handle to the set itself.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use ahash::{AHashMap, AHashSet};
use tracing::{debug, trace};

use crate::observable::{AsObservable, Observable};
use crate::signal::{Signal, Subscription};

struct SetState<T> {
    values: AHashSet<T>,
    /// One entry per observable element in `values`.
    forwarding: AHashMap<T, Subscription>,
}

struct SetCore<T: 'static> {
    state: RefCell<SetState<T>>,
    updated: Signal,
    changed: Signal<ObservableHashSet<T>>,
}

/// Observable hash set.
///
/// Cloning creates a new handle to the **same** set.
pub struct ObservableHashSet<T: 'static> {
    core: Rc<SetCore<T>>,
}

impl<T> ObservableHashSet<T>
where
    T: Eq + Hash + Clone + AsObservable + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(SetCore {
                state: RefCell::new(SetState {
                    values: AHashSet::new(),
                    forwarding: AHashMap::new(),
                }),
                updated: Signal::new(),
                changed: Signal::new(),
            }),
        }
    }

    fn from_core(core: Rc<SetCore<T>>) -> Self {
        Self { core }
    }

    fn register(&self, item: &T) -> Option<Subscription> {
        item.as_observable().map(|nested| {
            let weak: Weak<SetCore<T>> = Rc::downgrade(&self.core);
            nested.updated().subscribe(move |_| {
                if let Some(core) = weak.upgrade() {
                    ObservableHashSet::from_core(core).broadcast();
                }
            })
        })
    }

    fn broadcast(&self) {
        self.core.updated.fire(&());
        self.core.changed.fire(self);
    }

    /// Apply a precomputed delta. `added` must be disjoint from the current
    /// contents and `removed` a subset of them.
    fn apply(&self, added: Vec<T>, removed: Vec<T>) -> bool {
        if added.is_empty() && removed.is_empty() {
            return false;
        }
        trace!(added = added.len(), removed = removed.len(), "set.apply");
        let wired: Vec<(T, Subscription)> = added
            .iter()
            .filter_map(|item| self.register(item).map(|sub| (item.clone(), sub)))
            .collect();
        let released: Vec<Subscription> = {
            let mut state = self.core.state.borrow_mut();
            for item in &removed {
                state.values.remove(item);
            }
            let released = removed
                .iter()
                .filter_map(|item| state.forwarding.remove(item))
                .collect();
            state.values.extend(added);
            state.forwarding.extend(wired);
            released
        };
        drop(released);
        self.broadcast();
        true
    }

    /// Add `item`. Returns `false` (and fires nothing) if already present.
    pub fn insert(&self, item: T) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.apply(vec![item], Vec::new())
    }

    /// Remove `item`. Returns `false` (and fires nothing) if absent.
    pub fn remove(&self, item: &T) -> bool {
        if !self.contains(item) {
            return false;
        }
        self.apply(Vec::new(), vec![item.clone()])
    }

    /// Remove every element matching `predicate`; returns how many.
    ///
    /// The predicate runs against a snapshot, so it may read the set.
    pub fn remove_where(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let doomed: Vec<T> = self.to_vec().into_iter().filter(|item| predicate(item)).collect();
        let count = doomed.len();
        self.apply(Vec::new(), doomed);
        count
    }

    /// Remove every element. Fires only if the set was non-empty.
    pub fn clear(&self) {
        let (values, released) = {
            let mut state = self.core.state.borrow_mut();
            (
                std::mem::take(&mut state.values),
                std::mem::take(&mut state.forwarding),
            )
        };
        if values.is_empty() {
            return;
        }
        drop(released);
        drop(values);
        self.broadcast();
    }

    /// Clear (firing if non-empty), then close both channels.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        if self.core.updated.is_closed() {
            return;
        }
        debug!(elements = self.len(), "set.dispose");
        self.clear();
        self.core.updated.close();
        self.core.changed.close();
    }

    /// Add every element of `other` not already present.
    pub fn union_with(&self, other: impl IntoIterator<Item = T>) -> bool {
        let added: Vec<T> = {
            let state = self.core.state.borrow();
            collect_set(other)
                .into_iter()
                .filter(|item| !state.values.contains(item))
                .collect()
        };
        self.apply(added, Vec::new())
    }

    /// Keep only elements also present in `other`.
    pub fn intersect_with(&self, other: impl IntoIterator<Item = T>) -> bool {
        let other = collect_set(other);
        let removed: Vec<T> = {
            let state = self.core.state.borrow();
            state
                .values
                .iter()
                .filter(|item| !other.contains(*item))
                .cloned()
                .collect()
        };
        self.apply(Vec::new(), removed)
    }

    /// Remove every element present in `other`.
    pub fn except_with(&self, other: impl IntoIterator<Item = T>) -> bool {
        let removed: Vec<T> = {
            let state = self.core.state.borrow();
            collect_set(other)
                .into_iter()
                .filter(|item| state.values.contains(item))
                .collect()
        };
        self.apply(Vec::new(), removed)
    }

    /// Keep elements present in exactly one of `self` and `other`.
    pub fn symmetric_except_with(&self, other: impl IntoIterator<Item = T>) -> bool {
        let (added, removed): (Vec<T>, Vec<T>) = {
            let state = self.core.state.borrow();
            collect_set(other)
                .into_iter()
                .partition(|item| !state.values.contains(item))
        };
        self.apply(added, removed)
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.core.state.borrow().values.contains(item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.state.borrow().values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.state.borrow().values.is_empty()
    }

    /// Snapshot of the elements in the backing set's order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.core.state.borrow().values.iter().cloned().collect()
    }

    /// Visit every element.
    ///
    /// # Panics
    ///
    /// Panics if the closure mutates this set.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        for item in self.core.state.borrow().values.iter() {
            f(item);
        }
    }

    #[must_use]
    pub fn is_subset_of(&self, other: impl IntoIterator<Item = T>) -> bool {
        let other = collect_set(other);
        self.core.state.borrow().values.is_subset(&other)
    }

    #[must_use]
    pub fn is_superset_of(&self, other: impl IntoIterator<Item = T>) -> bool {
        let other = collect_set(other);
        self.core.state.borrow().values.is_superset(&other)
    }

    #[must_use]
    pub fn is_proper_subset_of(&self, other: impl IntoIterator<Item = T>) -> bool {
        let other = collect_set(other);
        let state = self.core.state.borrow();
        state.values.len() < other.len() && state.values.is_subset(&other)
    }

    #[must_use]
    pub fn is_proper_superset_of(&self, other: impl IntoIterator<Item = T>) -> bool {
        let other = collect_set(other);
        let state = self.core.state.borrow();
        state.values.len() > other.len() && state.values.is_superset(&other)
    }

    #[must_use]
    pub fn overlaps(&self, other: impl IntoIterator<Item = T>) -> bool {
        let state = self.core.state.borrow();
        other.into_iter().any(|item| state.values.contains(&item))
    }

    #[must_use]
    pub fn set_equals(&self, other: impl IntoIterator<Item = T>) -> bool {
        let other = collect_set(other);
        self.core.state.borrow().values == other
    }

    /// The "changed" channel, carrying the set after each mutation.
    #[must_use]
    pub fn changed(&self) -> &Signal<ObservableHashSet<T>> {
        &self.core.changed
    }

    /// Whether two handles share one set.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    #[cfg(test)]
    fn forwarding_count(&self) -> usize {
        self.core.state.borrow().forwarding.len()
    }
}

fn collect_set<T: Eq + Hash>(items: impl IntoIterator<Item = T>) -> AHashSet<T> {
    items.into_iter().collect()
}

impl<T> Default for ObservableHashSet<T>
where
    T: Eq + Hash + Clone + AsObservable + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for ObservableHashSet<T>
where
    T: Eq + Hash + Clone + AsObservable + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let set = Self::new();
        set.union_with(iter);
        set
    }
}

impl<T: 'static> Clone for ObservableHashSet<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ObservableHashSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.core.state.borrow().values.iter())
            .finish()
    }
}

impl<T: 'static> Observable for ObservableHashSet<T> {
    fn updated(&self) -> &Signal {
        &self.core.updated
    }
}

impl<T: 'static> AsObservable for ObservableHashSet<T> {
    fn as_observable(&self) -> Option<&dyn Observable> {
        Some(self)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::hash::Hash;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ObservableHashSet;
    use crate::observable::AsObservable;

    impl<T: Serialize + 'static> Serialize for ObservableHashSet<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.core.state.borrow().values.iter())
        }
    }

    impl<'de, T> Deserialize<'de> for ObservableHashSet<T>
    where
        T: Deserialize<'de> + Eq + Hash + Clone + AsObservable + 'static,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            // Rebuilt through `union_with`, which wires every observable element.
            let items = Vec::<T>::deserialize(deserializer)?;
            Ok(items.into_iter().collect())
        }
    }
}
