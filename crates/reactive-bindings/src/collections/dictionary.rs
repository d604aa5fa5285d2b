#![forbid(unsafe_code)]

//! A keyed container that broadcasts every structural mutation.
//!
//! # Invariants
//!
//! 1. Every mutating call that changes content fires "updated" exactly once,
//!    after the change is visible. Assignment always counts as a change.
//! 2. `clear()` on an empty dictionary and `remove()` of a missing key fire
//!    nothing.
//! 3. Each stored value that reports the observable capability holds exactly
//!    one forwarding subscription, released when the entry leaves.
//! 4. A forwarded fire from a nested value re-fires "updated" without
//!    touching membership.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::debug;

use super::cursor::Cursor;
use crate::error::{ReactiveError, Result};
use crate::observable::{AsObservable, Observable};
use crate::signal::{Signal, Subscription};

struct Entry<V> {
    value: V,
    /// Present iff `value` is observable.
    forwarding: Option<Subscription>,
}

struct DictionaryCore<K, V> {
    entries: RefCell<AHashMap<K, Entry<V>>>,
    updated: Signal,
}

/// Observable dictionary.
///
/// Cloning creates a new handle to the **same** dictionary. No borrow is
/// held while "updated" fires, so handlers may read or mutate it.
pub struct ObservableDictionary<K: 'static, V: 'static> {
    core: Rc<DictionaryCore<K, V>>,
}

impl<K, V> ObservableDictionary<K, V>
where
    K: Eq + Hash + 'static,
    V: AsObservable + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(DictionaryCore {
                entries: RefCell::new(AHashMap::new()),
                updated: Signal::new(),
            }),
        }
    }

    fn wrap(&self, value: V) -> Entry<V> {
        let forwarding = value.as_observable().map(|nested| {
            let target = self.core.updated.downgrade();
            nested.updated().subscribe(move |_| {
                target.fire(&());
            })
        });
        Entry { value, forwarding }
    }

    fn broadcast(&self) {
        self.core.updated.fire(&());
    }

    /// Insert or overwrite. Always fires once.
    pub fn set(&self, key: K, value: V) {
        let entry = self.wrap(value);
        let previous = self.core.entries.borrow_mut().insert(key, entry);
        // Releases the old value's forwarding outside the borrow.
        drop(previous);
        self.broadcast();
    }

    /// Insert only if `key` is absent; fires on success.
    pub fn try_add(&self, key: K, value: V) -> Result<()> {
        if self.contains_key(&key) {
            return Err(ReactiveError::DuplicateKey);
        }
        let entry = self.wrap(value);
        self.core.entries.borrow_mut().insert(key, entry);
        self.broadcast();
        Ok(())
    }

    /// Remove `key`. Fires only if an entry was removed.
    pub fn remove(&self, key: &K) -> bool {
        let removed = self.core.entries.borrow_mut().remove(key);
        match removed {
            Some(entry) => {
                drop(entry);
                self.broadcast();
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Fires only if the dictionary was non-empty.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.core.entries.borrow_mut());
        if drained.is_empty() {
            return;
        }
        drop(drained);
        self.broadcast();
    }

    /// Clear (firing if non-empty), then close "updated".
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        if self.core.updated.is_closed() {
            return;
        }
        debug!(entries = self.len(), "dictionary.dispose");
        self.clear();
        self.core.updated.close();
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.core.entries.borrow().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.entries.borrow().is_empty()
    }

    /// Borrow the value under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the closure mutates this dictionary.
    pub fn with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.core.entries.borrow().get(key).map(|entry| f(&entry.value))
    }

    /// Visit every pair in the backing map's order.
    ///
    /// # Panics
    ///
    /// Panics if the closure mutates this dictionary.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (key, entry) in self.core.entries.borrow().iter() {
            f(key, &entry.value);
        }
    }

    /// Whether two handles share one dictionary.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    #[cfg(test)]
    fn forwarding_count(&self) -> usize {
        self.core
            .entries
            .borrow()
            .values()
            .filter(|entry| entry.forwarding.is_some())
            .count()
    }
}

impl<K, V> ObservableDictionary<K, V>
where
    K: Eq + Hash + 'static,
    V: AsObservable + PartialEq + 'static,
{
    /// Whether `key` maps to a value equal to `value`.
    #[must_use]
    pub fn contains(&self, key: &K, value: &V) -> bool {
        self.with(key, |stored| stored == value).unwrap_or(false)
    }

    /// Remove `key` only if it maps to a value equal to `value`.
    pub fn remove_entry(&self, key: &K, value: &V) -> bool {
        self.contains(key, value) && self.remove(key)
    }
}

impl<K, V> ObservableDictionary<K, V>
where
    K: Eq + Hash + 'static,
    V: AsObservable + Clone + 'static,
{
    /// Clone of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.with(key, V::clone)
    }

    /// Clone of the value under `key`, or [`ReactiveError::KeyNotFound`].
    pub fn try_get(&self, key: &K) -> Result<V> {
        self.get(key).ok_or(ReactiveError::KeyNotFound)
    }

    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.core
            .entries
            .borrow()
            .values()
            .map(|entry| entry.value.clone())
            .collect()
    }
}

impl<K, V> ObservableDictionary<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: AsObservable + 'static,
{
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.core.entries.borrow().keys().cloned().collect()
    }
}

impl<K, V> ObservableDictionary<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: AsObservable + Clone + 'static,
{
    /// Snapshot of every pair in the backing map's order.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, V)> {
        self.core
            .entries
            .borrow()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Point-in-time enumerator over the current pairs.
    #[must_use]
    pub fn cursor(&self) -> Cursor<K, V> {
        Cursor::new(self.entries())
    }
}

impl<K, V> Default for ObservableDictionary<K, V>
where
    K: Eq + Hash + 'static,
    V: AsObservable + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for ObservableDictionary<K, V>
where
    K: Eq + Hash + 'static,
    V: AsObservable + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let dictionary = Self::new();
        for (key, value) in iter {
            dictionary.set(key, value);
        }
        dictionary
    }
}

impl<K: 'static, V: 'static> Clone for ObservableDictionary<K, V> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<K: fmt::Debug + 'static, V: fmt::Debug + 'static> fmt::Debug for ObservableDictionary<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.core
                    .entries
                    .borrow()
                    .iter()
                    .map(|(key, entry)| (key, &entry.value)),
            )
            .finish()
    }
}

impl<K: 'static, V: 'static> Observable for ObservableDictionary<K, V> {
    fn updated(&self) -> &Signal {
        &self.core.updated
    }
}

impl<K: 'static, V: 'static> AsObservable for ObservableDictionary<K, V> {
    fn as_observable(&self) -> Option<&dyn Observable> {
        Some(self)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::fmt;
    use std::hash::Hash;
    use std::marker::PhantomData;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ObservableDictionary;
    use crate::observable::AsObservable;

    impl<K, V> Serialize for ObservableDictionary<K, V>
    where
        K: Serialize + 'static,
        V: Serialize + 'static,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let entries = self.core.entries.borrow();
            serializer.collect_map(entries.iter().map(|(key, entry)| (key, &entry.value)))
        }
    }

    struct DictionaryVisitor<K, V>(PhantomData<fn() -> (K, V)>);

    impl<'de, K, V> Visitor<'de> for DictionaryVisitor<K, V>
    where
        K: Deserialize<'de> + Eq + Hash + 'static,
        V: Deserialize<'de> + AsObservable + 'static,
    {
        type Value = ObservableDictionary<K, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            // Every entry goes through `set`, which re-wires nested forwarding.
            let dictionary = ObservableDictionary::new();
            while let Some((key, value)) = access.next_entry()? {
                dictionary.set(key, value);
            }
            Ok(dictionary)
        }
    }

    impl<'de, K, V> Deserialize<'de> for ObservableDictionary<K, V>
    where
        K: Deserialize<'de> + Eq + Hash + 'static,
        V: Deserialize<'de> + AsObservable + 'static,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(DictionaryVisitor(PhantomData))
        }
    }
}
