#![forbid(unsafe_code)]

//! Point-in-time enumerator over a dictionary snapshot.

use crate::error::{ReactiveError, Result};

/// An explicit-step enumerator over `(K, V)` pairs copied out of an
/// [`ObservableDictionary`](super::ObservableDictionary).
///
/// Later mutations of the dictionary are not visible. Reading
/// [`current`](Cursor::current) before the first [`move_next`](Cursor::move_next)
/// or after it returned `false` is an error, never a wrap-around.
#[derive(Debug, Clone)]
pub struct Cursor<K, V> {
    items: Vec<(K, V)>,
    /// `None` before the first step; `Some(len)` once exhausted.
    position: Option<usize>,
}

impl<K, V> Cursor<K, V> {
    pub(crate) fn new(items: Vec<(K, V)>) -> Self {
        Self {
            items,
            position: None,
        }
    }

    /// Advance to the next pair. Returns `false` once past the end.
    pub fn move_next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1).min(self.items.len());
        self.position = Some(next);
        next < self.items.len()
    }

    /// The pair under the cursor.
    pub fn current(&self) -> Result<(&K, &V)> {
        match self.position {
            Some(i) if i < self.items.len() => {
                let (key, value) = &self.items[i];
                Ok((key, value))
            }
            position => Err(ReactiveError::invalid_cursor(position, self.items.len())),
        }
    }

    /// Rewind to before the first pair.
    pub fn reset(&mut self) {
        self.position = None;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate the whole snapshot without moving the cursor.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.items.iter().map(|(k, v)| (k, v))
    }
}

impl<K, V> IntoIterator for Cursor<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
