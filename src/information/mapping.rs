//! Sorted location tables with floor-search lookup.
//!
//! A [`Mapping`] associates generated locations with values, a [`MultiMapping`] associates them
//! with lists of values. Both store their keys in a strictly increasing array, and both answer a
//! lookup with the entry of the greatest key not exceeding the query ("floor search"). A query
//! before the first key has no mapping.
//!
//! Keys are only ever appended in increasing order. Appending at a location equal to the last
//! key replaces that entry's value, appending before it fails with
//! [`crate::Error::LocationOrder`].

use crate::{information::GeneratedLocation, Error, Result};

/// Floor search over a sorted key array.
fn floor_index(keys: &[GeneratedLocation], key: GeneratedLocation) -> Option<usize> {
    keys.partition_point(|k| *k <= key).checked_sub(1)
}

/// Verify that `keys` is strictly increasing.
fn check_sorted(keys: &[GeneratedLocation]) -> Result<()> {
    if let Some(pair) = keys.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(malformed_error!(
            "Mapping keys are not strictly increasing: {} followed by {}",
            pair[0],
            pair[1]
        ));
    }
    Ok(())
}

/// A sorted, binary-searchable table from generated location to value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping<V> {
    keys: Vec<GeneratedLocation>,
    values: Vec<V>,
}

impl<V> Default for Mapping<V> {
    fn default() -> Self {
        Mapping {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<V> Mapping<V> {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping from parallel key and value arrays.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the arrays differ in length or the keys are not
    /// strictly increasing.
    pub fn from_parts(keys: Vec<GeneratedLocation>, values: Vec<V>) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(malformed_error!(
                "Mapping has {} keys but {} values",
                keys.len(),
                values.len()
            ));
        }
        check_sorted(&keys)?;
        Ok(Mapping { keys, values })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The sorted key array.
    #[must_use]
    pub fn keys(&self) -> &[GeneratedLocation] {
        &self.keys
    }

    /// The value array, parallel to [`Mapping::keys`].
    #[must_use]
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// The entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<(GeneratedLocation, &V)> {
        Some((*self.keys.get(index)?, self.values.get(index)?))
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (GeneratedLocation, &V)> + '_ {
        self.keys.iter().copied().zip(self.values.iter())
    }

    /// Index of the greatest key not exceeding `key`.
    #[must_use]
    pub fn index_of(&self, key: GeneratedLocation) -> Option<usize> {
        floor_index(&self.keys, key)
    }

    /// The value paired with the greatest key not exceeding `key`, or `None` if `key` precedes
    /// every entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use aotdbg::information::{GeneratedLocation, Mapping};
    ///
    /// let mapping = Mapping::from_parts(
    ///     vec![GeneratedLocation::new(10, 0), GeneratedLocation::new(12, 0)],
    ///     vec!["a", "b"],
    /// )?;
    ///
    /// assert_eq!(mapping.lookup(GeneratedLocation::new(9, 99)), None);
    /// assert_eq!(mapping.lookup(GeneratedLocation::new(10, 0)), Some(&"a"));
    /// assert_eq!(mapping.lookup(GeneratedLocation::new(11, 0)), Some(&"a"));
    /// assert_eq!(mapping.lookup(GeneratedLocation::new(400, 0)), Some(&"b"));
    /// # Ok::<(), aotdbg::Error>(())
    /// ```
    #[must_use]
    pub fn lookup(&self, key: GeneratedLocation) -> Option<&V> {
        self.index_of(key).map(|index| &self.values[index])
    }

    pub(crate) fn value_mut(&mut self, index: usize) -> Option<&mut V> {
        self.values.get_mut(index)
    }

    /// Append an entry, replacing the last one when `key` equals its key.
    pub(crate) fn push(&mut self, key: GeneratedLocation, value: V) -> Result<()> {
        match self.keys.last() {
            Some(last) if *last == key => {
                if let Some(slot) = self.values.last_mut() {
                    *slot = value;
                }
                return Ok(());
            }
            Some(last) if *last > key => {
                return Err(Error::LocationOrder {
                    previous: *last,
                    current: key,
                });
            }
            _ => {}
        }
        self.keys.push(key);
        self.values.push(value);
        Ok(())
    }
}

impl<V: PartialEq> Mapping<V> {
    /// Drop entries whose value repeats the value of the preceding entry.
    ///
    /// Such entries cannot change any lookup result.
    pub(crate) fn compact(&mut self) {
        let mut keys = Vec::with_capacity(self.keys.len());
        let mut values: Vec<V> = Vec::with_capacity(self.values.len());

        for (key, value) in self.keys.drain(..).zip(self.values.drain(..)) {
            if values.last() == Some(&value) {
                continue;
            }
            keys.push(key);
            values.push(value);
        }

        self.keys = keys;
        self.values = values;
    }
}

/// A sorted table from generated location to a list of values.
///
/// Used for variable scopes, where several source variables can be represented by the same
/// generated variable at one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMapping<V> {
    keys: Vec<GeneratedLocation>,
    /// `offsets[i]..offsets[i + 1]` is the value range of key `i`
    offsets: Vec<usize>,
    data: Vec<V>,
}

impl<V> Default for MultiMapping<V> {
    fn default() -> Self {
        MultiMapping {
            keys: Vec::new(),
            offsets: vec![0],
            data: Vec::new(),
        }
    }
}

impl<V> MultiMapping<V> {
    /// Create an empty multi-mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a multi-mapping from keys and one value list per key.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the arrays differ in length or the keys are not
    /// strictly increasing.
    pub fn from_parts(keys: Vec<GeneratedLocation>, groups: Vec<Vec<V>>) -> Result<Self> {
        if keys.len() != groups.len() {
            return Err(malformed_error!(
                "Multi-mapping has {} keys but {} value lists",
                keys.len(),
                groups.len()
            ));
        }
        check_sorted(&keys)?;

        let mut offsets = Vec::with_capacity(keys.len() + 1);
        offsets.push(0);
        let mut data = Vec::new();
        for group in groups {
            data.extend(group);
            offsets.push(data.len());
        }

        Ok(MultiMapping {
            keys,
            offsets,
            data,
        })
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The sorted key array.
    #[must_use]
    pub fn keys(&self) -> &[GeneratedLocation] {
        &self.keys
    }

    /// The value list of the key at `index`.
    #[must_use]
    pub fn values_at(&self, index: usize) -> &[V] {
        match (self.offsets.get(index), self.offsets.get(index + 1)) {
            (Some(&start), Some(&end)) => &self.data[start..end],
            _ => &[],
        }
    }

    /// Iterate over all keys with their value lists.
    pub fn iter(&self) -> impl Iterator<Item = (GeneratedLocation, &[V])> + '_ {
        self.keys
            .iter()
            .enumerate()
            .map(|(index, key)| (*key, self.values_at(index)))
    }

    /// The value list of the greatest key not exceeding `key`; empty if `key` precedes every
    /// entry.
    #[must_use]
    pub fn lookup_all(&self, key: GeneratedLocation) -> &[V] {
        match floor_index(&self.keys, key) {
            Some(index) => self.values_at(index),
            None => &[],
        }
    }

    /// Append a key with its values, replacing the last list when `key` equals the last key.
    pub(crate) fn push(&mut self, key: GeneratedLocation, values: Vec<V>) -> Result<()> {
        match self.keys.last() {
            Some(last) if *last == key => {
                let start = self.offsets[self.offsets.len() - 2];
                self.data.truncate(start);
                self.data.extend(values);
                if let Some(end) = self.offsets.last_mut() {
                    *end = self.data.len();
                }
                return Ok(());
            }
            Some(last) if *last > key => {
                return Err(Error::LocationOrder {
                    previous: *last,
                    current: key,
                });
            }
            _ => {}
        }
        self.keys.push(key);
        self.data.extend(values);
        self.offsets.push(self.data.len());
        Ok(())
    }
}
