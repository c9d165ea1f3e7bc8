//! Deduplicated string tables.

use std::collections::HashMap;

/// An append-only string table assigning each distinct string a dense id.
///
/// A string gets a new id only the first time it is interned; later calls return the same id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl NameTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from an ordered list of names.
    ///
    /// Later duplicates keep the id of their first occurrence in the lookup map.
    #[must_use]
    pub fn from_names(names: Vec<String>) -> Self {
        let mut ids = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            ids.entry(name.clone()).or_insert(index as u32);
        }
        NameTable { names, ids }
    }

    /// Return the id of `name`, allocating one if it was never seen.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// The id of `name`, if present.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// The string with the given id.
    #[must_use]
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// All strings in id order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
