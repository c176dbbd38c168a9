//! Interned string table with stable, insertion-ordered indices

use crate::error::{Result, SourceMapError};
use std::collections::HashMap;

/// An ordered set of unique strings.
///
/// Indices are assigned in first-insertion order and never change; this is
/// what `sources` and `names` indices in a source map refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArraySet {
    array: Vec<String>,
    set: HashMap<String, usize>,
}

impl ArraySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a sequence, keeping duplicates in the array if
    /// `allow_duplicates` is set. Indices always point at the first copy.
    pub fn from_array<I, S>(values: I, allow_duplicates: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = ArraySet::new();
        for value in values {
            set.add(value, allow_duplicates);
        }
        set
    }

    /// Number of unique values.
    pub fn size(&self) -> usize {
        self.set.len()
    }

    /// Add a value. Re-adding an existing value is a no-op unless
    /// `allow_duplicate` is set, in which case the array grows but the
    /// value keeps its original index.
    pub fn add(&mut self, value: impl Into<String>, allow_duplicate: bool) {
        let value = value.into();
        let index = self.array.len();
        let present = self.set.contains_key(&value);
        if !present {
            self.set.insert(value.clone(), index);
            self.array.push(value);
        } else if allow_duplicate {
            self.array.push(value);
        }
    }

    pub fn has(&self, value: &str) -> bool {
        self.set.contains_key(value)
    }

    /// Index of `value`, or `NotInSet` if it was never added.
    pub fn index_of(&self, value: &str) -> Result<usize> {
        self.set
            .get(value)
            .copied()
            .ok_or_else(|| SourceMapError::NotInSet(value.to_string()))
    }

    /// Value stored at `index`, or `IndexOutOfRange`.
    pub fn at(&self, index: usize) -> Result<&str> {
        self.array
            .get(index)
            .map(String::as_str)
            .ok_or(SourceMapError::IndexOutOfRange(index))
    }

    /// A copy of the values in insertion order (including duplicates).
    pub fn to_array(&self) -> Vec<String> {
        self.array.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.array.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }
}
