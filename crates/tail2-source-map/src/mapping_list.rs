//! Append-only mapping buffer that sorts lazily

use crate::mapping::{Mapping, compare_by_generated_positions_inflated};
use std::cmp::Ordering;

/// Whether `b` can follow `a` without breaking generated-position order.
fn generated_position_after(a: &Mapping, b: &Mapping) -> bool {
    b.generated_line > a.generated_line
        || (b.generated_line == a.generated_line && b.generated_column >= a.generated_column)
        || compare_by_generated_positions_inflated(a, b) != Ordering::Greater
}

/// Buffer of mappings used while building a map.
///
/// Mappings usually arrive in generated order; in that case the buffer
/// stays sorted for free. An out-of-order insertion marks it dirty and the
/// next `to_array` performs one stable sort.
#[derive(Debug, Clone)]
pub struct MappingList {
    array: Vec<Mapping>,
    sorted: bool,
    /// Index of the greatest mapping appended in order so far.
    last: Option<usize>,
}

impl Default for MappingList {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingList {
    pub fn new() -> Self {
        MappingList {
            array: Vec::new(),
            sorted: true,
            last: None,
        }
    }

    pub fn add(&mut self, mapping: Mapping) {
        let in_order = self
            .last
            .is_none_or(|last| generated_position_after(&self.array[last], &mapping));
        if in_order {
            self.last = Some(self.array.len());
        } else {
            self.sorted = false;
        }
        self.array.push(mapping);
    }

    /// Mappings in insertion order, for in-place rewriting. Callers must not
    /// change generated positions.
    pub fn unsorted_for_each_mut(&mut self, f: impl FnMut(&mut Mapping)) {
        self.array.iter_mut().for_each(f);
    }

    /// All mappings sorted by generated position.
    pub fn to_array(&mut self) -> &[Mapping] {
        if !self.sorted {
            tracing::debug!(mappings = self.array.len(), "Sorting out-of-order mappings");
            self.array.sort_by(compare_by_generated_positions_inflated);
            self.sorted = true;
            self.last = self.array.len().checked_sub(1);
        }
        &self.array
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }
}
