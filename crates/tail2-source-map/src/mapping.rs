//! Mapping records and their orderings

use crate::types::Position;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One entry relating a generated position to an optional original position.
///
/// A well-formed mapping is either generated-only (no source, original
/// position or name) or fully anchored (source and original position, name
/// optional). This is also the shape handed to `each_mapping` visitors, with
/// `source` already resolved to a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<String>,
    pub original_line: Option<u32>,
    pub original_column: Option<u32>,
    pub name: Option<String>,
}

impl Mapping {
    pub fn generated(&self) -> Position {
        Position::new(self.generated_line, self.generated_column)
    }

    /// The original position, if both line and column are present.
    pub fn original(&self) -> Option<Position> {
        Some(Position::new(self.original_line?, self.original_column?))
    }
}

/// Input to `SourceMapGenerator::add_mapping`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewMapping {
    pub generated: Position,
    pub original: Option<Position>,
    pub source: Option<String>,
    pub name: Option<String>,
}

impl NewMapping {
    /// A mapping that ends provenance at `generated`.
    pub fn generated_only(generated: Position) -> Self {
        NewMapping {
            generated,
            ..Default::default()
        }
    }

    /// A mapping from `generated` to `original` inside `source`.
    pub fn new(generated: Position, source: impl Into<String>, original: Position) -> Self {
        NewMapping {
            generated,
            original: Some(original),
            source: Some(source.into()),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Compare two optional values, ordering `None` after every `Some`.
pub(crate) fn compare_nullable<T: Ord + ?Sized>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Generated-position order over mappings with literal source and name
/// strings: generated line, generated column, source, original line,
/// original column, name.
pub fn compare_by_generated_positions_inflated(a: &Mapping, b: &Mapping) -> Ordering {
    a.generated_line
        .cmp(&b.generated_line)
        .then(a.generated_column.cmp(&b.generated_column))
        .then_with(|| compare_nullable(a.source.as_deref(), b.source.as_deref()))
        .then(a.original_line.unwrap_or(0).cmp(&b.original_line.unwrap_or(0)))
        .then(a.original_column.unwrap_or(0).cmp(&b.original_column.unwrap_or(0)))
        .then_with(|| compare_nullable(a.name.as_deref(), b.name.as_deref()))
}
