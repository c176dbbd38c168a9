//! Core types for source map queries and configuration

use crate::error::{Result, SourceMapError};
use serde::{Deserialize, Serialize};

/// A position in text: 1-based line, 0-based column.
///
/// Columns count UTF-16 code units, which is what the v3 format uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (0-indexed)
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl Default for Position {
    /// The first column of the first line.
    fn default() -> Self {
        Position { line: 1, column: 0 }
    }
}

/// Tie-breaking policy for position lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bias {
    /// Closest element that is smaller than or equal to the needle.
    #[default]
    GreatestLowerBound,
    /// Closest element that is greater than or equal to the needle.
    LeastUpperBound,
}

impl Bias {
    pub const GREATEST_LOWER_BOUND: u32 = 1;
    pub const LEAST_UPPER_BOUND: u32 = 2;
}

impl TryFrom<u32> for Bias {
    type Error = SourceMapError;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            Bias::GREATEST_LOWER_BOUND => Ok(Bias::GreatestLowerBound),
            Bias::LEAST_UPPER_BOUND => Ok(Bias::LeastUpperBound),
            other => Err(SourceMapError::UnknownBias(other)),
        }
    }
}

/// Iteration order for `each_mapping`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MappingOrder {
    /// Sorted by generated line and column.
    #[default]
    Generated,
    /// Sorted by source, original line and column.
    Original,
}

impl MappingOrder {
    pub const GENERATED_ORDER: u32 = 1;
    pub const ORIGINAL_ORDER: u32 = 2;
}

impl TryFrom<u32> for MappingOrder {
    type Error = SourceMapError;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            MappingOrder::GENERATED_ORDER => Ok(MappingOrder::Generated),
            MappingOrder::ORIGINAL_ORDER => Ok(MappingOrder::Original),
            other => Err(SourceMapError::UnknownOrder(other)),
        }
    }
}

/// The last generated column covered by a mapping, once column spans are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastColumn {
    /// The mapping ends right before the next mapping on the same line.
    At(u32),
    /// The mapping is the last one on its line and extends to its end.
    EndOfLine,
}

/// Result of a generated → original lookup. All fields are `None` on a miss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalPosition {
    pub source: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub name: Option<String>,
}

impl OriginalPosition {
    pub fn is_found(&self) -> bool {
        self.source.is_some()
    }
}

/// Result of an original → generated lookup. All fields are `None` on a miss.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPosition {
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Only populated after `compute_column_spans`.
    pub last_column: Option<LastColumn>,
}

impl GeneratedPosition {
    pub fn is_found(&self) -> bool {
        self.line.is_some()
    }
}

/// How `SourceMapGenerator::add_mapping` treats malformed mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappingValidation {
    /// Reject the mapping with `SourceMapError::InvalidMapping`.
    #[default]
    Strict,
    /// Validate, but silently drop malformed mappings.
    Drop,
    /// Trusted input: store every mapping as given without checking it.
    Skip,
}

/// Options for `SourceMapGenerator::new`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    /// The generated file this map belongs to.
    pub file: Option<String>,
    /// Root prepended to every source path when resolving.
    pub source_root: Option<String>,
    pub validation: MappingValidation,
}

/// Options for constructing a consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsumerOptions {
    /// URL the map was loaded from; relative sources resolve against it.
    pub source_map_url: Option<String>,
}
