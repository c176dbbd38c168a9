//! Error types for source map encoding, decoding and lookup.
//!
//! Lookup misses are not errors: position queries that find nothing return
//! an all-`None` value. Everything here is either a corrupt input document or
//! a caller violating an API contract.

use thiserror::Error;

/// Errors produced while building, parsing or querying source maps.
#[derive(Debug, Error)]
pub enum SourceMapError {
    /// The document declares a version other than 3.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// A VLQ group had its continuation bit set on the last character.
    #[error("Expected more digits in base 64 VLQ value")]
    VlqUnexpectedEof,

    /// A character outside of the base64 alphabet appeared in `mappings`.
    #[error("Invalid base64 digit: {0:?}")]
    InvalidBase64Digit(char),

    /// A decoded VLQ value does not fit in a 32-bit signed integer.
    #[error("Base 64 VLQ value overflows a 32-bit integer")]
    VlqOverflow,

    /// A 6-bit digit outside `0..64` was handed to the base64 encoder.
    #[error("Must be between 0 and 63: {0}")]
    Base64OutOfRange(u32),

    /// A segment had two fields: a source without line and column.
    #[error("Found a source, but no line and column")]
    SegmentMissingLineColumn,

    /// A segment had three fields: a source and line without column.
    #[error("Found a source and line, but no column")]
    SegmentMissingColumn,

    /// A running total in the mappings stream dropped below zero.
    #[error("Mapping field `{field}` decoded to a negative value ({value})")]
    NegativeField { field: &'static str, value: i64 },

    /// Sections of an indexed map were out of order.
    #[error("Section offsets must be ordered and non-overlapping")]
    UnorderedSections,

    /// A section offset (0-based, as written in the document) pushes its
    /// mappings past the largest representable line or column.
    #[error("Section offset {line}:{column} is out of range")]
    InvalidOffset { line: u32, column: u32 },

    /// A section referenced its map by URL instead of embedding it.
    #[error("Support for url field in sections not implemented")]
    SectionUrlUnsupported,

    /// The document was not valid JSON or had the wrong shape.
    #[error("Invalid source map JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// `add_mapping` was given an invalid combination of fields.
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// A required field or argument was absent.
    #[error("\"{0}\" is a required argument")]
    MissingArgument(&'static str),

    /// `ArraySet::index_of` was asked for a value it does not hold.
    #[error("\"{0}\" is not in the set")]
    NotInSet(String),

    /// `ArraySet::at` was asked for an index past its end.
    #[error("No element indexed by {0}")]
    IndexOutOfRange(usize),

    /// An iteration order code other than 1 or 2.
    #[error("Unknown order of iteration: {0}")]
    UnknownOrder(u32),

    /// A bias code other than 1 or 2.
    #[error("Unknown bias: {0}")]
    UnknownBias(u32),

    /// `apply_source_map` had neither an explicit file nor the consumer's `file`.
    #[error(
        "apply_source_map requires either an explicit source file, or the source map's \"file\" property. Both were omitted."
    )]
    MissingFile,

    /// Generated or original lines are 1-based.
    #[error("Line must be greater than or equal to 1, got {0}")]
    InvalidLine(u32),

    /// `source_content_for` found no embedded content for the source.
    #[error("\"{0}\" is not in the SourceMap")]
    SourceNotFound(String),

    /// The URL the map was loaded from could not be parsed.
    #[error("sourceMapURL could not be parsed: {0}")]
    InvalidSourceMapUrl(String),
}

/// Result type for source map operations.
pub type Result<T> = std::result::Result<T, SourceMapError>;
