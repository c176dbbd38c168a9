//! Source Map v3 for tail2 stack symbolization
//!
//! This crate reads and writes Source Map v3 documents so that sampled stack
//! frames pointing into bundled or minified JavaScript can be reported at
//! their original source positions.
//!
//! # Overview
//!
//! The core types are:
//! - [`SourceMapGenerator`]: Collects mappings during code generation and
//!   serializes them
//! - [`SourceMapConsumer`]: Parses a map (regular or indexed) and answers
//!   position queries in both directions
//! - [`SourceNode`]: A tree of provenance-tagged text that emits code and its
//!   map together
//!
//! Lines are 1-based and columns 0-based (in UTF-16 code units) everywhere
//! in the public API. A position without a mapping is not an error: queries
//! return a result whose fields are all `None`.
//!
//! # Example
//!
//! ```rust
//! use tail2_source_map::*;
//!
//! let mut generator = SourceMapGenerator::new(GeneratorOptions::default());
//! generator
//!     .add_mapping(NewMapping::new(Position::new(1, 0), "app.ts", Position::new(10, 2)).with_name("main"))
//!     .unwrap();
//! let json = generator.to_json_string().unwrap();
//!
//! let consumer = SourceMapConsumer::parse(&json).unwrap();
//! let original = consumer
//!     .original_position_for(1, 0, Bias::GreatestLowerBound)
//!     .unwrap();
//! assert_eq!(original.source.as_deref(), Some("app.ts"));
//! assert_eq!(original.line, Some(10));
//! assert_eq!(original.name.as_deref(), Some("main"));
//! ```

pub mod array_set;
pub mod base64;
pub mod binary_search;
pub mod consumer;
pub mod document;
pub mod error;
pub mod generator;
pub mod mapping;
pub mod mapping_list;
pub mod source_node;
pub mod types;
pub mod util;
pub mod vlq;

// Re-export main types
pub use array_set::ArraySet;
pub use consumer::{BasicSourceMapConsumer, IndexedSourceMapConsumer, Section, SourceMapConsumer};
pub use document::{SectionDocument, SectionOffset, SourceMapDocument};
pub use error::{Result, SourceMapError};
pub use generator::SourceMapGenerator;
pub use mapping::{Mapping, NewMapping};
pub use mapping_list::MappingList;
pub use source_node::{Chunk, CodeWithSourceMap, Provenance, SourceNode};
pub use types::{
    Bias, ConsumerOptions, GeneratedPosition, GeneratorOptions, LastColumn, MappingOrder,
    MappingValidation, OriginalPosition, Position,
};
