//! Querying parsed source maps
//!
//! [`SourceMapConsumer`] wraps the two map shapes behind one interface:
//! regular maps answer from their own decoded mappings, indexed maps route
//! each query to the section that covers it.

mod basic;
mod index;
mod indexed;

pub use basic::BasicSourceMapConsumer;
pub use indexed::{IndexedSourceMapConsumer, Section};

use crate::document::SourceMapDocument;
use crate::error::Result;
use crate::generator::SourceMapGenerator;
use crate::mapping::Mapping;
use crate::types::{Bias, ConsumerOptions, GeneratedPosition, MappingOrder, OriginalPosition};
use std::str::FromStr;

#[derive(Debug)]
pub enum SourceMapConsumer {
    Basic(BasicSourceMapConsumer),
    Indexed(IndexedSourceMapConsumer),
}

impl SourceMapConsumer {
    /// Parse a map from JSON text.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tail2_source_map::{Bias, SourceMapConsumer};
    ///
    /// let consumer = SourceMapConsumer::parse(
    ///     r#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA,KAAE"}"#,
    /// )
    /// .unwrap();
    /// let original = consumer
    ///     .original_position_for(1, 6, Bias::GreatestLowerBound)
    ///     .unwrap();
    /// assert_eq!(original.source.as_deref(), Some("a.js"));
    /// assert_eq!(original.column, Some(2));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_with_options(input, &ConsumerOptions::default())
    }

    pub fn parse_with_options(input: &str, options: &ConsumerOptions) -> Result<Self> {
        Self::from_document(SourceMapDocument::from_json(input)?, options)
    }

    /// Build the consumer matching the document's shape.
    pub fn from_document(document: SourceMapDocument, options: &ConsumerOptions) -> Result<Self> {
        if document.is_indexed() {
            Ok(SourceMapConsumer::Indexed(IndexedSourceMapConsumer::new(
                document, options,
            )?))
        } else {
            Ok(SourceMapConsumer::Basic(BasicSourceMapConsumer::new(
                document, options,
            )?))
        }
    }

    pub fn from_generator(
        generator: &mut SourceMapGenerator,
        options: &ConsumerOptions,
    ) -> Result<Self> {
        Ok(SourceMapConsumer::Basic(
            BasicSourceMapConsumer::from_generator(generator, options)?,
        ))
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            SourceMapConsumer::Basic(c) => c.file(),
            SourceMapConsumer::Indexed(c) => c.file(),
        }
    }

    pub fn source_root(&self) -> Option<&str> {
        match self {
            SourceMapConsumer::Basic(c) => c.source_root(),
            SourceMapConsumer::Indexed(_) => None,
        }
    }

    /// Resolved URLs of every source.
    pub fn sources(&self) -> Vec<String> {
        match self {
            SourceMapConsumer::Basic(c) => c.sources(),
            SourceMapConsumer::Indexed(c) => c.sources(),
        }
    }

    pub(crate) fn has_source(&self, source: &str) -> bool {
        match self {
            SourceMapConsumer::Basic(c) => c.find_source_index(source).is_some(),
            SourceMapConsumer::Indexed(c) => c.has_source(source),
        }
    }

    pub(crate) fn resolved_source(&self, source: &str) -> Option<&str> {
        match self {
            SourceMapConsumer::Basic(c) => c.resolved_source(source),
            SourceMapConsumer::Indexed(c) => c.resolved_source(source),
        }
    }

    /// Build the lookup indices now instead of on the first query.
    pub fn ensure_indices_built(&self) -> Result<()> {
        match self {
            SourceMapConsumer::Basic(c) => c.ensure_indices_built(),
            SourceMapConsumer::Indexed(c) => c.ensure_indices_built(),
        }
    }

    /// Map a generated position (1-based line, 0-based column) to its
    /// original position. A miss is `Ok` with every field `None`.
    pub fn original_position_for(
        &self,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<OriginalPosition> {
        match self {
            SourceMapConsumer::Basic(c) => c.original_position_for(line, column, bias),
            SourceMapConsumer::Indexed(c) => c.original_position_for(line, column, bias),
        }
    }

    pub fn generated_position_for(
        &self,
        source: &str,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<GeneratedPosition> {
        match self {
            SourceMapConsumer::Basic(c) => c.generated_position_for(source, line, column, bias),
            SourceMapConsumer::Indexed(c) => c.generated_position_for(source, line, column, bias),
        }
    }

    pub fn all_generated_positions_for(
        &self,
        source: &str,
        line: u32,
        column: Option<u32>,
    ) -> Result<Vec<GeneratedPosition>> {
        match self {
            SourceMapConsumer::Basic(c) => c.all_generated_positions_for(source, line, column),
            SourceMapConsumer::Indexed(c) => c.all_generated_positions_for(source, line, column),
        }
    }

    pub fn compute_column_spans(&mut self) -> Result<()> {
        match self {
            SourceMapConsumer::Basic(c) => c.compute_column_spans(),
            SourceMapConsumer::Indexed(c) => c.compute_column_spans(),
        }
    }

    pub fn each_mapping(&self, order: MappingOrder, f: impl FnMut(&Mapping)) -> Result<()> {
        match self {
            SourceMapConsumer::Basic(c) => c.each_mapping(order, f),
            SourceMapConsumer::Indexed(c) => c.each_mapping(order, f),
        }
    }

    pub fn mappings(&self, order: MappingOrder) -> Result<Vec<Mapping>> {
        match self {
            SourceMapConsumer::Basic(c) => c.mappings(order),
            SourceMapConsumer::Indexed(c) => c.mappings(order),
        }
    }

    pub fn has_contents_of_all_sources(&self) -> bool {
        match self {
            SourceMapConsumer::Basic(c) => c.has_contents_of_all_sources(),
            SourceMapConsumer::Indexed(c) => c.has_contents_of_all_sources(),
        }
    }

    pub fn source_content_for(&self, source: &str, null_on_missing: bool) -> Result<Option<&str>> {
        match self {
            SourceMapConsumer::Basic(c) => c.source_content_for(source, null_on_missing),
            SourceMapConsumer::Indexed(c) => c.source_content_for(source, null_on_missing),
        }
    }
}

impl FromStr for SourceMapConsumer {
    type Err = crate::error::SourceMapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_picks_shape() {
        let basic: SourceMapConsumer =
            r#"{"version":3,"sources":[],"mappings":""}"#.parse().unwrap();
        assert!(matches!(basic, SourceMapConsumer::Basic(_)));

        let indexed = SourceMapConsumer::parse(r#"{"version":3,"sections":[]}"#).unwrap();
        assert!(matches!(indexed, SourceMapConsumer::Indexed(_)));
        assert!(indexed.sources().is_empty());
    }

    #[test]
    fn test_nested_indexed_sections() {
        let consumer = SourceMapConsumer::parse(
            r#"{"version":3,"sections":[{"offset":{"line":2,"column":0},"map":
                {"version":3,"sections":[{"offset":{"line":1,"column":0},"map":
                    {"version":3,"sources":["deep.js"],"names":[],"mappings":"AAAA"}}]}}]}"#,
        )
        .unwrap();
        let original = consumer
            .original_position_for(4, 0, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!(original.source.as_deref(), Some("deep.js"));
        assert!(consumer.has_source("deep.js"));
    }
}
