//! Consumer for indexed (sectioned) source maps

use super::SourceMapConsumer;
use super::index::{MappingIndex, RawMapping};
use crate::array_set::ArraySet;
use crate::binary_search;
use crate::document::SourceMapDocument;
use crate::error::{Result, SourceMapError};
use crate::mapping::Mapping;
use crate::types::{
    Bias, ConsumerOptions, GeneratedPosition, LastColumn, MappingOrder, OriginalPosition,
    Position,
};
use std::sync::OnceLock;

/// One embedded map placed at an offset in the generated output.
#[derive(Debug)]
pub struct Section {
    /// Where the section's line 1, column 0 lands (1-based line, 0-based column).
    pub generated_offset: Position,
    pub consumer: SourceMapConsumer,
}

impl Section {
    /// Translate a global generated position into this section's coordinates.
    fn to_local(&self, line: u32, column: u32) -> (u32, u32) {
        let offset = self.generated_offset;
        let local_line = line - (offset.line - 1);
        let local_column = if line == offset.line {
            column - offset.column
        } else {
            column
        };
        (local_line, local_column)
    }

    /// Translate a position in this section's coordinates to a global one.
    fn to_global(&self, line: u32, column: u32) -> Result<(u32, u32)> {
        let offset = self.generated_offset;
        let out_of_range = || SourceMapError::InvalidOffset {
            line: offset.line - 1,
            column: offset.column,
        };
        let column = if line == 1 {
            column.checked_add(offset.column).ok_or_else(out_of_range)?
        } else {
            column
        };
        let line = line
            .saturating_sub(1)
            .checked_add(offset.line)
            .ok_or_else(out_of_range)?;
        Ok((line, column))
    }
}

/// Sections flattened into one table of sources, names and mappings.
#[derive(Debug)]
struct FlatIndex {
    sources: ArraySet,
    names: ArraySet,
    mappings: MappingIndex,
}

/// Answers position queries against an indexed map by delegating to the
/// section covering the queried position.
#[derive(Debug)]
pub struct IndexedSourceMapConsumer {
    file: Option<String>,
    sections: Vec<Section>,
    flat: OnceLock<FlatIndex>,
}

impl IndexedSourceMapConsumer {
    pub fn new(document: SourceMapDocument, options: &ConsumerOptions) -> Result<Self> {
        let version = document
            .version
            .ok_or(SourceMapError::MissingArgument("version"))?;
        if version != 3 {
            return Err(SourceMapError::UnsupportedVersion(version));
        }
        let raw_sections = document
            .sections
            .ok_or(SourceMapError::MissingArgument("sections"))?;

        let mut sections = Vec::with_capacity(raw_sections.len());
        let mut last_offset: Option<(u32, u32)> = None;
        for raw in raw_sections {
            if raw.url.is_some() {
                return Err(SourceMapError::SectionUrlUnsupported);
            }
            let offset = raw.offset.ok_or(SourceMapError::MissingArgument("offset"))?;
            let line = offset.line.ok_or(SourceMapError::MissingArgument("line"))?;
            let column = offset
                .column
                .ok_or(SourceMapError::MissingArgument("column"))?;

            if last_offset.is_some_and(|last| (line, column) < last) {
                return Err(SourceMapError::UnorderedSections);
            }
            last_offset = Some((line, column));

            let map = raw.map.ok_or(SourceMapError::MissingArgument("map"))?;
            let first_line = line
                .checked_add(1)
                .ok_or(SourceMapError::InvalidOffset { line, column })?;
            sections.push(Section {
                generated_offset: Position::new(first_line, column),
                consumer: SourceMapConsumer::from_document(*map, options)?,
            });
        }

        tracing::debug!(sections = sections.len(), "Parsed indexed source map");
        Ok(IndexedSourceMapConsumer {
            file: document.file,
            sections,
            flat: OnceLock::new(),
        })
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Resolved source URLs of every section, in section order.
    pub fn sources(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|section| section.consumer.sources())
            .collect()
    }

    pub(crate) fn has_source(&self, source: &str) -> bool {
        self.sections
            .iter()
            .any(|section| section.consumer.has_source(source))
    }

    pub(crate) fn resolved_source(&self, source: &str) -> Option<&str> {
        self.sections
            .iter()
            .find_map(|section| section.consumer.resolved_source(source))
    }

    /// Build the flattened index if that has not happened yet.
    pub fn ensure_indices_built(&self) -> Result<()> {
        self.flat().map(|_| ())
    }

    fn flat(&self) -> Result<&FlatIndex> {
        if let Some(flat) = self.flat.get() {
            return Ok(flat);
        }
        let built = self.flatten()?;
        Ok(self.flat.get_or_init(|| built))
    }

    fn flatten(&self) -> Result<FlatIndex> {
        let mut sources = ArraySet::new();
        let mut names = ArraySet::new();
        let mut raw = Vec::new();

        for section in &self.sections {
            for mapping in section.consumer.mappings(MappingOrder::Generated)? {
                let source = match &mapping.source {
                    Some(source) => {
                        sources.add(source.as_str(), false);
                        Some(sources.index_of(source)?)
                    }
                    None => None,
                };
                let name = match &mapping.name {
                    Some(name) => {
                        names.add(name.as_str(), false);
                        Some(names.index_of(name)?)
                    }
                    None => None,
                };
                let (generated_line, generated_column) =
                    section.to_global(mapping.generated_line, mapping.generated_column)?;
                raw.push(RawMapping {
                    generated_line,
                    generated_column,
                    last_generated_column: None,
                    source,
                    original_line: mapping.original_line,
                    original_column: mapping.original_column,
                    name,
                });
            }
        }

        tracing::debug!(
            sections = self.sections.len(),
            mappings = raw.len(),
            sources = sources.size(),
            "Flattened indexed source map"
        );
        Ok(FlatIndex {
            sources,
            names,
            mappings: MappingIndex::from_mappings(raw),
        })
    }

    fn section_for(&self, line: u32, column: u32) -> Option<&Section> {
        let index = binary_search::search(
            &(line, column),
            &self.sections,
            Bias::GreatestLowerBound,
            |section| (section.generated_offset.line, section.generated_offset.column),
        )?;
        self.sections.get(index)
    }

    pub fn original_position_for(
        &self,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<OriginalPosition> {
        if line == 0 {
            return Err(SourceMapError::InvalidLine(line));
        }
        let Some(section) = self.section_for(line, column) else {
            return Ok(OriginalPosition::default());
        };
        let (local_line, local_column) = section.to_local(line, column);
        section
            .consumer
            .original_position_for(local_line, local_column, bias)
    }

    /// The first section that maps `source` and has a mapping for the
    /// position answers.
    pub fn generated_position_for(
        &self,
        source: &str,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<GeneratedPosition> {
        if line == 0 {
            return Err(SourceMapError::InvalidLine(line));
        }
        for section in &self.sections {
            if !section.consumer.has_source(source) {
                continue;
            }
            let local = section
                .consumer
                .generated_position_for(source, line, column, bias)?;
            if let (Some(local_line), Some(local_column)) = (local.line, local.column) {
                let (global_line, global_column) = section.to_global(local_line, local_column)?;
                let last_column = match local.last_column {
                    Some(LastColumn::At(last)) => {
                        Some(LastColumn::At(section.to_global(local_line, last)?.1))
                    }
                    other => other,
                };
                return Ok(GeneratedPosition {
                    line: Some(global_line),
                    column: Some(global_column),
                    last_column,
                });
            }
        }
        Ok(GeneratedPosition::default())
    }

    pub fn all_generated_positions_for(
        &self,
        source: &str,
        line: u32,
        column: Option<u32>,
    ) -> Result<Vec<GeneratedPosition>> {
        if line == 0 {
            return Err(SourceMapError::InvalidLine(line));
        }
        let flat = self.flat()?;
        let Some(source_index) = self
            .resolved_source(source)
            .and_then(|resolved| flat.sources.index_of(resolved).ok())
        else {
            return Ok(Vec::new());
        };
        Ok(flat.mappings.all_generated_for(source_index, line, column))
    }

    pub fn compute_column_spans(&mut self) -> Result<()> {
        for section in &mut self.sections {
            section.consumer.compute_column_spans()?;
        }
        self.flat()?;
        if let Some(flat) = self.flat.get_mut() {
            flat.mappings.compute_column_spans();
        }
        Ok(())
    }

    pub fn each_mapping(&self, order: MappingOrder, mut f: impl FnMut(&Mapping)) -> Result<()> {
        let flat = self.flat()?;
        flat.mappings.for_each(order, |raw| {
            let source = raw
                .source
                .map(|i| flat.sources.at(i).map(str::to_string))
                .transpose()?;
            let name = raw
                .name
                .map(|i| flat.names.at(i).map(str::to_string))
                .transpose()?;
            f(&Mapping {
                generated_line: raw.generated_line,
                generated_column: raw.generated_column,
                source,
                original_line: raw.original_line,
                original_column: raw.original_column,
                name,
            });
            Ok(())
        })
    }

    pub fn mappings(&self, order: MappingOrder) -> Result<Vec<Mapping>> {
        let mut out = Vec::new();
        self.each_mapping(order, |m| out.push(m.clone()))?;
        Ok(out)
    }

    pub fn has_contents_of_all_sources(&self) -> bool {
        self.sections
            .iter()
            .all(|section| section.consumer.has_contents_of_all_sources())
    }

    /// The first non-empty embedded content any section has for `source`.
    pub fn source_content_for(&self, source: &str, null_on_missing: bool) -> Result<Option<&str>> {
        for section in &self.sections {
            if let Some(content) = section.consumer.source_content_for(source, true)? {
                return Ok(Some(content));
            }
        }
        if null_on_missing {
            Ok(None)
        } else {
            Err(SourceMapError::SourceNotFound(source.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn indexed(json: &str) -> Result<IndexedSourceMapConsumer> {
        let document = SourceMapDocument::from_json(json)?;
        IndexedSourceMapConsumer::new(document, &ConsumerOptions::default())
    }

    // section 1 at 0:0 maps a.js; section 2 at 9:4 maps b.js
    const TWO_SECTIONS: &str = r#"{
        "version": 3,
        "sections": [
            {"offset": {"line": 0, "column": 0},
             "map": {"version": 3, "sources": ["a.js"], "names": ["x"], "mappings": "AAAAA,EAAE;AACA", "sourcesContent": ["a"]}},
            {"offset": {"line": 9, "column": 4},
             "map": {"version": 3, "sources": ["b.js"], "names": [], "mappings": "AAAA,IAAI;;AAEA"}}
        ]
    }"#;

    #[test]
    fn test_original_position_in_each_section() {
        let consumer = indexed(TWO_SECTIONS).unwrap();

        let first = consumer
            .original_position_for(1, 0, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!(first.source.as_deref(), Some("a.js"));
        assert_eq!(first.name.as_deref(), Some("x"));

        // first line of section 2: column offset applies
        let second = consumer
            .original_position_for(10, 8, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!(
            second,
            OriginalPosition {
                source: Some("b.js".into()),
                line: Some(1),
                column: Some(4),
                name: None,
            }
        );

        // third line of section 2: only the line offset applies
        let third = consumer
            .original_position_for(12, 0, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!((third.line, third.column), (Some(3), Some(4)));
    }

    #[test]
    fn test_position_before_section_start_belongs_to_previous_section() {
        let consumer = indexed(TWO_SECTIONS).unwrap();
        // 10:2 is before the 10:4 offset, so section 1 is asked about line 10
        let miss = consumer
            .original_position_for(10, 2, Bias::GreatestLowerBound)
            .unwrap();
        assert!(!miss.is_found());
    }

    #[test]
    fn test_generated_position_for_adds_offsets() {
        let mut consumer = indexed(TWO_SECTIONS).unwrap();
        consumer.compute_column_spans().unwrap();

        let position = consumer
            .generated_position_for("b.js", 1, 4, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!(
            position,
            GeneratedPosition {
                line: Some(10),
                column: Some(8),
                last_column: Some(LastColumn::EndOfLine),
            }
        );

        let first = consumer
            .generated_position_for("b.js", 1, 0, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!(first.column, Some(4));
        assert_eq!(first.last_column, Some(LastColumn::At(7)));

        let later = consumer
            .generated_position_for("b.js", 3, 4, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!((later.line, later.column), (Some(12), Some(0)));

        assert_eq!(
            consumer
                .generated_position_for("c.js", 1, 0, Bias::GreatestLowerBound)
                .unwrap(),
            GeneratedPosition::default()
        );
    }

    #[test]
    fn test_flattened_mappings_use_global_positions() {
        let consumer = indexed(TWO_SECTIONS).unwrap();
        let mappings = consumer.mappings(MappingOrder::Generated).unwrap();
        let positions: Vec<_> = mappings
            .iter()
            .map(|m| (m.generated_line, m.generated_column, m.source.clone().unwrap()))
            .collect();
        assert_eq!(
            positions,
            vec![
                (1, 0, "a.js".to_string()),
                (1, 2, "a.js".to_string()),
                (2, 0, "a.js".to_string()),
                (10, 4, "b.js".to_string()),
                (10, 8, "b.js".to_string()),
                (12, 0, "b.js".to_string()),
            ]
        );
        assert_eq!(mappings[0].name.as_deref(), Some("x"));
        assert_eq!(mappings[1].name, None);

        let all = consumer.all_generated_positions_for("b.js", 1, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].line, Some(10));
    }

    #[test]
    fn test_sources_and_contents() {
        let consumer = indexed(TWO_SECTIONS).unwrap();
        assert_eq!(consumer.sources(), vec!["a.js".to_string(), "b.js".to_string()]);
        assert_eq!(consumer.source_content_for("a.js", false).unwrap(), Some("a"));
        assert_eq!(consumer.source_content_for("b.js", true).unwrap(), None);
        assert!(consumer.source_content_for("b.js", false).is_err());
        assert!(!consumer.has_contents_of_all_sources());
    }

    #[test]
    fn test_unordered_sections_rejected() {
        let result = indexed(
            r#"{"version":3,"sections":[
                {"offset":{"line":5,"column":0},"map":{"version":3,"sources":[],"mappings":""}},
                {"offset":{"line":4,"column":9},"map":{"version":3,"sources":[],"mappings":""}}
            ]}"#,
        );
        assert!(matches!(result, Err(SourceMapError::UnorderedSections)));
    }

    #[test]
    fn test_equal_offsets_allowed() {
        let result = indexed(
            r#"{"version":3,"sections":[
                {"offset":{"line":1,"column":2},"map":{"version":3,"sources":[],"mappings":""}},
                {"offset":{"line":1,"column":2},"map":{"version":3,"sources":[],"mappings":""}}
            ]}"#,
        );
        assert_eq!(result.unwrap().sections().len(), 2);
    }

    #[test]
    fn test_section_url_rejected() {
        let result = indexed(
            r#"{"version":3,"sections":[{"offset":{"line":0,"column":0},"url":"other.map"}]}"#,
        );
        assert!(matches!(result, Err(SourceMapError::SectionUrlUnsupported)));
    }

    #[test]
    fn test_offset_past_last_line_rejected() {
        let result = indexed(
            r#"{"version":3,"sections":[{"offset":{"line":4294967295,"column":0},
                "map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}}]}"#,
        );
        assert!(matches!(
            result,
            Err(SourceMapError::InvalidOffset {
                line: u32::MAX,
                column: 0
            })
        ));
    }

    #[test]
    fn test_mappings_shifted_out_of_range_are_errors() {
        // the section fits, but its second line would land past u32::MAX
        let tall = indexed(
            r#"{"version":3,"sections":[{"offset":{"line":4294967294,"column":0},
                "map":{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA;AACA"}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            tall.ensure_indices_built(),
            Err(SourceMapError::InvalidOffset { .. })
        ));
        assert!(matches!(
            tall.generated_position_for("a.js", 2, 0, Bias::GreatestLowerBound),
            Err(SourceMapError::InvalidOffset { .. })
        ));

        let wide = indexed(
            r#"{"version":3,"sections":[{"offset":{"line":0,"column":4294967295},
                "map":{"version":3,"sources":["a.js"],"names":[],"mappings":"CAAA"}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            wide.mappings(MappingOrder::Generated),
            Err(SourceMapError::InvalidOffset {
                line: 0,
                column: u32::MAX
            })
        ));
    }

    #[test]
    fn test_all_generated_positions_accept_root_relative_sources() {
        let consumer = indexed(
            r#"{"version":3,"sections":[{"offset":{"line":0,"column":0},
                "map":{"version":3,"sourceRoot":"/src","sources":["a.js"],"names":[],"mappings":"AAAA"}}]}"#,
        )
        .unwrap();

        let single = consumer
            .generated_position_for("a.js", 1, 0, Bias::GreatestLowerBound)
            .unwrap();
        assert_eq!(single.line, Some(1));

        for source in ["a.js", "/src/a.js"] {
            let all = consumer.all_generated_positions_for(source, 1, None).unwrap();
            let lines: Vec<_> = all.iter().map(|p| (p.line, p.column)).collect();
            assert_eq!(lines, vec![(Some(1), Some(0))], "querying {source}");
        }
        assert!(consumer
            .all_generated_positions_for("b.js", 1, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_offset_fields() {
        let result = indexed(r#"{"version":3,"sections":[{"offset":{"line":0},"map":{}}]}"#);
        assert!(matches!(result, Err(SourceMapError::MissingArgument("column"))));
    }
}
