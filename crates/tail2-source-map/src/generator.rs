//! Building source maps during code generation

use crate::array_set::ArraySet;
use crate::consumer::SourceMapConsumer;
use crate::document::SourceMapDocument;
use crate::error::{Result, SourceMapError};
use crate::mapping::{Mapping, NewMapping, compare_by_generated_positions_inflated};
use crate::mapping_list::MappingList;
use crate::types::{Bias, GeneratorOptions, MappingOrder, MappingValidation, Position};
use crate::util;
use crate::vlq;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Accumulates mappings and serializes them as a v3 source map.
///
/// # Example
///
/// ```rust
/// use tail2_source_map::{GeneratorOptions, NewMapping, Position, SourceMapGenerator};
///
/// let mut generator = SourceMapGenerator::new(GeneratorOptions {
///     file: Some("bundle.js".into()),
///     ..Default::default()
/// });
/// generator
///     .add_mapping(NewMapping::new(Position::new(1, 0), "a.js", Position::new(1, 0)))
///     .unwrap();
/// assert_eq!(
///     generator.to_json_string().unwrap(),
///     r#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA","file":"bundle.js"}"#
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct SourceMapGenerator {
    file: Option<String>,
    source_root: Option<String>,
    validation: MappingValidation,
    sources: ArraySet,
    names: ArraySet,
    mappings: MappingList,
    /// Embedded contents keyed by root-relative source; `None` when empty.
    sources_contents: Option<HashMap<String, String>>,
}

impl SourceMapGenerator {
    pub const VERSION: u32 = 3;

    pub fn new(options: GeneratorOptions) -> Self {
        SourceMapGenerator {
            file: options.file,
            source_root: options.source_root,
            validation: options.validation,
            ..Default::default()
        }
    }

    /// Rebuild a generator holding every mapping, source and embedded
    /// content of `consumer`.
    pub fn from_source_map(consumer: &SourceMapConsumer) -> Result<Self> {
        let source_root = consumer.source_root().map(str::to_string);
        let mut generator = SourceMapGenerator::new(GeneratorOptions {
            file: consumer.file().map(str::to_string),
            source_root: source_root.clone(),
            validation: MappingValidation::Strict,
        });

        let mut pending = Vec::new();
        consumer.each_mapping(MappingOrder::Generated, |mapping| {
            let mut new_mapping = NewMapping::generated_only(mapping.generated());
            if let Some(source) = &mapping.source {
                new_mapping.source = Some(match &source_root {
                    Some(root) => util::relative(root, source),
                    None => source.clone(),
                });
                new_mapping.original = mapping.original();
                new_mapping.name = mapping.name.clone();
            }
            pending.push(new_mapping);
        })?;
        for new_mapping in pending {
            generator.add_mapping(new_mapping)?;
        }

        for source in consumer.sources() {
            let relative_source = match &source_root {
                Some(root) => util::relative(root, &source),
                None => source.clone(),
            };
            if !generator.sources.has(&relative_source) {
                generator.sources.add(relative_source, false);
            }
            if let Some(content) = consumer.source_content_for(&source, true)? {
                generator.set_source_content(&source, Some(content.to_string()));
            }
        }

        Ok(generator)
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn source_root(&self) -> Option<&str> {
        self.source_root.as_deref()
    }

    /// Interned sources in first-use order.
    pub fn sources(&self) -> Vec<String> {
        self.sources.to_array()
    }

    pub fn names(&self) -> Vec<String> {
        self.names.to_array()
    }

    /// Record one mapping.
    ///
    /// A mapping must be generated-only or carry both `source` and
    /// `original`; `name` requires the latter. What happens to other shapes
    /// depends on the generator's [`MappingValidation`].
    pub fn add_mapping(&mut self, mapping: NewMapping) -> Result<()> {
        match self.validation {
            MappingValidation::Strict => validate_mapping(&mapping)?,
            MappingValidation::Drop => {
                if let Err(e) = validate_mapping(&mapping) {
                    tracing::warn!(error = %e, "Dropping invalid mapping");
                    return Ok(());
                }
            }
            MappingValidation::Skip => {}
        }

        if let Some(source) = &mapping.source {
            if !self.sources.has(source) {
                self.sources.add(source.as_str(), false);
            }
        }
        if let Some(name) = &mapping.name {
            if !self.names.has(name) {
                self.names.add(name.as_str(), false);
            }
        }

        self.mappings.add(Mapping {
            generated_line: mapping.generated.line,
            generated_column: mapping.generated.column,
            source: mapping.source,
            original_line: mapping.original.map(|p| p.line),
            original_column: mapping.original.map(|p| p.column),
            name: mapping.name,
        });
        Ok(())
    }

    /// Embed (or with `None`, remove) the content of `source`.
    pub fn set_source_content(&mut self, source: &str, content: Option<String>) {
        let key = match &self.source_root {
            Some(root) => util::relative(root, source),
            None => source.to_string(),
        };

        match content {
            Some(content) => {
                self.sources_contents
                    .get_or_insert_with(HashMap::new)
                    .insert(key, content);
            }
            None => {
                if let Some(contents) = self.sources_contents.as_mut() {
                    contents.remove(&key);
                    if contents.is_empty() {
                        self.sources_contents = None;
                    }
                }
            }
        }
    }

    /// Compose with an upstream map.
    ///
    /// Every mapping into `source_file` (defaulting to the consumer's
    /// `file`) is re-resolved through `consumer`, so this generator then maps
    /// straight to the consumer's original sources. Rewritten sources are
    /// joined onto `source_map_path` when given. The source and name tables
    /// are rebuilt to hold only what the mappings still reference.
    pub fn apply_source_map(
        &mut self,
        consumer: &SourceMapConsumer,
        source_file: Option<&str>,
        source_map_path: Option<&str>,
    ) -> Result<()> {
        let mut source_file = match source_file {
            Some(file) => file.to_string(),
            None => consumer.file().ok_or(SourceMapError::MissingFile)?.to_string(),
        };
        let source_root = self.source_root.clone();
        if let Some(root) = &source_root {
            source_file = util::relative(root, &source_file);
        }

        let rebase = |source: &str| {
            let mut source = source.to_string();
            if let Some(path) = source_map_path {
                source = util::join(path, &source);
            }
            if let Some(root) = &source_root {
                source = util::relative(root, &source);
            }
            source
        };

        let mut new_sources = ArraySet::new();
        let mut new_names = ArraySet::new();
        let mut rewritten = 0usize;
        let mut failure = None;

        self.mappings.unsorted_for_each_mut(|mapping| {
            if failure.is_some() {
                return;
            }
            if mapping.source.as_deref() == Some(source_file.as_str()) {
                if let (Some(line), Some(column)) = (mapping.original_line, mapping.original_column)
                {
                    match consumer.original_position_for(line, column, Bias::GreatestLowerBound) {
                        Ok(original) => {
                            if let Some(source) = &original.source {
                                mapping.source = Some(rebase(source));
                                mapping.original_line = original.line;
                                mapping.original_column = original.column;
                                if original.name.is_some() {
                                    mapping.name = original.name;
                                }
                                rewritten += 1;
                            }
                        }
                        Err(e) => {
                            failure = Some(e);
                            return;
                        }
                    }
                }
            }

            if let Some(source) = &mapping.source {
                if !new_sources.has(source) {
                    new_sources.add(source.as_str(), false);
                }
            }
            if let Some(name) = &mapping.name {
                if !new_names.has(name) {
                    new_names.add(name.as_str(), false);
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }

        self.sources = new_sources;
        self.names = new_names;

        for source in consumer.sources() {
            if let Some(content) = consumer.source_content_for(&source, true)? {
                let content = content.to_string();
                let mut source = source;
                if let Some(path) = source_map_path {
                    source = util::join(path, &source);
                }
                if let Some(root) = &source_root {
                    source = util::relative(root, &source);
                }
                self.set_source_content(&source, Some(content));
            }
        }

        tracing::debug!(
            source_file = %source_file,
            rewritten,
            sources = self.sources.size(),
            "Applied upstream source map"
        );
        Ok(())
    }

    /// Mappings sorted by generated position.
    pub(crate) fn sorted_mappings(&mut self) -> &[Mapping] {
        self.mappings.to_array()
    }

    pub(crate) fn interned_sources(&self) -> &ArraySet {
        &self.sources
    }

    pub(crate) fn interned_names(&self) -> &ArraySet {
        &self.names
    }

    /// `sourcesContent` aligned with `sources`, or `None` if nothing is embedded.
    pub(crate) fn generate_sources_content(&self, sources: &[String]) -> Option<Vec<Option<String>>> {
        let contents = self.sources_contents.as_ref()?;
        Some(
            sources
                .iter()
                .map(|source| {
                    let key = match &self.source_root {
                        Some(root) => util::relative(root, source),
                        None => source.clone(),
                    };
                    contents.get(&key).cloned()
                })
                .collect(),
        )
    }

    /// Serialize to a v3 document.
    ///
    /// Takes `&mut self` because the first call may have to sort mappings
    /// that were added out of order; repeated calls return the same result.
    pub fn to_json(&mut self) -> Result<SourceMapDocument> {
        let mappings = serialize_mappings(self.mappings.to_array(), &self.sources, &self.names)?;
        let sources = self.sources.to_array();
        let sources_content = self.generate_sources_content(&sources);
        Ok(SourceMapDocument {
            version: Some(Self::VERSION),
            sources: Some(sources),
            names: Some(self.names.to_array()),
            mappings: Some(mappings),
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources_content,
            sections: None,
        })
    }

    pub fn to_json_string(&mut self) -> Result<String> {
        self.to_json()?.to_json_string()
    }
}

fn validate_mapping(mapping: &NewMapping) -> Result<()> {
    let generated_valid = mapping.generated.line > 0;
    let original_valid = mapping.original.is_some_and(|Position { line, .. }| line > 0);

    let generated_only = generated_valid
        && mapping.original.is_none()
        && mapping.source.is_none()
        && mapping.name.is_none();
    let anchored = generated_valid && original_valid && mapping.source.is_some();

    if generated_only || anchored {
        Ok(())
    } else {
        Err(SourceMapError::InvalidMapping(format!("{mapping:?}")))
    }
}

fn push_delta(out: &mut String, current: i64, previous: i64) -> Result<()> {
    let delta = i32::try_from(current - previous).map_err(|_| SourceMapError::VlqOverflow)?;
    vlq::encode_into(delta, out);
    Ok(())
}

/// Encode sorted mappings as the `mappings` string.
///
/// Every field but the generated column is delta-encoded against the same
/// field of the previous segment across the whole stream; the generated
/// column resets at each line.
fn serialize_mappings(mappings: &[Mapping], sources: &ArraySet, names: &ArraySet) -> Result<String> {
    let mut previous_generated_line: u32 = 1;
    let mut previous_generated_column: i64 = 0;
    let mut previous_source: i64 = 0;
    let mut previous_original_line: i64 = 0;
    let mut previous_original_column: i64 = 0;
    let mut previous_name: i64 = 0;
    let mut result = String::new();

    for (i, mapping) in mappings.iter().enumerate() {
        if mapping.generated_line > previous_generated_line {
            previous_generated_column = 0;
            while previous_generated_line < mapping.generated_line {
                result.push(';');
                previous_generated_line += 1;
            }
        } else if i > 0 {
            if compare_by_generated_positions_inflated(mapping, &mappings[i - 1]) == Ordering::Equal
            {
                continue;
            }
            result.push(',');
        }

        let generated_column = i64::from(mapping.generated_column);
        push_delta(&mut result, generated_column, previous_generated_column)?;
        previous_generated_column = generated_column;

        if let Some(source) = &mapping.source {
            let source_index = sources.index_of(source)? as i64;
            push_delta(&mut result, source_index, previous_source)?;
            previous_source = source_index;

            // lines are 0-based on the wire
            let original_line = i64::from(mapping.original_line.unwrap_or(0)) - 1;
            push_delta(&mut result, original_line, previous_original_line)?;
            previous_original_line = original_line;

            let original_column = i64::from(mapping.original_column.unwrap_or(0));
            push_delta(&mut result, original_column, previous_original_column)?;
            previous_original_column = original_column;

            if let Some(name) = &mapping.name {
                let name_index = names.index_of(name)? as i64;
                push_delta(&mut result, name_index, previous_name)?;
                previous_name = name_index;
            }
        }
    }

    Ok(result)
}
