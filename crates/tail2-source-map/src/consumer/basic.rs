//! Consumer for regular (non-sectioned) source maps

use super::index::{MappingIndex, RawMapping};
use crate::array_set::ArraySet;
use crate::document::SourceMapDocument;
use crate::error::{Result, SourceMapError};
use crate::generator::SourceMapGenerator;
use crate::mapping::Mapping;
use crate::types::{Bias, ConsumerOptions, GeneratedPosition, MappingOrder, OriginalPosition};
use crate::util;
use std::sync::OnceLock;

/// Answers position queries against one regular source map.
///
/// The `mappings` string is only decoded on the first query that needs it
/// (or an explicit [`ensure_indices_built`](Self::ensure_indices_built)).
#[derive(Debug)]
pub struct BasicSourceMapConsumer {
    file: Option<String>,
    source_root: Option<String>,
    /// Normalized `sources` as they appear in the map.
    sources: ArraySet,
    /// `sources` resolved against the root and the map URL.
    absolute_sources: Vec<String>,
    names: ArraySet,
    sources_content: Option<Vec<Option<String>>>,
    mappings: String,
    index: OnceLock<MappingIndex>,
}

impl BasicSourceMapConsumer {
    pub fn new(document: SourceMapDocument, options: &ConsumerOptions) -> Result<Self> {
        let version = document
            .version
            .ok_or(SourceMapError::MissingArgument("version"))?;
        if version != 3 {
            return Err(SourceMapError::UnsupportedVersion(version));
        }
        let raw_sources = document
            .sources
            .ok_or(SourceMapError::MissingArgument("sources"))?;
        let mappings = document
            .mappings
            .ok_or(SourceMapError::MissingArgument("mappings"))?;

        let source_root = document
            .source_root
            .filter(|root| !root.is_empty())
            .map(|root| util::normalize(&root));

        // Sources and the root are only made relative to each other when both
        // are absolute; a relative root stays a prefix applied at lookup time.
        let sources = raw_sources.iter().map(|source| {
            let source = util::normalize(source);
            match &source_root {
                Some(root) if util::is_absolute(root) && util::is_absolute(&source) => {
                    util::relative(root, &source)
                }
                _ => source,
            }
        });
        let sources = ArraySet::from_array(sources, true);
        let names = ArraySet::from_array(document.names.unwrap_or_default(), true);

        let absolute_sources = resolve_sources(&sources, source_root.as_deref(), options)?;

        tracing::debug!(
            file = ?document.file,
            sources = sources.len(),
            names = names.len(),
            "Parsed source map"
        );

        Ok(BasicSourceMapConsumer {
            file: document.file,
            source_root,
            sources,
            absolute_sources,
            names,
            sources_content: document.sources_content,
            mappings,
            index: OnceLock::new(),
        })
    }

    /// A consumer over a generator's current state, with its index built
    /// from the generator's mappings directly rather than re-decoded.
    pub fn from_generator(
        generator: &mut SourceMapGenerator,
        options: &ConsumerOptions,
    ) -> Result<Self> {
        let sources = ArraySet::from_array(generator.interned_sources().iter(), true);
        let names = ArraySet::from_array(generator.interned_names().iter(), true);
        let source_root = generator.source_root().map(str::to_string);
        let sources_content = generator.generate_sources_content(&sources.to_array());
        let absolute_sources = resolve_sources(&sources, source_root.as_deref(), options)?;

        let mut raw = Vec::new();
        for mapping in generator.sorted_mappings() {
            let source = mapping
                .source
                .as_deref()
                .map(|s| sources.index_of(s))
                .transpose()?;
            let name = mapping
                .name
                .as_deref()
                .map(|n| names.index_of(n))
                .transpose()?;
            raw.push(RawMapping {
                generated_line: mapping.generated_line,
                generated_column: mapping.generated_column,
                last_generated_column: None,
                source,
                original_line: source.and(mapping.original_line),
                original_column: source.and(mapping.original_column),
                name: source.and(name),
            });
        }

        Ok(BasicSourceMapConsumer {
            file: generator.file().map(str::to_string),
            source_root,
            sources,
            absolute_sources,
            names,
            sources_content,
            mappings: String::new(),
            index: OnceLock::from(MappingIndex::from_mappings(raw)),
        })
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn source_root(&self) -> Option<&str> {
        self.source_root.as_deref()
    }

    /// Resolved source URLs, in `sources` order.
    pub fn sources(&self) -> Vec<String> {
        self.absolute_sources.clone()
    }

    /// Decode `mappings` if that has not happened yet.
    pub fn ensure_indices_built(&self) -> Result<()> {
        self.indices().map(|_| ())
    }

    fn indices(&self) -> Result<&MappingIndex> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let built = MappingIndex::decode(&self.mappings)?;
        Ok(self.index.get_or_init(|| built))
    }

    /// Index of `source` in `sources`, accepting either the stored form or
    /// the resolved URL.
    pub(crate) fn find_source_index(&self, source: &str) -> Option<usize> {
        let relative_source = match &self.source_root {
            Some(root) => util::relative(root, source),
            None => source.to_string(),
        };
        if let Ok(index) = self.sources.index_of(&relative_source) {
            return Some(index);
        }
        self.absolute_sources.iter().position(|s| s == source)
    }

    /// The resolved URL that `source` refers to, if this map has it.
    pub(crate) fn resolved_source(&self, source: &str) -> Option<&str> {
        let index = self.find_source_index(source)?;
        self.absolute_sources.get(index).map(String::as_str)
    }

    fn resolve(&self, raw: &RawMapping) -> Result<Mapping> {
        let source = raw
            .source
            .map(|i| self.absolute_source(i))
            .transpose()?;
        let name = raw
            .name
            .map(|i| self.names.at(i).map(str::to_string))
            .transpose()?;
        Ok(Mapping {
            generated_line: raw.generated_line,
            generated_column: raw.generated_column,
            source,
            original_line: raw.original_line,
            original_column: raw.original_column,
            name,
        })
    }

    fn absolute_source(&self, index: usize) -> Result<String> {
        self.absolute_sources
            .get(index)
            .cloned()
            .ok_or(SourceMapError::IndexOutOfRange(index))
    }

    /// Map a generated position (1-based line, 0-based column) back to its
    /// original position.
    pub fn original_position_for(
        &self,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Result<OriginalPosition> {
        if line == 0 {
            return Err(SourceMapError::InvalidLine(line));
        }
        let index = self.indices()?;
        let Some(raw) = index.find_generated(line, column, bias) else {
            return Ok(OriginalPosition::default());
        };
        let mapping = self.resolve(raw)?;
        Ok(OriginalPosition {
            source: mapping.source,
            line: mapping.original_line,
            column: mapping.original_column,
            name: mapping.name,
        })
    }

    /// Map an original position in `source` to a generated position.
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
        let Some(source_index) = self.find_source_index(source) else {
            return Ok(GeneratedPosition::default());
        };
        Ok(self
            .indices()?
            .find_original(source_index, line, column, bias)
            .map(RawMapping::generated_position)
            .unwrap_or_default())
    }

    /// Every generated position for an original line, or for one column of
    /// it when `column` is given.
    pub fn all_generated_positions_for(
        &self,
        source: &str,
        line: u32,
        column: Option<u32>,
    ) -> Result<Vec<GeneratedPosition>> {
        if line == 0 {
            return Err(SourceMapError::InvalidLine(line));
        }
        let Some(source_index) = self.find_source_index(source) else {
            return Ok(Vec::new());
        };
        Ok(self.indices()?.all_generated_for(source_index, line, column))
    }

    /// Record how far each mapping extends along its generated line.
    pub fn compute_column_spans(&mut self) -> Result<()> {
        self.indices()?;
        if let Some(index) = self.index.get_mut() {
            index.compute_column_spans();
        }
        Ok(())
    }

    /// Visit every mapping, with source and name resolved to strings.
    pub fn each_mapping(&self, order: MappingOrder, mut f: impl FnMut(&Mapping)) -> Result<()> {
        self.indices()?.for_each(order, |raw| {
            f(&self.resolve(raw)?);
            Ok(())
        })
    }

    pub fn mappings(&self, order: MappingOrder) -> Result<Vec<Mapping>> {
        let mut out = Vec::with_capacity(self.indices()?.len());
        self.each_mapping(order, |m| out.push(m.clone()))?;
        Ok(out)
    }

    /// Whether every source has embedded content.
    pub fn has_contents_of_all_sources(&self) -> bool {
        self.sources_content.as_ref().is_some_and(|contents| {
            contents.len() >= self.sources.size() && contents.iter().all(Option::is_some)
        })
    }

    /// Embedded content of `source`.
    ///
    /// Returns `Ok(None)` when the map embeds no content at all. Otherwise a
    /// source that cannot be matched is an error unless `null_on_missing`.
    pub fn source_content_for(&self, source: &str, null_on_missing: bool) -> Result<Option<&str>> {
        let Some(contents) = &self.sources_content else {
            return Ok(None);
        };
        let content_at = |index: usize| contents.get(index).and_then(|c| c.as_deref());

        if let Some(index) = self.find_source_index(source) {
            return Ok(content_at(index));
        }

        let mut relative_source = source.to_string();
        if let Some(root) = &self.source_root {
            relative_source = util::relative(root, source);
            if let Some(url) = util::url_parse(root) {
                let file_path = relative_source
                    .strip_prefix("file://")
                    .unwrap_or(&relative_source);
                if url.scheme.as_deref() == Some("file") {
                    if let Ok(index) = self.sources.index_of(file_path) {
                        return Ok(content_at(index));
                    }
                }
                if url.path.as_deref().is_none_or(|path| path == "/") {
                    if let Ok(index) = self.sources.index_of(&format!("/{relative_source}")) {
                        return Ok(content_at(index));
                    }
                }
            }
        }

        if null_on_missing {
            Ok(None)
        } else {
            Err(SourceMapError::SourceNotFound(relative_source))
        }
    }
}

fn resolve_sources(
    sources: &ArraySet,
    source_root: Option<&str>,
    options: &ConsumerOptions,
) -> Result<Vec<String>> {
    sources
        .iter()
        .map(|source| {
            util::compute_source_url(source_root, source, options.source_map_url.as_deref())
        })
        .collect()
}
