//! Provenance-tagged text trees
//!
//! A [`SourceNode`] holds generated text in pieces, each piece optionally
//! tagged with the original position it came from. Concatenating the tree
//! yields the generated code; [`SourceNode::to_string_with_source_map`]
//! produces the code and a matching source map in one pass.

use crate::consumer::SourceMapConsumer;
use crate::error::Result;
use crate::generator::SourceMapGenerator;
use crate::mapping::{Mapping, NewMapping};
use crate::types::{GeneratorOptions, MappingOrder, Position};
use crate::util;
use indexmap::IndexMap;
use regex::Regex;
use std::convert::Infallible;
use std::fmt;

/// A child of a [`SourceNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Node(SourceNode),
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Chunk::Text(text.to_string())
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Chunk::Text(text)
    }
}

impl From<SourceNode> for Chunk {
    fn from(node: SourceNode) -> Self {
        Chunk::Node(node)
    }
}

/// The original position a piece of text is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance<'a> {
    pub source: Option<&'a str>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub name: Option<&'a str>,
}

impl Provenance<'_> {
    /// Whether this provenance can anchor a mapping.
    fn is_mapped(&self) -> bool {
        self.source.is_some() && self.line.is_some() && self.column.is_some()
    }

    fn mapping_at(&self, line: u32, column: u32) -> NewMapping {
        NewMapping {
            generated: Position::new(line, column),
            original: Some(Position::new(
                self.line.unwrap_or_default(),
                self.column.unwrap_or_default(),
            )),
            source: self.source.map(str::to_string),
            name: self.name.map(str::to_string),
        }
    }
}

/// Generated code together with its source map.
#[derive(Debug, Clone)]
pub struct CodeWithSourceMap {
    pub code: String,
    pub map: SourceMapGenerator,
}

/// A node of generated text. Text directly inside a node is attributed to
/// that node's position; nested nodes carry their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceNode {
    children: Vec<Chunk>,
    source_contents: IndexMap<String, String>,
    line: Option<u32>,
    column: Option<u32>,
    source: Option<String>,
    name: Option<String>,
}

impl SourceNode {
    /// An untagged node.
    pub fn new() -> Self {
        SourceNode::default()
    }

    /// A node whose text originates at `line:column` (1-based line) of `source`.
    pub fn from_origin(line: u32, column: u32, source: impl Into<String>) -> Self {
        SourceNode {
            line: Some(line),
            column: Some(column),
            source: Some(source.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_child(mut self, chunk: impl Into<Chunk>) -> Self {
        self.add(chunk);
        self
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<u32> {
        self.column
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn children(&self) -> &[Chunk] {
        &self.children
    }

    /// Append a child. Empty text is ignored.
    pub fn add(&mut self, chunk: impl Into<Chunk>) -> &mut Self {
        match chunk.into() {
            Chunk::Text(text) if text.is_empty() => {}
            chunk => self.children.push(chunk),
        }
        self
    }

    pub fn add_all<C: Into<Chunk>>(&mut self, chunks: impl IntoIterator<Item = C>) -> &mut Self {
        for chunk in chunks {
            self.add(chunk);
        }
        self
    }

    pub fn prepend(&mut self, chunk: impl Into<Chunk>) -> &mut Self {
        self.children.insert(0, chunk.into());
        self
    }

    /// Prepend several children, keeping their relative order.
    pub fn prepend_all<C: Into<Chunk>>(&mut self, chunks: impl IntoIterator<Item = C>) -> &mut Self {
        let mut chunks: Vec<Chunk> = chunks.into_iter().map(Into::into).collect();
        chunks.append(&mut self.children);
        self.children = chunks;
        self
    }

    fn provenance(&self) -> Provenance<'_> {
        Provenance {
            source: self.source.as_deref(),
            line: self.line,
            column: self.column,
            name: self.name.as_deref(),
        }
    }

    /// Depth-first, left-to-right traversal that stops at the first error.
    fn try_walk<'a, E>(
        &'a self,
        f: &mut impl FnMut(&'a str, Provenance<'a>) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        for chunk in &self.children {
            match chunk {
                Chunk::Node(node) => node.try_walk(f)?,
                Chunk::Text(text) if !text.is_empty() => f(text, self.provenance())?,
                Chunk::Text(_) => {}
            }
        }
        Ok(())
    }

    /// Visit every non-empty text leaf with the provenance of its nearest
    /// enclosing node.
    pub fn walk<'a>(&'a self, mut f: impl FnMut(&'a str, Provenance<'a>)) {
        let Ok(()) = self.try_walk::<Infallible>(&mut |text, provenance| {
            f(text, provenance);
            Ok(())
        });
    }

    /// Interleave `separator` between the children.
    pub fn join(&mut self, separator: &str) -> &mut Self {
        let count = self.children.len();
        if count > 1 {
            let mut joined = Vec::with_capacity(count * 2 - 1);
            for (i, chunk) in self.children.drain(..).enumerate() {
                if i > 0 {
                    joined.push(Chunk::from(separator));
                }
                joined.push(chunk);
            }
            self.children = joined;
        }
        self
    }

    /// Replace the first match of `pattern` in the right-most text leaf.
    pub fn replace_right(&mut self, pattern: &Regex, replacement: &str) -> &mut Self {
        match self.children.last_mut() {
            Some(Chunk::Node(node)) => {
                node.replace_right(pattern, replacement);
            }
            Some(Chunk::Text(text)) => {
                *text = pattern.replace(text, replacement).into_owned();
            }
            None => {
                let text = pattern.replace("", replacement).into_owned();
                self.children.push(Chunk::Text(text));
            }
        }
        self
    }

    pub fn set_source_content(&mut self, source: impl Into<String>, content: impl Into<String>) {
        self.source_contents.insert(source.into(), content.into());
    }

    /// Visit every embedded source content, descendants first.
    pub fn walk_source_contents(&self, f: &mut impl FnMut(&str, &str)) {
        for chunk in &self.children {
            if let Chunk::Node(node) = chunk {
                node.walk_source_contents(f);
            }
        }
        for (source, content) in &self.source_contents {
            f(source, content);
        }
    }

    /// Concatenate the tree and build the source map describing it.
    pub fn to_string_with_source_map(&self, options: GeneratorOptions) -> Result<CodeWithSourceMap> {
        let mut state = EmitState::new(SourceMapGenerator::new(options));
        self.try_walk(&mut |text, provenance| state.emit(text, provenance))?;

        let EmitState {
            code,
            line,
            mut generator,
            mappings,
            ..
        } = state;
        self.walk_source_contents(&mut |source, content| {
            generator.set_source_content(source, Some(content.to_string()));
        });

        tracing::debug!(lines = line, mappings, "Emitted source node");
        Ok(CodeWithSourceMap {
            code,
            map: generator,
        })
    }

    /// Rebuild a tree from generated code and the map describing it, so the
    /// code can be recomposed without losing its provenance.
    ///
    /// Sources are joined onto `relative_path` when given.
    pub fn from_string_with_source_map(
        code: &str,
        consumer: &SourceMapConsumer,
        relative_path: Option<&str>,
    ) -> Result<Self> {
        let mut lines = RemainingLines::split(code);
        let mut node = SourceNode::new();
        let mut last_line: u32 = 1;
        let mut last_column: u32 = 0;
        let mut last_mapping: Option<Mapping> = None;

        for mapping in consumer.mappings(MappingOrder::Generated)? {
            if let Some(last) = last_mapping.take() {
                if last_line < mapping.generated_line {
                    // the previous mapping runs to the end of its line
                    node.add(tagged_chunk(&last, lines.shift_line(), relative_path));
                    last_line += 1;
                    last_column = 0;
                } else {
                    let piece =
                        lines.take_prefix(mapping.generated_column.saturating_sub(last_column));
                    last_column = mapping.generated_column;
                    node.add(tagged_chunk(&last, piece, relative_path));
                    last_mapping = Some(mapping);
                    continue;
                }
            }

            while last_line < mapping.generated_line {
                node.add(lines.shift_line());
                last_line += 1;
            }
            if last_column < mapping.generated_column {
                node.add(lines.take_prefix(mapping.generated_column - last_column));
                last_column = mapping.generated_column;
            }
            last_mapping = Some(mapping);
        }

        if lines.has_remaining() {
            if let Some(last) = &last_mapping {
                node.add(tagged_chunk(last, lines.shift_line(), relative_path));
            }
            node.add(lines.take_rest());
        }

        for source in consumer.sources() {
            if let Some(content) = consumer.source_content_for(&source, true)? {
                let source = match relative_path {
                    Some(path) => util::join(path, &source),
                    None => source,
                };
                node.set_source_content(source, content);
            }
        }

        Ok(node)
    }
}

impl fmt::Display for SourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.try_walk(&mut |text, _| f.write_str(text))
    }
}

/// Text attributed to `mapping`, or plain text for generated-only mappings.
fn tagged_chunk(mapping: &Mapping, code: String, relative_path: Option<&str>) -> Chunk {
    match &mapping.source {
        None => Chunk::Text(code),
        Some(source) => {
            let source = match relative_path {
                Some(path) => util::join(path, source),
                None => source.clone(),
            };
            let mut node = SourceNode {
                line: mapping.original_line,
                column: mapping.original_column,
                source: Some(source),
                name: mapping.name.clone(),
                ..Default::default()
            };
            node.add(code);
            Chunk::Node(node)
        }
    }
}

/// Cursor and generator threaded through one emission pass.
struct EmitState<'a> {
    code: String,
    line: u32,
    /// In UTF-16 code units.
    column: u32,
    /// Provenance of the mapping currently open, if any.
    open: Option<Provenance<'a>>,
    generator: SourceMapGenerator,
    mappings: usize,
}

impl<'a> EmitState<'a> {
    fn new(generator: SourceMapGenerator) -> Self {
        EmitState {
            code: String::new(),
            line: 1,
            column: 0,
            open: None,
            generator,
            mappings: 0,
        }
    }

    fn add(&mut self, mapping: NewMapping) -> Result<()> {
        self.mappings += 1;
        self.generator.add_mapping(mapping)
    }

    fn emit(&mut self, text: &'a str, provenance: Provenance<'a>) -> Result<()> {
        self.code.push_str(text);

        if provenance.is_mapped() {
            if self.open != Some(provenance) {
                self.add(provenance.mapping_at(self.line, self.column))?;
            }
            self.open = Some(provenance);
        } else if self.open.is_some() {
            self.add(NewMapping::generated_only(Position::new(self.line, self.column)))?;
            self.open = None;
        }

        for (i, ch) in text.char_indices() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
                if i + 1 == text.len() {
                    self.open = None;
                } else if let Some(open) = self.open {
                    self.add(open.mapping_at(self.line, self.column))?;
                }
            } else {
                self.column += ch.len_utf16() as u32;
            }
        }
        Ok(())
    }
}

/// Generated code split into lines and their terminators, consumed front to
/// back while rebuilding a tree.
#[derive(Debug)]
struct RemainingLines {
    /// Alternating line text and `\n` / `\r\n` terminators.
    parts: Vec<String>,
    index: usize,
}

impl RemainingLines {
    fn split(code: &str) -> Self {
        let mut parts = Vec::new();
        let mut start = 0;
        for (i, _) in code.match_indices('\n') {
            let line_end = if i > start && code.as_bytes()[i - 1] == b'\r' {
                i - 1
            } else {
                i
            };
            parts.push(code[start..line_end].to_string());
            parts.push(code[line_end..=i].to_string());
            start = i + 1;
        }
        parts.push(code[start..].to_string());
        RemainingLines { parts, index: 0 }
    }

    fn has_remaining(&self) -> bool {
        self.index < self.parts.len()
    }

    fn next_part(&mut self) -> String {
        match self.parts.get_mut(self.index) {
            Some(part) => {
                self.index += 1;
                std::mem::take(part)
            }
            None => String::new(),
        }
    }

    /// The rest of the current line including its terminator.
    fn shift_line(&mut self) -> String {
        let mut line = self.next_part();
        line.push_str(&self.next_part());
        line
    }

    /// Cut the first `units` UTF-16 code units off the current line.
    fn take_prefix(&mut self, units: u32) -> String {
        let Some(current) = self.parts.get_mut(self.index) else {
            return String::new();
        };
        let split = utf16_byte_offset(current, units);
        let rest = current.split_off(split);
        std::mem::replace(current, rest)
    }

    fn take_rest(&mut self) -> String {
        let rest = self.parts[self.index..].concat();
        self.index = self.parts.len();
        rest
    }
}

/// Byte offset of the first char starting at or after `units` UTF-16 code units.
fn utf16_byte_offset(text: &str, units: u32) -> usize {
    let mut count = 0u32;
    for (i, ch) in text.char_indices() {
        if count >= units {
            return i;
        }
        count += ch.len_utf16() as u32;
    }
    text.len()
}
