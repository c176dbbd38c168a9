//! Decoded mappings and the two sorted views used for lookups

use crate::binary_search;
use crate::error::{Result, SourceMapError};
use crate::mapping::compare_nullable;
use crate::types::{Bias, GeneratedPosition, LastColumn, MappingOrder};
use crate::vlq;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A decoded mapping whose source and name are indices into the consumer's
/// tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawMapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub last_generated_column: Option<LastColumn>,
    pub source: Option<usize>,
    pub original_line: Option<u32>,
    pub original_column: Option<u32>,
    pub name: Option<usize>,
}

impl RawMapping {
    pub fn generated_position(&self) -> GeneratedPosition {
        GeneratedPosition {
            line: Some(self.generated_line),
            column: Some(self.generated_column),
            last_column: self.last_generated_column,
        }
    }
}

/// Generated order with source and name compared by index.
fn compare_by_generated_positions_deflated(a: &RawMapping, b: &RawMapping) -> Ordering {
    a.generated_line
        .cmp(&b.generated_line)
        .then(a.generated_column.cmp(&b.generated_column))
        .then_with(|| compare_nullable(a.source.as_ref(), b.source.as_ref()))
        .then(a.original_line.unwrap_or(0).cmp(&b.original_line.unwrap_or(0)))
        .then(a.original_column.unwrap_or(0).cmp(&b.original_column.unwrap_or(0)))
        .then_with(|| compare_nullable(a.name.as_ref(), b.name.as_ref()))
}

fn compare_by_original_positions(a: &RawMapping, b: &RawMapping) -> Ordering {
    compare_nullable(a.source.as_ref(), b.source.as_ref())
        .then(a.original_line.cmp(&b.original_line))
        .then(a.original_column.cmp(&b.original_column))
        .then(a.generated_line.cmp(&b.generated_line))
        .then(a.generated_column.cmp(&b.generated_column))
        .then_with(|| compare_nullable(a.name.as_ref(), b.name.as_ref()))
}

/// Running totals while decoding. The generated column resets on every new
/// line; every other field accumulates across the whole string.
#[derive(Debug)]
struct DeltaState {
    generated_line: u32,
    generated_column: i64,
    source: i64,
    original_line: i64,
    original_column: i64,
    name: i64,
}

impl DeltaState {
    fn new() -> Self {
        DeltaState {
            generated_line: 1,
            generated_column: 0,
            source: 0,
            original_line: 0,
            original_column: 0,
            name: 0,
        }
    }

    fn next_line(&mut self) {
        self.generated_line += 1;
        self.generated_column = 0;
    }

    /// Apply one segment's deltas and produce its mapping.
    fn apply(&mut self, fields: &[i32]) -> Result<RawMapping> {
        self.generated_column += i64::from(fields[0]);
        let mut mapping = RawMapping {
            generated_line: self.generated_line,
            generated_column: non_negative("generatedColumn", self.generated_column)?,
            last_generated_column: None,
            source: None,
            original_line: None,
            original_column: None,
            name: None,
        };

        if fields.len() > 1 {
            self.source += i64::from(fields[1]);
            self.original_line += i64::from(fields[2]);
            self.original_column += i64::from(fields[3]);
            mapping.source = Some(non_negative("source", self.source)? as usize);
            // lines are 0-based on the wire
            mapping.original_line = Some(non_negative("originalLine", self.original_line)? + 1);
            mapping.original_column = Some(non_negative("originalColumn", self.original_column)?);

            if fields.len() > 4 {
                self.name += i64::from(fields[4]);
                mapping.name = Some(non_negative("name", self.name)? as usize);
            }
        }

        Ok(mapping)
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| SourceMapError::NegativeField { field, value })
}

fn decode_fields(segment: &str) -> Result<Vec<i32>> {
    let mut fields = Vec::with_capacity(5);
    let mut index = 0;
    while index < segment.len() {
        let (value, next) = vlq::decode(segment, index)?;
        fields.push(value);
        index = next;
    }

    match fields.len() {
        2 => Err(SourceMapError::SegmentMissingLineColumn),
        3 => Err(SourceMapError::SegmentMissingColumn),
        _ => Ok(fields),
    }
}

/// Every mapping of one map, sorted by generated position, plus a second
/// view (indices into the first) sorted by original position.
#[derive(Debug, Clone, Default)]
pub(crate) struct MappingIndex {
    generated: Vec<RawMapping>,
    original: Vec<usize>,
}

impl MappingIndex {
    /// Decode a `mappings` string.
    pub fn decode(mappings: &str) -> Result<Self> {
        let mut state = DeltaState::new();
        let mut decoded = Vec::new();
        // identical segments decode to identical deltas
        let mut memo: HashMap<&str, Vec<i32>> = HashMap::new();

        let bytes = mappings.as_bytes();
        let mut index = 0;
        while index < bytes.len() {
            match bytes[index] {
                b';' => {
                    state.next_line();
                    index += 1;
                }
                b',' => index += 1,
                _ => {
                    let end = bytes[index..]
                        .iter()
                        .position(|&b| b == b';' || b == b',')
                        .map_or(bytes.len(), |offset| index + offset);
                    let segment = &mappings[index..end];
                    if !memo.contains_key(segment) {
                        memo.insert(segment, decode_fields(segment)?);
                    }
                    decoded.push(state.apply(&memo[segment])?);
                    index = end;
                }
            }
        }

        tracing::debug!(
            mappings = decoded.len(),
            lines = state.generated_line,
            distinct_segments = memo.len(),
            "Decoded mappings"
        );
        Ok(Self::from_mappings(decoded))
    }

    /// Build both views over already-decoded mappings.
    pub fn from_mappings(mut mappings: Vec<RawMapping>) -> Self {
        mappings.sort_by(compare_by_generated_positions_deflated);

        let mut original: Vec<usize> = (0..mappings.len())
            .filter(|&i| mappings[i].source.is_some())
            .collect();
        original.sort_by(|&a, &b| compare_by_original_positions(&mappings[a], &mappings[b]));

        MappingIndex {
            generated: mappings,
            original,
        }
    }

    pub fn len(&self) -> usize {
        self.generated.len()
    }

    /// Visit mappings in the requested order. Generated-only mappings are
    /// absent from original order.
    pub fn for_each(
        &self,
        order: MappingOrder,
        mut f: impl FnMut(&RawMapping) -> Result<()>,
    ) -> Result<()> {
        match order {
            MappingOrder::Generated => self.generated.iter().try_for_each(f),
            MappingOrder::Original => self
                .original
                .iter()
                .try_for_each(|&i| f(&self.generated[i])),
        }
    }

    /// The mapping covering a generated position, restricted to its line.
    pub fn find_generated(&self, line: u32, column: u32, bias: Bias) -> Option<&RawMapping> {
        let index = binary_search::search(&(line, column), &self.generated, bias, |m| {
            (m.generated_line, m.generated_column)
        })?;
        let mapping = &self.generated[index];
        (mapping.generated_line == line).then_some(mapping)
    }

    fn search_original(&self, source: usize, line: u32, column: u32, bias: Bias) -> Option<usize> {
        binary_search::search(
            &(Some(source), Some(line), Some(column)),
            &self.original,
            bias,
            |&i| {
                let m = &self.generated[i];
                (m.source, m.original_line, m.original_column)
            },
        )
    }

    /// The mapping covering an original position in `source`.
    pub fn find_original(
        &self,
        source: usize,
        line: u32,
        column: u32,
        bias: Bias,
    ) -> Option<&RawMapping> {
        let index = self.search_original(source, line, column, bias)?;
        let mapping = &self.generated[self.original[index]];
        (mapping.source == Some(source)).then_some(mapping)
    }

    /// Every generated position for an original line, or for one column of
    /// it. When the exact column has no mapping, the next mapped column on
    /// the same line is used instead.
    pub fn all_generated_for(
        &self,
        source: usize,
        line: u32,
        column: Option<u32>,
    ) -> Vec<GeneratedPosition> {
        let Some(start) =
            self.search_original(source, line, column.unwrap_or(0), Bias::LeastUpperBound)
        else {
            return Vec::new();
        };

        let candidates = self.original[start..].iter().map(|&i| &self.generated[i]);
        let first = &self.generated[self.original[start]];
        let matched: Vec<GeneratedPosition> = match column {
            None => {
                let original_line = first.original_line;
                candidates
                    .take_while(|m| m.source == Some(source) && m.original_line == original_line)
                    .map(RawMapping::generated_position)
                    .collect()
            }
            Some(_) => {
                let original_column = first.original_column;
                candidates
                    .take_while(|m| {
                        m.source == Some(source)
                            && m.original_line == Some(line)
                            && m.original_column == original_column
                    })
                    .map(RawMapping::generated_position)
                    .collect()
            }
        };
        matched
    }

    /// Fill in `last_generated_column` for every mapping.
    pub fn compute_column_spans(&mut self) {
        let count = self.generated.len();
        for i in 0..count {
            let last = match self.generated.get(i + 1) {
                Some(next) if next.generated_line == self.generated[i].generated_line => {
                    LastColumn::At(next.generated_column.saturating_sub(1))
                }
                _ => LastColumn::EndOfLine,
            };
            self.generated[i].last_generated_column = Some(last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn generated(index: &MappingIndex) -> Vec<(u32, u32, Option<usize>, Option<u32>, Option<u32>)> {
        let mut out = Vec::new();
        index
            .for_each(MappingOrder::Generated, |m| {
                out.push((
                    m.generated_line,
                    m.generated_column,
                    m.source,
                    m.original_line,
                    m.original_column,
                ));
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn test_decode_single_line() {
        let index = MappingIndex::decode("AAAA,KAAE").unwrap();
        assert_eq!(
            generated(&index),
            vec![(1, 0, Some(0), Some(1), Some(0)), (1, 5, Some(0), Some(1), Some(2))]
        );
    }

    #[test]
    fn test_decode_generated_column_resets_per_line() {
        let index = MappingIndex::decode("CAACA;;ECCD,M").unwrap();
        assert_eq!(
            generated(&index),
            vec![
                (1, 1, Some(0), Some(1), Some(1)),
                (3, 2, Some(1), Some(2), Some(0)),
                (3, 8, None, None, None),
            ]
        );
    }

    #[test]
    fn test_decode_names() {
        let index = MappingIndex::decode("AAAAA,CAAAC").unwrap();
        let mut names = Vec::new();
        index
            .for_each(MappingOrder::Generated, |m| {
                names.push(m.name);
                Ok(())
            })
            .unwrap();
        assert_eq!(names, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_decode_empty_and_separators_only() {
        assert_eq!(MappingIndex::decode("").unwrap().len(), 0);
        assert_eq!(MappingIndex::decode(";;,;").unwrap().len(), 0);
    }

    #[test]
    fn test_decode_rejects_short_segments() {
        assert!(matches!(
            MappingIndex::decode("AA"),
            Err(SourceMapError::SegmentMissingLineColumn)
        ));
        assert!(matches!(
            MappingIndex::decode("AAA"),
            Err(SourceMapError::SegmentMissingColumn)
        ));
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let index = MappingIndex::decode("AAAAAA").unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_decode_rejects_negative_totals() {
        assert!(matches!(
            MappingIndex::decode("D"),
            Err(SourceMapError::NegativeField {
                field: "generatedColumn",
                value: -1
            })
        ));
        assert!(matches!(
            MappingIndex::decode("ADAA"),
            Err(SourceMapError::NegativeField { field: "source", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_digits() {
        assert!(matches!(
            MappingIndex::decode("AA!A"),
            Err(SourceMapError::InvalidBase64Digit('!'))
        ));
        assert!(matches!(
            MappingIndex::decode("g"),
            Err(SourceMapError::VlqUnexpectedEof)
        ));
    }

    #[test]
    fn test_repeated_segments_share_memo() {
        // each "CAAC" advances every running total again
        let index = MappingIndex::decode("AAAA,CAAC,CAAC").unwrap();
        assert_eq!(
            generated(&index),
            vec![
                (1, 0, Some(0), Some(1), Some(0)),
                (1, 1, Some(0), Some(1), Some(1)),
                (1, 2, Some(0), Some(1), Some(2)),
            ]
        );
    }

    #[test]
    fn test_find_generated_respects_line() {
        let index = MappingIndex::decode("AAAA,KAAE;AACA").unwrap();
        let m = index.find_generated(1, 7, Bias::GreatestLowerBound).unwrap();
        assert_eq!(m.generated_column, 5);

        // the upper bound on line 1 would be on line 2
        assert!(index.find_generated(1, 7, Bias::LeastUpperBound).is_none());
        assert!(index.find_generated(3, 0, Bias::GreatestLowerBound).is_none());
    }

    #[test]
    fn test_find_original() {
        // line 1: a.js 1:0, line 2: b.js 1:0, line 3: a.js 2:4
        let index = MappingIndex::decode("AAAA;ACAA;ADCI").unwrap();
        let m = index.find_original(0, 2, 4, Bias::GreatestLowerBound).unwrap();
        assert_eq!(m.generated_line, 3);

        let m = index.find_original(0, 2, 0, Bias::LeastUpperBound).unwrap();
        assert_eq!(m.generated_line, 3);

        assert!(index.find_original(1, 5, 0, Bias::LeastUpperBound).is_none());
    }

    #[test]
    fn test_original_order_excludes_generated_only() {
        let index = MappingIndex::decode("A,CAAA").unwrap();
        let mut count = 0;
        index
            .for_each(MappingOrder::Original, |_| {
                count += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_all_generated_for_line() {
        // a.js 1:0 appears at 1:0 and 2:0; a.js 1:4 at 1:6
        let index = MappingIndex::decode("AAAA,MAAI;AAAJ").unwrap();
        let positions = index.all_generated_for(0, 1, None);
        let lines: Vec<_> = positions.iter().map(|p| (p.line, p.column)).collect();
        assert_eq!(
            lines,
            vec![(Some(1), Some(0)), (Some(2), Some(0)), (Some(1), Some(6))]
        );

        let exact = index.all_generated_for(0, 1, Some(4));
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].column, Some(6));

        // column 2 has nothing; the next mapped column on the line is 4
        let next = index.all_generated_for(0, 1, Some(2));
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].column, Some(6));

        assert!(index.all_generated_for(0, 7, None).is_empty());
    }

    #[test]
    fn test_column_spans() {
        let mut index = MappingIndex::decode("AAAA,KAAE;AACA").unwrap();
        index.compute_column_spans();
        let spans: Vec<_> = index.generated.iter().map(|m| m.last_generated_column).collect();
        assert_eq!(
            spans,
            vec![
                Some(LastColumn::At(4)),
                Some(LastColumn::EndOfLine),
                Some(LastColumn::EndOfLine),
            ]
        );
    }
}
