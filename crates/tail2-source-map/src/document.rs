//! The Source Map v3 JSON document

use crate::error::Result;
use crate::util::parse_source_map_input;
use serde::{Deserialize, Serialize};

/// A Source Map v3 document, either a regular map or an indexed map with
/// `sections`.
///
/// Every field is optional at the type level so that missing required
/// fields surface as `SourceMapError::MissingArgument` from the consumer
/// instead of a generic JSON error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionDocument>>,
}

/// One entry of an indexed map's `sections`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<SectionOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<Box<SourceMapDocument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Generated offset of a section. Both fields are 0-based, as in the JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOffset {
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl SourceMapDocument {
    /// Parse JSON text, dropping a leading XSSI guard line if present.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(parse_source_map_input(input))?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_indexed(&self) -> bool {
        self.sections.is_some()
    }
}
