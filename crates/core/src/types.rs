//! Domain types for the text map: addresses, entries and the map itself.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The container-specific part of an address.
///
/// Serialized inline into the entry object, with `container` as the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "container", rename_all = "snake_case")]
pub enum Container {
    /// A run inside a shape's own text frame.
    TextFrame {
        paragraph_index: usize,
        run_index: usize,
    },
    /// A run inside the text frame of one table cell.
    TableCell {
        table_row: usize,
        table_col: usize,
        paragraph_index: usize,
        run_index: usize,
    },
    /// A text node inside a chart's backing part.
    ChartPart {
        chart_partname: String,
        chart_text_index: usize,
    },
}

impl Container {
    /// Wire names of every container kind, in variant order.
    pub const KINDS: [&'static str; 3] = ["text_frame", "table_cell", "chart_part"];

    /// Wire name of this container kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Container::TextFrame { .. } => Self::KINDS[0],
            Container::TableCell { .. } => Self::KINDS[1],
            Container::ChartPart { .. } => Self::KINDS[2],
        }
    }
}

/// Identity of one text leaf inside a presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// 1-based slide position.
    pub slide_index: usize,
    /// 1-based shape positions, outermost group first.
    pub shape_index_chain: Vec<usize>,
    pub container: Container,
}

impl Address {
    /// Dotted path of the addressed shape, e.g. `slide[2].shape[1].shape[3]`.
    pub fn shape_path(&self) -> String {
        shape_path(self.slide_index, &self.shape_index_chain)
    }

    /// Dotted path of the addressed leaf.
    pub fn path(&self) -> String {
        let shape = self.shape_path();
        match &self.container {
            Container::TextFrame {
                paragraph_index,
                run_index,
            } => format!(
                "{}.text_frame.paragraph[{}].run[{}]",
                shape, paragraph_index, run_index
            ),
            Container::TableCell {
                table_row,
                table_col,
                paragraph_index,
                run_index,
            } => format!(
                "{}.table.cell[{},{}].table_cell.paragraph[{}].run[{}]",
                shape, table_row, table_col, paragraph_index, run_index
            ),
            Container::ChartPart {
                chart_text_index, ..
            } => format!("{}.chart.text[{}]", shape, chart_text_index),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Build the dotted path of a shape from its slide and index chain.
pub fn shape_path(slide_index: usize, chain: &[usize]) -> String {
    let mut path = format!("slide[{}]", slide_index);
    for idx in chain {
        path.push_str(&format!(".shape[{}]", idx));
    }
    path
}

/// Descriptive metadata for the shape that owns a text leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMeta {
    pub slide_id: Option<u32>,
    pub slide_layout: Option<String>,
    pub shape_id: Option<u32>,
    pub shape_name: String,
    pub shape_type: String,
}

/// One text leaf: its address, descriptive metadata and current text.
///
/// The field set is closed: unknown keys in an entry are ignored on load and
/// not written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub slide_index: usize,
    pub slide_id: Option<u32>,
    pub slide_layout: Option<String>,
    pub shape_id: Option<u32>,
    pub shape_name: String,
    pub shape_type: String,
    pub shape_index_chain: Vec<usize>,
    pub shape_path: String,

    #[serde(flatten)]
    pub container: Container,

    /// Location of a chart text node inside its part. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_xpath: Option<String>,

    pub path: String,
    pub text: String,
}

impl Entry {
    /// Create an entry whose paths are derived from the address.
    pub fn new(address: Address, meta: ShapeMeta, text: impl Into<String>) -> Self {
        let shape_path = address.shape_path();
        let path = address.path();
        Self {
            slide_index: address.slide_index,
            slide_id: meta.slide_id,
            slide_layout: meta.slide_layout,
            shape_id: meta.shape_id,
            shape_name: meta.shape_name,
            shape_type: meta.shape_type,
            shape_index_chain: address.shape_index_chain,
            shape_path,
            container: address.container,
            chart_xpath: None,
            path,
            text: text.into(),
        }
    }

    /// Attach the in-part location of a chart text node.
    pub fn with_chart_xpath(mut self, xpath: impl Into<String>) -> Self {
        self.chart_xpath = Some(xpath.into());
        self
    }

    /// The address this entry resolves through.
    pub fn address(&self) -> Address {
        Address {
            slide_index: self.slide_index,
            shape_index_chain: self.shape_index_chain.clone(),
            container: self.container.clone(),
        }
    }
}

/// The serialized, ordered list of entries plus top-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMap {
    /// Path of the presentation the map was extracted from.
    pub source: String,
    pub slide_count: usize,
    pub entry_count: usize,
    pub entries: Vec<Entry>,
}

impl TextMap {
    /// Create a map, deriving `entry_count` from the entries.
    pub fn new(source: impl Into<String>, slide_count: usize, entries: Vec<Entry>) -> Self {
        Self {
            source: source.into(),
            slide_count,
            entry_count: entries.len(),
            entries,
        }
    }

    /// Parse and validate a text map.
    ///
    /// Rejects maps whose `entry_count` disagrees with the entry list, entries
    /// with an unknown `container`, and entries missing any required field.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Validate an already parsed JSON value as a text map.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::InvalidTextMap("Map JSON must be an object".into()));
        };

        let source = match map.remove("source") {
            Some(Value::String(s)) => s,
            _ => return Err(Error::InvalidTextMap("source must be a string".into())),
        };
        let slide_count = map
            .get("slide_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Error::InvalidTextMap("slide_count must be a non-negative integer".into())
            })? as usize;
        let declared = map
            .get("entry_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                Error::InvalidTextMap("entry_count must be a non-negative integer".into())
            })? as usize;
        let raw_entries = match map.remove("entries") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(Error::InvalidTextMap(
                    "Map JSON missing entries array".into(),
                ))
            }
        };

        if declared != raw_entries.len() {
            return Err(Error::EntryCountMismatch {
                declared,
                actual: raw_entries.len(),
            });
        }

        let entries = raw_entries
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| parse_entry(raw).map_err(|e| e.at_entry(idx + 1)))
            .collect::<Result<Vec<_>>>()?;

        log::debug!("Loaded text map for {} with {} entries", source, entries.len());

        Ok(Self {
            source,
            slide_count,
            entry_count: declared,
            entries,
        })
    }

    /// Serialize as deterministic, ASCII-escaped, indented JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        crate::json::to_ascii_pretty(self)
    }
}

/// Check the container tag first so unknown kinds get their own error.
fn parse_entry(raw: Value) -> Result<Entry> {
    if !raw.is_object() {
        return Err(Error::InvalidTextMap("Entry must be object".into()));
    }
    match raw.get("container") {
        Some(Value::String(kind)) if Container::KINDS.contains(&kind.as_str()) => {}
        Some(Value::String(kind)) => return Err(Error::UnsupportedContainer(kind.clone())),
        Some(_) => return Err(Error::InvalidTextMap("container must be string".into())),
        None => return Err(Error::InvalidTextMap("missing field `container`".into())),
    }
    serde_json::from_value(raw).map_err(Error::from)
}
