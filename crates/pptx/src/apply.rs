//! Projection of a (translated) text map back onto a presentation.

use crate::chart::ChartCache;
use crate::document::Document;
use crate::resolve::resolve;
use crate::rewrite::check_text;
use std::path::Path;
use textmap_core::{Error, Result, TextMap};

/// Applies text map entries to a document.
///
/// All entries are checked and resolved before any text is recorded, so a
/// failing entry leaves the document untouched.
#[derive(Debug, Default, Clone)]
pub struct Projector;

impl Projector {
    pub fn new() -> Self {
        Self
    }

    /// Resolve every entry and set its text. Returns the number applied.
    pub fn apply(&self, doc: &mut Document, map: &TextMap) -> Result<usize> {
        if map.entry_count != map.entries.len() {
            return Err(Error::EntryCountMismatch {
                declared: map.entry_count,
                actual: map.entries.len(),
            });
        }

        let mut charts = ChartCache::new();
        let resolved = map
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                check_text(&entry.text)
                    .and_then(|()| resolve(doc, &entry.address(), &mut charts))
                    .map(|r| (r.node, entry.text.as_str()))
                    .map_err(|e| e.at_entry(idx + 1))
            })
            .collect::<Result<Vec<_>>>()?;

        for (node, text) in &resolved {
            doc.set_text(node, *text);
        }

        log::info!(
            "Applied {} entries from {} onto {}",
            resolved.len(),
            map.source,
            doc.source()
        );
        Ok(resolved.len())
    }
}

/// Load a fresh copy of `pptx`, apply the map at `map_path` and save to `output`.
///
/// Nothing is written unless every entry resolves. Returns the number of
/// entries applied.
pub fn apply_text_map(pptx: &Path, map_path: &Path, output: &Path) -> Result<usize> {
    let map = TextMap::from_json(&std::fs::read_to_string(map_path)?)?;
    let mut doc = Document::open(pptx)?;
    let applied = Projector::new().apply(&mut doc, &map)?;
    doc.save(output)?;
    Ok(applied)
}
