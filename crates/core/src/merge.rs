//! Positional merging of translated strings into a text map.

use crate::error::{Error, Result};
use crate::types::TextMap;
use serde_json::Value;

/// Parse the externally produced translation file: a JSON array of strings.
///
/// Any non-string element rejects the whole file.
pub fn parse_translated_values(json: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(Error::InvalidTextMap(
            "translated values file must contain a JSON array".into(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(s) => Ok(s),
            _ => Err(Error::NonStringValue { index: idx + 1 }),
        })
        .collect()
}

/// Replace the text of every entry with the value at the same position.
///
/// Values are matched by position only. Every other entry field and the map's
/// `source`/`slide_count` are copied unchanged; `entry_count` is recomputed.
/// Keys outside the [`Entry`](crate::types::Entry) schema were already dropped
/// when the map was loaded.
pub fn merge_translations(base: &TextMap, values: &[String]) -> Result<TextMap> {
    if base.entries.len() != values.len() {
        return Err(Error::ValueCountMismatch {
            entries: base.entries.len(),
            values: values.len(),
        });
    }

    let entries = base
        .entries
        .iter()
        .zip(values)
        .map(|(entry, text)| {
            let mut merged = entry.clone();
            merged.text = text.clone();
            merged
        })
        .collect();

    let merged = TextMap::new(base.source.clone(), base.slide_count, entries);
    log::info!("Merged {} translated values", merged.entry_count);
    Ok(merged)
}
