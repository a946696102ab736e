//! Flattening a text map to the bare string array handed to translators.

use crate::types::TextMap;

/// The text of every entry, in entry order.
pub fn flatten(map: &TextMap) -> Vec<String> {
    map.entries.iter().map(|e| e.text.clone()).collect()
}
