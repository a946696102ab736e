//! Core domain types for presentation text maps: addresses, entries,
//! translation merging, flattening and deterministic JSON output.

pub mod error;
pub mod flatten;
pub mod json;
pub mod merge;
pub mod types;

pub use error::{Error, Result};
pub use flatten::flatten;
pub use merge::{merge_translations, parse_translated_values};
pub use types::{Address, Container, Entry, ShapeMeta, TextMap};
