//! PPTX (Office Open XML) backend for presentation text maps.
//!
//! Parses .pptx files (ZIP archives containing XML parts) into a slide shape
//! tree, extracts addressed text entries and writes translated text back into
//! a copy of the package.

pub mod apply;
pub mod chart;
pub mod document;
pub mod extract;
pub mod model;
pub mod package;
pub mod resolve;
pub mod rewrite;
pub mod xml;

pub use apply::{apply_text_map, Projector};
pub use chart::ChartCache;
pub use document::{Document, TextNodeId};
pub use extract::{build_text_map, Extractor};
pub use resolve::{resolve, ResolvedText};
