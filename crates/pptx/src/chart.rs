//! Per-invocation cache of chart text nodes.

use crate::package::{PackUri, Package};
use crate::xml::{self, TextNode};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use textmap_core::Result;

/// All `a:t` nodes of each chart part, scanned once per part.
///
/// Several shapes, possibly on different slides, may reference the same chart
/// part; they all index into the same node list. The cache lives for one
/// pipeline invocation and is never invalidated.
#[derive(Debug, Default)]
pub struct ChartCache {
    parts: HashMap<PackUri, Vec<TextNode>>,
}

impl ChartCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text nodes of a chart part, loading and parsing it on first use.
    pub fn nodes(&mut self, package: &Package, partname: &PackUri) -> Result<&[TextNode]> {
        let nodes = match self.parts.entry(partname.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let xml = package.read_part(partname)?;
                let nodes = xml::parse(&xml)?.text_nodes();
                log::debug!("Scanned {}: {} text nodes", partname, nodes.len());
                entry.insert(nodes)
            }
        };
        Ok(nodes)
    }

    /// Number of chart parts scanned so far.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
