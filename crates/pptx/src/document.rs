//! A loaded presentation: package, slide model and pending text edits.

use crate::model::{Slide, SlideLoader};
use crate::package::{PackUri, Package, RT_OFFICE_DOCUMENT};
use crate::rewrite::replace_text_nodes;
use crate::xml::{self, NS_P, NS_R};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use textmap_core::{Error, Result};

/// Identity of one `a:t` node: its part and ordinal within that part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextNodeId {
    pub part: PackUri,
    pub ordinal: usize,
}

/// A presentation opened for extraction or projection.
///
/// Text edits are recorded in memory and only reach storage through
/// [`Document::save`].
pub struct Document {
    source: String,
    package: Package,
    slides: Vec<Slide>,
    edits: BTreeMap<PackUri, BTreeMap<usize, String>>,
}

impl Document {
    /// Open a presentation from disk.
    pub fn open(path: &Path) -> Result<Self> {
        log::debug!("Opening {}", path.display());
        let package = Package::open(path)?;
        Self::from_package(package, path.display().to_string())
    }

    /// Open a presentation held in memory.
    pub fn from_bytes(bytes: Vec<u8>, source: impl Into<String>) -> Result<Self> {
        Self::from_package(Package::from_bytes(bytes)?, source.into())
    }

    fn from_package(package: Package, source: String) -> Result<Self> {
        let slides = load_slides(&package)?;
        log::info!("Loaded {} with {} slides", source, slides.len());
        Ok(Self {
            source,
            package,
            slides,
            edits: BTreeMap::new(),
        })
    }

    /// Where the presentation was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Record new text for a node. A later edit of the same node wins.
    pub fn set_text(&mut self, node: &TextNodeId, text: impl Into<String>) {
        self.edits
            .entry(node.part.clone())
            .or_default()
            .insert(node.ordinal, text.into());
    }

    /// Text recorded for a node but not yet saved.
    pub fn pending_text(&self, node: &TextNodeId) -> Option<&str> {
        self.edits
            .get(&node.part)
            .and_then(|part| part.get(&node.ordinal))
            .map(String::as_str)
    }

    /// Number of nodes with pending edits.
    pub fn pending_count(&self) -> usize {
        self.edits.values().map(BTreeMap::len).sum()
    }

    /// Serialize the presentation with all pending edits applied.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut replaced = HashMap::new();
        for (part, nodes) in &self.edits {
            let xml = self.package.read_part(part)?;
            let bytes = replace_text_nodes(&xml, nodes)
                .map_err(|e| Error::XmlError(format!("Failed to rewrite {}: {}", part, e)))?;
            replaced.insert(part.membername().to_string(), bytes);
        }
        self.package.write_with(&replaced)
    }

    /// Write the presentation with all pending edits to `path`.
    ///
    /// The output is fully built in memory before anything touches `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        log::info!(
            "Saved {} ({} text nodes in {} parts changed)",
            path.display(),
            self.pending_count(),
            self.edits.len()
        );
        Ok(())
    }
}

/// Slides in `p:sldIdLst` order.
fn load_slides(package: &Package) -> Result<Vec<Slide>> {
    let presentation = package
        .relationships(&PackUri::package_root())?
        .part_by_reltype(RT_OFFICE_DOCUMENT)?
        .ok_or_else(|| Error::CorruptedFile("package has no main presentation part".into()))?;

    let xml = package.read_part(&presentation)?;
    let root = xml::parse(&xml)?;
    let rels = package.relationships(&presentation)?;

    let mut loader = SlideLoader::new(package);
    let mut slides = Vec::new();

    let Some(list) = root.child(NS_P, "sldIdLst") else {
        return Ok(slides);
    };
    for sld_id in list.children_named(NS_P, "sldId") {
        let r_id = sld_id.attr_ns(NS_R, "id").ok_or_else(|| {
            Error::CorruptedFile("p:sldId without r:id".into())
        })?;
        let slide_id = sld_id.attr("id").and_then(|v| v.parse().ok());
        let partname = rels.target_part(r_id)?;
        slides.push(loader.load(partname, slide_id)?);
    }

    Ok(slides)
}
