//! Text map extraction.

use crate::chart::ChartCache;
use crate::document::{Document, TextNodeId};
use crate::model::{Shape, ShapeContent, Slide, TextFrame};
use crate::package::PackUri;
use crate::resolve::resolve;
use std::path::Path;
use textmap_core::{Address, Container, Entry, Error, Result, ShapeMeta, TextMap};

/// Walks a document and emits one entry per non-empty text leaf.
///
/// Slides and shapes are visited in document order. At each shape the text
/// frame, table cells (row-major) or chart text nodes are emitted, and groups
/// are recursed into where they occur. Empty runs and chart nodes get no
/// entry but keep their position, so neighbours keep their true indices.
#[derive(Debug, Clone)]
pub struct Extractor {
    verify: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self { verify: true }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every emitted address is re-resolved and checked (default on).
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn extract(&self, doc: &Document) -> Result<TextMap> {
        let mut walk = Walk {
            doc,
            verify: self.verify,
            charts: ChartCache::new(),
            entries: Vec::new(),
        };

        for (idx, slide) in doc.slides().iter().enumerate() {
            let before = walk.entries.len();
            walk.shapes(slide, idx + 1, &slide.shapes, &[])?;
            log::debug!(
                "Slide {} ({}): {} entries",
                idx + 1,
                slide.partname,
                walk.entries.len() - before
            );
        }

        log::info!(
            "Extracted {} entries from {} slides ({} chart parts)",
            walk.entries.len(),
            doc.slides().len(),
            walk.charts.len()
        );
        Ok(TextMap::new(doc.source(), doc.slides().len(), walk.entries))
    }
}

/// Open a presentation and extract its text map.
pub fn build_text_map(path: &Path) -> Result<TextMap> {
    let doc = Document::open(path)?;
    Extractor::new().extract(&doc)
}

struct Walk<'a> {
    doc: &'a Document,
    verify: bool,
    charts: ChartCache,
    entries: Vec<Entry>,
}

impl Walk<'_> {
    fn shapes(
        &mut self,
        slide: &Slide,
        slide_index: usize,
        shapes: &[Shape],
        chain: &[usize],
    ) -> Result<()> {
        for (pos, shape) in shapes.iter().enumerate() {
            let mut shape_chain = chain.to_vec();
            shape_chain.push(pos + 1);
            let meta = ShapeMeta {
                slide_id: slide.slide_id,
                slide_layout: slide.layout_name.clone(),
                shape_id: shape.id,
                shape_name: shape.name.clone(),
                shape_type: shape.shape_type.name().to_string(),
            };
            let address = |container| Address {
                slide_index,
                shape_index_chain: shape_chain.clone(),
                container,
            };

            match &shape.content {
                ShapeContent::TextFrame(frame) => {
                    self.runs(&slide.partname, frame, &meta, |paragraph_index, run_index| {
                        address(Container::TextFrame {
                            paragraph_index,
                            run_index,
                        })
                    })?;
                }
                ShapeContent::Table(table) => {
                    for (r, row) in table.rows.iter().enumerate() {
                        for (c, cell) in row.iter().enumerate() {
                            self.runs(&slide.partname, cell, &meta, |paragraph_index, run_index| {
                                address(Container::TableCell {
                                    table_row: r + 1,
                                    table_col: c + 1,
                                    paragraph_index,
                                    run_index,
                                })
                            })?;
                        }
                    }
                }
                ShapeContent::Chart(chart) => {
                    let nodes = self.charts.nodes(self.doc.package(), &chart.partname)?.to_vec();
                    for (k, node) in nodes.iter().enumerate() {
                        let id = TextNodeId {
                            part: chart.partname.clone(),
                            ordinal: node.ordinal,
                        };
                        let text = self.current_text(&id, &node.text);
                        if text.is_empty() {
                            continue;
                        }
                        let container = Container::ChartPart {
                            chart_partname: chart.partname.to_string(),
                            chart_text_index: k + 1,
                        };
                        let entry = Entry::new(address(container), meta.clone(), text)
                            .with_chart_xpath(node.xpath.clone());
                        self.emit(entry, &id)?;
                    }
                }
                ShapeContent::Group(children) => {
                    self.shapes(slide, slide_index, children, &shape_chain)?;
                }
                ShapeContent::Empty => {}
            }
        }
        Ok(())
    }

    fn runs(
        &mut self,
        part: &PackUri,
        frame: &TextFrame,
        meta: &ShapeMeta,
        address: impl Fn(usize, usize) -> Address,
    ) -> Result<()> {
        for (p, paragraph) in frame.paragraphs.iter().enumerate() {
            for (r, run) in paragraph.runs.iter().enumerate() {
                let Some(ordinal) = run.node else {
                    continue;
                };
                let id = TextNodeId {
                    part: part.clone(),
                    ordinal,
                };
                let text = self.current_text(&id, &run.text);
                if text.is_empty() {
                    continue;
                }
                let entry = Entry::new(address(p + 1, r + 1), meta.clone(), text);
                self.emit(entry, &id)?;
            }
        }
        Ok(())
    }

    fn current_text(&self, node: &TextNodeId, model_text: &str) -> String {
        self.doc
            .pending_text(node)
            .unwrap_or(model_text)
            .to_string()
    }

    fn emit(&mut self, entry: Entry, node: &TextNodeId) -> Result<()> {
        if self.verify {
            let resolved = resolve(self.doc, &entry.address(), &mut self.charts)?;
            if resolved.node != *node || resolved.text != entry.text {
                return Err(Error::AddressDrift(format!(
                    "{} resolves to {}#{} instead of {}#{}",
                    entry.path, resolved.node.part, resolved.node.ordinal, node.part, node.ordinal
                )));
            }
        }
        self.entries.push(entry);
        Ok(())
    }
}
