//! Address resolution shared by extraction and projection.
//!
//! The extractor re-resolves every address it emits and the projector
//! resolves every address it applies, both through [`resolve`], so the two
//! directions cannot disagree about what an address denotes.

use crate::chart::ChartCache;
use crate::document::{Document, TextNodeId};
use crate::model::{Shape, ShapeContent, TextFrame};
use crate::package::PackUri;
use textmap_core::{Address, Container, Error, Result};

/// The node an address denotes, with its current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedText {
    pub node: TextNodeId,
    pub text: String,
}

/// Bounds-check a 1-based index and return the element.
fn nth<'a, T>(items: &'a [T], index: usize, field: &str) -> Result<&'a T> {
    if index == 0 || index > items.len() {
        return Err(Error::mismatch(format!(
            "{} {} out of range (1..={})",
            field,
            index,
            items.len()
        )));
    }
    Ok(&items[index - 1])
}

fn lacks(shape: &Shape, container: &Container) -> Error {
    Error::mismatch(format!(
        "shape '{}' ({}) lacks {}",
        shape.name,
        shape.shape_type.name(),
        container.kind()
    ))
}

/// Resolve an address against a document.
pub fn resolve(doc: &Document, address: &Address, charts: &mut ChartCache) -> Result<ResolvedText> {
    let slide = nth(doc.slides(), address.slide_index, "slide_index")?;
    let shape = resolve_shape(&slide.shapes, &address.shape_index_chain)?;

    let (node, model_text) = match &address.container {
        Container::TextFrame {
            paragraph_index,
            run_index,
        } => {
            let ShapeContent::TextFrame(frame) = &shape.content else {
                return Err(lacks(shape, &address.container));
            };
            resolve_run(frame, &slide.partname, *paragraph_index, *run_index)?
        }
        Container::TableCell {
            table_row,
            table_col,
            paragraph_index,
            run_index,
        } => {
            let ShapeContent::Table(table) = &shape.content else {
                return Err(lacks(shape, &address.container));
            };
            let row = nth(&table.rows, *table_row, "table_row")?;
            if *table_col == 0 || *table_col > table.column_count {
                return Err(Error::mismatch(format!(
                    "table_col {} out of range (1..={})",
                    table_col, table.column_count
                )));
            }
            let cell = row.get(table_col - 1).ok_or_else(|| {
                Error::mismatch(format!(
                    "row {} has no cell in column {}",
                    table_row, table_col
                ))
            })?;
            resolve_run(cell, &slide.partname, *paragraph_index, *run_index)?
        }
        Container::ChartPart {
            chart_partname,
            chart_text_index,
        } => {
            let ShapeContent::Chart(chart) = &shape.content else {
                return Err(lacks(shape, &address.container));
            };
            if chart.partname.as_str() != chart_partname {
                return Err(Error::ChartPartMismatch {
                    expected: chart_partname.clone(),
                    actual: chart.partname.to_string(),
                });
            }
            let nodes = charts.nodes(doc.package(), &chart.partname)?;
            let node = nth(nodes, *chart_text_index, "chart_text_index")?;
            (
                TextNodeId {
                    part: chart.partname.clone(),
                    ordinal: node.ordinal,
                },
                node.text.clone(),
            )
        }
    };

    let text = match doc.pending_text(&node) {
        Some(pending) => pending.to_string(),
        None => model_text,
    };
    log::trace!("Resolved {} to {}#{}", address, node.part, node.ordinal);
    Ok(ResolvedText { node, text })
}

/// Walk a shape index chain; every step but the last must be a group.
pub fn resolve_shape<'a>(shapes: &'a [Shape], chain: &[usize]) -> Result<&'a Shape> {
    let Some((last, groups)) = chain.split_last() else {
        return Err(Error::mismatch("shape_index_chain must not be empty"));
    };

    let mut current = shapes;
    for (depth, idx) in groups.iter().enumerate() {
        let shape = nth(current, *idx, &format!("shape index at depth {}", depth + 1))?;
        let ShapeContent::Group(children) = &shape.content else {
            return Err(Error::mismatch(format!(
                "intermediate shape '{}' at depth {} must be a group",
                shape.name,
                depth + 1
            )));
        };
        current = children;
    }

    nth(current, *last, &format!("shape index at depth {}", chain.len()))
}

fn resolve_run(
    frame: &TextFrame,
    part: &PackUri,
    paragraph_index: usize,
    run_index: usize,
) -> Result<(TextNodeId, String)> {
    let paragraph = nth(&frame.paragraphs, paragraph_index, "paragraph_index")?;
    let run = nth(&paragraph.runs, run_index, "run_index")?;
    let ordinal = run.node.ok_or_else(|| {
        Error::mismatch(format!(
            "run {} of paragraph {} has no a:t element",
            run_index, paragraph_index
        ))
    })?;
    Ok((
        TextNodeId {
            part: part.clone(),
            ordinal,
        },
        run.text.clone(),
    ))
}
