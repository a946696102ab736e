//! Slide shape tree: the subset of PresentationML the text map addresses.

use crate::package::{PackUri, Package, Relationships, RT_SLIDE_LAYOUT};
use crate::xml::{self, Element, NS_A, NS_P, NS_R, URI_CHART, URI_DIAGRAM, URI_OLE, URI_TABLE};
use std::collections::HashMap;
use textmap_core::{Error, Result};

/// Element names that make up a shape sequence, in `p:spTree` or `p:grpSp`.
const SHAPE_TAGS: [&str; 6] = ["sp", "grpSp", "graphicFrame", "cxnSp", "pic", "contentPart"];

/// One slide with its ordered top-level shapes.
#[derive(Debug, Clone)]
pub struct Slide {
    pub partname: PackUri,
    pub slide_id: Option<u32>,
    pub layout_name: Option<String>,
    pub shapes: Vec<Shape>,
}

/// A positioned element of a shape sequence.
#[derive(Debug, Clone)]
pub struct Shape {
    pub id: Option<u32>,
    pub name: String,
    pub shape_type: ShapeType,
    pub content: ShapeContent,
}

/// What a shape carries that the text map can address.
#[derive(Debug, Clone)]
pub enum ShapeContent {
    /// A `p:sp`; its text body may be absent, giving an empty frame.
    TextFrame(TextFrame),
    Table(Table),
    Chart(ChartRef),
    Group(Vec<Shape>),
    /// Pictures, connectors and other shapes without addressable text.
    Empty,
}

#[derive(Debug, Clone, Default)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

/// An `a:r`. `node` is the ordinal of its `a:t`, absent if it has none.
#[derive(Debug, Clone)]
pub struct Run {
    pub text: String,
    pub node: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Table {
    /// Number of `a:gridCol` columns.
    pub column_count: usize,
    /// Cells per `a:tr`, in document order.
    pub rows: Vec<Vec<TextFrame>>,
}

/// The chart part backing a chart graphic frame.
#[derive(Debug, Clone)]
pub struct ChartRef {
    pub partname: PackUri,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    AutoShape,
    TextBox,
    Placeholder,
    Freeform,
    Group,
    Table,
    Chart,
    Picture,
    Media,
    Line,
    EmbeddedOleObject,
    IgxGraphic,
    ContentPart,
    Unknown,
}

impl ShapeType {
    /// Upper snake case name used in the text map.
    pub fn name(self) -> &'static str {
        match self {
            ShapeType::AutoShape => "AUTO_SHAPE",
            ShapeType::TextBox => "TEXT_BOX",
            ShapeType::Placeholder => "PLACEHOLDER",
            ShapeType::Freeform => "FREEFORM",
            ShapeType::Group => "GROUP",
            ShapeType::Table => "TABLE",
            ShapeType::Chart => "CHART",
            ShapeType::Picture => "PICTURE",
            ShapeType::Media => "MEDIA",
            ShapeType::Line => "LINE",
            ShapeType::EmbeddedOleObject => "EMBEDDED_OLE_OBJECT",
            ShapeType::IgxGraphic => "IGX_GRAPHIC",
            ShapeType::ContentPart => "CONTENT_PART",
            ShapeType::Unknown => "UNKNOWN",
        }
    }
}

/// Loads slides, caching layout names per layout part.
pub(crate) struct SlideLoader<'a> {
    package: &'a Package,
    layout_names: HashMap<PackUri, String>,
}

impl<'a> SlideLoader<'a> {
    pub(crate) fn new(package: &'a Package) -> Self {
        Self {
            package,
            layout_names: HashMap::new(),
        }
    }

    pub(crate) fn load(&mut self, partname: PackUri, slide_id: Option<u32>) -> Result<Slide> {
        let xml = self.package.read_part(&partname)?;
        let root = xml::parse(&xml)?;
        let rels = self.package.relationships(&partname)?;

        let layout_name = match rels.part_by_reltype(RT_SLIDE_LAYOUT)? {
            Some(layout) => Some(self.cached_layout_name(layout)?),
            None => None,
        };

        let tree = root
            .path(NS_P, &["cSld", "spTree"])
            .ok_or_else(|| Error::CorruptedFile(format!("{} has no p:cSld/p:spTree", partname)))?;
        let shapes = parse_shapes(tree, &rels)?;

        log::debug!(
            "Loaded {} with {} top-level shapes",
            partname,
            shapes.len()
        );

        Ok(Slide {
            partname,
            slide_id,
            layout_name,
            shapes,
        })
    }

    fn cached_layout_name(&mut self, layout: PackUri) -> Result<String> {
        if let Some(name) = self.layout_names.get(&layout) {
            return Ok(name.clone());
        }
        let xml = self.package.read_part(&layout)?;
        let name = layout_name(&xml::parse(&xml)?);
        self.layout_names.insert(layout, name.clone());
        Ok(name)
    }
}

/// `p:cSld/@name` of a layout; the attribute defaults to the empty string.
fn layout_name(layout: &Element) -> String {
    layout
        .child(NS_P, "cSld")
        .and_then(|c| c.attr("name"))
        .unwrap_or("")
        .to_string()
}

/// Parse the shape sequence under `p:spTree` or `p:grpSp`.
fn parse_shapes(container: &Element, rels: &Relationships) -> Result<Vec<Shape>> {
    container
        .children
        .iter()
        .filter(|el| el.ns.as_deref() == Some(NS_P) && SHAPE_TAGS.contains(&el.local.as_str()))
        .map(|el| parse_shape(el, rels))
        .collect()
}

fn parse_shape(el: &Element, rels: &Relationships) -> Result<Shape> {
    let c_nv_pr = el
        .children
        .iter()
        .find(|c| c.ns.as_deref() == Some(NS_P) && c.local.starts_with("nv"))
        .and_then(|nv| nv.child(NS_P, "cNvPr"));
    let id = c_nv_pr
        .and_then(|c| c.attr("id"))
        .and_then(|v| v.parse().ok());
    let name = c_nv_pr
        .and_then(|c| c.attr("name"))
        .unwrap_or_default()
        .to_string();

    let (shape_type, content) = match el.local.as_str() {
        "sp" => {
            let frame = el
                .child(NS_P, "txBody")
                .map(parse_text_frame)
                .unwrap_or_default();
            (sp_type(el), ShapeContent::TextFrame(frame))
        }
        "grpSp" => (ShapeType::Group, ShapeContent::Group(parse_shapes(el, rels)?)),
        "graphicFrame" => parse_graphic_frame(el, rels)?,
        "cxnSp" => (ShapeType::Line, ShapeContent::Empty),
        "pic" => (pic_type(el), ShapeContent::Empty),
        "contentPart" => (ShapeType::ContentPart, ShapeContent::Empty),
        _ => (ShapeType::Unknown, ShapeContent::Empty),
    };

    Ok(Shape {
        id,
        name,
        shape_type,
        content,
    })
}

fn is_placeholder(el: &Element, nv: &str) -> bool {
    el.path(NS_P, &[nv, "nvPr", "ph"]).is_some()
}

fn sp_type(sp: &Element) -> ShapeType {
    let sp_pr = sp.child(NS_P, "spPr");
    if is_placeholder(sp, "nvSpPr") {
        ShapeType::Placeholder
    } else if sp_pr.and_then(|p| p.child(NS_A, "custGeom")).is_some() {
        ShapeType::Freeform
    } else if sp.path(NS_P, &["nvSpPr", "cNvSpPr"]).and_then(|c| c.attr("txBox")) == Some("1") {
        ShapeType::TextBox
    } else if sp_pr.and_then(|p| p.child(NS_A, "prstGeom")).is_some() {
        ShapeType::AutoShape
    } else {
        ShapeType::Unknown
    }
}

fn pic_type(pic: &Element) -> ShapeType {
    if is_placeholder(pic, "nvPicPr") {
        return ShapeType::Placeholder;
    }
    let media = pic.path(NS_P, &["nvPicPr", "nvPr"]).map(|nv_pr| {
        nv_pr.child(NS_A, "videoFile").is_some() || nv_pr.child(NS_A, "audioFile").is_some()
    });
    if media == Some(true) {
        ShapeType::Media
    } else {
        ShapeType::Picture
    }
}

fn parse_graphic_frame(el: &Element, rels: &Relationships) -> Result<(ShapeType, ShapeContent)> {
    let Some(data) = el
        .child(NS_A, "graphic")
        .and_then(|g| g.child(NS_A, "graphicData"))
    else {
        return Ok((ShapeType::Unknown, ShapeContent::Empty));
    };

    match data.attr("uri").unwrap_or_default() {
        URI_TABLE => {
            let table = data
                .child(NS_A, "tbl")
                .map(parse_table)
                .unwrap_or(Table {
                    column_count: 0,
                    rows: Vec::new(),
                });
            Ok((ShapeType::Table, ShapeContent::Table(table)))
        }
        URI_CHART => {
            let r_id = data
                .children
                .iter()
                .find(|c| c.local == "chart")
                .and_then(|c| c.attr_ns(NS_R, "id"))
                .ok_or_else(|| Error::CorruptedFile("chart graphic frame without r:id".into()))?;
            let partname = rels.target_part(r_id)?;
            Ok((ShapeType::Chart, ShapeContent::Chart(ChartRef { partname })))
        }
        URI_OLE => Ok((ShapeType::EmbeddedOleObject, ShapeContent::Empty)),
        URI_DIAGRAM => Ok((ShapeType::IgxGraphic, ShapeContent::Empty)),
        _ => Ok((ShapeType::Unknown, ShapeContent::Empty)),
    }
}

fn parse_table(tbl: &Element) -> Table {
    let column_count = tbl
        .child(NS_A, "tblGrid")
        .map(|grid| grid.children_named(NS_A, "gridCol").count())
        .unwrap_or(0);
    let rows = tbl
        .children_named(NS_A, "tr")
        .map(|tr| {
            tr.children_named(NS_A, "tc")
                .map(|tc| {
                    tc.child(NS_A, "txBody")
                        .map(parse_text_frame)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    Table { column_count, rows }
}

/// Paragraphs are the `a:p` children of a text body, runs the `a:r`
/// children of a paragraph. Fields and line breaks are not runs.
fn parse_text_frame(body: &Element) -> TextFrame {
    let paragraphs = body
        .children_named(NS_A, "p")
        .map(|p| Paragraph {
            runs: p
                .children_named(NS_A, "r")
                .map(|r| {
                    let t = r.child(NS_A, "t");
                    Run {
                        text: t.map(|t| t.text.clone()).unwrap_or_default(),
                        node: t.and_then(|t| t.text_ordinal),
                    }
                })
                .collect(),
        })
        .collect();
    TextFrame { paragraphs }
}
