//! In-memory presentation fixtures.
#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const NS_DECLS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const RT_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const RT_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const RT_CHART: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";

/// A slide under construction: shape XML plus chart relationships.
#[derive(Default)]
pub struct SlideFixture {
    shapes: Vec<String>,
    charts: Vec<(String, String)>,
}

impl SlideFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(mut self, xml: String) -> Self {
        self.shapes.push(xml);
        self
    }

    /// Add a chart frame referencing `chart_file` (e.g. `chart1.xml`).
    pub fn chart(mut self, id: u32, name: &str, chart_file: &str) -> Self {
        let r_id = self.next_chart_rel();
        self.shapes.push(chart_frame(id, name, &r_id));
        self.link_chart(&r_id, chart_file)
    }

    /// Relationship id the next linked chart will get.
    pub fn next_chart_rel(&self) -> String {
        format!("rId{}", self.charts.len() + 2)
    }

    /// Declare a chart relationship for a frame placed elsewhere, e.g. in a group.
    pub fn link_chart(mut self, r_id: &str, chart_file: &str) -> Self {
        self.charts.push((r_id.to_string(), chart_file.to_string()));
        self
    }
}

/// Builds a minimal but well-formed .pptx package.
#[derive(Default)]
pub struct PptxFixture {
    slides: Vec<SlideFixture>,
    charts: Vec<(String, String)>,
}

impl PptxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: SlideFixture) -> Self {
        self.slides.push(slide);
        self
    }

    /// Add a chart part `ppt/charts/<file>` whose title/axis texts are `texts`.
    pub fn chart_part(mut self, file: &str, texts: &[&str]) -> Self {
        self.charts.push((file.to_string(), chart_xml(texts)));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let mut put = |name: &str, content: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };

        put("[Content_Types].xml", &self.content_types());
        put(
            "_rels/.rels",
            &rels(&[(
                "rId1",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
                "ppt/presentation.xml",
            )]),
        );

        let mut sld_ids = String::new();
        let mut pres_rels = Vec::new();
        for i in 0..self.slides.len() {
            sld_ids.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                256 + i,
                i + 2
            ));
            pres_rels.push((
                format!("rId{}", i + 2),
                RT_SLIDE.to_string(),
                format!("slides/slide{}.xml", i + 1),
            ));
        }
        put(
            "ppt/presentation.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {}><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#,
                NS_DECLS, sld_ids
            ),
        );
        put("ppt/_rels/presentation.xml.rels", &owned_rels(&pres_rels));

        put(
            "ppt/slideLayouts/slideLayout1.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {}><p:cSld name="Title and Content"><p:spTree/></p:cSld></p:sldLayout>"#,
                NS_DECLS
            ),
        );

        for (i, slide) in self.slides.iter().enumerate() {
            put(
                &format!("ppt/slides/slide{}.xml", i + 1),
                &format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
                    NS_DECLS,
                    slide.shapes.concat()
                ),
            );
            let mut slide_rels = vec![(
                "rId1".to_string(),
                RT_LAYOUT.to_string(),
                "../slideLayouts/slideLayout1.xml".to_string(),
            )];
            for (r_id, file) in &slide.charts {
                slide_rels.push((r_id.clone(), RT_CHART.to_string(), format!("../charts/{}", file)));
            }
            put(
                &format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
                &owned_rels(&slide_rels),
            );
        }

        for (file, xml) in &self.charts {
            put(&format!("ppt/charts/{}", file), xml);
        }

        zip.finish().unwrap().into_inner()
    }

    fn content_types(&self) -> String {
        let mut overrides = String::new();
        for i in 0..self.slides.len() {
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                i + 1
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{}</Types>"#,
            overrides
        )
    }
}

fn rels(items: &[(&str, &str, &str)]) -> String {
    let owned: Vec<(String, String, String)> = items
        .iter()
        .map(|(a, b, c)| (a.to_string(), b.to_string(), c.to_string()))
        .collect();
    owned_rels(&owned)
}

fn owned_rels(items: &[(String, String, String)]) -> String {
    let body: String = items
        .iter()
        .map(|(id, ty, target)| {
            format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                id, ty, target
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        body
    )
}

fn text_body(tag: &str, paragraphs: &[&[&str]]) -> String {
    let mut xml = format!("<{}><a:bodyPr/>", tag);
    for runs in paragraphs {
        xml.push_str("<a:p>");
        for run in *runs {
            if run.is_empty() {
                xml.push_str(r#"<a:r><a:rPr lang="en-US"/><a:t/></a:r>"#);
            } else {
                xml.push_str(&format!(
                    r#"<a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r>"#,
                    escape(run)
                ));
            }
        }
        xml.push_str("</a:p>");
    }
    xml.push_str(&format!("</{}>", tag));
    xml
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A text box whose paragraphs hold the given runs; `""` makes an empty run.
pub fn text_box(id: u32, name: &str, paragraphs: &[&[&str]]) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="100" cy="100"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>{}</p:sp>"#,
        id,
        name,
        text_body("p:txBody", paragraphs)
    )
}

/// A picture, which carries no text but occupies a shape position.
pub fn picture(id: u32, name: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="{}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr/></p:pic>"#,
        id, name
    )
}

/// A table with one single-run paragraph per cell.
pub fn table(id: u32, name: &str, rows: &[&[&str]]) -> String {
    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut xml = format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="{}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblGrid>"#,
        id, name
    );
    for _ in 0..cols {
        xml.push_str(r#"<a:gridCol w="1000"/>"#);
    }
    xml.push_str("</a:tblGrid>");
    for row in rows {
        xml.push_str(r#"<a:tr h="100">"#);
        for cell in *row {
            xml.push_str(&format!("<a:tc>{}<a:tcPr/></a:tc>", text_body("a:txBody", &[&[*cell]])));
        }
        xml.push_str("</a:tr>");
    }
    xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
    xml
}

/// A group containing the given child shapes.
pub fn group(id: u32, name: &str, children: &[String]) -> String {
    format!(
        r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{}" name="{}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:grpSp>"#,
        id,
        name,
        children.concat()
    )
}

/// A chart graphic frame pointing at relationship `r_id`.
pub fn chart_frame(id: u32, name: &str, r_id: &str) -> String {
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="{}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" r:id="{}"/></a:graphicData></a:graphic></p:graphicFrame>"#,
        id, name, r_id
    )
}

/// A chart part with one title run per text.
fn chart_xml(texts: &[&str]) -> String {
    let runs: String = texts
        .iter()
        .map(|t| {
            if t.is_empty() {
                "<a:r><a:t/></a:r>".to_string()
            } else {
                format!("<a:r><a:t>{}</a:t></a:r>", escape(t))
            }
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><c:chart><c:title><c:tx><c:rich><a:bodyPr/><a:p>{}</a:p></c:rich></c:tx></c:title><c:plotArea><c:barChart><c:barDir val="col"/></c:barChart></c:plotArea></c:chart></c:chartSpace>"#,
        runs
    )
}

/// One slide whose only shape is a group holding a table and a chart.
pub fn grouped_table_and_chart_deck() -> Vec<u8> {
    let slide = SlideFixture::new();
    let r_id = slide.next_chart_rel();
    let slide = slide
        .shape(group(
            2,
            "Group 1",
            &[table(3, "Table 2", &[&["A", "B"]]), chart_frame(4, "Chart 3", &r_id)],
        ))
        .link_chart(&r_id, "chart1.xml");
    PptxFixture::new()
        .slide(slide)
        .chart_part("chart1.xml", &["C"])
        .build()
}

/// Contents of every member of a zip package, in archive order.
pub fn members(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}
