//! OPC package access: zip members, part names and relationships.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use textmap_core::{Error, Result};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Relationship type of the main presentation part.
pub const RT_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
/// Relationship type from a slide to its layout.
pub const RT_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";

/// A part name inside the package, always starting with `/`
/// (e.g. `/ppt/charts/chart1.xml`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackUri(String);

impl PackUri {
    /// Create a part name, which must begin with a slash.
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(Error::CorruptedFile(format!(
                "part name must begin with slash, got '{}'",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// The package pseudo-part, source of the package-level relationships.
    pub fn package_root() -> Self {
        Self("/".to_string())
    }

    /// Resolve a relationship target against the directory of a source part.
    pub fn from_rel_ref(base_uri: &str, target: &str) -> Result<Self> {
        let joined = if target.starts_with('/') {
            target.to_string()
        } else if base_uri.ends_with('/') {
            format!("{}{}", base_uri, target)
        } else {
            format!("{}/{}", base_uri, target)
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in joined.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        Self::new(format!("/{}", segments.join("/")))
    }

    /// Directory portion, e.g. `/ppt/slides` for `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.0.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.0[..pos],
        }
    }

    /// File name portion, empty for the package root.
    pub fn filename(&self) -> &str {
        self.0.rfind('/').map(|pos| &self.0[pos + 1..]).unwrap_or("")
    }

    /// Name of the zip member backing this part (no leading slash).
    pub fn membername(&self) -> &str {
        &self.0[1..]
    }

    /// Part name of the relationships part belonging to this part.
    pub fn rels_uri(&self) -> PackUri {
        if self.0 == "/" {
            return PackUri("/_rels/.rels".to_string());
        }
        let base = self.base_uri().trim_end_matches('/');
        PackUri(format!("{}/_rels/{}.rels", base, self.filename()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single relationship from a source part.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub id: String,
    pub reltype: String,
    pub target: String,
    pub external: bool,
}

/// All relationships declared by one source part.
#[derive(Debug, Clone)]
pub struct Relationships {
    source: PackUri,
    rels: HashMap<String, Relationship>,
}

impl Relationships {
    fn empty(source: PackUri) -> Self {
        Self {
            source,
            rels: HashMap::new(),
        }
    }

    /// Parse a `.rels` part for the given source part.
    pub fn parse(source: PackUri, xml: &str) -> Result<Self> {
        let mut rels = Relationships::empty(source);
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let mut rel = Relationship {
                        id: String::new(),
                        reltype: String::new(),
                        target: String::new(),
                        external: false,
                    };

                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map_err(|e| Error::XmlError(format!("Bad relationship attribute: {}", e)))?
                            .into_owned();
                        match attr.key.as_ref() {
                            b"Id" => rel.id = value,
                            b"Type" => rel.reltype = value,
                            b"Target" => rel.target = value,
                            b"TargetMode" => rel.external = value == "External",
                            _ => {}
                        }
                    }

                    rels.rels.insert(rel.id.clone(), rel);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships of {}: {}",
                        rels.source, e
                    )));
                }
                _ => {}
            }
        }

        Ok(rels)
    }

    /// Look up a relationship by id.
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Resolve the target part of an internal relationship.
    pub fn target_part(&self, r_id: &str) -> Result<PackUri> {
        let rel = self.get(r_id).ok_or_else(|| {
            Error::CorruptedFile(format!("{} has no relationship '{}'", self.source, r_id))
        })?;
        self.resolve(rel)
    }

    /// The first internal relationship of the given type, resolved.
    pub fn part_by_reltype(&self, reltype: &str) -> Result<Option<PackUri>> {
        let mut matches: Vec<&Relationship> = self
            .rels
            .values()
            .filter(|r| r.reltype == reltype && !r.external)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.first().map(|rel| self.resolve(rel)).transpose()
    }

    fn resolve(&self, rel: &Relationship) -> Result<PackUri> {
        if rel.external {
            return Err(Error::CorruptedFile(format!(
                "relationship '{}' of {} is external",
                rel.id, self.source
            )));
        }
        PackUri::from_rel_ref(self.source.base_uri(), &rel.target)
    }
}

/// An in-memory zip package.
///
/// The whole file is held in memory; parts are decompressed on demand.
pub struct Package {
    archive: RefCell<ZipArchive<Cursor<Vec<u8>>>>,
}

impl Package {
    /// Load a package from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// Load a package from bytes, rejecting anything that is not a zip file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        check_magic(&bytes)?;
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }

    /// Whether a part exists.
    pub fn has_part(&self, part: &PackUri) -> bool {
        self.archive
            .borrow()
            .file_names()
            .any(|name| name == part.membername())
    }

    /// Read a part as UTF-8 text.
    pub fn read_part(&self, part: &PackUri) -> Result<String> {
        let mut archive = self.archive.borrow_mut();
        let mut file = archive.by_name(part.membername()).map_err(|e| {
            Error::ZipError(format!("File not found in archive '{}': {}", part, e))
        })?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", part, e)))?;

        if let Some(stripped) = content.strip_prefix('\u{feff}') {
            content = stripped.to_string();
        }
        Ok(content)
    }

    /// Relationships declared by a part; a part without a `.rels` has none.
    pub fn relationships(&self, part: &PackUri) -> Result<Relationships> {
        let rels_uri = part.rels_uri();
        if !self.has_part(&rels_uri) {
            return Ok(Relationships::empty(part.clone()));
        }
        let xml = self.read_part(&rels_uri)?;
        Relationships::parse(part.clone(), &xml)
    }

    /// Serialize the package, substituting the given member contents.
    ///
    /// Members without a replacement are copied raw, compressed bytes included.
    pub fn write_with(&self, replaced: &HashMap<String, Vec<u8>>) -> Result<Vec<u8>> {
        let mut archive = self.archive.borrow_mut();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(zip_error("read member"))?;
            let name = file.name().to_string();

            match replaced.get(&name) {
                Some(bytes) => {
                    let options = FileOptions::default()
                        .compression_method(file.compression())
                        .last_modified_time(file.last_modified());
                    drop(file);
                    log::debug!("Rewriting {}", name);
                    writer.start_file(name.as_str(), options).map_err(zip_error("start member"))?;
                    writer.write_all(bytes)?;
                }
                None => {
                    writer.raw_copy_file(file).map_err(zip_error("copy member"))?;
                }
            }
        }

        let cursor = writer.finish().map_err(zip_error("finish archive"))?;
        Ok(cursor.into_inner())
    }
}

fn zip_error(action: &'static str) -> impl Fn(ZipError) -> Error {
    move |e| Error::ZipError(format!("Failed to {}: {}", action, e))
}

/// Reject non-zip input up front, naming legacy binary presentations.
fn check_magic(bytes: &[u8]) -> Result<()> {
    // PPTX is a ZIP file (PK\x03\x04)
    if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return Ok(());
    }

    // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
    if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return Err(Error::UnsupportedFormat(
            "legacy binary .ppt files are not supported; save as .pptx first".into(),
        ));
    }

    Err(Error::UnsupportedFormat(
        "input is not a ZIP-based (OOXML) presentation".into(),
    ))
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
