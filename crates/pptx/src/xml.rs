//! Namespace-aware XML element tree.
//!
//! Every `a:t` element in a part gets an ordinal: its position among all
//! `a:t` elements of that part in document order. The ordinal is the node
//! identity shared by the model, the resolver and the rewriter.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use textmap_core::{Error, Result};

pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

pub const URI_CHART: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
pub const URI_TABLE: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";
pub const URI_OLE: &str = "http://schemas.openxmlformats.org/presentationml/2006/ole";
pub const URI_DIAGRAM: &str = "http://schemas.openxmlformats.org/drawingml/2006/diagram";

/// A resolved attribute.
#[derive(Debug, Clone)]
pub struct Attr {
    pub ns: Option<String>,
    pub local: String,
    pub value: String,
}

/// An element with its resolved namespace, attributes and children.
#[derive(Debug, Clone)]
pub struct Element {
    /// Name as written in the document, e.g. `c:chartSpace`.
    pub qname: String,
    pub ns: Option<String>,
    pub local: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Element>,
    /// Concatenated character data directly inside this element.
    pub text: String,
    /// Ordinal among the part's `a:t` elements, for `a:t` elements only.
    pub text_ordinal: Option<usize>,
}

/// A text node found in a part, with its lxml-style location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub ordinal: usize,
    pub text: String,
    pub xpath: String,
}

impl Element {
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.local == local && self.ns.as_deref() == Some(ns)
    }

    pub fn child(&self, ns: &str, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(ns, local))
    }

    pub fn children_named<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(ns, local))
    }

    /// Follow a path of child elements in one namespace.
    pub fn path(&self, ns: &str, locals: &[&str]) -> Option<&Element> {
        locals
            .iter()
            .try_fold(self, |el, local| el.child(ns, local))
    }

    /// Value of an attribute without a namespace.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns.is_none() && a.local == local)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespaced attribute.
    pub fn attr_ns(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local == local && a.ns.as_deref() == Some(ns))
            .map(|a| a.value.as_str())
    }

    /// All `a:t` descendants (and self) in document order.
    pub fn text_nodes(&self) -> Vec<TextNode> {
        let mut nodes = Vec::new();
        collect_text_nodes(self, &format!("/{}", self.qname), &mut nodes);
        nodes
    }
}

fn collect_text_nodes(el: &Element, path: &str, out: &mut Vec<TextNode>) {
    if let Some(ordinal) = el.text_ordinal {
        out.push(TextNode {
            ordinal,
            text: el.text.clone(),
            xpath: path.to_string(),
        });
    }

    for (i, child) in el.children.iter().enumerate() {
        let same_tag = |c: &&Element| c.ns == child.ns && c.local == child.local;
        let segment = if el.children.iter().filter(same_tag).count() > 1 {
            let position = el.children[..i].iter().filter(same_tag).count() + 1;
            format!("{}/{}[{}]", path, child.qname, position)
        } else {
            format!("{}/{}", path, child.qname)
        };
        collect_text_nodes(child, &segment, out);
    }
}

/// In-scope namespace declarations while streaming through a part.
#[derive(Debug, Default)]
pub(crate) struct NamespaceScopes {
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScopes {
    /// Enter an element, registering its `xmlns` declarations.
    pub(crate) fn push(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let mut frame = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::XmlError(format!("Bad attribute: {}", e)))?;
            let key = attr.key.as_ref();
            let prefix = if key == b"xmlns" {
                None
            } else if let Some(p) = key.strip_prefix(b"xmlns:") {
                Some(String::from_utf8_lossy(p).into_owned())
            } else {
                continue;
            };
            let uri = attr
                .unescape_value()
                .map_err(|e| Error::XmlError(format!("Bad namespace declaration: {}", e)))?
                .into_owned();
            frame.push((prefix, uri));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Leave the innermost element.
    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(NS_XML.to_string());
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    /// Resolve an element name to `(namespace, local name)`.
    pub(crate) fn element_name(&self, qname: &[u8]) -> (Option<String>, String) {
        let (prefix, local) = split_qname(qname);
        (self.lookup(prefix.as_deref()), local)
    }

    /// Whether the element just pushed is a DrawingML `a:t`.
    pub(crate) fn is_text_node(&self, e: &BytesStart<'_>) -> bool {
        let (ns, local) = self.element_name(e.name().as_ref());
        local == "t" && ns.as_deref() == Some(NS_A)
    }

    fn attributes(&self, e: &BytesStart<'_>) -> Result<Vec<Attr>> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::XmlError(format!("Bad attribute: {}", e)))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let (prefix, local) = split_qname(key);
            // Unprefixed attributes are in no namespace.
            let ns = match prefix {
                Some(p) => self.lookup(Some(&p)),
                None => None,
            };
            let value = attr
                .unescape_value()
                .map_err(|e| Error::XmlError(format!("Bad attribute value: {}", e)))?
                .into_owned();
            attrs.push(Attr { ns, local, value });
        }
        Ok(attrs)
    }
}

fn split_qname(qname: &[u8]) -> (Option<String>, String) {
    match qname.iter().position(|&b| b == b':') {
        Some(pos) => (
            Some(String::from_utf8_lossy(&qname[..pos]).into_owned()),
            String::from_utf8_lossy(&qname[pos + 1..]).into_owned(),
        ),
        None => (None, String::from_utf8_lossy(qname).into_owned()),
    }
}

/// Parse a part into an element tree.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut scopes = NamespaceScopes::default();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut next_ordinal = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::XmlError(format!(
                "Parse error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => {
                scopes.push(e)?;
                let el = open_element(&scopes, e, &mut next_ordinal)?;
                stack.push(el);
            }
            Event::Empty(ref e) => {
                scopes.push(e)?;
                let el = open_element(&scopes, e, &mut next_ordinal)?;
                scopes.pop();
                attach(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                scopes.pop();
                let el = stack
                    .pop()
                    .ok_or_else(|| Error::XmlError("Unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, el);
            }
            Event::Text(ref t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::XmlError(format!("Bad character data: {}", e)))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(ref c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::XmlError("Unexpected end of document".into()));
    }
    root.ok_or_else(|| Error::XmlError("Document has no root element".into()))
}

fn open_element(
    scopes: &NamespaceScopes,
    e: &BytesStart<'_>,
    next_ordinal: &mut usize,
) -> Result<Element> {
    let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let (ns, local) = scopes.element_name(e.name().as_ref());
    let text_ordinal = if scopes.is_text_node(e) {
        let ordinal = *next_ordinal;
        *next_ordinal += 1;
        Some(ordinal)
    } else {
        None
    };
    Ok(Element {
        qname,
        ns,
        local,
        attrs: scopes.attributes(e)?,
        children: Vec::new(),
        text: String::new(),
        text_ordinal,
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => *root = Some(el),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <c:chart>
    <c:title><c:tx><c:rich><a:p><a:r><a:t>Sales &amp; Costs</a:t></a:r></a:p></c:rich></c:tx></c:title>
    <c:plotArea>
      <c:valAx><c:title><c:tx><c:rich><a:p><a:r><a:t/></a:r><a:r><a:t>EUR</a:t></a:r></a:p></c:rich></c:tx></c:title></c:valAx>
    </c:plotArea>
  </c:chart>
</c:chartSpace>"#;

    #[test]
    fn test_text_nodes_in_document_order() {
        let root = parse(CHART).unwrap();
        let nodes = root.text_nodes();
        let texts: Vec<&str> = nodes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["Sales & Costs", "", "EUR"]);
        assert_eq!(nodes[2].ordinal, 2);
    }

    #[test]
    fn test_xpath_uses_sibling_positions() {
        let root = parse(CHART).unwrap();
        let nodes = root.text_nodes();
        assert_eq!(
            nodes[0].xpath,
            "/c:chartSpace/c:chart/c:title/c:tx/c:rich/a:p/a:r/a:t"
        );
        assert_eq!(
            nodes[2].xpath,
            "/c:chartSpace/c:chart/c:plotArea/c:valAx/c:title/c:tx/c:rich/a:p/a:r[2]/a:t"
        );
    }

    #[test]
    fn test_namespace_resolution_ignores_prefix_spelling() {
        let xml = r#"<x:root xmlns:x="http://schemas.openxmlformats.org/drawingml/2006/main"><x:t>one</x:t><t>not drawingml</t></x:root>"#;
        let root = parse(xml).unwrap();
        assert_eq!(root.text_nodes().len(), 1);
        assert!(root.is(NS_A, "root"));
    }

    #[test]
    fn test_attributes() {
        let xml = r#"<p:sldId xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" id="256" r:id="rId2"/>"#;
        let root = parse(xml).unwrap();
        assert_eq!(root.attr("id"), Some("256"));
        assert_eq!(root.attr_ns(NS_R, "id"), Some("rId2"));
    }

    #[test]
    fn test_rejects_mismatched_tags() {
        assert!(parse("<a><b></a>").is_err());
    }
}
