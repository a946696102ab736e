//! Streaming replacement of `a:t` contents.
//!
//! Every event of the part is written back as read, so markup outside the
//! replaced text nodes stays byte-identical.

use crate::xml::NamespaceScopes;
use quick_xml::events::{BytesEnd, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use textmap_core::{Error, Result};

fn xml_error(e: quick_xml::Error) -> Error {
    Error::XmlError(e.to_string())
}

/// Reject text holding characters outside the XML 1.0 `Char` production.
pub fn check_text(text: &str) -> Result<()> {
    for (offset, c) in text.char_indices() {
        let legal = matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}')
            || c >= '\u{10000}';
        if !legal {
            return Err(Error::InvalidText {
                code: c as u32,
                offset,
            });
        }
    }
    Ok(())
}

/// Escape character data for an `a:t`. `\r` becomes `&#13;` so readers
/// do not normalize it to `\n`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

/// Rewrite a part, setting the text of the `a:t` nodes keyed by ordinal.
///
/// A node whose current text already equals the replacement is left untouched.
/// Fails if an ordinal does not exist in the part or a replacement is not
/// representable in XML.
pub fn replace_text_nodes(xml: &str, replacements: &BTreeMap<usize, String>) -> Result<Vec<u8>> {
    for text in replacements.values() {
        check_text(text)?;
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 64));
    let mut scopes = NamespaceScopes::default();
    let mut next_ordinal = 0usize;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Start(ref e) => {
                scopes.push(e)?;
                if !scopes.is_text_node(e) {
                    writer.write_event(&event).map_err(xml_error)?;
                    continue;
                }
                let ordinal = next_ordinal;
                next_ordinal += 1;

                let Some(text) = replacements.get(&ordinal) else {
                    writer.write_event(&event).map_err(xml_error)?;
                    continue;
                };

                let (inner, end, current) = read_text_content(&mut reader)?;
                writer.write_event(&event).map_err(xml_error)?;
                if current == *text {
                    for ev in inner {
                        writer.write_event(ev).map_err(xml_error)?;
                    }
                } else {
                    writer
                        .write_event(Event::Text(BytesText::from_escaped(escape_text(text))))
                        .map_err(xml_error)?;
                }
                writer.write_event(end).map_err(xml_error)?;
                scopes.pop();
            }
            Event::Empty(ref e) => {
                scopes.push(e)?;
                let replacement = if scopes.is_text_node(e) {
                    let ordinal = next_ordinal;
                    next_ordinal += 1;
                    replacements.get(&ordinal).filter(|t| !t.is_empty())
                } else {
                    None
                };
                scopes.pop();

                match replacement {
                    // <a:t/> expands to <a:t>text</a:t>
                    Some(text) => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        writer
                            .write_event(Event::Start(e.clone()))
                            .map_err(xml_error)?;
                        writer
                            .write_event(Event::Text(BytesText::from_escaped(escape_text(text))))
                            .map_err(xml_error)?;
                        writer
                            .write_event(Event::End(BytesEnd::new(name)))
                            .map_err(xml_error)?;
                    }
                    None => writer.write_event(&event).map_err(xml_error)?,
                }
            }
            Event::End(_) => {
                scopes.pop();
                writer.write_event(&event).map_err(xml_error)?;
            }
            Event::Eof => break,
            _ => writer.write_event(&event).map_err(xml_error)?,
        }
    }

    if let Some((&ordinal, _)) = replacements.range(next_ordinal..).next() {
        return Err(Error::mismatch(format!(
            "text node {} not found; part has {} text nodes",
            ordinal, next_ordinal
        )));
    }

    Ok(writer.into_inner())
}

/// Consume the content of an `a:t` up to its end tag.
///
/// Returns the raw inner events, the end event and the unescaped text.
fn read_text_content<'a>(
    reader: &mut Reader<&'a [u8]>,
) -> Result<(Vec<Event<'a>>, Event<'a>, String)> {
    let mut inner = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::End(_) if depth == 0 => return Ok((inner, event, text)),
            Event::End(_) => depth -= 1,
            Event::Start(_) => depth += 1,
            Event::Text(ref t) if depth == 0 => {
                text.push_str(&t.unescape().map_err(xml_error)?);
            }
            Event::CData(ref c) if depth == 0 => {
                text.push_str(&String::from_utf8_lossy(c));
            }
            Event::Eof => {
                return Err(Error::XmlError("Unexpected end of document inside a:t".into()));
            }
            _ => {}
        }
        inner.push(event);
    }
}
