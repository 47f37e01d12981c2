//! Event-driven construction of the [`Document`] tree.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Document, Element, Misc, Node};
use crate::error::{Error, Result};

/// Parse an XML string into a [`Document`].
///
/// Comments, CDATA sections and processing instructions are kept; entity
/// references in text and attribute values are resolved.
///
/// # Errors
///
/// Returns [`Error::XmlParse`] for malformed input, text outside the root
/// element, a missing root or more than one root.
pub fn parse(xml: &str) -> Result<Document> {
    // The reader skips a leading BOM, which would shift every offset below.
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);

    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let start = offset(reader.buffer_position());
        let event = reader
            .read_event()
            .map_err(|e| Error::xml(offset(reader.error_position()), e.to_string()))?;
        let end = offset(reader.buffer_position());
        let raw = xml.get(start..end).unwrap_or_default();

        match event {
            Event::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(Error::xml(start, "more than one root element"));
                }
                stack.push(open(&e, start)?);
            }
            Event::Empty(e) => {
                let element = open(&e, start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => return Err(Error::xml(start, "more than one root element")),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::xml(start, "closing tag without opening tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Event::Text(_) | Event::GeneralRef(_) => {
                let text = unescape(raw).map_err(|e| Error::xml(start, e.to_string()))?;
                match stack.last_mut() {
                    Some(parent) => push_text(parent, &text),
                    None if text.trim().is_empty() => {}
                    None => return Err(Error::xml(start, "text outside the root element")),
                }
            }
            Event::CData(_) => {
                let body = strip(raw, "<![CDATA[", "]]>");
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(body.to_string())),
                    None => return Err(Error::xml(start, "CDATA outside the root element")),
                }
            }
            Event::Comment(_) => {
                let body = strip(raw, "<!--", "-->").to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Comment(body)),
                    None if root.is_none() => prolog.push(Misc::Comment(body)),
                    None => epilog.push(Misc::Comment(body)),
                }
            }
            Event::PI(_) => match stack.last_mut() {
                Some(parent) => parent
                    .children
                    .push(Node::ProcessingInstruction(raw.to_string())),
                None if root.is_none() => prolog.push(Misc::ProcessingInstruction(raw.to_string())),
                None => epilog.push(Misc::ProcessingInstruction(raw.to_string())),
            },
            Event::Decl(_) => prolog.push(Misc::Declaration(raw.to_string())),
            Event::DocType(_) => prolog.push(Misc::Doctype(raw.to_string())),
            Event::Eof => break,
        }
    }

    if let Some(unclosed) = stack.last() {
        return Err(Error::xml(xml.len(), format!("unclosed element <{}>", unclosed.name)));
    }
    let root = root.ok_or_else(|| Error::xml(xml.len(), "document has no root element"))?;

    Ok(Document {
        prolog,
        root,
        epilog,
    })
}

fn open(start: &BytesStart<'_>, position: usize) -> Result<Element> {
    let name = utf8(start.name().as_ref(), position)?;
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::xml(position, format!("invalid attribute: {e}")))?;
        let key = utf8(attr.key.as_ref(), position)?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::xml(position, format!("invalid attribute value: {e}")))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn push_text(parent: &mut Element, text: &str) {
    if let Some(Node::Text(last)) = parent.children.last_mut() {
        last.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_string()));
    }
}

fn strip<'a>(raw: &'a str, prefix: &str, suffix: &str) -> &'a str {
    raw.strip_prefix(prefix)
        .and_then(|s| s.strip_suffix(suffix))
        .unwrap_or(raw)
}

fn utf8(bytes: &[u8], position: usize) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::xml(position, e.to_string()))
}

fn offset(position: u64) -> usize {
    usize::try_from(position).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attributes_and_children() {
        let doc = parse(r#"<root><board name="BLEFRIEND"><firmware/></board></root>"#).unwrap();
        let board = doc.root.child("board").unwrap();
        assert_eq!(board.attr("name"), Some("BLEFRIEND"));
        assert!(board.child("firmware").is_some());
    }

    #[test]
    fn test_parse_keeps_comments() {
        let doc = parse("<root><!-- note --><a/></root>").unwrap();
        assert_eq!(doc.root.children[0], Node::Comment(" note ".to_string()));
    }

    #[test]
    fn test_parse_prolog_and_epilog() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- head -->\n<root/>\n<!-- tail -->\n";
        let doc = parse(xml).unwrap();
        assert_eq!(
            doc.prolog,
            vec![
                Misc::Declaration("<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_string()),
                Misc::Comment(" head ".to_string()),
            ]
        );
        assert_eq!(doc.epilog, vec![Misc::Comment(" tail ".to_string())]);
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let doc = parse(r#"<a title="x &amp; y">1 &lt; 2</a>"#).unwrap();
        assert_eq!(doc.root.attr("title"), Some("x & y"));
        assert_eq!(doc.root.children, vec![Node::Text("1 < 2".to_string())]);
    }

    #[test]
    fn test_parse_cdata() {
        let doc = parse("<a><![CDATA[<raw>]]></a>").unwrap();
        assert_eq!(doc.root.children, vec![Node::CData("<raw>".to_string())]);
    }

    #[test]
    fn test_parse_byte_order_mark() {
        let doc = parse("\u{feff}<?xml version=\"1.0\"?>\n<!-- head -->\n<root>text</root>\n").unwrap();
        assert_eq!(
            doc.prolog,
            vec![
                Misc::Declaration("<?xml version=\"1.0\"?>".to_string()),
                Misc::Comment(" head ".to_string()),
            ]
        );
        assert_eq!(doc.root.children, vec![Node::Text("text".to_string())]);
    }

    #[test]
    fn test_parse_mismatched_tags_fails() {
        let result = parse("<root><a></b></root>");
        assert!(matches!(result, Err(Error::XmlParse { .. })));
    }

    #[test]
    fn test_parse_unclosed_fails() {
        let result = parse("<root><a>");
        assert!(matches!(result, Err(Error::XmlParse { .. })));
    }

    #[test]
    fn test_parse_empty_document_fails() {
        let err = parse("  \n").unwrap_err();
        assert!(err.to_string().contains("no root"));
    }

    #[test]
    fn test_parse_two_roots_fails() {
        let err = parse("<a/><b/>").unwrap_err();
        assert!(err.to_string().contains("more than one root"));
    }

    #[test]
    fn test_parse_text_outside_root_fails() {
        assert!(parse("<a/>junk").is_err());
    }
}
