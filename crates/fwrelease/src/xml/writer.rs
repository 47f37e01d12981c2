//! Pretty-printing serializer.
//!
//! Indentation is two spaces per level. Whitespace-only text around the
//! children of an element is replaced by a newline plus indentation; any
//! non-whitespace text is written back as it was, so mixed content survives.
//! Elements that hold only text are written on one line.

use quick_xml::escape::{escape, partial_escape};

use super::{Document, Element, Misc, Node};

const INDENT: &str = "  ";

/// Serialize a document, ending with a newline after the last item.
#[must_use]
pub fn write(doc: &Document) -> String {
    let mut out = String::new();
    for item in &doc.prolog {
        write_misc(&mut out, item);
        out.push('\n');
    }
    write_element(&mut out, &doc.root, 0);
    out.push('\n');
    for item in &doc.epilog {
        write_misc(&mut out, item);
        out.push('\n');
    }
    out
}

fn write_misc(out: &mut String, item: &Misc) {
    match item {
        Misc::Declaration(raw) | Misc::Doctype(raw) | Misc::ProcessingInstruction(raw) => {
            out.push_str(raw);
        }
        Misc::Comment(body) => write_comment(out, body),
    }
}

fn write_comment(out: &mut String, body: &str) {
    out.push_str("<!--");
    out.push_str(body);
    out.push_str("-->");
}

/// Whitespace other than a plain space is written as a character reference,
/// since a reader normalizes it to a space inside attribute values.
fn write_attr_value(out: &mut String, value: &str) {
    for ch in escape(value).chars() {
        match ch {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(ch),
        }
    }
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        write_attr_value(out, value);
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str(" />");
        return;
    }
    out.push('>');

    let structured = element
        .children
        .iter()
        .any(|n| matches!(n, Node::Element(_) | Node::Comment(_) | Node::ProcessingInstruction(_)));

    if structured {
        let mut pending = String::new();
        for node in &element.children {
            if let Node::Text(text) = node {
                pending.push_str(text);
                continue;
            }
            write_gap(out, &pending, depth + 1);
            pending.clear();
            write_node(out, node, depth + 1);
        }
        write_gap(out, &pending, depth);
    } else {
        for node in &element.children {
            write_node(out, node, depth);
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    match node {
        Node::Element(e) => write_element(out, e, depth),
        Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
        Node::Comment(body) => write_comment(out, body),
        Node::CData(body) => {
            out.push_str("<![CDATA[");
            out.push_str(body);
            out.push_str("]]>");
        }
        Node::ProcessingInstruction(raw) => out.push_str(raw),
    }
}

/// Write the text between two children, normalizing pure whitespace.
fn write_gap(out: &mut String, text: &str, level: usize) {
    if text.trim().is_empty() {
        out.push('\n');
        out.push_str(&INDENT.repeat(level));
    } else {
        out.push_str(&partial_escape(text));
    }
}
