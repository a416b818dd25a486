//! DOM helpers shared by the backends.
//!
//! Markup is parsed with kuchiki, edited in place and written back either as
//! HTML (documents between stages) or as XHTML (the renderer's output).

use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeData, NodeRef};

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

pub(crate) fn parse(markup: &str) -> NodeRef {
    kuchiki::parse_html().one(markup)
}

/// Serialize a parsed document back to HTML.
pub(crate) fn to_html(document: &NodeRef) -> String {
    document.to_string()
}

/// A detached HTML element without attributes or children.
pub(crate) fn new_element(name: &str) -> NodeRef {
    let qual = QualName::new(None, Namespace::from(XHTML_NS), LocalName::from(name));
    NodeRef::new_element(qual, Vec::<(ExpandedName, Attribute)>::new())
}

/// Replace every child of `node` with a single text node.
pub(crate) fn set_text(node: &NodeRef, text: &str) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        child.detach();
    }
    if !text.is_empty() {
        node.append(NodeRef::new_text(text));
    }
}

/// Neutralize closing tags of the raw-text element `name` inside `text`, so
/// the text stays inside that element when the markup is parsed again.
pub(crate) fn escape_raw_text(text: &str, name: &str) -> String {
    let needle = format!("</{}", name);
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (at, _) in lower.match_indices(&needle) {
        out.push_str(&text[last..at]);
        out.push_str("<\\/");
        last = at + 2;
    }
    out.push_str(&text[last..]);
    out
}

/// Write `node` as namespace-well-formed XHTML.
pub(crate) fn write_xhtml(node: &NodeRef, out: &mut String) {
    write_node(node, None, out);
}

fn write_node(node: &NodeRef, parent_ns: Option<&str>, out: &mut String) {
    match node.data() {
        NodeData::Document(_) | NodeData::DocumentFragment => {
            for child in node.children() {
                write_node(&child, parent_ns, out);
            }
        }
        NodeData::Element(el) => {
            let tag = el.name.local.as_ref();
            let ns = el.name.ns.as_ref();
            out.push('<');
            out.push_str(tag);
            if parent_ns != Some(ns) && !ns.is_empty() {
                out.push_str(" xmlns=\"");
                escape_attr(ns, out);
                out.push('"');
            }

            for (name, attr) in el.attributes.borrow().map.iter() {
                let local = name.local.as_ref();
                let prefix = match name.ns.as_ref() {
                    "" => "",
                    XLINK_NS => "xlink:",
                    XML_NS => "xml:",
                    _ => continue,
                };
                if (prefix.is_empty() && local == "xmlns") || !is_xml_name(local) {
                    continue;
                }
                out.push(' ');
                out.push_str(prefix);
                out.push_str(local);
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }

            let mut children = node.children().peekable();
            if children.peek().is_none() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(&child, Some(ns), out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeData::Text(text) => escape_text(&text.borrow(), out),
        _ => {}
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{A}'
            | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn escape_text(input: &str, out: &mut String) {
    for ch in input.chars().filter(|c| is_xml_char(*c)) {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(input: &str, out: &mut String) {
    for ch in input.chars().filter(|c| is_xml_char(*c)) {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}
