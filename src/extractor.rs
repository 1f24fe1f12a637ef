//! Finds block-display MathML equations embedded in an HTML document and
//! serializes each back to a clean MathML string (§4.X).
//!
//! Parsing goes through `html5ever`'s DOM builder rather than a bespoke XML
//! scan: source HTML is not guaranteed to be well-formed XML, and `<math>`
//! elements can appear inside arbitrarily broken surrounding markup that a
//! browser-grade parser recovers from.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{NodeData, RcDom};
use thiserror::Error;

/// Attributes stripped from every serialized element: editorial metadata
/// that carries no structural meaning for normalization.
const STRIPPED_ATTRS: &[&str] = &["id", "xref", "type", "cd", "encoding"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    InputError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One block-display equation as found in source order, alongside its
/// `alttext` attribute (empty string if absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEquation {
    pub mathml: String,
    pub alttext: String,
}

pub fn extract_block_equations_from_file(path: &Path) -> Result<Vec<BlockEquation>, ExtractError> {
    let html = fs::read_to_string(path).map_err(|source| ExtractError::InputError {
        path: path.display().to_string(),
        source,
    })?;
    Ok(extract_block_equations(&html))
}

/// Walks the DOM for every `<math display="block">` element and returns a
/// stripped, pretty-printed serialization of each.
pub fn extract_block_equations(html: &str) -> Vec<BlockEquation> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .expect("reading from an in-memory byte slice never fails");

    let mut found = Vec::new();
    collect_math_elements(&dom.document, &mut found);
    found
}

fn collect_math_elements(node: &Rc<markup5ever_rcdom::Node>, out: &mut Vec<BlockEquation>) {
    if let NodeData::Element { ref name, ref attrs, .. } = node.data {
        if name.local.as_ref() == "math" {
            let display = attr_value(attrs, "display").unwrap_or_default();
            if display == "block" {
                let alttext = attr_value(attrs, "alttext").unwrap_or_default();
                let mut mathml = String::new();
                render_stripped(node, &mut mathml, 0);
                out.push(BlockEquation { mathml, alttext });
                return;
            }
        }
    }
    for child in node.children.borrow().iter() {
        collect_math_elements(child, out);
    }
}

fn attr_value(attrs: &std::cell::RefCell<Vec<html5ever::Attribute>>, name: &str) -> Option<String> {
    attrs.borrow().iter().find(|a| a.name.local.as_ref() == name).map(|a| a.value.to_string())
}

/// Re-serializes `node` as MathML, dropping [`STRIPPED_ATTRS`] and
/// pretty-printing with two-space indentation.
fn render_stripped(node: &Rc<markup5ever_rcdom::Node>, out: &mut String, depth: usize) {
    match node.data {
        NodeData::Element { ref name, ref attrs, .. } => {
            let indent = "  ".repeat(depth);
            let tag = name.local.as_ref();

            out.push_str(&indent);
            out.push('<');
            out.push_str(tag);
            for attr in attrs.borrow().iter() {
                let attr_name = attr.name.local.as_ref();
                if STRIPPED_ATTRS.contains(&attr_name) {
                    continue;
                }
                out.push(' ');
                out.push_str(attr_name);
                out.push_str("=\"");
                out.push_str(&escape_xml(&attr.value));
                out.push('"');
            }

            let children = node.children.borrow();
            if children.is_empty() {
                out.push_str("/>\n");
                return;
            }
            out.push_str(">\n");
            for child in children.iter() {
                render_stripped(child, out, depth + 1);
            }
            out.push_str(&indent);
            out.push_str("</");
            out.push_str(tag);
            out.push_str(">\n");
        }
        NodeData::Text { ref contents } => {
            let text = contents.borrow();
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(&"  ".repeat(depth));
                out.push_str(&escape_xml(trimmed));
                out.push('\n');
            }
        }
        _ => {
            for child in node.children.borrow().iter() {
                render_stripped(child, out, depth);
            }
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Strips every attribute (not just [`STRIPPED_ATTRS`]) and drops
/// `annotation`/`annotation-xml` subtrees entirely, then collapses runs of
/// whitespace and removes the invisible-times marker U+2062. Distinct from
/// [`extract_block_equations`], which keeps `semantics`/`annotation-xml`
/// wrappers intact for the normalizer to unwrap: this is for callers that
/// want a maximally-cleaned MathML string for display, such as the CLI
/// echoing back the equation a query matched.
pub fn strip_all_attributes(mathml: &str) -> String {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut mathml.as_bytes())
        .expect("reading from an in-memory byte slice never fails");

    let mut out = String::new();
    match find_math_element(&dom.document) {
        Some(math_node) => render_bare(&math_node, &mut out),
        None => out.push_str(mathml),
    }
    out.replace('\u{2062}', "").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_math_element(node: &Rc<markup5ever_rcdom::Node>) -> Option<Rc<markup5ever_rcdom::Node>> {
    if let NodeData::Element { ref name, .. } = node.data {
        if name.local.as_ref() == "math" {
            return Some(node.clone());
        }
    }
    for child in node.children.borrow().iter() {
        if let Some(found) = find_math_element(child) {
            return Some(found);
        }
    }
    None
}

fn render_bare(node: &Rc<markup5ever_rcdom::Node>, out: &mut String) {
    match node.data {
        NodeData::Element { ref name, .. } => {
            let tag = name.local.as_ref();
            if tag == "annotation" || tag == "annotation-xml" {
                return;
            }
            out.push('<');
            out.push_str(tag);
            let children = node.children.borrow();
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children.iter() {
                render_bare(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeData::Text { ref contents } => {
            out.push_str(&escape_xml(contents.borrow().trim()));
        }
        _ => {
            for child in node.children.borrow().iter() {
                render_bare(child, out);
            }
        }
    }
}
