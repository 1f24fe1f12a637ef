//! The operator tree and the MathML-to-operator-tree normalizer.
//!
//! This is the densest subsystem: a tag-directed recursive rewrite of a
//! content-MathML subtree into a canonical [`OpNode`] tree, with three rule
//! families (skip / terminal / operator) and three compression passes
//! (subscript, superscript, derivative) layered on top of the operator
//! family.
//!
//! Every rule here is a pure function over owned [`OpNode`] values: no pass
//! mutates a node that another part of the tree still holds a reference to.
//! This is a deliberate departure from a naive line-by-line port, which
//! would alias child nodes across sibling subtrees during compression.

use roxmltree::Node;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::regexes;

/// U+1D451 MATHEMATICAL ITALIC SMALL D, the glyph MathML uses for `d` in
/// derivative notation before it has been folded into ASCII.
const ITALIC_D: char = '\u{1D451}';

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum TagKind {
    Math,
    Semantics,
    Annotation,
    AnnotationXml,
    Apply,
    Ci,
    Cn,
    Cs,
    Csymbol,
}

fn classify_tag(tag: &str) -> Option<TagKind> {
    serde_plain::from_str(tag).ok()
}

fn is_skip(tag: &str) -> bool {
    matches!(
        classify_tag(tag),
        Some(TagKind::Math | TagKind::Semantics | TagKind::Annotation | TagKind::AnnotationXml)
    )
}

fn is_terminal(tag: &str) -> bool {
    matches!(
        classify_tag(tag),
        Some(TagKind::Ci | TagKind::Cn | TagKind::Cs | TagKind::Csymbol)
    )
}

fn is_compressable(tag: &str) -> bool {
    matches!(classify_tag(tag), Some(TagKind::Ci | TagKind::Cn | TagKind::Cs))
}

/// A node of the canonical operator tree (§3). `value` is either an operator
/// label (`times`, `plus`, `subscript`, ...) or a leaf payload (a variable
/// name, numeral, or identifier). Child order is significant: for an
/// operator node, `children[0]` is the operator head.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpNode {
    pub value: String,
    pub children: Vec<OpNode>,
}

impl OpNode {
    pub fn leaf(value: impl Into<String>) -> Self {
        OpNode { value: value.into(), children: Vec::new() }
    }

    pub fn new(value: impl Into<String>, children: Vec<OpNode>) -> Self {
        OpNode { value: value.into(), children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Toggles for the three compression passes (§4.N). All default to enabled,
/// matching the source engine's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub compress_subscripts: bool,
    pub compress_superscripts: bool,
    pub fix_derivatives: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            compress_subscripts: true,
            compress_superscripts: true,
            fix_derivatives: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed MathML: {0}")]
    MalformedMathml(String),
    #[error("semantics element is missing an annotation/annotation-xml child")]
    MissingContentMl,
}

impl From<roxmltree::Error> for NormalizeError {
    fn from(e: roxmltree::Error) -> Self {
        NormalizeError::MalformedMathml(e.to_string())
    }
}

/// Normalizes a MathML subtree (as a string) into an operator tree.
pub fn normalize(mathml: &str, opts: &NormalizeOptions) -> Result<OpNode, NormalizeError> {
    let sanitized = regexes::sanitize_xml(mathml);
    let doc = roxmltree::Document::parse(&sanitized)?;
    to_op_node(doc.root_element(), opts)
}

fn first_element_child(node: Node) -> Option<Node> {
    node.children().find(|n| n.is_element())
}

fn element_children(node: Node) -> Vec<Node> {
    node.children().filter(|n| n.is_element()).collect()
}

fn to_op_node(node: Node, opts: &NormalizeOptions) -> Result<OpNode, NormalizeError> {
    let tag = node.tag_name().name();

    if is_skip(tag) {
        if classify_tag(tag) == Some(TagKind::Semantics) {
            for child in element_children(node) {
                if matches!(classify_tag(child.tag_name().name()), Some(TagKind::Annotation | TagKind::AnnotationXml)) {
                    return to_op_node(child, opts);
                }
            }
            return Err(NormalizeError::MissingContentMl);
        }
        let first = first_element_child(node)
            .ok_or_else(|| NormalizeError::MalformedMathml(format!("<{tag}> has no children to skip into")))?;
        return to_op_node(first, opts);
    }

    if is_terminal(tag) {
        return Ok(terminal_leaf(node));
    }

    if classify_tag(tag) == Some(TagKind::Apply) {
        return build_operator_node(node, opts);
    }

    let children = element_children(node);
    if children.is_empty() {
        return Ok(OpNode::leaf(tag));
    }
    let kids = children
        .into_iter()
        .map(|c| to_op_node(c, opts))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(OpNode::new(tag, kids))
}

/// Descends child[0] until non-empty text is found or no children remain.
fn terminal_leaf(mut node: Node) -> OpNode {
    loop {
        let text = node.text().unwrap_or("").trim();
        if !text.is_empty() {
            return OpNode::leaf(text);
        }
        match first_element_child(node) {
            Some(next) => node = next,
            None => return OpNode::leaf("no text found"),
        }
    }
}

fn build_operator_node(node: Node, opts: &NormalizeOptions) -> Result<OpNode, NormalizeError> {
    let kids = element_children(node);
    let head_node = kids
        .first()
        .copied()
        .ok_or_else(|| NormalizeError::MalformedMathml("<apply> has no operator head".to_string()))?;
    let head = to_op_node(head_node, opts)?;
    let value = head.value.clone();

    let mut children = head.children;
    for &operand in &kids[1..] {
        children.push(to_op_node(operand, opts)?);
    }
    let result = OpNode::new(value, children);

    if opts.compress_subscripts && result.value == "subscript" {
        if let Some(compressed) = try_subscript_compression(&kids, opts)? {
            return Ok(compressed);
        }
    }

    if opts.compress_superscripts && result.value == "superscript" {
        if let Some(compressed) = try_superscript_compression(node, opts)? {
            return Ok(compressed);
        }
    }

    if opts.fix_derivatives && result.value == "times" {
        return apply_derivative_fixup(node, opts);
    }

    Ok(result)
}

/// Subscript compression rules (a)-(g) from §4.N. First applicable rule wins.
fn try_subscript_compression(kids: &[Node], opts: &NormalizeOptions) -> Result<Option<OpNode>, NormalizeError> {
    if kids.len() != 3 {
        return Ok(None);
    }
    let tag1 = kids[1].tag_name().name();
    let tag2 = kids[2].tag_name().name();
    let node0 = to_op_node(kids[0], opts)?;
    let node1 = to_op_node(kids[1], opts)?;
    let node2 = to_op_node(kids[2], opts)?;

    // (a)
    if is_compressable(tag1) && is_compressable(tag2) {
        return Ok(Some(OpNode::leaf(format!("{}_{}", node1.value, node2.value))));
    }

    // (b)
    if node0.value == "subscript"
        && node1.value == "superscript"
        && node2.children.is_empty()
        && node1.children.first().map_or(false, |c| c.children.is_empty())
    {
        let mut node1 = node1;
        node1.children[0].value.push('_');
        node1.children[0].value.push_str(&node2.value);
        return Ok(Some(node1));
    }

    // (c)
    if node0.value == "subscript" && node1.value == "superscript" && !node2.children.is_empty() {
        return Ok(Some(node1));
    }

    // (d)
    if node0.value == "subscript" && node1.children.is_empty() && is_compressable(tag1) && !is_compressable(tag2) {
        let mut node1 = node1;
        node1.value.push('_');
        node1.value.push_str(&in_order_traversal(&node2));
        return Ok(Some(node1));
    }

    // (e)
    if node0.value == "subscript" && node1.children.is_empty() {
        return Ok(Some(node1));
    }

    // (f) and (g): tag1 not compressable, regardless of tag2
    if !is_compressable(tag1) {
        return Ok(Some(node1));
    }

    Ok(None)
}

/// In-order traversal string used by subscript rule (d).
fn in_order_traversal(node: &OpNode) -> String {
    match node.children.len() {
        0 => node.value.trim().to_string(),
        1 => format!("{}_{}", in_order_traversal(&node.children[0]), node.value),
        2 => format!(
            "{}_{}_{}",
            in_order_traversal(&node.children[0]),
            node.value,
            in_order_traversal(&node.children[1])
        ),
        _ => node.value.clone(),
    }
}

/// Superscript compression: `apply(superscript, f(x), n)` with all three
/// children leaves becomes `superscript(f(x), n)` with `x` reattached as the
/// operand of `f`.
fn try_superscript_compression(node: Node, opts: &NormalizeOptions) -> Result<Option<OpNode>, NormalizeError> {
    let mut test_opts = *opts;
    test_opts.compress_superscripts = false;
    let test_node = build_operator_node(node, &test_opts)?;

    if test_node.children.len() == 3 && test_node.children.iter().all(OpNode::is_leaf) {
        let mut children = test_node.children;
        let power = children.remove(1);
        let operand = children.remove(1);
        let mut operator = children.remove(0);
        operator.children = vec![operand];
        return Ok(Some(OpNode::new("superscript", vec![operator, power])));
    }
    Ok(None)
}

/// Derivative fixup: `times(d, x)` becomes `d` with child `x`, and
/// `times(superscript(d, n), x)` becomes `superscript(d(x), n)`, folding away
/// the enclosing `times` entirely when it ends up with a single child.
fn apply_derivative_fixup(node: Node, opts: &NormalizeOptions) -> Result<OpNode, NormalizeError> {
    let mut no_deriv = *opts;
    no_deriv.fix_derivatives = false;
    let l0 = build_operator_node(node, &no_deriv)?;
    let value = l0.value;

    let after_sweep1 = derivative_sweep_one(l0.children);
    let final_children = derivative_sweep_two(after_sweep1);

    if final_children.len() == 1 {
        Ok(final_children.into_iter().next().unwrap())
    } else {
        Ok(OpNode::new(value, final_children))
    }
}

/// `times(d, operand)` -> `d` adopts `operand` as its sole child, renamed to ASCII `d`.
fn derivative_sweep_one(mut children: Vec<OpNode>) -> Vec<OpNode> {
    let mut removal = std::collections::HashSet::new();
    for i in 0..children.len() {
        if i + 1 < children.len() && children[i].value == ITALIC_D.to_string() && children[i].children.is_empty() {
            let next = children[i + 1].clone();
            children[i].children.push(next);
            removal.insert(i + 1);
        }
    }
    children
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !removal.contains(i))
        .map(|(_, mut c)| {
            if c.value == ITALIC_D.to_string() {
                c.value = "d".to_string();
            }
            c
        })
        .collect()
}

/// `times(superscript(d, n), operand)` -> `superscript(d(operand), n)`.
fn derivative_sweep_two(mut children: Vec<OpNode>) -> Vec<OpNode> {
    let mut removal = std::collections::HashSet::new();
    for i in 0..children.len() {
        if children[i].value != "superscript" {
            continue;
        }
        let has_next = i + 1 < children.len();
        let operand = if has_next { Some(children[i + 1].clone()) } else { None };
        let mut matched = false;
        for grandchild in children[i].children.iter_mut() {
            if !matched && grandchild.value == ITALIC_D.to_string() && grandchild.children.is_empty() {
                grandchild.value = "d".to_string();
                if let Some(operand) = operand.clone() {
                    grandchild.children = vec![operand];
                    removal.insert(i + 1);
                }
                matched = true;
            }
        }
    }
    children
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !removal.contains(i))
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn normalize_default(mathml: &str) -> OpNode {
        normalize(mathml, &NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn simple_plus() {
        let tree = normalize_default(
            r#"<math><apply><plus/><ci>x</ci><ci>y</ci></apply></math>"#,
        );
        assert_eq!(tree.value, "plus");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].value, "x");
        assert_eq!(tree.children[1].value, "y");
    }

    #[test]
    fn semantics_wrapper_unwraps_to_annotation_xml() {
        let tree = normalize_default(
            r#"<math>
                <semantics>
                    <mrow><mi>x</mi></mrow>
                    <annotation-xml encoding="MathML-Content">
                        <apply><plus/><ci>x</ci><ci>y</ci></apply>
                    </annotation-xml>
                </semantics>
            </math>"#,
        );
        assert_eq!(tree.value, "plus");
    }

    #[test]
    fn semantics_without_content_ml_is_an_error_not_a_panic() {
        let err = normalize(
            r#"<math><semantics><mrow><mi>x</mi></mrow></semantics></math>"#,
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::MissingContentMl));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = normalize("<math><apply><plus/>", &NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedMathml(_)));
    }

    #[test]
    fn subscript_rule_a_compresses_two_leaves() {
        // apply(subscript, ci(x), cn(1)) -> leaf "x_1"
        let tree = normalize_default(
            r#"<math><apply><subscript/><ci>x</ci><cn>1</cn></apply></math>"#,
        );
        assert_eq!(tree.value, "x_1");
        assert!(tree.children.is_empty());
    }

    #[test]
    fn superscript_compression_reattaches_operand() {
        // apply(superscript, operator f, power 2, operand x) -> superscript(f(x), 2)
        let tree = normalize_default(
            r#"<math>
                <apply>
                    <superscript/>
                    <ci>f</ci>
                    <cn>2</cn>
                    <ci>x</ci>
                </apply>
            </math>"#,
        );
        assert_eq!(tree.value, "superscript");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].value, "f");
        assert_eq!(tree.children[0].children[0].value, "x");
        assert_eq!(tree.children[1].value, "2");
    }

    #[test]
    fn derivative_fixup_collapses_times_d_x() {
        let mathml = format!(
            r#"<math><apply><times/><ci>{d}</ci><ci>x</ci></apply></math>"#,
            d = ITALIC_D
        );
        let tree = normalize_default(&mathml);
        assert_eq!(tree.value, "d");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].value, "x");
    }

    #[test]
    fn derivative_fixup_keeps_times_with_other_operands() {
        let mathml = format!(
            r#"<math><apply><times/><ci>{d}</ci><ci>x</ci><ci>y</ci></apply></math>"#,
            d = ITALIC_D
        );
        let tree = normalize_default(&mathml);
        assert_eq!(tree.value, "times");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].value, "d");
        assert_eq!(tree.children[0].children[0].value, "x");
        assert_eq!(tree.children[1].value, "y");
    }

    #[test]
    fn greek_entities_are_sanitized_before_parsing() {
        let tree = normalize_default(r#"<math><cn type="constant">&pi;</cn></math>"#);
        assert_eq!(tree.value, "$FIXED_pi");
    }
}
