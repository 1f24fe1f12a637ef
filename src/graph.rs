//! The graph-form tree (§3) and the property-graph store interface (§6).
//!
//! [`GraphTree`] is the representation feature extraction and path finding
//! operate over: node ids are assigned in pre-order at construction time and
//! never renumbered, edges run parent -> child, and `data[id]` mirrors the
//! operator tree's `value` at that node.
//!
//! [`GraphStore`] is the external collaborator boundary: the Doc/Equation/
//! Feature schema and the EQN_IN/HAS_FTR edges, expressed as a trait so a
//! real property-graph driver can implement it. [`InMemoryGraphStore`] is
//! the dependency-free default used by the CLI's demo mode and by tests.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::glyph::map_glyphs;
use crate::tree::OpNode;

/// A rooted tree built by a single pre-order walk of an [`OpNode`]. Node ids
/// are stable for the lifetime of the tree; node 0 is always the root.
#[derive(Debug, Clone)]
pub struct GraphTree {
    data: Vec<String>,
    children: Vec<Vec<usize>>,
    parent: Vec<Option<usize>>,
}

impl GraphTree {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn data(&self, id: usize) -> &str {
        &self.data[id]
    }

    pub fn children(&self, id: usize) -> &[usize] {
        &self.children[id]
    }

    pub fn parent(&self, id: usize) -> Option<usize> {
        self.parent[id]
    }

    pub fn is_leaf(&self, id: usize) -> bool {
        self.children[id].is_empty()
    }

    /// Leaf ids in pre-order (which, for a tree built by a single top-down
    /// walk, is a valid topological order).
    pub fn leaves(&self) -> Vec<usize> {
        (0..self.len()).filter(|&id| self.is_leaf(id)).collect()
    }

    /// Treats edges as undirected: children and parent.
    pub fn neighbors(&self, id: usize) -> Vec<usize> {
        let mut out = self.children[id].clone();
        if let Some(p) = self.parent[id] {
            out.push(p);
        }
        out
    }

    pub fn set_data(&mut self, id: usize, value: String) {
        self.data[id] = value;
    }
}

/// Builds a [`GraphTree`] from an operator tree via pre-order traversal.
pub fn build_graph_tree(root: &OpNode) -> GraphTree {
    let mut data = Vec::new();
    let mut children = Vec::new();
    let mut parent = Vec::new();
    visit(root, None, &mut data, &mut children, &mut parent);
    GraphTree { data, children, parent }
}

fn visit(
    node: &OpNode,
    parent_id: Option<usize>,
    data: &mut Vec<String>,
    children: &mut Vec<Vec<usize>>,
    parent: &mut Vec<Option<usize>>,
) -> usize {
    let id = data.len();
    let value = if node.children.is_empty() {
        map_glyphs(&node.value)
    } else {
        node.value.clone()
    };
    data.push(value);
    children.push(Vec::new());
    parent.push(parent_id);
    if let Some(p) = parent_id {
        children[p].push(id);
    }
    for child in &node.children {
        visit(child, Some(id), data, children, parent);
    }
    id
}

/// Separator used to render an operator path as a single string `Feature.id`.
/// Chosen to never collide with an operator label or variable name.
const FEATURE_ID_SEPARATOR: char = '\u{1}';

pub fn feature_id(path: &[String]) -> String {
    path.join(&FEATURE_ID_SEPARATOR.to_string())
}

pub fn split_feature_id(id: &str) -> Vec<String> {
    if id.is_empty() {
        Vec::new()
    } else {
        id.split(FEATURE_ID_SEPARATOR).map(str::to_owned).collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found: {0}")]
    DocNotFound(String),
    #[error("feature not found: {0}")]
    FeatureNotFound(String),
}

/// The Doc-Equation-Feature property graph (§3, §6), consumed not
/// implemented: a real deployment backs this with a property-graph driver's
/// session/transaction API. All mutating methods are idempotent merges.
pub trait GraphStore {
    fn merge_doc(&mut self, id: &str) -> Result<(), StoreError>;
    fn merge_equation(&mut self, id: &str, alttext: &str) -> Result<(), StoreError>;
    fn merge_feature(&mut self, id: &str) -> Result<(), StoreError>;
    fn merge_eqn_in(&mut self, equation_id: &str, doc_id: &str) -> Result<(), StoreError>;
    fn merge_has_ftr(&mut self, equation_id: &str, feature_id: &str) -> Result<(), StoreError>;

    /// Equations that carry every feature in `feature_ids` (Q1).
    fn equations_with_all_features(&self, feature_ids: &[String]) -> Result<Vec<String>, StoreError>;
    /// The operator-path feature set stored for one equation.
    fn equation_features(&self, equation_id: &str) -> Result<Vec<Vec<String>>, StoreError>;
    fn equation_alttext(&self, equation_id: &str) -> Result<Option<String>, StoreError>;
    /// All indexed equation ids, for queries that must scan the corpus (Q2, Q3).
    fn all_equations(&self) -> Result<Vec<String>, StoreError>;
}

/// A `HashMap`/`HashSet`-backed [`GraphStore`]. Good enough for the CLI's
/// local demo mode and for the whole test suite; not persisted across runs.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    docs: HashSet<String>,
    equations: HashMap<String, String>,
    features: HashSet<String>,
    eqn_in: HashMap<String, HashSet<String>>,
    has_ftr: HashMap<String, Vec<String>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn merge_doc(&mut self, id: &str) -> Result<(), StoreError> {
        self.docs.insert(id.to_owned());
        Ok(())
    }

    fn merge_equation(&mut self, id: &str, alttext: &str) -> Result<(), StoreError> {
        self.equations.entry(id.to_owned()).or_insert_with(|| alttext.to_owned());
        Ok(())
    }

    fn merge_feature(&mut self, id: &str) -> Result<(), StoreError> {
        self.features.insert(id.to_owned());
        Ok(())
    }

    fn merge_eqn_in(&mut self, equation_id: &str, doc_id: &str) -> Result<(), StoreError> {
        if !self.docs.contains(doc_id) {
            return Err(StoreError::DocNotFound(doc_id.to_owned()));
        }
        self.eqn_in.entry(equation_id.to_owned()).or_default().insert(doc_id.to_owned());
        Ok(())
    }

    fn merge_has_ftr(&mut self, equation_id: &str, feature_id: &str) -> Result<(), StoreError> {
        if !self.features.contains(feature_id) {
            return Err(StoreError::FeatureNotFound(feature_id.to_owned()));
        }
        let feats = self.has_ftr.entry(equation_id.to_owned()).or_default();
        if !feats.iter().any(|f| f == feature_id) {
            feats.push(feature_id.to_owned());
        }
        Ok(())
    }

    fn equations_with_all_features(&self, feature_ids: &[String]) -> Result<Vec<String>, StoreError> {
        if feature_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut out: Vec<String> = self
            .has_ftr
            .iter()
            .filter(|(_, feats)| feature_ids.iter().all(|f| feats.contains(f)))
            .map(|(eq, _)| eq.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    fn equation_features(&self, equation_id: &str) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self
            .has_ftr
            .get(equation_id)
            .map(|feats| feats.iter().map(|f| split_feature_id(f)).collect())
            .unwrap_or_default())
    }

    fn equation_alttext(&self, equation_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.equations.get(equation_id).cloned())
    }

    fn all_equations(&self) -> Result<Vec<String>, StoreError> {
        let mut out: Vec<String> = self.equations.keys().cloned().collect();
        out.sort();
        Ok(out)
    }
}
