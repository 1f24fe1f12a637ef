//! Finds which nodes of a graph tree can participate in a walk that spells
//! out a given sequence of operator labels (§4.P).
//!
//! The search proceeds layer by layer: layer 0 is every node whose label
//! matches `feature_list[0]`, and layer `i` is every neighbor of a layer
//! `i - 1` node whose label matches `feature_list[i]`. If any layer comes up
//! empty, no walk completes and the whole match fails. Otherwise the result
//! is the union of every node id across every layer of the walk, not just
//! the last one: a match to `[plus, times]` reports the `plus` node *and*
//! every `times` node that completed a path, since all of them participated.

use std::collections::{HashMap, HashSet};

use crate::graph::GraphTree;

/// `legacy_layering = true` reproduces a documented quirk of the original
/// layering step: each layer is filtered against the *unrestricted* bucket
/// of same-label nodes rather than against the previous layer, so a node
/// can be re-admitted into layer `i` even if none of its neighbors are
/// actually in layer `i - 1`. Default is the corrected behavior.
#[derive(Debug, Clone, Copy)]
pub struct PathFinderOptions {
    pub legacy_layering: bool,
}

impl Default for PathFinderOptions {
    fn default() -> Self {
        Self { legacy_layering: false }
    }
}

/// Buckets every node id by its label.
fn bucket_by_label(tree: &GraphTree) -> HashMap<&str, Vec<usize>> {
    let mut buckets: HashMap<&str, Vec<usize>> = HashMap::new();
    for id in 0..tree.len() {
        buckets.entry(tree.data(id)).or_default().push(id);
    }
    buckets
}

/// Returns the union of every node id that participates in some walk through
/// `tree` whose node labels, in order, equal `feature_list`. An empty
/// `feature_list`, or a `feature_list` with no complete walk, matches
/// nothing.
pub fn find_feature_paths(
    tree: &GraphTree,
    feature_list: &[String],
    opts: &PathFinderOptions,
) -> HashSet<usize> {
    if feature_list.is_empty() {
        return HashSet::new();
    }

    let buckets = bucket_by_label(tree);
    let first_label: &str = &feature_list[0];
    let mut layer: HashSet<usize> = buckets.get(first_label).cloned().unwrap_or_default().into_iter().collect();
    let mut prev_label: &str = first_label;
    let mut union: HashSet<usize> = layer.clone();

    for label in &feature_list[1..] {
        if layer.is_empty() {
            return HashSet::new();
        }

        let candidates: HashSet<usize> = buckets.get(label.as_str()).cloned().unwrap_or_default().into_iter().collect();

        // Corrected: restrict against the layer as narrowed by every step so
        // far. Legacy: restrict against the *full* bucket for the previous
        // label, ignoring any narrowing from steps further back.
        let restrict_against: HashSet<usize> = if opts.legacy_layering {
            buckets.get(prev_label).cloned().unwrap_or_default().into_iter().collect()
        } else {
            layer.clone()
        };

        let mut next_layer = HashSet::new();
        for &node in &candidates {
            if tree.neighbors(node).iter().any(|n| restrict_against.contains(n)) {
                next_layer.insert(node);
            }
        }
        layer = next_layer;
        prev_label = label;
        union.extend(layer.iter().copied());
    }

    if layer.is_empty() {
        HashSet::new()
    } else {
        union
    }
}
