//! Enumerates the feature set of an operator tree: for every unordered pair
//! of leaves, the sequence of operator labels on the path between them
//! through their lowest common ancestor (§4.F).

use crate::graph::GraphTree;

pub type OperatorPath = Vec<String>;

/// One structural feature: the pair of leaf labels it was derived from, and
/// the operator path connecting them (leaves excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub variables: (String, String),
    pub operator_path: OperatorPath,
}

/// Enumerates every feature of `tree`, one per unordered leaf pair `{i, j}`
/// with `i < j` in pre-order (§3, §4.F).
pub fn extract_features(tree: &GraphTree) -> Vec<Feature> {
    let leaves = tree.leaves();
    let mut features = Vec::with_capacity(leaves.len() * leaves.len().saturating_sub(1) / 2);

    for i in 0..leaves.len() {
        for j in (i + 1)..leaves.len() {
            let path_a = path_from_root(tree, leaves[i]);
            let path_b = path_from_root(tree, leaves[j]);
            let merged = merge_leaf_paths(&path_a, &path_b);

            // Drop the two leaves themselves, keep only the operators between them.
            let operator_path: Vec<String> = merged[1..merged.len() - 1]
                .iter()
                .map(|&id| tree.data(id).to_owned())
                .collect();

            features.push(Feature {
                variables: (tree.data(leaves[i]).to_owned(), tree.data(leaves[j]).to_owned()),
                operator_path,
            });
        }
    }
    features
}

/// The unique path from the root down to `node`, root first.
fn path_from_root(tree: &GraphTree, node: usize) -> Vec<usize> {
    let mut path = vec![node];
    let mut cur = node;
    while let Some(p) = tree.parent(cur) {
        path.push(p);
        cur = p;
    }
    path.reverse();
    path
}

/// Merges two root-to-leaf paths into the leaf-to-leaf path through their
/// LCA. Starts from `reverse(path_a)`; walks `path_b` removing the first
/// matching node it finds (the shared ancestor chain) and re-inserting the
/// last such match once we leave the shared prefix, so what remains is
/// `leaf_a ... LCA ... leaf_b`.
fn merge_leaf_paths(path_a: &[usize], path_b: &[usize]) -> Vec<usize> {
    let mut merged: Vec<usize> = path_a.iter().rev().copied().collect();
    let mut last_repeat: Option<usize> = None;

    for &node in path_b {
        if let Some(pos) = merged.iter().position(|&n| n == node) {
            merged.remove(pos);
            last_repeat = Some(node);
        } else {
            if let Some(lr) = last_repeat.take() {
                merged.push(lr);
            }
            merged.push(node);
        }
    }
    merged
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::build_graph_tree;
    use crate::tree::OpNode;

    #[test]
    fn plus_times_yields_expected_features() {
        // plus(a, times(b, c))
        let root = OpNode::new(
            "plus",
            vec![
                OpNode::leaf("a"),
                OpNode::new("times", vec![OpNode::leaf("b"), OpNode::leaf("c")]),
            ],
        );
        let tree = build_graph_tree(&root);
        let features = extract_features(&tree);

        assert_eq!(features.len(), 3);

        let ab = features.iter().find(|f| f.variables == ("a".to_string(), "b".to_string())).unwrap();
        assert_eq!(ab.operator_path, vec!["plus".to_string(), "times".to_string()]);

        let ac = features.iter().find(|f| f.variables == ("a".to_string(), "c".to_string())).unwrap();
        assert_eq!(ac.operator_path, vec!["plus".to_string(), "times".to_string()]);

        let bc = features.iter().find(|f| f.variables == ("b".to_string(), "c".to_string())).unwrap();
        assert_eq!(bc.operator_path, vec!["times".to_string()]);
    }

    #[test]
    fn single_leaf_tree_has_no_features() {
        let root = OpNode::leaf("x");
        let tree = build_graph_tree(&root);
        assert!(extract_features(&tree).is_empty());
    }

    #[test]
    fn operator_path_length_matches_depth_invariant() {
        // plus(a, times(b, plus(c, d)))
        let root = OpNode::new(
            "plus",
            vec![
                OpNode::leaf("a"),
                OpNode::new(
                    "times",
                    vec![OpNode::leaf("b"), OpNode::new("plus", vec![OpNode::leaf("c"), OpNode::leaf("d")])],
                ),
            ],
        );
        let tree = build_graph_tree(&root);
        let features = extract_features(&tree);

        let depth = |mut id: usize| {
            let mut d = 0;
            while let Some(p) = tree.parent(id) {
                d += 1;
                id = p;
            }
            d
        };
        let leaves = tree.leaves();
        for i in 0..leaves.len() {
            for j in (i + 1)..leaves.len() {
                let (li, lj) = (leaves[i], leaves[j]);
                let feature = features
                    .iter()
                    .find(|f| f.variables == (tree.data(li).to_string(), tree.data(lj).to_string()))
                    .unwrap();

                // LCA depth: walk up from the deeper leaf to find the common ancestor's depth.
                let mut ancestors_i = vec![li];
                let mut cur = li;
                while let Some(p) = tree.parent(cur) {
                    ancestors_i.push(p);
                    cur = p;
                }
                let mut cur = lj;
                let lca_depth = loop {
                    if let Some(pos) = ancestors_i.iter().position(|&a| a == cur) {
                        break depth(ancestors_i[pos]);
                    }
                    cur = tree.parent(cur).unwrap();
                };
                let expected_len = depth(li) + depth(lj) - 2 * lca_depth - 2;
                assert_eq!(feature.operator_path.len(), expected_len.max(0) as usize);
            }
        }
    }
}
