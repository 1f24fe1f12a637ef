//! Renames variable leaves to canonical sequential names (`a`, `b`, `c`, ...)
//! while preserving the tree's topology exactly (§4.S).

use std::collections::HashMap;

use crate::graph::GraphTree;

/// Codepoints excluded from variable status even though they're single
/// alphabetic characters (currently just lowercase pi).
const COMMON_CONSTANTS: &[char] = &['\u{03C0}'];

/// A leaf value is a variable iff it is exactly one alphabetic character and
/// not a common constant.
pub fn is_variable(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(c) = chars.next() else { return false };
    if chars.next().is_some() {
        return false;
    }
    c.is_alphabetic() && !COMMON_CONSTANTS.contains(&c)
}

/// Returns a copy of `tree` with every variable leaf renamed to the next
/// unused letter in `a, b, c, ...` order, first occurrence wins, repeats
/// reuse the earlier substitution. Non-variable leaves and all internal
/// nodes are untouched; node ids, children, and parent links are identical
/// to the input.
pub fn standardize(tree: &GraphTree) -> GraphTree {
    let mut standardized = tree.clone();
    let mut substitutions: HashMap<String, String> = HashMap::new();
    let mut next = b'a';

    for id in 0..tree.len() {
        if !tree.is_leaf(id) {
            continue;
        }
        let name = tree.data(id).to_owned();
        if !is_variable(&name) {
            continue;
        }
        let replacement = substitutions.entry(name).or_insert_with(|| {
            let letter = (next as char).to_string();
            next += 1;
            letter
        });
        standardized.set_data(id, replacement.clone());
    }
    standardized
}
