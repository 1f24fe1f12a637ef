//! Equation identity: a content hash of the MathML source, not the mutable
//! tuple identity the rest of the pipeline might otherwise be tempted to use
//! (two equations with identical MathML are the same equation regardless of
//! which document or position they were found at).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn equation_id(mathml: &str) -> String {
    let mut hasher = DefaultHasher::new();
    mathml.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
