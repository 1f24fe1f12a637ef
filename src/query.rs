//! The three retrieval modes over an indexed corpus (§4.Q): exact feature
//! match, subsequence match, and blended ranking.

use thiserror::Error;

use crate::graph::{feature_id, split_feature_id, GraphStore, StoreError};
use crate::subseq::is_subsequence;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryInputError {
    #[error("feature list must not be empty")]
    EmptyFeatureList,
    #[error("operator sequence must not be empty")]
    EmptySequence,
}

/// Combines input validation with store-layer failures, since every query
/// here does both a precondition check and a store read.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Input(#[from] QueryInputError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn validate_feature_list(feature_ids: &[String]) -> Result<(), QueryInputError> {
    if feature_ids.is_empty() {
        Err(QueryInputError::EmptyFeatureList)
    } else {
        Ok(())
    }
}

fn validate_sequence(labels: &[String]) -> Result<(), QueryInputError> {
    if labels.is_empty() {
        Err(QueryInputError::EmptySequence)
    } else {
        Ok(())
    }
}

/// Q1: equations carrying every one of `feature_ids` as an exact operator
/// path (not merely a subsequence of one).
pub fn exact_match<S: GraphStore>(store: &S, feature_ids: &[String]) -> Result<Vec<String>, QueryError> {
    validate_feature_list(feature_ids)?;
    Ok(store.equations_with_all_features(feature_ids)?)
}

/// Q2: equations that have at least one stored operator path containing
/// `labels` as a subsequence, alongside the paths that match.
pub fn subsequence_match<S: GraphStore>(
    store: &S,
    labels: &[String],
) -> Result<Vec<(String, Vec<Vec<String>>)>, QueryError> {
    validate_sequence(labels)?;

    let mut results = Vec::new();
    for equation_id in store.all_equations()? {
        let paths = store.equation_features(&equation_id)?;
        let matching: Vec<Vec<String>> = paths.into_iter().filter(|path| is_subsequence(labels, path)).collect();
        if !matching.is_empty() {
            results.push((equation_id, matching));
        }
    }
    Ok(results)
}

/// Q3: every equation scored against `feature_ids` and sorted descending.
/// `score = 0.5 * (exact / denom) + 0.5 * (subseq / denom)`, where `exact`
/// counts how many of the queried features (`f_1..f_k`) are a direct
/// feature of `e`, `subseq` counts how many are a subsequence of some
/// feature of `e`, and `denom = max(total_features(e, F), k)` where
/// `total_features(e, F)` is the number of `e`'s stored features that the
/// query actually touched (exactly or as a subsequence) — not `e`'s whole
/// stored feature count, which would let an equation's unrelated features
/// dilute a perfect match (see S7).
pub fn ranked_results<S: GraphStore>(
    store: &S,
    feature_ids: &[String],
) -> Result<Vec<(f64, String)>, QueryError> {
    validate_feature_list(feature_ids)?;
    let wanted: Vec<Vec<String>> = feature_ids.iter().map(|id| split_feature_id(id)).collect();

    let mut scored = Vec::new();
    for equation_id in store.all_equations()? {
        let paths = store.equation_features(&equation_id)?;
        if paths.is_empty() {
            continue;
        }

        let exact = wanted.iter().filter(|w| paths.iter().any(|p| p == *w)).count();
        let subseq = wanted.iter().filter(|w| paths.iter().any(|p| is_subsequence(w, p))).count();

        let matched_features: std::collections::HashSet<&Vec<String>> = paths
            .iter()
            .filter(|p| wanted.iter().any(|w| *p == w || is_subsequence(w, p)))
            .collect();

        let denom = matched_features.len().max(feature_ids.len()) as f64;
        let score = 0.5 * (exact as f64 / denom) + 0.5 * (subseq as f64 / denom);
        scored.push((score, equation_id));
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.1.cmp(&b.1)));
    Ok(scored)
}

/// Computes the feature id for a single operator path, for callers that
/// have a path rather than the already-joined id string.
pub fn operator_path_id(path: &[String]) -> String {
    feature_id(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::InMemoryGraphStore;

    fn seeded_store() -> InMemoryGraphStore {
        let mut store = InMemoryGraphStore::new();
        store.merge_doc("doc").unwrap();

        store.merge_equation("eq1", "x+y").unwrap();
        store.merge_eqn_in("eq1", "doc").unwrap();
        let f1 = feature_id(&["plus".to_string()]);
        let f2 = feature_id(&["plus".to_string(), "times".to_string()]);
        store.merge_feature(&f1).unwrap();
        store.merge_feature(&f2).unwrap();
        store.merge_has_ftr("eq1", &f1).unwrap();
        store.merge_has_ftr("eq1", &f2).unwrap();

        store.merge_equation("eq2", "z").unwrap();
        store.merge_eqn_in("eq2", "doc").unwrap();
        let f3 = feature_id(&["minus".to_string()]);
        store.merge_feature(&f3).unwrap();
        store.merge_has_ftr("eq2", &f3).unwrap();

        store
    }

    #[test]
    fn exact_match_requires_full_feature_list_presence() {
        let store = seeded_store();
        let f1 = feature_id(&["plus".to_string()]);
        let result = exact_match(&store, &[f1]).unwrap();
        assert_eq!(result, vec!["eq1".to_string()]);
    }

    #[test]
    fn exact_match_rejects_empty_input() {
        let store = seeded_store();
        let err = exact_match(&store, &[]).unwrap_err();
        assert!(matches!(err, QueryError::Input(QueryInputError::EmptyFeatureList)));
    }

    #[test]
    fn subsequence_match_finds_partial_paths() {
        let store = seeded_store();
        let result = subsequence_match(&store, &["plus".to_string()]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "eq1");
    }

    #[test]
    fn ranked_results_sorts_descending_by_score() {
        let store = seeded_store();
        let f1 = feature_id(&["plus".to_string()]);
        let ranked = ranked_results(&store, &[f1]).unwrap();
        assert_eq!(ranked.first().unwrap().1, "eq1");
        for pair in ranked.windows(2) {
            assert!(pair[0].0 >= pair[1].0);
        }
    }

    #[test]
    fn ranked_results_matches_worked_example_scores() {
        let mut store = InMemoryGraphStore::new();
        store.merge_doc("doc").unwrap();

        store.merge_equation("e1", "<e1/>").unwrap();
        store.merge_eqn_in("e1", "doc").unwrap();
        let long = feature_id(&["times".to_string(), "plus".to_string(), "times".to_string()]);
        let short = feature_id(&["plus".to_string()]);
        store.merge_feature(&long).unwrap();
        store.merge_feature(&short).unwrap();
        store.merge_has_ftr("e1", &long).unwrap();
        store.merge_has_ftr("e1", &short).unwrap();

        store.merge_equation("e2", "<e2/>").unwrap();
        store.merge_eqn_in("e2", "doc").unwrap();
        store.merge_has_ftr("e2", &short).unwrap();

        let ranked = ranked_results(&store, &[long]).unwrap();
        let scores: std::collections::HashMap<String, f64> = ranked.into_iter().map(|(s, e)| (e, s)).collect();
        assert_eq!(scores["e1"], 1.0);
        assert_eq!(scores["e2"], 0.0);
    }
}
