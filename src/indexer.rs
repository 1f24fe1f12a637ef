//! Drives a directory of HTML documents through extraction, normalization,
//! feature extraction, and storage (§4.I).

use std::fs;
use std::path::Path;

use log::warn;

use crate::error::EngineError;
use crate::extractor::extract_block_equations_from_file;
use crate::feature::extract_features;
use crate::graph::{build_graph_tree, feature_id, GraphStore};
use crate::identity::equation_id;
use crate::standardize::standardize;
use crate::tree::normalize;
use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub equations: usize,
    pub skipped: usize,
}

/// Ingests every `.html`/`.htm` file directly under `corpus_dir` (not
/// recursive) into `store`. A malformed equation is logged and skipped
/// without aborting the document or the corpus; a document that can't be
/// read at all is a hard error.
pub fn ingest_corpus<S: GraphStore>(
    store: &mut S,
    corpus_dir: &Path,
    config: &EngineConfig,
) -> Result<IngestReport, EngineError> {
    let mut report = IngestReport::default();

    for entry in fs::read_dir(corpus_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
            .unwrap_or(false);
        if !is_html {
            continue;
        }

        let doc_id = path.display().to_string();
        let equations = extract_block_equations_from_file(&path)?;
        store.merge_doc(&doc_id)?;
        report.documents += 1;

        for block_eq in &equations {
            match normalize(&block_eq.mathml, &config.normalize) {
                Ok(op_tree) => {
                    let eq_id = equation_id(&block_eq.mathml);
                    let tree = standardize(&build_graph_tree(&op_tree));

                    store.merge_equation(&eq_id, &block_eq.alttext)?;
                    store.merge_eqn_in(&eq_id, &doc_id)?;

                    for feature in extract_features(&tree) {
                        let fid = feature_id(&feature.operator_path);
                        store.merge_feature(&fid)?;
                        store.merge_has_ftr(&eq_id, &fid)?;
                    }
                    report.equations += 1;
                }
                Err(err) => {
                    warn!("skipping malformed equation in {doc_id}: {err}");
                    report.skipped += 1;
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::InMemoryGraphStore;
    use std::io::Write;

    #[test]
    fn ingests_valid_equations_and_skips_malformed_ones() {
        let dir = tempdir();
        let good = r#"<html><body><math display="block"><apply><plus/><ci>x</ci><ci>y</ci></apply></math></body></html>"#;
        let bad = r#"<html><body><math display="block"><semantics><mi>x</mi></semantics></math></body></html>"#;
        write_file(&dir, "good.html", good);
        write_file(&dir, "bad.html", bad);

        let mut store = InMemoryGraphStore::new();
        let report = ingest_corpus(&mut store, &dir, &EngineConfig::default()).unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.equations, 1);
        assert_eq!(report.skipped, 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempdir() -> std::path::PathBuf {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!("mathml_search_engine_test_{nanos}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }
}
