//! Bundles the tunables of the normalization and path-finding stages into a
//! single value the CLI and the indexer both thread through (§4.C).

use crate::pathfind::PathFinderOptions;
use crate::tree::NormalizeOptions;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub normalize: NormalizeOptions,
    pub pathfind: PathFinderOptions,
}
