//! The crate-wide error type (§4.E): every fallible boundary funnels into
//! this enum so the CLI has one place to render failures.

use thiserror::Error;

use crate::extractor::ExtractError;
use crate::graph::StoreError;
use crate::query::QueryError;
use crate::tree::NormalizeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
