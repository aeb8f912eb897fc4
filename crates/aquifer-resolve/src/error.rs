use std::fmt::Display;

use aquifer_core::{LexiconError, QueryRejected};
use thiserror::Error;
use tracing::error;

/// Errors surfaced to callers of the resolver.
///
/// Store faults never carry their details out; they are logged and reported
/// as [`ResolveError::Internal`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("question is empty")]
    Input,

    #[error(transparent)]
    QueryRejected(#[from] QueryRejected),

    #[error("lexicon error: {0}")]
    Lexicon(#[from] LexiconError),

    #[error("{0}")]
    Internal(String),
}

/// Log `err` and return a generic [`ResolveError::Internal`].
pub(crate) fn internal(context: &'static str, err: impl Display) -> ResolveError {
    error!(error = %err, context, "internal failure");
    ResolveError::Internal(format!("{context}; see logs for details"))
}
