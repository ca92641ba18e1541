//! Error types for condense-orchestrator

use thiserror::Error;

/// Result type alias using condense-orchestrator Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during compaction
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the backend or message conversion layer
    #[error(transparent)]
    Types(#[from] condense_types::Error),

    /// A compaction is already running for this session
    #[error("A compaction is already in progress")]
    AlreadyCompacting,

    /// The context manager was requested outside a provider scope
    #[error("The context manager must be used within a context provider")]
    MissingProvider,
}
