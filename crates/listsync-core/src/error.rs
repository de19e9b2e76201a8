//! Error types for listsync core
//!
//! Provides error handling for:
//! - Scope lookup and lifecycle failures
//! - Desynchronized diff streams
//! - Configuration loading

use crate::scope::ScopeId;
use listsync_diff::ReconcileError;
use std::path::PathBuf;

/// Main sync error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No scope registered under this id
    #[error("unknown scope: {0}")]
    UnknownScope(ScopeId),

    /// Scope writer has stopped
    #[error("scope closed: {0}")]
    ScopeClosed(ScopeId),

    /// A scope with this id is already open
    #[error("scope already open: {0}")]
    DuplicateScope(ScopeId),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Batch could not be reconciled
    #[error("reconcile failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl SyncError {
    /// Check if the error only concerns a single scope
    ///
    /// Scope-local errors never affect other scopes of the same session.
    #[inline]
    #[must_use]
    pub fn is_scope_local(&self) -> bool {
        matches!(
            self,
            Self::UnknownScope(_) | Self::ScopeClosed(_) | Self::Reconcile(_)
        )
    }

    /// Check if the error reports a desynchronized replica
    #[inline]
    #[must_use]
    pub fn is_desynchronized(&self) -> bool {
        matches!(self, Self::Reconcile(ReconcileError::Desynchronized { .. }))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds unusable values
    #[error("invalid config: {0}")]
    Invalid(String),
}
