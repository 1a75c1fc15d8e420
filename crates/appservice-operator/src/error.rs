use thiserror::Error;

/// Failure reported by the cluster store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} conflict: {reason}")]
    Conflict {
        kind: String,
        key: String,
        reason: String,
    },
    #[error("{kind} {key} rejected: {reason}")]
    Invalid {
        kind: String,
        key: String,
        reason: String,
    },
    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: String },
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl StoreError {
    pub fn remote<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Remote(err.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{key} has malformed baseline annotation: {source}")]
    MalformedBaseline {
        key: String,
        source: serde_json::Error,
    },
    #[error("unable to encode spec of {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("reconcile of {0} cancelled")]
    Cancelled(String),
}
