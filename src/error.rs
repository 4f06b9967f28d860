use std::path::{Path, PathBuf};

use crate::pipeline::Mode;
use crate::resolver::{EntityKind, RawId};

/// Errors raised by the loading pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An input file does not have the shape its loader expects.
    #[error("Malformed source {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },

    /// A foreign key has no registered mapping.
    #[error("Unresolved {kind} reference: {raw_id}")]
    UnresolvedReference { kind: EntityKind, raw_id: RawId },

    /// A mode was requested before its prerequisite data exists.
    #[error("Mode '{mode}' requires '{missing}', which is neither scheduled nor loaded")]
    MissingDependency { mode: Mode, missing: Mode },

    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Circular mode dependency detected at: {0}")]
    CircularDependency(Mode),

    #[error("Invalid table schema: {0}")]
    Schema(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl PipelineError {
    pub fn malformed(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::MalformedSource {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn unresolved(kind: EntityKind, raw_id: impl Into<RawId>) -> Self {
        Self::UnresolvedReference {
            kind,
            raw_id: raw_id.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_names_kind_and_id() {
        let err = PipelineError::unresolved(EntityKind::Item, 42_i64);
        assert_eq!(err.to_string(), "Unresolved item reference: 42");
    }

    #[test]
    fn test_malformed_mentions_path() {
        let err = PipelineError::malformed("a/b.json", "expected an object");
        assert!(err.to_string().contains("a/b.json"));
        assert!(err.to_string().contains("expected an object"));
    }
}
