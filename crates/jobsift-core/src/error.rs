//! Error types for the pipeline engine.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing one of the pipeline's files. Always fatal for
/// the run.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The input file has no header row.
    #[error("{}: input has no header row", path.display())]
    MissingHeader { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>) -> impl FnOnce(csv::Error) -> Self {
        let path = path.into();
        move |source| Self::Csv { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| Self::Json { path, source }
    }

    /// Path of the file that failed.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. }
            | Self::Csv { path, .. }
            | Self::MissingHeader { path }
            | Self::Json { path, .. } => path,
        }
    }
}

/// Classification of one record failed.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("classification failed after {candidates} prompt candidate(s): {last_error}")]
    Exhausted {
        /// Number of candidates tried.
        candidates: usize,
        /// Raw text of the last reply received, if any call succeeded at the
        /// transport level.
        last_reply: Option<String>,
        /// Why the last call or reply was rejected.
        last_error: String,
    },
}

impl ClassifyError {
    pub fn last_reply(&self) -> Option<&str> {
        match self {
            Self::Exhausted { last_reply, .. } => last_reply.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_names_path() {
        let err = StoreError::io("/tmp/queue.csv")(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(err.to_string().starts_with("/tmp/queue.csv: "));
        assert_eq!(err.path(), std::path::Path::new("/tmp/queue.csv"));
    }

    #[test]
    fn missing_header_message() {
        let err = StoreError::MissingHeader {
            path: "in.csv".into(),
        };
        assert_eq!(err.to_string(), "in.csv: input has no header row");
    }

    #[test]
    fn exhausted_carries_last_reply() {
        let err = ClassifyError::Exhausted {
            candidates: 2,
            last_reply: Some("not json".into()),
            last_error: "reply is not a JSON object".into(),
        };
        assert_eq!(err.last_reply(), Some("not json"));
        assert!(err.to_string().contains("2 prompt candidate(s)"));
    }
}
