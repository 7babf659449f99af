use thiserror::Error;

use crate::document::error::LookupError;

/// Errors that stop progress reporting for the run.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A case referenced a document that was never read.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A step that is neither a feature-file step nor a known hook.
    #[error("unclassified step kind '{kind}' on line {line} (expected a step or a before/after hook)")]
    UnclassifiedStep { line: usize, kind: String },

    /// An event log line could not be decoded.
    #[error("malformed event record on line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// An earlier event failed; nothing more is reported for this run.
    #[error("reporting was aborted by an earlier error")]
    Aborted,

    #[error("failed to write progress output: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_is_transparent() {
        let err: ReportError = LookupError::DocumentNotRead {
            uri: "file:///a.feature".into(),
        }
        .into();
        assert_eq!(err.to_string(), "no document was read for file:///a.feature");
    }

    #[test]
    fn unclassified_step_names_the_kind() {
        let err = ReportError::UnclassifiedStep {
            line: 12,
            kind: "hook around".into(),
        };
        assert!(err.to_string().contains("'hook around' on line 12"));
    }

    #[test]
    fn malformed_record_names_the_line() {
        let err = ReportError::MalformedRecord {
            line: 7,
            message: "missing field `uri`".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed event record on line 7: missing field `uri`"
        );
    }
}
