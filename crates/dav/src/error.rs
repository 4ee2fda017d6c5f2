use kdbx_dav_protocol::Revision;

/// Failure below HTTP: the request never produced a status line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request aborted")]
    Aborted,
}

/// Every way a load, stat or save can fail
///
/// `RevisionConflict` is the only variant a caller should answer with a
/// reload-and-merge; everything else is a plain error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DavError {
    #[error("not found")]
    NotFound,

    /// The remote object changed since the caller last saw it. `observed` is
    /// the revision found on the server, when the failing step returned one.
    #[error("revision conflict{}", conflict_suffix(.observed.as_ref()))]
    RevisionConflict { observed: Option<Revision> },

    #[error("no Last-Modified header in response")]
    MissingRevisionHeader,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("request aborted")]
    Aborted,

    /// A path could not be turned into a request URL. Raised before any
    /// request is sent.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

fn conflict_suffix(observed: Option<&Revision>) -> String {
    observed.map_or_else(String::new, |rev| format!(" (remote is at {rev})"))
}

impl DavError {
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::RevisionConflict { .. })
    }
}

impl From<TransportError> for DavError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(msg) => Self::Network(msg),
            TransportError::Aborted => Self::Aborted,
        }
    }
}

/// Terminal state of a save, for callers that want a value instead of a `Result`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { revision: Revision },
    RevisionConflict { observed: Option<Revision> },
    Failed(DavError),
}

impl From<Result<Revision, DavError>> for SaveOutcome {
    fn from(result: Result<Revision, DavError>) -> Self {
        match result {
            Ok(revision) => Self::Saved { revision },
            Err(DavError::RevisionConflict { observed }) => Self::RevisionConflict { observed },
            Err(err) => Self::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_remote_revision() {
        let err = DavError::RevisionConflict {
            observed: Some(Revision::from("R2")),
        };
        assert_eq!(err.to_string(), "revision conflict (remote is at R2)");

        let err = DavError::RevisionConflict { observed: None };
        assert_eq!(err.to_string(), "revision conflict");
    }

    #[test]
    fn only_conflicts_are_conflicts() {
        assert!(DavError::RevisionConflict { observed: None }.is_conflict());
        for err in [
            DavError::NotFound,
            DavError::MissingRevisionHeader,
            DavError::HttpStatus(500),
            DavError::Network("reset".into()),
            DavError::Aborted,
        ] {
            assert!(!err.is_conflict(), "{err} must not read as a conflict");
        }
    }

    #[test]
    fn transport_errors_keep_their_kind() {
        assert_eq!(
            DavError::from(TransportError::Network("refused".into())),
            DavError::Network("refused".into())
        );
        assert_eq!(DavError::from(TransportError::Aborted), DavError::Aborted);
    }

    #[test]
    fn outcome_splits_conflicts_from_failures() {
        let saved = SaveOutcome::from(Ok(Revision::from("R2")));
        assert_eq!(
            saved,
            SaveOutcome::Saved {
                revision: Revision::from("R2")
            }
        );

        let conflict = SaveOutcome::from(Err(DavError::RevisionConflict {
            observed: Some(Revision::from("R3")),
        }));
        assert!(matches!(conflict, SaveOutcome::RevisionConflict { observed: Some(_) }));

        let failed = SaveOutcome::from(Err(DavError::HttpStatus(507)));
        assert_eq!(failed, SaveOutcome::Failed(DavError::HttpStatus(507)));
    }
}
