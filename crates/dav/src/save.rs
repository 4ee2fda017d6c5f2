//! Optimistic-concurrency save
//!
//! WebDAV has no conditional write we can rely on, so a save approximates
//! compare-and-swap with plain verbs:
//!
//! 1. `HEAD` the target and compare its revision with the expected one
//! 2. `PUT` the body to a hidden temp file next to the target
//! 3. `HEAD` the temp file to make sure it landed
//! 4. `HEAD` the target again, in case another writer got in meanwhile
//! 5. `MOVE` the temp file over the target (`Overwrite: T`)
//! 6. `HEAD` the target for the revision the store assigned
//!
//! A writer that completes its own `MOVE` between steps 4 and 5 is not
//! detected. Closing that window needs server-side conditional writes.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::HeaderValue;
use tracing::{info, warn};

use kdbx_dav_protocol::{Method, Revision};

use crate::client::DavClient;
use crate::credentials::Credentials;
use crate::error::DavError;
use crate::request::{Op, RequestConfig, DESTINATION, OVERWRITE};
use crate::transport::Transport;

/// Last stamp handed out by [`next_stamp`]
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp, strictly increasing within the process
fn next_stamp() -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let prev = LAST_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(prev + 1)
}

/// Hidden sibling of `path` used while a save is in flight
///
/// `/dir/db.kdbx` with stamp 42 becomes `/dir/.db.kdbx.42`.
pub fn temp_path(path: &str, stamp: u64) -> String {
    let split = path.rfind('/').map_or(0, |i| i + 1);
    let (dir, name) = path.split_at(split);
    if name.is_empty() {
        format!("{path}.{stamp}")
    } else {
        format!("{dir}.{name}.{stamp}")
    }
}

/// `Ok` if `observed` satisfies `expected`
///
/// No expectation accepts anything, including a missing file.
fn check_revision(
    path: &str,
    expected: Option<&Revision>,
    observed: Option<&Revision>,
) -> Result<(), DavError> {
    match expected {
        Some(expected) if observed != Some(expected) => {
            warn!(
                path,
                expected = %expected,
                observed = observed.map(Revision::as_str),
                "save rejected: revision conflict"
            );
            Err(DavError::RevisionConflict {
                observed: observed.cloned(),
            })
        }
        _ => Ok(()),
    }
}

impl<T: Transport> DavClient<T> {
    /// Write `body` to `path` unless it changed since `expected`
    ///
    /// `expected == None` creates the file or overwrites it unconditionally.
    /// Returns the revision the store assigned to the new content.
    /// Without a base URL `path` must itself be absolute, since it becomes
    /// the `Destination` header.
    pub async fn save(
        &self,
        path: &str,
        credentials: Option<&Credentials>,
        body: impl Into<Bytes>,
        expected: Option<&Revision>,
    ) -> Result<Revision, DavError> {
        let body = body.into();
        let destination = self.resolve(path)?;
        if !destination.contains("://") {
            return Err(DavError::InvalidUrl(format!(
                "{path}: MOVE destination must be an absolute URL"
            )));
        }
        let destination = HeaderValue::from_str(&destination)
            .map_err(|_| DavError::InvalidUrl(destination.clone()))?;

        let observed = self
            .head_tolerating_missing(Op::SaveStat, path, credentials, expected)
            .await?;
        check_revision(path, expected, observed.as_ref())?;

        let temp = temp_path(path, next_stamp());
        self.request(
            RequestConfig::new(Op::SavePut, Method::Put, &temp)
                .credentials(credentials)
                .body(body)
                .nostat(),
        )
        .await?;

        if let Err(err) = self.head(Op::SaveVerify, &temp, credentials).await {
            self.discard(&temp, credentials).await;
            return Err(err);
        }

        let recheck = self
            .head_tolerating_missing(Op::SaveRecheck, path, credentials, expected)
            .await
            .and_then(|observed| check_revision(path, expected, observed.as_ref()));
        if let Err(err) = recheck {
            self.discard(&temp, credentials).await;
            return Err(err);
        }

        self.request(
            RequestConfig::new(Op::SaveMove, Method::Move, &temp)
                .credentials(credentials)
                .header(DESTINATION.clone(), destination)
                .header(OVERWRITE.clone(), HeaderValue::from_static("T"))
                .nostat(),
        )
        .await?;

        let revision = self.head(Op::SaveFinalStat, path, credentials).await?;
        info!(path, rev = %revision, "saved");
        Ok(revision)
    }

    /// `HEAD` that maps 404 to `None` when the caller expects nothing
    async fn head_tolerating_missing(
        &self,
        op: Op,
        path: &str,
        credentials: Option<&Credentials>,
        expected: Option<&Revision>,
    ) -> Result<Option<Revision>, DavError> {
        match self.head(op, path, credentials).await {
            Ok(revision) => Ok(Some(revision)),
            Err(DavError::NotFound) if expected.is_none() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Best-effort removal of an abandoned temp file. The outcome is logged
    /// and dropped so it never masks the error that caused it.
    async fn discard(&self, temp: &str, credentials: Option<&Credentials>) {
        let result = self
            .request_detached(
                RequestConfig::new(Op::SaveDelete, Method::Delete, temp)
                    .credentials(credentials)
                    .nostat(),
            )
            .await;
        if let Err(err) = result {
            warn!(path = temp, error = %err, "failed to remove temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_hides_final_segment() {
        assert_eq!(temp_path("/db.kdbx", 42), "/.db.kdbx.42");
        assert_eq!(temp_path("/dir/sub/db.kdbx", 7), "/dir/sub/.db.kdbx.7");
        assert_eq!(
            temp_path("https://dav.example.com/files/db.kdbx", 1_700_000_000_000),
            "https://dav.example.com/files/.db.kdbx.1700000000000"
        );
        assert_eq!(temp_path("db.kdbx", 1), ".db.kdbx.1");
    }

    #[test]
    fn temp_path_for_directory_only_appends_stamp() {
        assert_eq!(temp_path("/dir/", 5), "/dir/.5");
    }

    #[test]
    fn stamps_never_repeat() {
        let stamps: Vec<u64> = (0..1000).map(|_| next_stamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn missing_expectation_accepts_anything() {
        assert!(check_revision("/x", None, None).is_ok());
        assert!(check_revision("/x", None, Some(&Revision::from("R1"))).is_ok());
    }

    #[test]
    fn mismatch_reports_observed_revision() {
        let expected = Revision::from("R1");
        let observed = Revision::from("R2");
        assert_eq!(
            check_revision("/x", Some(&expected), Some(&observed)).unwrap_err(),
            DavError::RevisionConflict {
                observed: Some(observed)
            }
        );
        assert!(check_revision("/x", Some(&expected), Some(&expected)).is_ok());
    }
}
