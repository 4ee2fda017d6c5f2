//! Request classifier
//!
//! Turns a raw transport outcome into either a `Reply` or exactly one
//! `DavError`. No retries and no side effects other than log lines.

use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use kdbx_dav_protocol::Revision;

use crate::error::{DavError, TransportError};
use crate::request::Op;
use crate::transport::DavResponse;

/// Statuses treated as success
const OK_STATUSES: [u16; 3] = [200, 201, 204];

/// A successful, classified response
#[derive(Debug, Clone)]
pub struct Reply {
    /// Always `Some` unless the request was issued with `nostat`
    pub revision: Option<Revision>,
    pub body: Bytes,
}

pub fn classify(
    op: Op,
    path: &str,
    outcome: Result<DavResponse, TransportError>,
    nostat: bool,
    started: Instant,
) -> Result<Reply, DavError> {
    let elapsed_ms = elapsed_ms(started);

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            debug!(op = %op, path, elapsed_ms, error = %err, "request failed");
            return Err(err.into());
        }
    };

    if !OK_STATUSES.contains(&response.status) {
        debug!(op = %op, path, status = response.status, elapsed_ms, "request failed");
        return Err(match response.status {
            404 => DavError::NotFound,
            412 => DavError::RevisionConflict { observed: None },
            status => DavError::HttpStatus(status),
        });
    }

    let revision = response.last_modified().map(Revision::from);
    if revision.is_none() && !nostat {
        debug!(op = %op, path, elapsed_ms, "request failed: no Last-Modified header");
        return Err(DavError::MissingRevisionHeader);
    }

    debug!(
        op = %op,
        path,
        rev = revision.as_ref().map(Revision::as_str),
        elapsed_ms,
        "request completed"
    );
    Ok(Reply {
        revision,
        body: response.body,
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
