use std::time::Instant;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use kdbx_dav_protocol::{Method, Revision};

use crate::classify::{classify, Reply};
use crate::credentials::Credentials;
use crate::error::{DavError, TransportError};
use crate::request::{Op, RequestConfig};
use crate::transport::Transport;

/// Body and revision returned by a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub body: Bytes,
    pub revision: Revision,
}

/// WebDAV client for a single remote file
///
/// Every call runs its requests one at a time, in order. Cancelling the
/// attached token aborts whichever request is in flight; the call then fails
/// with [`DavError::Aborted`].
pub struct DavClient<T> {
    transport: T,
    /// Location relative paths are resolved against
    base_url: Option<Url>,
    cancel: CancellationToken,
}

impl<T: Transport> DavClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_url: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Resolve relative paths (and `Destination` headers) against `base`
    #[must_use]
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetch the body and its revision
    pub async fn load(
        &self,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Loaded, DavError> {
        let reply = self
            .request(RequestConfig::new(Op::Load, Method::Get, path).credentials(credentials))
            .await?;
        let revision = reply.revision.ok_or(DavError::MissingRevisionHeader)?;
        Ok(Loaded {
            body: reply.body,
            revision,
        })
    }

    /// Fetch only the current revision
    pub async fn stat(
        &self,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Revision, DavError> {
        self.head(Op::Stat, path, credentials).await
    }

    pub(crate) async fn head(
        &self,
        op: Op,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Revision, DavError> {
        let reply = self
            .request(RequestConfig::new(op, Method::Head, path).credentials(credentials))
            .await?;
        reply.revision.ok_or(DavError::MissingRevisionHeader)
    }

    /// Absolute form of `path`
    ///
    /// Paths containing `://` are used verbatim. Anything else is joined onto
    /// the base URL, or passed through unchanged when no base is set.
    pub fn resolve(&self, path: &str) -> Result<String, DavError> {
        if path.contains("://") {
            return Ok(path.to_string());
        }
        match &self.base_url {
            Some(base) => base
                .join(path)
                .map(String::from)
                .map_err(|e| DavError::InvalidUrl(format!("{path}: {e}"))),
            None => Ok(path.to_string()),
        }
    }

    /// Issue one request; aborts if the client's token is cancelled
    pub(crate) async fn request(&self, config: RequestConfig<'_>) -> Result<Reply, DavError> {
        self.issue(config, true).await
    }

    /// Issue one request that ignores cancellation
    pub(crate) async fn request_detached(
        &self,
        config: RequestConfig<'_>,
    ) -> Result<Reply, DavError> {
        self.issue(config, false).await
    }

    async fn issue(&self, config: RequestConfig<'_>, cancellable: bool) -> Result<Reply, DavError> {
        let url = self.resolve(config.path)?;
        let request = config.to_request(url);
        debug!(op = %config.op, path = config.path, method = %config.method, "request");

        let started = Instant::now();
        let outcome = if cancellable {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => Err(TransportError::Aborted),
                outcome = self.transport.issue(request) => outcome,
            }
        } else {
            self.transport.issue(request).await
        };
        classify(config.op, config.path, outcome, config.nostat, started)
    }
}
