use async_trait::async_trait;
use bytes::Bytes;
use http::header::LAST_MODIFIED;
use http::HeaderMap;

use kdbx_dav_protocol::Method;

use crate::error::TransportError;

/// One HTTP request, fully prepared
///
/// Headers are final: authorization, cache bypass and content type have
/// already been added by the client.
#[derive(Debug, Clone)]
pub struct DavRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Status, headers and body of a completed request
#[derive(Debug, Clone)]
pub struct DavResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl DavResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// `Last-Modified` value, if present and readable
    pub fn last_modified(&self) -> Option<&str> {
        self.headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

/// Transport trait - every request to the store goes through this
///
/// Implementations issue exactly one request per call and never retry. A
/// non-2xx status is a successful transport call; only failures that produce
/// no status at all are `TransportError`s.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue(&self, request: DavRequest) -> Result<DavResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn last_modified_is_read_from_headers() {
        let mut response = DavResponse::new(200);
        assert_eq!(response.last_modified(), None);

        response.headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Tue, 14 Nov 2023 22:13:20 GMT"),
        );
        assert_eq!(
            response.last_modified(),
            Some("Tue, 14 Nov 2023 22:13:20 GMT")
        );
    }

    #[test]
    fn empty_last_modified_counts_as_missing() {
        let mut response = DavResponse::new(200);
        response
            .headers
            .insert(LAST_MODIFIED, HeaderValue::from_static(""));
        assert_eq!(response.last_modified(), None);
    }
}
