use bytes::Bytes;
use http::header::{HeaderName, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};

use kdbx_dav_protocol::Method;

use crate::credentials::Credentials;
use crate::transport::DavRequest;

/// WebDAV `Destination` header (RFC 4918 §10.3)
pub static DESTINATION: HeaderName = HeaderName::from_static("destination");
/// WebDAV `Overwrite` header (RFC 4918 §10.6)
pub static OVERWRITE: HeaderName = HeaderName::from_static("overwrite");

/// Named step a request belongs to, used in log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Load,
    Stat,
    SaveStat,
    SavePut,
    SaveVerify,
    SaveRecheck,
    SaveMove,
    SaveFinalStat,
    SaveDelete,
}

impl Op {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Load => "Load",
            Self::Stat => "Stat",
            Self::SaveStat => "Save:stat",
            Self::SavePut => "Save:put",
            Self::SaveVerify => "Save:verify",
            Self::SaveRecheck => "Save:recheck",
            Self::SaveMove => "Save:move",
            Self::SaveFinalStat => "Save:final-stat",
            Self::SaveDelete => "Save:delete",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to issue and classify one request
#[derive(Debug, Clone)]
pub struct RequestConfig<'a> {
    pub op: Op,
    pub method: Method,
    pub path: &'a str,
    pub credentials: Option<&'a Credentials>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// A response without `Last-Modified` is acceptable
    pub nostat: bool,
}

impl<'a> RequestConfig<'a> {
    pub fn new(op: Op, method: Method, path: &'a str) -> Self {
        Self {
            op,
            method,
            path,
            credentials: None,
            headers: HeaderMap::new(),
            body: None,
            nostat: false,
        }
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Option<&'a Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn nostat(mut self) -> Self {
        self.nostat = true;
        self
    }

    /// Build the wire request for `url`
    pub fn to_request(&self, url: String) -> DavRequest {
        let mut headers = HeaderMap::new();
        if let Some(auth) = self.credentials.and_then(Credentials::authorization) {
            headers.insert(AUTHORIZATION, auth);
        }
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        if self.method.is_read() {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }
        if self.body.is_some() {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
        }
        DavRequest {
            method: self.method,
            url,
            headers,
            body: self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bypass_cache() {
        let request =
            RequestConfig::new(Op::Stat, Method::Head, "/db.kdbx").to_request("/db.kdbx".into());
        assert_eq!(request.headers.get(CACHE_CONTROL).unwrap(), "no-cache");
        assert!(request.headers.get(AUTHORIZATION).is_none());

        let request =
            RequestConfig::new(Op::SaveDelete, Method::Delete, "/x").to_request("/x".into());
        assert!(request.headers.get(CACHE_CONTROL).is_none());
    }

    #[test]
    fn body_is_sent_as_octet_stream() {
        let request = RequestConfig::new(Op::SavePut, Method::Put, "/x")
            .body(Bytes::from_static(b"kdbx"))
            .nostat()
            .to_request("/x".into());
        assert_eq!(
            request.headers.get(CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
        assert_eq!(request.body.as_deref(), Some(&b"kdbx"[..]));
    }

    #[test]
    fn credentials_add_basic_auth() {
        let creds = Credentials::new("alice", "s3cret");
        let request = RequestConfig::new(Op::Load, Method::Get, "/db.kdbx")
            .credentials(Some(&creds))
            .to_request("/db.kdbx".into());
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap(),
            "Basic YWxpY2U6czNjcmV0"
        );
    }

    #[test]
    fn extra_headers_are_forwarded() {
        let request = RequestConfig::new(Op::SaveMove, Method::Move, "/.db.kdbx.1")
            .header(
                DESTINATION.clone(),
                HeaderValue::from_static("https://dav.example.com/db.kdbx"),
            )
            .header(OVERWRITE.clone(), HeaderValue::from_static("T"))
            .to_request("/.db.kdbx.1".into());
        assert_eq!(
            request.headers.get(&DESTINATION).unwrap(),
            "https://dav.example.com/db.kdbx"
        );
        assert_eq!(request.headers.get(&OVERWRITE).unwrap(), "T");
    }

    #[test]
    fn op_names_are_stable() {
        assert_eq!(Op::SaveStat.to_string(), "Save:stat");
        assert_eq!(Op::Load.to_string(), "Load");
    }
}
