//! In-memory WebDAV store for testing
//!
//! Speaks just enough WebDAV for the client: GET, HEAD, PUT, MOVE and DELETE
//! with `Last-Modified` revisions. Every write gets a fresh revision. Requests
//! are logged, and tests can inject faults or run a hook before a given
//! request to play the part of a second client. With
//! [`MemoryDav::yield_before_requests`] every request first gives up the
//! executor, so concurrent clients interleave request by request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::LAST_MODIFIED;
use http::{HeaderMap, HeaderValue};
use url::Url;

use kdbx_dav_protocol::{Method, Revision};

use crate::error::TransportError;
use crate::request::{DESTINATION, OVERWRITE};
use crate::transport::{DavRequest, DavResponse, Transport};

/// First revision timestamp handed out (2023-11-14T22:13:20Z)
const EPOCH_SECS: i64 = 1_700_000_000;

/// Injected failure for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Answer with this status and no side effects
    Status(u16),
    /// Fail below HTTP
    Network,
    /// Report the request as aborted
    Aborted,
    /// Never answer; only cancellation ends the request
    Hang,
}

/// A request as the store saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Store key the URL mapped to
    pub path: String,
    pub headers: HeaderMap,
}

type Hook = Box<dyn FnOnce(&MemoryDav) + Send>;

#[derive(Clone)]
struct Entry {
    body: Bytes,
    revision: Revision,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    clock: i64,
    omit_revision: bool,
    log: Vec<RecordedRequest>,
    faults: HashMap<usize, Fault>,
    hooks: HashMap<usize, Hook>,
    /// Requests seen so far, including faulted ones
    seen: usize,
    yielding: bool,
}

impl State {
    fn next_revision(&mut self) -> Revision {
        self.clock += 1;
        let secs = EPOCH_SECS + self.clock;
        chrono::DateTime::from_timestamp(secs, 0).map_or_else(
            || Revision::new(secs.to_string()),
            |t| Revision::new(t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
        )
    }

    fn write(&mut self, path: String, body: Bytes) -> Revision {
        let revision = self.next_revision();
        self.entries.insert(
            path,
            Entry {
                body,
                revision: revision.clone(),
            },
        );
        revision
    }
}

/// In-memory WebDAV store
///
/// Clones share the same store, so a test can keep one handle for assertions
/// while the client owns another.
#[derive(Clone, Default)]
pub struct MemoryDav {
    state: Arc<Mutex<State>>,
}

impl MemoryDav {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial file contents
    pub fn with_files<'a, B: AsRef<[u8]>>(
        files: impl IntoIterator<Item = (&'a str, B)>,
    ) -> Self {
        let dav = Self::new();
        for (path, body) in files {
            dav.put(path, Bytes::copy_from_slice(body.as_ref()));
        }
        dav
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write directly, bypassing the request log. Stands in for another
    /// client's completed save.
    pub fn put(&self, path: &str, body: impl Into<Bytes>) -> Revision {
        self.lock().write(key(path), body.into())
    }

    /// Delete directly, bypassing the request log; `false` if absent
    pub fn remove(&self, path: &str) -> bool {
        self.lock().entries.remove(&key(path)).is_some()
    }

    pub fn get(&self, path: &str) -> Option<(Bytes, Revision)> {
        self.lock()
            .entries
            .get(&key(path))
            .map(|e| (e.body.clone(), e.revision.clone()))
    }

    pub fn revision(&self, path: &str) -> Option<Revision> {
        self.get(path).map(|(_, revision)| revision)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().entries.contains_key(&key(path))
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.lock().entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Leave `Last-Modified` out of every response
    pub fn omit_revision_header(&self, omit: bool) {
        self.lock().omit_revision = omit;
    }

    /// Fail the `index`-th request (0-based, counted from creation)
    pub fn fail_nth(&self, index: usize, fault: Fault) {
        self.lock().faults.insert(index, fault);
    }

    /// Run `hook` just before the `index`-th request is handled
    pub fn before_nth(&self, index: usize, hook: impl FnOnce(&Self) + Send + 'static) {
        self.lock().hooks.insert(index, Box::new(hook));
    }

    /// Yield to the executor once before handling each request
    pub fn yield_before_requests(&self, on: bool) {
        self.lock().yielding = on;
    }

    /// Requests handled so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().log.clone()
    }

    /// Methods of the requests handled so far, in order
    pub fn methods(&self) -> Vec<Method> {
        self.lock().log.iter().map(|r| r.method).collect()
    }

    fn handle(&self, request: &DavRequest, path: String) -> DavResponse {
        let mut state = self.lock();
        let omit_revision = state.omit_revision;
        let with_revision = |mut response: DavResponse, revision: &Revision| {
            if !omit_revision {
                if let Ok(value) = HeaderValue::from_str(revision.as_str()) {
                    response.headers.insert(LAST_MODIFIED, value);
                }
            }
            response
        };

        match request.method {
            Method::Get | Method::Head => match state.entries.get(&path) {
                Some(entry) => {
                    let mut response = DavResponse::new(200);
                    if request.method == Method::Get {
                        response.body = entry.body.clone();
                    }
                    with_revision(response, &entry.revision)
                }
                None => DavResponse::new(404),
            },
            Method::Put => {
                let existed = state.entries.contains_key(&path);
                state.write(path, request.body.clone().unwrap_or_default());
                DavResponse::new(if existed { 204 } else { 201 })
            }
            Method::Delete => match state.entries.remove(&path) {
                Some(_) => DavResponse::new(204),
                None => DavResponse::new(404),
            },
            Method::Move => {
                let Some(destination) = request
                    .headers
                    .get(&DESTINATION)
                    .and_then(|v| v.to_str().ok())
                    .map(key)
                else {
                    return DavResponse::new(400);
                };
                let overwrite = request
                    .headers
                    .get(&OVERWRITE)
                    .map_or(true, |v| v.as_bytes().eq_ignore_ascii_case(b"T"));
                let existed = state.entries.contains_key(&destination);
                if existed && !overwrite {
                    return DavResponse::new(412);
                }
                match state.entries.remove(&path) {
                    Some(entry) => {
                        state.entries.insert(destination, entry);
                        DavResponse::new(if existed { 204 } else { 201 })
                    }
                    None => DavResponse::new(404),
                }
            }
        }
    }
}

/// Store key for a URL or path: the URL path, always with a leading `/`
fn key(url: &str) -> String {
    if url.contains("://") {
        if let Ok(parsed) = Url::parse(url) {
            return parsed.path().to_string();
        }
    }
    if url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{url}")
    }
}

#[async_trait]
impl Transport for MemoryDav {
    async fn issue(&self, request: DavRequest) -> Result<DavResponse, TransportError> {
        let yielding = self.lock().yielding;
        if yielding {
            tokio::task::yield_now().await;
        }

        let (index, hook) = {
            let mut state = self.lock();
            let index = state.seen;
            state.seen += 1;
            (index, state.hooks.remove(&index))
        };
        if let Some(hook) = hook {
            hook(self);
        }

        let path = key(&request.url);
        let fault = {
            let mut state = self.lock();
            state.log.push(RecordedRequest {
                method: request.method,
                path: path.clone(),
                headers: request.headers.clone(),
            });
            state.faults.remove(&index)
        };

        match fault {
            Some(Fault::Status(status)) => Ok(DavResponse::new(status)),
            Some(Fault::Network) => Err(TransportError::Network("connection reset".into())),
            Some(Fault::Aborted) => Err(TransportError::Aborted),
            Some(Fault::Hang) => std::future::pending().await,
            None => Ok(self.handle(&request, path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, url: &str) -> DavRequest {
        DavRequest {
            method,
            url: url.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn head_reports_last_modified() {
        let dav = MemoryDav::with_files(vec![("/db.kdbx", b"kdbx")]);
        let response = dav.issue(request(Method::Head, "/db.kdbx")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.last_modified(), Some("Tue, 14 Nov 2023 22:13:21 GMT"));
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn every_write_gets_a_new_revision() {
        let dav = MemoryDav::new();
        let first = dav.put("/db.kdbx", &b"one"[..]);
        let second = dav.put("/db.kdbx", &b"two"[..]);
        assert_ne!(first, second);
        assert_eq!(dav.revision("/db.kdbx"), Some(second));
    }

    #[tokio::test]
    async fn put_answers_without_revision() {
        let dav = MemoryDav::new();
        let mut put = request(Method::Put, "https://dav.example.com/db.kdbx");
        put.body = Some(Bytes::from_static(b"kdbx"));
        let response = dav.issue(put).await.unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.last_modified(), None);
        assert_eq!(dav.get("/db.kdbx").unwrap().0, Bytes::from_static(b"kdbx"));
    }

    #[tokio::test]
    async fn move_respects_overwrite_header() {
        let dav = MemoryDav::with_files(vec![("/a", b"a"), ("/b", b"b")]);

        let mut no_overwrite = request(Method::Move, "/a");
        no_overwrite
            .headers
            .insert(DESTINATION.clone(), HeaderValue::from_static("https://dav.example.com/b"));
        no_overwrite
            .headers
            .insert(OVERWRITE.clone(), HeaderValue::from_static("F"));
        assert_eq!(dav.issue(no_overwrite).await.unwrap().status, 412);

        let mut overwrite = request(Method::Move, "/a");
        overwrite
            .headers
            .insert(DESTINATION.clone(), HeaderValue::from_static("/b"));
        overwrite
            .headers
            .insert(OVERWRITE.clone(), HeaderValue::from_static("T"));
        assert_eq!(dav.issue(overwrite).await.unwrap().status, 204);
        assert_eq!(dav.paths(), vec!["/b".to_string()]);
        assert_eq!(dav.get("/b").unwrap().0, Bytes::from_static(b"a"));
    }

    #[tokio::test]
    async fn move_without_destination_is_bad_request() {
        let dav = MemoryDav::with_files(vec![("/a", b"a")]);
        assert_eq!(dav.issue(request(Method::Move, "/a")).await.unwrap().status, 400);
        assert!(dav.exists("/a"));
    }

    #[tokio::test]
    async fn faults_fire_once_on_their_index() {
        let dav = MemoryDav::with_files(vec![("/db.kdbx", b"kdbx")]);
        dav.fail_nth(1, Fault::Status(503));

        assert_eq!(dav.issue(request(Method::Head, "/db.kdbx")).await.unwrap().status, 200);
        assert_eq!(dav.issue(request(Method::Head, "/db.kdbx")).await.unwrap().status, 503);
        assert_eq!(dav.issue(request(Method::Head, "/db.kdbx")).await.unwrap().status, 200);
        assert_eq!(dav.methods(), vec![Method::Head; 3]);
    }

    #[tokio::test]
    async fn hooks_run_before_their_request() {
        let dav = MemoryDav::with_files(vec![("/db.kdbx", b"one")]);
        dav.before_nth(0, |dav| {
            dav.put("/db.kdbx", &b"two"[..]);
        });
        let response = dav.issue(request(Method::Get, "/db.kdbx")).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn yielding_lets_other_futures_run_first() {
        let dav = MemoryDav::with_files(vec![("/db.kdbx", b"one")]);
        dav.yield_before_requests(true);

        let read = dav.issue(request(Method::Get, "/db.kdbx"));
        let write = async {
            dav.put("/db.kdbx", &b"two"[..]);
        };
        let (response, ()) = tokio::join!(read, write);
        assert_eq!(response.unwrap().body, Bytes::from_static(b"two"));
    }

    #[test]
    fn urls_and_paths_share_keys() {
        assert_eq!(key("https://dav.example.com/files/db.kdbx"), "/files/db.kdbx");
        assert_eq!(key("/files/db.kdbx"), "/files/db.kdbx");
        assert_eq!(key("files/db.kdbx"), "/files/db.kdbx");
    }
}
