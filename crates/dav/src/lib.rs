//! Optimistic-concurrency storage of a single file over WebDAV
//!
//! [`DavClient`] loads, stats and saves one remote file through a
//! [`Transport`]. Saves detect lost updates by comparing `Last-Modified`
//! revisions before and after writing to a temp file, then move the temp
//! file into place.

pub mod classify;
pub mod client;
pub mod credentials;
pub mod error;
pub mod http_transport;
pub mod memory;
pub mod request;
pub mod save;
pub mod transport;

pub use classify::{classify, Reply};
pub use client::{DavClient, Loaded};
pub use credentials::{deobfuscate, obfuscate, ConnectionConfig, CredentialError, Credentials};
pub use error::{DavError, SaveOutcome, TransportError};
pub use http_transport::{HttpTransport, TransportConfig};
pub use memory::{Fault, MemoryDav, RecordedRequest};
pub use request::{Op, RequestConfig};
pub use transport::{DavRequest, DavResponse, Transport};

pub use kdbx_dav_protocol::{Method, Revision, StoredCredentials};
