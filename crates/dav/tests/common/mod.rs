//! Common test utilities
#![allow(dead_code)] // Not every test file uses every helper

use kdbx_dav::{DavClient, MemoryDav};
use url::Url;

pub const BASE_URL: &str = "https://dav.example.com/";
pub const DB: &str = "/db.kdbx";

/// Request indices of a save that runs to completion
pub const STAT: usize = 0;
pub const PUT: usize = 1;
pub const VERIFY: usize = 2;
pub const RECHECK: usize = 3;
pub const MOVE: usize = 4;
pub const FINAL_STAT: usize = 5;

/// Client over `dav`, resolving paths against [`BASE_URL`]
pub fn client(dav: &MemoryDav) -> DavClient<MemoryDav> {
    DavClient::new(dav.clone()).with_base_url(Url::parse(BASE_URL).unwrap())
}

/// Store seeded with `body` at [`DB`]
pub fn seeded(body: &[u8]) -> MemoryDav {
    MemoryDav::with_files([(DB, body)])
}

/// Hidden temp files left in the store
pub fn temp_files(dav: &MemoryDav) -> Vec<String> {
    dav.paths()
        .into_iter()
        .filter(|p| p.rsplit('/').next().is_some_and(|name| name.starts_with('.')))
        .collect()
}
