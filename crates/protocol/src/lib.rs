//! Shared plain-data types for kdbx-dav
//!
//! Revisions, verbs, the open-config field list and the persisted credential
//! record. Nothing here performs I/O.

pub mod fields;
pub mod method;
pub mod record;
pub mod revision;

pub use fields::*;
pub use method::*;
pub use record::*;
pub use revision::*;
