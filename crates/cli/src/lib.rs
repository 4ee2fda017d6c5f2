//! Command-line front end for kdbx-dav
//!
//! Parses arguments, loads `~/.config/kdbx-dav/config.toml` and runs one
//! command against a WebDAV server.

pub mod args;
pub mod commands;
pub mod config;

pub use args::{parse, Cli, Command, Expect, USAGE};
pub use commands::{http_client, App, Outcome};
pub use config::{Config, SavedConnection};

/// Log filter, e.g. `KDBX_DAV_LOG=kdbx_dav=debug`
pub const LOG_ENV: &str = "KDBX_DAV_LOG";

/// Password used when `--password` is not given
pub const PASSWORD_ENV: &str = "KDBX_DAV_PASSWORD";
