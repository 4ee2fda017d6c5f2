//! Command-line parsing

use std::path::PathBuf;

use anyhow::{anyhow, bail};

use kdbx_dav_protocol::Revision;

pub const USAGE: &str = "\
kdbx-dav - load and save a password database over WebDAV

USAGE:
    kdbx-dav [OPTIONS] <COMMAND>

COMMANDS:
    stat <TARGET>                   Print the current revision
    load <TARGET> [-o FILE]         Download to FILE (or stdout)
    save <TARGET> <FILE> --rev REV  Upload FILE if the revision is still REV
    save <TARGET> <FILE> --force    Upload FILE unconditionally
    remember <NAME> <PATH>          Save a connection as @NAME
        [--file-id ID]              Key for the stored password (default: random)
    forget <NAME>                   Remove a saved connection
    connections                     List saved connections
    fields                          Describe the storage and its connection fields (JSON)

TARGET is a URL, a path relative to transport.base_url, or @NAME.

OPTIONS:
    --user USER         User for Basic authentication
    --password PASS     Password (or set KDBX_DAV_PASSWORD)
    --config FILE       Config file (default: ~/.config/kdbx-dav/config.toml)
    -v, --verbose       Log every request
    -h, --help          Print help information
    --version           Print version

EXIT STATUS:
    0 on success, 1 on error, 2 when a save hit a revision conflict
";

/// What `save` requires of the remote revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// Remote revision must still be this one
    Revision(Revision),
    /// Create or overwrite regardless
    Any,
}

impl Expect {
    pub const fn revision(&self) -> Option<&Revision> {
        match self {
            Self::Revision(revision) => Some(revision),
            Self::Any => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stat {
        target: String,
    },
    Load {
        target: String,
        output: Option<PathBuf>,
    },
    Save {
        target: String,
        file: PathBuf,
        expect: Expect,
    },
    Remember {
        name: String,
        path: String,
        file_id: Option<String>,
    },
    Forget {
        name: String,
    },
    Connections,
    Fields,
    Help,
    Version,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub command: Command,
}

/// Parse arguments, program name excluded
pub fn parse<I>(args: I) -> anyhow::Result<Cli>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut help = false;
    let mut version = false;
    let mut verbose = false;
    let mut config = None;
    let mut user = None;
    let mut password = None;
    let mut output = None;
    let mut rev = None;
    let mut force = false;
    let mut file_id = None;
    let mut positional = Vec::new();

    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{flag} requires a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => help = true,
            "--version" => version = true,
            "-v" | "--verbose" => verbose = true,
            "--config" => config = Some(PathBuf::from(value("--config")?)),
            "--user" => user = Some(value("--user")?),
            "--password" => password = Some(value("--password")?),
            "-o" | "--output" => output = Some(PathBuf::from(value("--output")?)),
            "--rev" => rev = Some(Revision::new(value("--rev")?)),
            "--force" => force = true,
            "--file-id" => file_id = Some(value("--file-id")?),
            flag if flag.starts_with('-') && flag.len() > 1 => bail!("unknown option {flag}"),
            _ => positional.push(arg),
        }
    }

    if help || version {
        return Ok(Cli {
            verbose,
            config,
            user,
            password,
            command: if help { Command::Help } else { Command::Version },
        });
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        None | Some("help") => Command::Help,
        Some("version") => Command::Version,
        Some("stat") => Command::Stat {
            target: required(&mut positional, "TARGET")?,
        },
        Some("load") => Command::Load {
            target: required(&mut positional, "TARGET")?,
            output,
        },
        Some("save") => {
            let target = required(&mut positional, "TARGET")?;
            let file = PathBuf::from(required(&mut positional, "FILE")?);
            let expect = match (rev, force) {
                (Some(rev), false) => Expect::Revision(rev),
                (None, true) => Expect::Any,
                (Some(_), true) => bail!("--rev and --force are mutually exclusive"),
                (None, false) => bail!("save needs --rev REV, or --force to overwrite"),
            };
            Command::Save {
                target,
                file,
                expect,
            }
        }
        Some("remember") => Command::Remember {
            name: required(&mut positional, "NAME")?,
            path: required(&mut positional, "PATH")?,
            file_id,
        },
        Some("forget") => Command::Forget {
            name: required(&mut positional, "NAME")?,
        },
        Some("connections") => Command::Connections,
        Some("fields") => Command::Fields,
        Some(other) => bail!("unknown command {other}"),
    };

    if let Some(extra) = positional.next() {
        bail!("unexpected argument {extra}");
    }

    Ok(Cli {
        verbose,
        config,
        user,
        password,
        command,
    })
}

fn required(args: &mut impl Iterator<Item = String>, name: &str) -> anyhow::Result<String> {
    args.next().ok_or_else(|| anyhow!("missing {name}"))
}
