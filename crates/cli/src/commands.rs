//! Command handlers
//!
//! `App` is generic over the transport so the same handlers run against a
//! real server and against `MemoryDav` in tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use secrecy::SecretString;
use tracing::debug;
use url::Url;

use kdbx_dav::{
    ConnectionConfig, DavClient, HttpTransport, SaveOutcome, Transport, TransportConfig,
};
use kdbx_dav_protocol::{needs_open_config, open_config, WEBDAV_STORAGE};

use crate::args::{Command, Expect, USAGE};
use crate::config::{Config, SavedConnection};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// A save was refused because the remote file changed
    Conflict,
}

impl Outcome {
    /// Process exit status
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Conflict => 2,
        }
    }
}

/// Fail on the first required connection field left empty
fn check_required(path: &str, user: Option<&str>, password: Option<&str>) -> anyhow::Result<()> {
    for field in open_config().iter().filter(|f| f.required) {
        let value = match field.id {
            "path" => Some(path),
            "user" => user,
            "password" => password,
            _ => None,
        };
        if value.unwrap_or_default().is_empty() {
            bail!("{} is required", field.id);
        }
    }
    Ok(())
}

/// Build a client over HTTP from the `[transport]` section
pub fn http_client(config: &TransportConfig) -> anyhow::Result<DavClient<HttpTransport>> {
    let client = DavClient::new(HttpTransport::from_config(config));
    match &config.base_url {
        Some(base) => {
            let base = Url::parse(base).with_context(|| format!("invalid base_url {base}"))?;
            Ok(client.with_base_url(base))
        }
        None => Ok(client),
    }
}

pub struct App<T> {
    client: DavClient<T>,
    config: Config,
    config_path: PathBuf,
    /// `--user`, wins over saved connections
    user: Option<String>,
    /// `--password` or the environment, wins over saved connections
    password: Option<String>,
}

impl<T: Transport> App<T> {
    pub fn new(client: DavClient<T>, config: Config, config_path: PathBuf) -> Self {
        Self {
            client,
            config,
            config_path,
            user: None,
            password: None,
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.user = user;
        self.password = password;
        self
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Connection settings for a target: `@name` or a URL/path
    pub fn connection_for(&self, target: &str) -> anyhow::Result<ConnectionConfig> {
        let mut connection = match target.strip_prefix('@') {
            Some(name) => {
                let saved = self
                    .config
                    .connection(name)
                    .ok_or_else(|| anyhow!("no saved connection named {name}"))?;
                ConnectionConfig::from_stored(&saved.path, &saved.stored(), &saved.file_id)
                    .with_context(|| format!("stored password for @{name} is unreadable"))?
            }
            None => ConnectionConfig::new(target),
        };
        if let Some(user) = &self.user {
            connection.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            connection.password = Some(SecretString::new(password.clone()));
        }
        Ok(connection)
    }

    pub async fn run(
        &mut self,
        command: &Command,
        out: &mut impl Write,
    ) -> anyhow::Result<Outcome> {
        match command {
            Command::Stat { target } => self.stat(target, out).await?,
            Command::Load { target, output } => {
                self.load(target, output.as_deref(), out).await?;
            }
            Command::Save {
                target,
                file,
                expect,
            } => return self.save(target, file, expect, out).await,
            Command::Remember {
                name,
                path,
                file_id,
            } => self.remember(name, path, file_id.as_deref(), out)?,
            Command::Forget { name } => self.forget(name, out)?,
            Command::Connections => self.list(out)?,
            Command::Fields => describe(out)?,
            Command::Help => write!(out, "{USAGE}")?,
            Command::Version => writeln!(out, "kdbx-dav {VERSION}")?,
        }
        Ok(Outcome::Success)
    }

    async fn stat(&self, target: &str, out: &mut impl Write) -> anyhow::Result<()> {
        let connection = self.connection_for(target)?;
        let revision = self
            .client
            .stat(&connection.path, connection.credentials().as_ref())
            .await
            .with_context(|| format!("stat {}", connection.path))?;
        writeln!(out, "{revision}")?;
        Ok(())
    }

    async fn load(
        &self,
        target: &str,
        output: Option<&Path>,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let connection = self.connection_for(target)?;
        let loaded = self
            .client
            .load(&connection.path, connection.credentials().as_ref())
            .await
            .with_context(|| format!("load {}", connection.path))?;

        match output {
            Some(file) => {
                std::fs::write(file, &loaded.body)
                    .with_context(|| format!("failed to write {}", file.display()))?;
                debug!(file = %file.display(), bytes = loaded.body.len(), "wrote download");
            }
            None => out.write_all(&loaded.body)?,
        }
        eprintln!("revision: {}", loaded.revision);
        Ok(())
    }

    async fn save(
        &self,
        target: &str,
        file: &Path,
        expect: &Expect,
        out: &mut impl Write,
    ) -> anyhow::Result<Outcome> {
        let connection = self.connection_for(target)?;
        let body = std::fs::read(file)
            .with_context(|| format!("failed to read {}", file.display()))?;

        let result = self
            .client
            .save(
                &connection.path,
                connection.credentials().as_ref(),
                body,
                expect.revision(),
            )
            .await;

        match SaveOutcome::from(result) {
            SaveOutcome::Saved { revision } => {
                writeln!(out, "{revision}")?;
                Ok(Outcome::Success)
            }
            SaveOutcome::RevisionConflict { observed } => {
                let remote = observed
                    .map_or_else(|| "an unknown revision".to_string(), |r| r.to_string());
                eprintln!(
                    "conflict: {} is now at {remote}; load it again, merge your changes and retry",
                    connection.path
                );
                Ok(Outcome::Conflict)
            }
            SaveOutcome::Failed(err) => {
                Err(anyhow::Error::new(err).context(format!("save {}", connection.path)))
            }
        }
    }

    fn remember(
        &mut self,
        name: &str,
        path: &str,
        file_id: Option<&str>,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        if name.is_empty() || name.starts_with('@') {
            bail!("connection name must be non-empty and not start with @");
        }
        check_required(path, self.user.as_deref(), self.password.as_deref())?;
        let previous = self.config.connection(name);
        let file_id = file_id
            .map(str::to_string)
            .or_else(|| previous.map(|p| p.file_id.clone()))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        // An old encpass is only readable with the id it was masked with
        let previous_stored = previous
            .filter(|p| p.file_id == file_id)
            .map(SavedConnection::stored);

        let connection = ConnectionConfig {
            path: path.to_string(),
            user: self
                .user
                .clone()
                .or_else(|| previous_stored.as_ref().and_then(|p| p.user.clone())),
            password: self.password.clone().map(SecretString::new),
        };
        let stored = connection
            .to_stored(&file_id, previous_stored.as_ref())
            .context("failed to store password")?;

        self.config.remember(SavedConnection {
            name: name.to_string(),
            path: path.to_string(),
            user: stored.user,
            encpass: stored.encpass,
            file_id,
        });
        self.config.save_to_path(&self.config_path)?;
        writeln!(out, "saved @{name}")?;
        Ok(())
    }

    fn forget(&mut self, name: &str, out: &mut impl Write) -> anyhow::Result<()> {
        if !self.config.forget(name) {
            bail!("no saved connection named {name}");
        }
        self.config.save_to_path(&self.config_path)?;
        writeln!(out, "forgot @{name}")?;
        Ok(())
    }

    fn list(&self, out: &mut impl Write) -> anyhow::Result<()> {
        for connection in &self.config.connections {
            writeln!(
                out,
                "@{}\t{}\t{}",
                connection.name,
                connection.path,
                connection.user.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

/// Storage descriptor and open-dialog fields, as a UI would consume them
fn describe(out: &mut impl Write) -> anyhow::Result<()> {
    let description = serde_json::json!({
        "storage": WEBDAV_STORAGE,
        "needsOpenConfig": needs_open_config(),
        "fields": open_config(),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&description)?)?;
    Ok(())
}
