// Per-user session configuration.
//
// The session lives in `~/.codegrinderrc` as a small JSON object holding the
// server host and the authentication cookie. Diagnostic flags come from the
// command line on every invocation and are never written to disk.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::ApiClient;
use crate::error::{GrindError, Result};
use crate::version::{self, ServerVersion};

/// Host used when the config does not name one.
pub const DEFAULT_HOST: &str = "dorking.cs.dixie.edu";

/// Name of the per-user config file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".codegrinderrc";

/// Name of the session cookie issued by the server.
pub const COOKIE_NAME: &str = "codegrinder";

/// Environment variables consulted, in order, to find the home directory.
const HOME_VARS: [&str; 2] = ["HOME", "USERPROFILE"];

#[cfg(unix)]
const CONFIG_FILE_MODE: u32 = 0o600;

/// Session state for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub cookie: String,
    /// Log every request line before it is sent.
    #[serde(skip)]
    pub api_report: bool,
    /// Also log request and response payloads.
    #[serde(skip)]
    pub api_dump: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            cookie: String::new(),
            api_report: false,
            api_dump: false,
        }
    }
}

impl Config {
    pub fn new(host: impl Into<String>, cookie: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            cookie: cookie.into(),
            ..Self::default()
        }
    }

    /// Merge the diagnostic flags of the current invocation.
    pub fn apply(&mut self, flags: Diagnostics) {
        self.api_report = flags.report || flags.dump;
        self.api_dump = flags.dump;
    }
}

/// Diagnostic flags taken from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub report: bool,
    /// Implies `report`.
    pub dump: bool,
}

/// Checks that a cookie has the `codegrinder=...` shape.
pub fn validate_cookie(cookie: &str) -> Result<()> {
    match cookie.strip_prefix(COOKIE_NAME) {
        Some(rest) if rest.starts_with('=') => Ok(()),
        _ => Err(GrindError::MalformedCookie),
    }
}

/// Reads and writes the per-user config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Locate the config file in the current user's home directory.
    pub fn locate() -> Result<Self> {
        Self::locate_with(|name| std::env::var_os(name))
    }

    /// Locate the config file using `lookup` to read environment variables.
    /// The first variable with a non-empty value wins.
    pub fn locate_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let home = HOME_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty())
            .ok_or(GrindError::HomeNotFound)?;

        Ok(Self::at(PathBuf::from(home).join(CONFIG_FILE_NAME)))
    }

    /// Use an explicit config file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored config without contacting the server.
    pub fn read(&self) -> Result<Config> {
        let raw = fs::read(&self.path).map_err(|source| GrindError::ConfigMissing {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_slice(&raw).map_err(|source| GrindError::ConfigCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the stored config, merge the invocation's diagnostic flags, and
    /// run the version gate against the configured server. A config without
    /// a cookie has not been through `grind init` and is rejected.
    pub fn load(&self, flags: Diagnostics) -> Result<Config> {
        self.load_with_server_version(flags).map(|(config, _)| config)
    }

    /// Same as [`ConfigStore::load`], also returning the version descriptor
    /// the gate fetched.
    pub fn load_with_server_version(&self, flags: Diagnostics) -> Result<(Config, ServerVersion)> {
        let mut config = self.read()?;
        if config.cookie.is_empty() {
            return Err(GrindError::NoSession {
                path: self.path.clone(),
            });
        }
        config.apply(flags);

        let client = ApiClient::new(&config)?;
        let server = version::check(&client, version::CURRENT_VERSION)?;

        Ok((config, server))
    }

    /// Write the config, replacing any existing file.
    pub fn save(&self, config: &Config) -> Result<()> {
        let raw = to_indented_json(config).map_err(|source| GrindError::Encode {
            what: "config file",
            source,
        })?;

        #[cfg(unix)]
        let written = write_file(&self.path, &raw, CONFIG_FILE_MODE);
        #[cfg(not(unix))]
        let written = write_file(&self.path, &raw);

        written.map_err(|source| GrindError::ConfigWrite {
            path: self.path.clone(),
            source,
        })
    }
}

/// Serialize with four-space indentation and a trailing newline.
pub(crate) fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut raw = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut raw, formatter);
    value.serialize(&mut serializer)?;
    raw.push(b'\n');
    Ok(raw)
}

/// Truncate-and-write `path`, leaving it with exactly `mode` permissions.
#[cfg(unix)]
pub(crate) fn write_file(path: &Path, raw: &[u8], mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    file.write_all(raw)?;

    // `mode` only applies to newly created files
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub(crate) fn write_file(path: &Path, raw: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(raw)
}
