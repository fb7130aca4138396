// Error types shared by every module of the client. Each variant is one
// way an invocation can fail; the binary decides how to report it and
// always exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::COOKIE_NAME;

#[derive(Error, Debug)]
pub enum GrindError {
    #[error("unable to locate home directory (neither HOME nor USERPROFILE is set), giving up")]
    HomeNotFound,

    #[error("unable to load config file {}; try running \"grind init\"", .path.display())]
    ConfigMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to parse {}: {source}; you may wish to try deleting the file and running \"grind init\" again",
        .path.display()
    )]
    ConfigCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no session cookie in {}; try running \"grind init\"", .path.display())]
    NoSession { path: PathBuf },

    #[error("error writing {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the cookie must start with {}=; perhaps you copied the wrong thing?", COOKIE_NAME)]
    MalformedCookie,

    #[error("failed to read the cookie you pasted: {0}")]
    CookieInput(String),

    #[error("error writing to the terminal: {0}")]
    Terminal(#[source] std::io::Error),

    #[error("JSON error encoding {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("error creating http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid request URL {url}")]
    InvalidUrl { url: String },

    #[error("error connecting to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status from {url}: {status}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse result object from server: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("error reading response from {url}: {source}")]
    ReadBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid {what} version {value:?}: {source}")]
    InvalidVersion {
        what: &'static str,
        value: String,
        #[source]
        source: semver::Error,
    },

    #[error("this is grind version {current}, but the server requires {required} or higher; you must upgrade to continue")]
    UpgradeRequired { current: String, required: String },

    #[error("no {} file found in {} or any parent directory", crate::dotfile::DOTFILE_NAME, .start.display())]
    DotFileNotFound { start: PathBuf },

    #[error("error reading {}: {source}", .path.display())]
    DotFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    DotFileCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("error writing {}: {source}", .path.display())]
    DotFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GrindError>;
