// Client/server version compatibility gate.
//
// The server advertises the oldest `grind` it accepts and the oldest it
// recommends. Every command checks both before doing anything else.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

use crate::api::ApiClient;
use crate::error::{GrindError, Result};

/// Version of this build of `grind`.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version descriptor served by `GET /version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    #[serde(default)]
    pub version: String,
    #[serde(rename = "grindVersionRequired")]
    pub grind_version_required: String,
    #[serde(rename = "grindVersionRecommended")]
    pub grind_version_recommended: String,
}

/// Result of a version check that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    UpToDate,
    UpgradeRecommended { recommended: Version },
}

fn parse(what: &'static str, value: &str) -> Result<Version> {
    Version::parse(value).map_err(|source| GrindError::InvalidVersion {
        what,
        value: value.to_string(),
        source,
    })
}

/// Compare `current` against the server's thresholds.
pub fn evaluate(current: &str, server: &ServerVersion) -> Result<Compatibility> {
    let current_version = parse("client", current)?;
    let required = parse("required", &server.grind_version_required)?;
    let recommended = parse("recommended", &server.grind_version_recommended)?;

    // Precedence ignores build metadata, so `1.0.0+build.7` equals `1.0.0`.
    if required.cmp_precedence(&current_version) == Ordering::Greater {
        return Err(GrindError::UpgradeRequired {
            current: current.to_string(),
            required: server.grind_version_required.clone(),
        });
    }
    if recommended.cmp_precedence(&current_version) == Ordering::Greater {
        return Ok(Compatibility::UpgradeRecommended { recommended });
    }
    Ok(Compatibility::UpToDate)
}

/// Fetch the server's thresholds and check `current` against them. Fails
/// when an upgrade is required; only warns when one is recommended.
pub fn check(client: &ApiClient<'_>, current: &str) -> Result<ServerVersion> {
    let server: ServerVersion = client.must_get_object("/version", None)?;

    if let Compatibility::UpgradeRecommended { recommended } = evaluate(current, &server)? {
        warn!(
            "this is grind version {}, but the server recommends {} or higher",
            current, recommended
        );
        warn!("  please upgrade as soon as possible");
    }
    Ok(server)
}
