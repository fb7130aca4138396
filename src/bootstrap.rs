// First-time session setup: the user pastes a cookie issued by the server,
// we check it against the server, and only then write it to the config
// file. Nothing is saved if any step fails.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::time::Duration;
use tracing::info;

use crate::api::{self, ApiClient};
use crate::config::{self, Config, ConfigStore, Diagnostics, COOKIE_NAME, DEFAULT_HOST};
use crate::error::{GrindError, Result};
use crate::version;

/// Server path that hands a logged-in browser its session cookie.
pub const COOKIE_PATH: &str = "/users/me/cookie";

/// The account the cookie belongs to, as returned by `GET /users/me`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Pick the host to bootstrap against: the one given on the command line,
/// else the one in an existing config, else the built-in default.
pub fn resolve_host(store: &ConfigStore, requested: Option<String>) -> String {
    requested
        .filter(|host| !host.is_empty())
        .or_else(|| {
            store
                .read()
                .ok()
                .map(|existing| existing.host)
                .filter(|host| !host.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// Steps shown to the user before they paste the cookie.
pub fn instructions(host: &str) -> String {
    let url = format!("{}{}", api::base_url(host), COOKIE_PATH);
    format!(
        "Please follow these steps:

1.  Use Canvas to load a CodeGrinder window
2.  Open a new tab in your browser and copy this URL into the address bar:

    {url}

3.  The browser will display something of the form: {COOKIE_NAME}=...
4.  Copy that entire string to the clipboard and paste it below.

Paste here: "
    )
}

/// Read exactly one whitespace-delimited token from one line of `input` and
/// check that it looks like a session cookie.
pub fn read_cookie<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| GrindError::CookieInput(e.to_string()))?;

    let mut tokens = line.split_whitespace();
    let cookie = match (tokens.next(), tokens.next()) {
        (Some(token), None) => token.to_string(),
        (None, _) => {
            return Err(GrindError::CookieInput(
                "nothing was pasted; please try again".to_string(),
            ))
        }
        (Some(_), Some(_)) => {
            return Err(GrindError::CookieInput(
                "expected a single value without spaces; please try again".to_string(),
            ))
        }
    };

    config::validate_cookie(&cookie)?;
    Ok(cookie)
}

/// Run the whole bootstrap flow, prompting on `output` and reading the
/// cookie from `input`. The config is saved only after the server accepts
/// the cookie.
pub fn run<R: BufRead, W: Write>(
    store: &ConfigStore,
    host: Option<String>,
    flags: Diagnostics,
    input: &mut R,
    output: &mut W,
) -> Result<User> {
    let host = resolve_host(store, host);

    output
        .write_all(instructions(&host).as_bytes())
        .and_then(|_| output.flush())
        .map_err(GrindError::Terminal)?;

    let cookie = read_cookie(input)?;

    let mut config = Config::new(host, cookie);
    config.apply(flags);
    let client = ApiClient::new(&config)?;

    version::check(&client, version::CURRENT_VERSION)?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Verifying cookie...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let user = client.must_get_object::<User>("/users/me", None);
    spinner.finish_and_clear();
    let user = user?;

    store.save(&config)?;
    info!("cookie verified and saved: welcome {}", user.name);

    Ok(user)
}
