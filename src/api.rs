// API client module: a small blocking HTTP client that talks JSON to the
// CodeGrinder server. One request at a time, no retries; every failure
// comes back as a `GrindError` for the caller to report.

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, info};

use crate::config::{self, Config};
use crate::error::{GrindError, Result};

/// Version prefix shared by every API path.
pub const API_PREFIX: &str = "/v2";

/// Query parameters for a request. Receivers treat them as unordered.
pub type Params = BTreeMap<String, String>;

/// The HTTP verbs the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this verb may carry a JSON body.
    pub fn allows_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// How a response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    /// 404 on a request that allows the resource to be missing.
    Absent,
    Failure,
}

pub fn classify(status: StatusCode, tolerate_not_found: bool) -> Disposition {
    if status.is_success() {
        Disposition::Success
    } else if tolerate_not_found && status == StatusCode::NOT_FOUND {
        Disposition::Absent
    } else {
        Disposition::Failure
    }
}

/// Blocking API client bound to a loaded session config.
#[derive(Debug, Clone)]
pub struct ApiClient<'a> {
    config: &'a Config,
    http: Client,
    base: String,
}

impl<'a> ApiClient<'a> {
    /// Create a client for `config`. A non-empty cookie must be well formed;
    /// a malformed one is refused here so it is never sent.
    pub fn new(config: &'a Config) -> Result<Self> {
        if !config.cookie.is_empty() {
            config::validate_cookie(&config.cookie)?;
        }

        let base = base_url(&config.host);
        let parsed = Url::parse(&base).map_err(|_| GrindError::InvalidUrl { url: base.clone() })?;

        let mut builder = Client::builder();
        if is_loopback(&parsed) {
            builder = builder.no_proxy();
        }
        let http = builder.build().map_err(GrindError::Client)?;

        Ok(ApiClient { config, http, base })
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Full URL for `path` with `params` appended as the query string.
    ///
    /// Panics if `path` does not start with `/`.
    pub fn url(&self, path: &str, params: Option<&Params>) -> Result<Url> {
        assert!(
            path.starts_with('/'),
            "request path must start with /, got {path:?}"
        );

        let raw = format!("{}{}", self.base, path);
        let mut url = Url::parse(&raw).map_err(|_| GrindError::InvalidUrl { url: raw })?;
        if let Some(params) = params.filter(|params| !params.is_empty()) {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Issue one request and decode the JSON response.
    ///
    /// Returns `Ok(None)` only when the server answers 404 and
    /// `tolerate_not_found` is set. Every other non-2xx status is an error.
    ///
    /// Panics if `path` does not start with `/` or if `upload` is given for a
    /// verb that cannot carry a body.
    pub fn request<U, D>(
        &self,
        method: Method,
        path: &str,
        params: Option<&Params>,
        upload: Option<&U>,
        tolerate_not_found: bool,
    ) -> Result<Option<D>>
    where
        U: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        let payload = self.encode_upload(method, upload)?;
        match self.send(method, path, params, payload, tolerate_not_found)? {
            Some(response) => self.decode(response).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`ApiClient::request`], but ignores the response body. Returns
    /// `false` only for a tolerated 404.
    pub fn execute<U>(
        &self,
        method: Method,
        path: &str,
        params: Option<&Params>,
        upload: Option<&U>,
        tolerate_not_found: bool,
    ) -> Result<bool>
    where
        U: Serialize + ?Sized,
    {
        let payload = self.encode_upload(method, upload)?;
        Ok(self
            .send(method, path, params, payload, tolerate_not_found)?
            .is_some())
    }

    /// GET an object that may not exist.
    pub fn get_object<D: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&Params>,
    ) -> Result<Option<D>> {
        self.request(Method::Get, path, params, None::<&()>, true)
    }

    pub fn must_get_object<D: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&Params>,
    ) -> Result<D> {
        self.request(Method::Get, path, params, None::<&()>, false)
            .map(expect_present)
    }

    pub fn must_post_object<U, D>(&self, path: &str, params: Option<&Params>, upload: &U) -> Result<D>
    where
        U: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        self.request(Method::Post, path, params, Some(upload), false)
            .map(expect_present)
    }

    pub fn must_put_object<U, D>(&self, path: &str, params: Option<&Params>, upload: &U) -> Result<D>
    where
        U: Serialize + ?Sized,
        D: DeserializeOwned,
    {
        self.request(Method::Put, path, params, Some(upload), false)
            .map(expect_present)
    }

    pub fn must_delete(&self, path: &str, params: Option<&Params>) -> Result<()> {
        self.execute(Method::Delete, path, params, None::<&()>, false)
            .map(|_| ())
    }

    fn encode_upload<U>(&self, method: Method, upload: Option<&U>) -> Result<Option<Vec<u8>>>
    where
        U: Serialize + ?Sized,
    {
        let Some(upload) = upload else {
            return Ok(None);
        };
        assert!(
            method.allows_body(),
            "{method} requests cannot carry an upload body"
        );

        let payload = config::to_indented_json(upload).map_err(|source| GrindError::Encode {
            what: "object to upload",
            source,
        })?;
        if self.config.api_dump {
            info!("Request data: {}", String::from_utf8_lossy(&payload));
        }
        Ok(Some(payload))
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        params: Option<&Params>,
        payload: Option<Vec<u8>>,
        tolerate_not_found: bool,
    ) -> Result<Option<Response>> {
        let url = self.url(path, params)?;
        if self.config.api_report {
            info!("{} {}", method, url);
        }

        let mut request = self
            .http
            .request(method.into(), url.clone())
            .header(ACCEPT, "application/json");
        if !self.config.cookie.is_empty() {
            request = request.header(COOKIE, self.config.cookie.as_str());
        }
        if let Some(payload) = payload {
            request = request.header(CONTENT_TYPE, "application/json").body(payload);
        }

        let response = request.send().map_err(|source| GrindError::Connect {
            host: self.config.host.clone(),
            source,
        })?;

        let status = response.status();
        match classify(status, tolerate_not_found) {
            Disposition::Success => Ok(Some(response)),
            Disposition::Absent => {
                debug!("{} {} not found", method, url);
                Ok(None)
            }
            Disposition::Failure => {
                let body = response.text().unwrap_or_default();
                Err(GrindError::UnexpectedStatus {
                    url: url.to_string(),
                    status,
                    body,
                })
            }
        }
    }

    fn decode<D: DeserializeOwned>(&self, response: Response) -> Result<D> {
        let url = response.url().to_string();
        let raw = response
            .bytes()
            .map_err(|source| GrindError::ReadBody { url, source })?;

        let value = serde_json::from_slice(&raw).map_err(GrindError::Decode)?;
        if self.config.api_dump {
            info!("Response data: {}", String::from_utf8_lossy(&raw));
        }
        Ok(value)
    }
}

// Non-tolerant requests never yield `None`.
fn expect_present<D>(value: Option<D>) -> D {
    match value {
        Some(value) => value,
        None => unreachable!("404 is only tolerated when requested"),
    }
}

/// `scheme://host/v2`. A bare host is reached over HTTPS.
pub fn base_url(host: &str) -> String {
    if host.contains("://") {
        format!("{}{}", host.trim_end_matches('/'), API_PREFIX)
    } else {
        format!("https://{}{}", host, API_PREFIX)
    }
}

// Loopback hosts never go through a proxy.
fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_matches(&['[', ']'][..])
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}
