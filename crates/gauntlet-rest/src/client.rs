//! REST request state and dispatch
//!
//! A scenario accumulates request state step by step: base URI, headers,
//! cookies, credentials, body. [`RestClient::send`] dispatches the accumulated
//! state and snapshots the response for later assertion steps. Headers and
//! cookies support direct removal, so clearing them never rebuilds the client.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Method;
use tracing::{debug, info};

use gauntlet_core::{GauntletError, Result};

/// HTTP verbs the step grammar accepts, resolved once from the step text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn method(&self) -> Method {
        match self {
            HttpVerb::Get => Method::GET,
            HttpVerb::Post => Method::POST,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Patch => Method::PATCH,
            HttpVerb::Delete => Method::DELETE,
        }
    }
}

impl FromStr for HttpVerb {
    type Err = GauntletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "PATCH" => Ok(HttpVerb::Patch),
            "DELETE" => Ok(HttpVerb::Delete),
            _ => Err(GauntletError::UnsupportedVerb {
                name: s.to_string(),
            }),
        }
    }
}

/// Protocol, host and port every request of the scenario is sent against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUri {
    pub secured: bool,
    pub host: String,
    pub port: u16,
}

impl BaseUri {
    /// Applies the defaults of the step grammar: host `localhost`, port 80
    /// or 443 depending on the secured flag.
    pub fn resolve(secured: bool, host: Option<&str>, port: Option<u16>) -> Self {
        let host = host
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost")
            .to_string();
        let port = port.unwrap_or(if secured { 443 } else { 80 });
        Self {
            secured,
            host,
            port,
        }
    }

    /// Splits a `host` or `host:port` authority from the step text.
    pub fn parse_authority(raw: &str) -> Result<(String, Option<u16>)> {
        match raw.split_once(':') {
            None => Ok((raw.to_string(), None)),
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| GauntletError::InvalidExpression {
                        expression: raw.to_string(),
                        reason: format!("'{port}' is not a valid port"),
                    })?;
                Ok((host.to_string(), Some(port)))
            }
        }
    }

    pub fn origin(&self) -> String {
        let protocol = if self.secured { "https" } else { "http" };
        format!("{}://{}:{}", protocol, self.host, self.port)
    }
}

/// Snapshot of the last response, kept for assertion and extraction steps.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub cookies: BTreeMap<String, String>,
    pub body: String,
    pub elapsed: Duration,
    pub received_at: DateTime<Utc>,
}

impl RestResponse {
    /// First header with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Request state owned by one scenario.
#[derive(Debug)]
pub struct RestClient {
    http: reqwest::Client,
    base: Option<BaseUri>,
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    auth: Option<(String, String)>,
    body: Option<String>,
    last_response: Option<RestResponse>,
}

impl RestClient {
    pub fn new() -> Result<Self> {
        debug!("starting a REST client");
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base: None,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            auth: None,
            body: None,
            last_response: None,
        })
    }

    /// Configures the base URI for all further requests of the scenario. A
    /// secured base relaxes TLS validation, since test endpoints routinely
    /// present self-signed certificates.
    pub fn configure_base(
        &mut self,
        secured: bool,
        host: Option<&str>,
        port: Option<u16>,
    ) -> Result<()> {
        let base = BaseUri::resolve(secured, host, port);
        if secured {
            self.http = reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .build()?;
        }
        info!("sending requests to {}", base.origin());
        self.base = Some(base);
        Ok(())
    }

    pub fn base(&self) -> Option<&BaseUri> {
        self.base.as_ref()
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn remove_cookie(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn set_basic_auth(&mut self, user: impl Into<String>, password: impl Into<String>) {
        self.auth = Some((user.into(), password.into()));
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }

    pub fn clear_body(&mut self) {
        self.body = None;
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Dispatches the accumulated request state against `endpoint` and
    /// snapshots the response.
    pub async fn send(&mut self, verb: HttpVerb, endpoint: &str) -> Result<&RestResponse> {
        let base = self.base.as_ref().ok_or(GauntletError::MissingBaseUri)?;
        let url = format!("{}{}", base.origin(), endpoint);
        debug!("sending {:?} request to {}", verb, url);

        let mut request = self.http.request(verb.method(), &url);

        let mut has_content_type = false;
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("content-type") {
                has_content_type = true;
            }
            request = request.header(name.as_str(), value.as_str());
        }
        // Requests default to JSON bodies unless a step said otherwise.
        if !has_content_type {
            request = request.header("Content-Type", "application/json");
        }

        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header("Cookie", cookie_header);
        }

        if let Some((user, password)) = &self.auth {
            request = request.basic_auth(user, Some(password));
        }

        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let cookies = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();

        let body = response.text().await?;
        let snapshot = RestResponse {
            status,
            headers,
            cookies,
            body,
            elapsed: started.elapsed(),
            received_at: Utc::now(),
        };
        debug!("saving response ({} bytes, status {})", snapshot.body.len(), status);
        Ok(&*self.last_response.insert(snapshot))
    }

    /// The last response, or a descriptive error when no request was sent.
    pub fn last_response(&self) -> Result<&RestResponse> {
        self.last_response.as_ref().ok_or(GauntletError::MissingResponse)
    }
}
