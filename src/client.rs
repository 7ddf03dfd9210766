use anyhow::{Context, Result, anyhow, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::thread;
use std::time::Duration;

use crate::config::load_config;
use crate::error::{TokenErrorResponse, format_auth_error};
use crate::limiter::QuotaWindow;
use crate::table::Table;
use crate::util::{SPINNER_THRESHOLD, payload_for_log, urljoin};

/// OAuth scope for the Core LMI API.
const SCOPE: &str = "agnitio";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client id.
    pub username: String,
    /// OAuth client secret.
    pub password: String,
    /// Base Core LMI URL, typically `https://agnitio.emsicloud.com/`.
    pub url: String,
    /// Token endpoint, typically `https://auth.emsicloud.com/connect/token`.
    pub auth_url: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

impl ClientConfig {
    /// Credentials against the production endpoints.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            url: crate::config::DEFAULT_URL.to_string(),
            auth_url: crate::config::DEFAULT_AUTH_URL.to_string(),
            verify: true,
        }
    }

    /// Loads settings from `LCAPI_*` environment variables and/or `.lightcastrc`.
    pub fn from_env() -> Result<Self> {
        load_config(None, None, None)
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// A completed call, successful or not.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    url: String,
    body: String,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// True only for HTTP 200, the single status the API answers with on success.
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Parses the body regardless of status.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str::<T>(&self.body).with_context(|| {
            format!(
                "failed to parse API JSON (url={}, status={})",
                self.url, self.status
            )
        })
    }
}

/// Authenticated, quota-aware Core LMI client.
///
/// One instance owns one access token and one [`QuotaWindow`]. Calls take
/// `&mut self`, so a client cannot be shared between threads without an
/// explicit lock around it.
pub struct Client {
    url: String,
    auth_url: String,
    username: String,
    password: String,
    token: String,

    quota: QuotaWindow,
    timeout: Duration,
    progress: bool,

    http: HttpClient,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("token", &"<redacted>")
            .field("quota", &self.quota)
            .field("timeout", &self.timeout)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client from `LCAPI_USER` / `LCAPI_PASS` and/or `.lightcastrc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit arguments
    /// - environment variables `LCAPI_USER` / `LCAPI_PASS` / `LCAPI_URL` / `LCAPI_AUTH_URL`
    /// - config file from `LCAPI_RC` or `.lightcastrc`
    ///
    /// Fetches an access token before returning.
    pub fn new(
        username: Option<String>,
        password: Option<String>,
        url: Option<String>,
    ) -> Result<Self> {
        let cfg = load_config(username, password, url)?;
        Self::with_config(cfg)
    }

    pub fn with_config(cfg: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lightcast-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("lightcast-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(60));

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        let mut client = Self {
            url: cfg.url,
            auth_url: cfg.auth_url,
            username: cfg.username,
            password: cfg.password,
            token: String::new(),
            quota: QuotaWindow::new(),
            timeout: Duration::from_secs(60),
            progress: false,
            http,
        };
        client.refresh_token()?;
        Ok(client)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Show a spinner on stderr while waiting on the rate limiter.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Continue from an existing quota window instead of a fresh one.
    pub fn with_quota(mut self, quota: QuotaWindow) -> Self {
        self.quota = quota;
        self
    }

    pub fn quota(&self) -> &QuotaWindow {
        &self.quota
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    /// Requests a new access token with the client-credentials grant.
    ///
    /// Tokens are never refreshed implicitly; call this after a 401.
    pub fn refresh_token(&mut self) -> Result<()> {
        let form = [
            ("client_id", self.username.as_str()),
            ("client_secret", self.password.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", SCOPE),
        ];
        let resp = self
            .http
            .post(&self.auth_url)
            .form(&form)
            .timeout(self.timeout)
            .send()
            .with_context(|| format!("could not connect to {}", self.auth_url))?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            if let Ok(err_json) = serde_json::from_str::<TokenErrorResponse>(&text) {
                return Err(format_auth_error(status, &self.auth_url, &err_json));
            }

            bail!(
                "authentication failed: HTTP {} for url ({})\n{}",
                status,
                self.auth_url,
                text
            );
        }

        let token: TokenResponse = serde_json::from_str(&text).with_context(|| {
            format!(
                "failed to parse token response (url={}, status={})",
                self.auth_url, status
            )
        })?;
        if token.access_token.trim().is_empty() {
            return Err(anyhow!("token endpoint returned an empty access_token"));
        }

        log::debug!(
            "acquired access token (expires in {}s)",
            token
                .expires_in
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".into())
        );
        self.token = token.access_token;
        Ok(())
    }

    /// Performs one call against `base url + path`.
    ///
    /// `None` payload issues a GET, `Some` a POST with a JSON body. The quota
    /// is charged for every attempt. A non-200 answer is logged with the
    /// payload, URL and body, then returned like any other response; only
    /// transport failures are errors.
    pub fn dispatch(
        &mut self,
        path: &str,
        payload: Option<&Value>,
        smart_limit: bool,
    ) -> Result<ApiResponse> {
        if smart_limit || self.quota.remaining() == 0 {
            let delay = self.quota.recommended_delay();
            self.pause(delay)?;
        }

        let url = urljoin(&self.url, path);
        let req = match payload {
            None => self.http.get(&url),
            Some(body) => self.http.post(&url).json(body),
        };
        let sent = req.bearer_auth(&self.token).timeout(self.timeout).send();
        self.quota.consume();

        let resp = sent.with_context(|| format!("could not connect to {}", url))?;
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("failed to read response body from {}", url))?;

        if status != StatusCode::OK {
            log::warn!("request failed: HTTP {} for url ({})", status, url);
            log::warn!("payload: {}", payload_for_log(payload));
            log::warn!("response: {}", body);
        } else {
            log::debug!(
                "{} {} -> {} ({} call(s) left in window)",
                if payload.is_some() { "POST" } else { "GET" },
                url,
                status,
                self.quota.remaining()
            );
        }

        Ok(ApiResponse { status, url, body })
    }

    fn get_json<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        self.dispatch(path, None, false)?.json()
    }

    /// `GET meta`: datasets available to this account.
    pub fn get_meta(&mut self) -> Result<Value> {
        self.get_json("meta")
    }

    /// `GET meta/definitions`: datasets with titles, versions and descriptions.
    pub fn get_meta_definitions(&mut self) -> Result<Value> {
        self.get_json("meta/definitions")
    }

    /// `GET meta/dataset/{dataset}/{datarun}`: dimensions and metrics of one
    /// dataset version.
    pub fn get_meta_dataset(&mut self, dataset: &str, datarun: &str) -> Result<Value> {
        self.get_json(&format!("meta/dataset/{}/{}", dataset, datarun))
    }

    /// `GET meta/dataset/{dataset}/{datarun}/{dimension}`: hierarchy of one
    /// dimension.
    pub fn get_meta_dataset_dimension(
        &mut self,
        dataset: &str,
        dimension: &str,
        datarun: &str,
    ) -> Result<Value> {
        self.get_json(&format!(
            "meta/dataset/{}/{}/{}",
            dataset, datarun, dimension
        ))
    }

    /// POSTs a query document to `{dataset}/{datarun}` and returns the raw JSON.
    pub fn post_retrieve_data<T: Serialize>(
        &mut self,
        dataset: &str,
        payload: &T,
        datarun: &str,
    ) -> Result<Value> {
        let payload = serde_json::to_value(payload).context("failed to serialize query")?;
        self.dispatch(&format!("{}/{}", dataset, datarun), Some(&payload), false)?
            .json()
    }

    /// Like [`Client::post_retrieve_data`], reshaped into a [`Table`].
    pub fn post_retrieve_table<T: Serialize>(
        &mut self,
        dataset: &str,
        payload: &T,
        datarun: &str,
    ) -> Result<Table> {
        let body = self.post_retrieve_data(dataset, payload, datarun)?;
        Table::from_query_response(&body)
    }

    /// Hierarchy entries of a dimension as a [`Table`], one row per node.
    pub fn get_dimension_hierarchy_table(
        &mut self,
        dataset: &str,
        dimension: &str,
        datarun: &str,
    ) -> Result<Table> {
        let body = self.get_meta_dataset_dimension(dataset, dimension, datarun)?;
        let nodes = body
            .get("hierarchy")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("response has no `hierarchy` list"))?;
        Table::from_records(nodes)
    }

    fn pause(&self, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return Ok(());
        }
        log::debug!(
            "rate limit: sleeping {:.2}s ({} call(s) left in window)",
            delay.as_secs_f64(),
            self.quota.remaining()
        );

        if !self.progress || delay < SPINNER_THRESHOLD {
            thread::sleep(delay);
            return Ok(());
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg} {elapsed}")?);
        pb.set_message(format!(
            "waiting {:.1}s for the API quota",
            delay.as_secs_f64()
        ));
        pb.enable_steady_tick(Duration::from_millis(100));
        thread::sleep(delay);
        pb.finish_and_clear();
        Ok(())
    }
}
