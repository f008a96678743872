use crate::client::FloodError::*;
use crate::entities::{
    AuthRequest, AuthResponse, ClientSettings, ConnectionStatus, ConnectionTest, HistorySummary,
    LastNotification, Notifications, Settings, Snapshot, ThrottleUpdate, TorrentCounts,
    TorrentHashes, Torrents, TransferHistory,
};
use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

const DEFAULT_PORT: u16 = 80;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const HISTORY_SNAPSHOT: &str = "FIVE_MINUTE";

/// Custom error types for the [`FloodApi`] client
#[derive(Error, Debug)]
pub enum FloodError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Environment variable error: {0}")]
    Environment(#[from] env::VarError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// HTTP methods the Flood API is called with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
}

impl From<RequestMethod> for Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => Method::GET,
            RequestMethod::Post => Method::POST,
            RequestMethod::Patch => Method::PATCH,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Method::from(*self))
    }
}

/// Known Flood API paths, relative to `http://{host}:{port}/api/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Authenticate,
    ConnectionTest,
    ClientSettings,
    Settings,
    History,
    Notifications,
    Torrents,
    StopTorrents,
    StartTorrents,
}

impl Endpoint {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Endpoint::Authenticate => "auth/authenticate",
            Endpoint::ConnectionTest => "client/connection-test",
            Endpoint::ClientSettings => "client/settings",
            Endpoint::Settings => "settings",
            Endpoint::History => "history",
            Endpoint::Notifications => "notifications",
            Endpoint::Torrents => "torrents",
            Endpoint::StopTorrents => "torrents/stop",
            Endpoint::StartTorrents => "torrents/start",
        }
    }
}

/// How many times a request is sent when the backend answers 401.
///
/// Every attempt after the first is preceded by a re-authentication. There is
/// no backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` sends in total, at least one
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self { max_attempts }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Flood API client
pub struct FloodApi {
    host: String,
    port: u16,
    username: String,
    password: String,
    base_url: Url,
    timeout: Duration,
    retry_policy: RetryPolicy,
    session: OnceCell<Client>,
    /// Jar backing a self-created session, `None` when the session was injected
    cookie_jar: Option<Arc<Jar>>,
    owns_session: bool,
}

impl FloodApi {
    /// Creates a new `FloodApi` client for the given backend
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Host, username or password is empty
    /// - Host contains a scheme or a path
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(
        host: String,
        port: u16,
        username: String,
        password: String,
        timeout_ms: u64,
    ) -> Result<Self> {
        if host.is_empty() {
            return Err(Configuration("Host cannot be empty".into()).into());
        }

        if host.contains("://") || host.contains('/') {
            return Err(Configuration(format!(
                "Host must be a bare host name or address, got: {host}"
            ))
            .into());
        }

        if username.is_empty() {
            return Err(Configuration("Username cannot be empty".into()).into());
        }

        if password.is_empty() {
            return Err(Configuration("Password cannot be empty".into()).into());
        }

        let base_url = Url::parse(&format!("http://{host}:{port}/api/"))
            .map_err(|e| Configuration(format!("Invalid Flood URL for host {host}: {e}")))?;

        Ok(Self {
            host,
            port,
            username,
            password,
            base_url,
            timeout: Duration::from_millis(timeout_ms),
            retry_policy: RetryPolicy::default(),
            session: OnceCell::new(),
            cookie_jar: Some(Arc::new(Jar::default())),
            owns_session: true,
        })
    }

    /// Creates a new `FloodApi` client with a builder pattern
    #[must_use]
    pub fn builder() -> FloodApiBuilder {
        FloodApiBuilder::default()
    }

    /// Host name or address of the backend
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL every endpoint is resolved against
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Whether an HTTP session is currently open
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session.initialized()
    }

    /// Whether the client's own cookie jar holds a session cookie.
    ///
    /// Always `false` for injected sessions.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.cookie_jar
            .as_ref()
            .and_then(|jar| jar.cookies(&self.base_url))
            .is_some()
    }

    /// Sends the credentials and reports whether Flood accepted them
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Flood answers 401
    /// - Response cannot be parsed
    pub async fn auth(&self) -> Result<bool> {
        let credentials = AuthRequest {
            username: &self.username,
            password: &self.password,
        };

        let response = self
            .send(
                RequestMethod::Post,
                Endpoint::Authenticate,
                Some(&credentials),
                None,
            )
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Authentication("Authentication failed with Flood".into()).into());
        }

        let data = Self::read_json::<AuthResponse>(response)
            .await
            .context("Failed to authenticate")?;

        if data.success {
            debug!("Authenticated with Flood at {}", self.host);
        } else {
            warn!("Flood at {} rejected the credentials", self.host);
        }
        Ok(data.success)
    }

    /// Checks whether Flood is connected to its torrent client
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Response cannot be parsed
    pub async fn connected(&self) -> Result<bool> {
        let data: ConnectionTest = self
            .get(Endpoint::ConnectionTest, None)
            .await
            .context("Failed to test connection")?;
        Ok(data.is_connected)
    }

    /// Most recent download and upload rates
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Response cannot be parsed
    pub async fn history(&self) -> Result<HistorySummary> {
        let history: TransferHistory = self
            .get(Endpoint::History, Some(&[("snapshot", HISTORY_SNAPSHOT)][..]))
            .await
            .context("Failed to get history")?;
        Ok(history.latest())
    }

    /// Gets the torrent client throttle settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Response cannot be parsed
    pub async fn client_settings(&self) -> Result<ClientSettings> {
        self.get(Endpoint::ClientSettings, None)
            .await
            .context("Failed to get client settings")
    }

    /// Gets the Flood settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Response cannot be parsed
    pub async fn settings(&self) -> Result<Settings> {
        self.get(Endpoint::Settings, None)
            .await
            .context("Failed to get settings")
    }

    /// Gets the notification feed
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Response cannot be parsed
    pub async fn notifications(&self) -> Result<Notifications> {
        self.get(Endpoint::Notifications, None)
            .await
            .context("Failed to get notifications")
    }

    /// Classified summary of the newest notification, `None` if there is none
    ///
    /// # Errors
    ///
    /// Same as [`Self::notifications()`]
    pub async fn last_notification(&self) -> Result<Option<LastNotification>> {
        let notifications = self.notifications().await?;
        Ok(notifications
            .notifications
            .first()
            .map(crate::entities::Notification::summarize))
    }

    /// Gets every torrent, keyed by hash
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Response cannot be parsed
    pub async fn get_torrents(&self) -> Result<Torrents> {
        self.get(Endpoint::Torrents, None)
            .await
            .context("Failed to get torrents")
    }

    /// Torrent totals per status
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_torrents()`]
    pub async fn torrents(&self) -> Result<TorrentCounts> {
        Ok(self.get_torrents().await?.counts())
    }

    /// Gathers everything a poll cycle needs.
    ///
    /// Calls are made one after the other and the first failure aborts the
    /// whole snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any of the underlying calls
    pub async fn global_get(&self) -> Result<Snapshot> {
        let snapshot = Snapshot {
            client_settings: self.client_settings().await?,
            settings: self.settings().await?,
            last_notification: self.last_notification().await?,
            history: self.history().await?,
            torrents: self.torrents().await?,
            connected: ConnectionStatus {
                status: self.connected().await?,
            },
        };
        debug!(
            "Polled Flood at {}: {} torrents",
            self.host, snapshot.torrents.count
        );
        Ok(snapshot)
    }

    /// Sets the global download limit in kB/s
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    pub async fn set_download_limit(&self, kbps: u32) -> Result<()> {
        let update = ThrottleUpdate {
            throttle_global_down_speed: Some(u64::from(kbps) * 1024),
            ..Default::default()
        };
        self.update_client_settings(&update)
            .await
            .context("Failed to set download limit")
    }

    /// Sets the global upload limit in kB/s
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    pub async fn set_upload_limit(&self, kbps: u32) -> Result<()> {
        let update = ThrottleUpdate {
            throttle_global_up_speed: Some(u64::from(kbps) * 1024),
            ..Default::default()
        };
        self.update_client_settings(&update)
            .await
            .context("Failed to set upload limit")
    }

    /// Stops every torrent
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Torrent list cannot be parsed
    pub async fn stop_all(&self) -> Result<()> {
        self.command_all(Endpoint::StopTorrents)
            .await
            .context("Failed to stop all torrents")
    }

    /// Starts every torrent
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or times out
    /// - Session is invalid and re-authentication keeps failing
    /// - Torrent list cannot be parsed
    pub async fn start_all(&self) -> Result<()> {
        self.command_all(Endpoint::StartTorrents)
            .await
            .context("Failed to start all torrents")
    }

    /// Releases the HTTP session if this client created it.
    ///
    /// Injected sessions stay open, they belong to the caller. A closed
    /// client opens a fresh session on its next request.
    pub fn close(&mut self) {
        if !self.owns_session {
            return;
        }
        if self.session.take().is_some() {
            self.cookie_jar = Some(Arc::new(Jar::default()));
            debug!("Closed Flood session for {}", self.host);
        }
    }

    async fn update_client_settings(&self, update: &ThrottleUpdate) -> Result<()> {
        debug!("Updating Flood client settings: {update:?}");
        self.request::<serde::de::IgnoredAny, _>(
            RequestMethod::Patch,
            Endpoint::ClientSettings,
            Some(update),
            None,
        )
        .await?;
        Ok(())
    }

    /// Lists the torrents and sends their hashes to a start/stop endpoint
    async fn command_all(&self, endpoint: Endpoint) -> Result<()> {
        let hashes = TorrentHashes {
            hashes: self.get_torrents().await?.hashes(),
        };
        debug!(
            "Sending {} torrent hashes to {}",
            hashes.hashes.len(),
            endpoint.path()
        );
        self.request::<serde::de::IgnoredAny, _>(
            RequestMethod::Post,
            endpoint,
            Some(&hashes),
            None,
        )
        .await?;
        Ok(())
    }

    async fn get<R>(&self, endpoint: Endpoint, query: Option<&[(&str, &str)]>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.request::<R, ()>(RequestMethod::Get, endpoint, None, query)
            .await
    }

    /// Makes an authenticated API request.
    ///
    /// A 401 answer triggers a re-authentication followed by another attempt,
    /// until the retry policy is exhausted.
    async fn request<R, B>(
        &self,
        method: RequestMethod,
        endpoint: Endpoint,
        body: Option<&B>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<R>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let max_attempts = self.retry_policy.max_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self.send(method, endpoint, body, query).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Self::read_json(response).await;
            }
            // Drain the body so the connection goes back to the pool
            let _ = response.bytes().await;

            if attempt >= max_attempts {
                return Err(Authentication(format!(
                    "Authentication failed with Flood after {attempt} attempts"
                ))
                .into());
            }

            debug!(
                "{method} {} answered 401, re-authenticating (attempt {attempt}/{max_attempts})",
                endpoint.path()
            );
            if !self.auth().await? {
                warn!("Re-authentication with Flood was rejected");
            }
        }
    }

    /// Sends a single request, without any retry
    async fn send<B>(
        &self,
        method: RequestMethod,
        endpoint: Endpoint,
        body: Option<&B>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let session = self.session().await?;
        let url = self
            .base_url
            .join(endpoint.path())
            .map_err(|e| Configuration(format!("Invalid endpoint {}: {e}", endpoint.path())))?;

        debug!("Making API request: {method} {url}");

        let mut builder = session.request(method.into(), url).timeout(self.timeout);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        debug!("API request status: {}", response.status());
        Ok(response)
    }

    /// Reads the whole body and decodes it; an empty body decodes as `null`
    async fn read_json<R>(response: Response) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(Connection(format!(
                "Unknown error, HTTP status: {} ({})",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
            .into());
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };

        serde_json::from_slice(body)
            .map_err(|e| InvalidResponse(format!("Failed to parse API response: {e}")).into())
    }

    async fn session(&self) -> Result<&Client> {
        self.session
            .get_or_try_init(|| async { self.create_session() })
            .await
    }

    /// Creates the HTTP session: JSON content type, cookie jar, any certificate
    fn create_session(&self) -> Result<Client> {
        let jar = self
            .cookie_jar
            .clone()
            .ok_or_else(|| Configuration("Injected Flood session was released".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!("Creating HTTP session for Flood at {}", self.host);
        Client::builder()
            .default_headers(headers)
            .cookie_provider(jar)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Configuration(format!("Failed to create HTTP client: {e}")).into())
    }
}

impl Drop for FloodApi {
    fn drop(&mut self) {
        self.close();
    }
}

fn transport_error(error: reqwest::Error) -> FloodError {
    if error.is_timeout() {
        Connection("Timeout occurred while connecting to Flood".into())
    } else {
        Connection(format!(
            "Error occurred while communicating with Flood: {error}"
        ))
    }
}

/// Builder for [`FloodApi`] client
#[derive(Default)]
pub struct FloodApiBuilder {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<u64>,
    retry_policy: Option<RetryPolicy>,
    session: Option<Client>,
}

impl FloodApiBuilder {
    /// Reads `FLOOD_HOST`, `FLOOD_PORT`, `FLOOD_USERNAME` and `FLOOD_PASSWORD`.
    ///
    /// `FLOOD_PORT` is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the port is not a number
    pub fn from_env() -> Result<Self> {
        let host = env::var("FLOOD_HOST").map_err(Environment)?;
        let username = env::var("FLOOD_USERNAME").map_err(Environment)?;
        let password = env::var("FLOOD_PASSWORD").map_err(Environment)?;

        let mut builder = Self::default()
            .host(host)
            .username(username)
            .password(password);

        if let Ok(port) = env::var("FLOOD_PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| Configuration(format!("Invalid FLOOD_PORT {port}: {e}")))?;
            builder = builder.port(port);
        }

        Ok(builder)
    }

    /// Sets the host name or address
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the port, 80 by default
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the username
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the per-request timeout in milliseconds
    #[must_use]
    pub fn timeout(mut self, timeout_millis: u64) -> Self {
        self.timeout = Some(timeout_millis);
        self
    }

    /// Sets how often a request is attempted when Flood answers 401
    #[must_use]
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    /// Uses an existing HTTP session instead of creating one.
    ///
    /// The session stays owned by the caller: [`FloodApi::close()`] leaves it
    /// open. It should carry a cookie store, Flood authenticates by cookie.
    #[must_use]
    pub fn session(mut self, session: Client) -> Self {
        self.session = Some(session);
        self
    }

    /// Builds the [`FloodApi`] client
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields (host, username, password) are not provided
    /// - Any field contains invalid data
    pub fn build(self) -> Result<FloodApi> {
        let host = self
            .host
            .ok_or_else(|| Configuration("Host is required".into()))?;
        let username = self
            .username
            .ok_or_else(|| Configuration("Username is required".into()))?;
        let password = self
            .password
            .ok_or_else(|| Configuration("Password is required".into()))?;

        let port = self.port.unwrap_or(DEFAULT_PORT);
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS);

        let mut client = FloodApi::new(host, port, username, password, timeout)?;

        if let Some(retry_policy) = self.retry_policy {
            client.retry_policy = retry_policy;
        }

        if let Some(session) = self.session {
            client.session = OnceCell::new_with(Some(session));
            client.cookie_jar = None;
            client.owns_session = false;
        }

        Ok(client)
    }
}
