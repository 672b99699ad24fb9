//! Authenticated session against the Ros-Bot website.
//!
//! [`SessionClient`] logs in with a username/password, keeps the session
//! cookies in its HTTP client, and resolves the user's bot-activity endpoint
//! once. [`SessionClient::fetch_activity`] transparently logs in again when the
//! site reports an expired session.

mod login;

use std::time::Duration;

use reqwest::{Client, Response};
use rosbot_shared::{Credentials, DEFAULT_BASE_URL, Result, RosbotError};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use login::{extract_activity_endpoint, extract_form_build_id};

/// Path of the login form, relative to the base URL.
const LOGIN_PATH: &str = "/user/login";

/// Maximum number of redirects followed after posting the login form.
const MAX_REDIRECTS: usize = 10;

/// Default transport timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("rosbot-collector/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Transport settings for a [`SessionClient`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Scheme and host of the site.
    pub base_url: Url,
    /// Timeout for every HTTP request, in seconds.
    pub timeout_secs: u64,
}

impl SessionOptions {
    /// Options for a custom base URL with the default timeout.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RosbotError::config(format!("invalid base URL '{base_url}': {e}")))?;
        Ok(Self {
            base_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Mutable part of an authenticated session.
///
/// Cookies live in the HTTP client's store; this holds what the collector
/// itself derives from logging in.
#[derive(Debug, Clone)]
struct Session {
    /// Resolved at the first login and never recomputed.
    activity_path: String,
    /// Bumped by every successful re-authentication.
    generation: u64,
}

/// Authenticated client for the activity feed.
///
/// Cheap to share behind an `Arc`: concurrent fetches serialize only around
/// re-authentication.
pub struct SessionClient {
    credentials: Credentials,
    client: Client,
    base_url: Url,
    login_url: Url,
    session: Mutex<Session>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    /// Log in and resolve the activity endpoint.
    ///
    /// Fails with [`RosbotError::BadCredentials`], [`RosbotError::MissingLoginToken`],
    /// [`RosbotError::MissingActivityEndpoint`] or a transport error.
    #[instrument(skip_all, fields(base_url = %options.base_url, user = credentials.username_or_email()))]
    pub async fn connect(credentials: Credentials, options: SessionOptions) -> Result<Self> {
        let client = build_client(&options)?;
        let login_url = options
            .base_url
            .join(LOGIN_PATH)
            .map_err(|e| RosbotError::config(format!("invalid login URL: {e}")))?;

        let landing = login(&client, &login_url, &credentials).await?;
        let activity_path = extract_activity_endpoint(&landing)?;

        info!(%activity_path, "logged in, activity endpoint resolved");

        Ok(Self {
            credentials,
            client,
            base_url: options.base_url,
            login_url,
            session: Mutex::new(Session {
                activity_path,
                generation: 0,
            }),
        })
    }

    /// The resolved `/user/<id>/bot-activity` path.
    pub async fn activity_path(&self) -> String {
        self.session.lock().await.activity_path.clone()
    }

    /// Run the login handshake again, keeping the resolved activity path.
    #[instrument(skip_all)]
    pub async fn authenticate(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        login(&self.client, &self.login_url, &self.credentials).await?;
        session.generation += 1;
        info!(generation = session.generation, "session refreshed");
        Ok(())
    }

    /// Fetch the activity page for the given query suffix
    /// (e.g. `/?item_destination=All&ancient=0&item_quality=All&page=1`).
    ///
    /// A non-success status is taken as an expired session: the client logs
    /// in again once and retries once. A failing login surfaces as
    /// [`RosbotError::SessionRefreshFailure`].
    #[instrument(skip(self))]
    pub async fn fetch_activity(&self, query: &str) -> Result<String> {
        let (url, generation) = {
            let session = self.session.lock().await;
            (self.activity_url(&session.activity_path, query)?, session.generation)
        };

        let response = self.get(&url).await?;
        let status = response.status();
        if status.is_success() {
            return read_body(&url, response).await;
        }

        warn!(%status, "activity request rejected, session presumed expired");
        self.refresh(generation).await?;

        let response = self.get(&url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RosbotError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        read_body(&url, response).await
    }

    /// Log in again unless another fetch already did since `seen_generation`.
    async fn refresh(&self, seen_generation: u64) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.generation != seen_generation {
            debug!(
                generation = session.generation,
                "session already refreshed by a concurrent fetch"
            );
            return Ok(());
        }

        login(&self.client, &self.login_url, &self.credentials)
            .await
            .map_err(|e| {
                warn!(error = %e, "re-authentication failed");
                RosbotError::refresh(&e)
            })?;

        session.generation += 1;
        info!(generation = session.generation, "session refreshed");
        Ok(())
    }

    fn activity_url(&self, activity_path: &str, query: &str) -> Result<Url> {
        let endpoint = self
            .base_url
            .join(activity_path)
            .map_err(|e| RosbotError::parse(format!("invalid activity path '{activity_path}': {e}")))?;
        let raw = format!("{}{query}", endpoint.as_str().trim_end_matches('/'));
        Url::parse(&raw).map_err(|e| RosbotError::parse(format!("invalid activity URL '{raw}': {e}")))
    }

    async fn get(&self, url: &Url) -> Result<Response> {
        debug!(%url, "GET");
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RosbotError::Network(format!("{url}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Login handshake
// ---------------------------------------------------------------------------

/// Build a reqwest client with a cookie store and the configured timeout.
fn build_client(options: &SessionOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(options.timeout_secs))
        .build()
        .map_err(|e| RosbotError::Network(format!("failed to build HTTP client: {e}")))
}

/// Post the login form and return the landing page body.
///
/// The site answers 200 whether or not the credentials are accepted; only a
/// redirect away from the login URL signals success.
async fn login(client: &Client, login_url: &Url, credentials: &Credentials) -> Result<String> {
    debug!(%login_url, "fetching login form");
    let response = client
        .get(login_url.clone())
        .send()
        .await
        .map_err(|e| RosbotError::Network(format!("{login_url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RosbotError::HttpStatus {
            url: login_url.to_string(),
            status: status.as_u16(),
        });
    }

    let page = read_body(login_url, response).await?;
    let form_build_id = extract_form_build_id(&page)?;

    let form = [
        ("name", credentials.username_or_email()),
        ("pass", credentials.password()),
        ("form_id", "user_login"),
        ("op", "Log in"),
        ("form_build_id", form_build_id.as_str()),
    ];

    debug!("posting credentials");
    let response = client
        .post(login_url.clone())
        .form(&form)
        .send()
        .await
        .map_err(|e| RosbotError::Network(format!("{login_url}: {e}")))?;

    if response.url() == login_url {
        return Err(RosbotError::BadCredentials);
    }

    debug!(landing = %response.url(), "login accepted");
    read_body(login_url, response).await
}

async fn read_body(url: &Url, response: Response) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| RosbotError::Network(format!("{url}: failed to read body: {e}")))
}
