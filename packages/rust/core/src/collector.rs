//! Public client: one authenticated session, many parses.

use std::time::Duration;

use rosbot_parser::{build_query, filter_updates, parse_updates};
use rosbot_session::{SessionClient, SessionOptions};
use rosbot_shared::{Credentials, FilterConfig, Result, RosbotError, ServerUpdate};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::pipeline::{ProgressReporter, SilentProgress};

/// Collects server updates from the bot-activity page of one account.
#[derive(Debug)]
pub struct Collector {
    session: SessionClient,
}

impl Collector {
    /// Log in to the public site.
    ///
    /// Fails on bad credentials or transport failure.
    pub async fn new(username_or_email: &str, password: &str) -> Result<Self> {
        Self::with_options(
            Credentials::new(username_or_email, password),
            SessionOptions::default(),
        )
        .await
    }

    /// Log in with explicit transport options (base URL, timeout).
    pub async fn with_options(credentials: Credentials, options: SessionOptions) -> Result<Self> {
        let session = SessionClient::connect(credentials, options).await?;
        Ok(Self { session })
    }

    /// The underlying authenticated session.
    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    /// Parse the first page with no filtering.
    pub async fn parse_with_defaults(&self) -> Result<Vec<ServerUpdate>> {
        self.parse(&FilterConfig::default()).await
    }

    /// Fetch and parse one page, keeping only items accepted by `config`.
    pub async fn parse(&self, config: &FilterConfig) -> Result<Vec<ServerUpdate>> {
        self.parse_with_cancel(config, CancellationToken::new()).await
    }

    /// Like [`Collector::parse`], giving up with [`RosbotError::Cancelled`]
    /// once `deadline` has elapsed.
    pub async fn parse_with_deadline(
        &self,
        config: &FilterConfig,
        deadline: Duration,
    ) -> Result<Vec<ServerUpdate>> {
        let (cancel, timer) = deadline_token(deadline);
        let result = self.parse_with_cancel(config, cancel).await;
        timer.abort();
        result
    }

    /// Like [`Collector::parse`], aborting the fetch or the parse when
    /// `cancel` fires.
    pub async fn parse_with_cancel(
        &self,
        config: &FilterConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<ServerUpdate>> {
        self.parse_reporting(config, cancel, &SilentProgress).await
    }

    #[instrument(skip_all, fields(page = config.page))]
    pub(crate) async fn parse_reporting(
        &self,
        config: &FilterConfig,
        cancel: CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ServerUpdate>> {
        let query = build_query(config);

        progress.phase("Fetching activity");

        let markup = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RosbotError::Cancelled),
            body = self.session.fetch_activity(&query) => body?,
        };

        progress.phase("Parsing updates");
        let updates = parse_updates(&markup, &cancel).await?;
        let updates = filter_updates(updates, config);

        info!(
            updates = updates.len(),
            items = updates.iter().map(|u| u.items.len()).sum::<usize>(),
            "activity collected"
        );

        Ok(updates)
    }
}

/// A token cancelled by a timer task once `deadline` elapses.
///
/// Abort the returned handle when the guarded work finishes first.
pub(crate) fn deadline_token(deadline: Duration) -> (CancellationToken, JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            cancel.cancel();
        })
    };
    (cancel, timer)
}
