//! End-to-end `activity` pipeline: sign in, fetch, parse, filter.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use rosbot_session::SessionOptions;
use rosbot_shared::{Credentials, FilterConfig, Result, RosbotError, ServerUpdate};

use crate::collector::{Collector, deadline_token};

/// Configuration for the `collect` pipeline.
#[derive(Debug, Clone)]
pub struct CollectRequest {
    /// Account to log in with.
    pub credentials: Credentials,
    /// Transport options (base URL, timeout).
    pub options: SessionOptions,
    /// Filters and page number.
    pub filter: FilterConfig,
    /// Give up after this long; `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

/// Result of the `collect` pipeline.
#[derive(Debug)]
pub struct CollectResult {
    /// Filtered updates, ascending by server timestamp.
    pub updates: Vec<ServerUpdate>,
    /// Total elapsed time, login included.
    pub elapsed: Duration,
}

impl CollectResult {
    /// Items across every update.
    pub fn item_count(&self) -> usize {
        self.updates.iter().map(|u| u.items.len()).sum()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &CollectResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &CollectResult) {}
}

/// Run the full pipeline for one page of activity.
#[instrument(skip_all, fields(base_url = %request.options.base_url, page = request.filter.page))]
pub async fn collect(
    request: &CollectRequest,
    progress: &dyn ProgressReporter,
) -> Result<CollectResult> {
    let start = Instant::now();

    // The deadline covers sign-in as well as fetch and parse.
    let (cancel, timer) = match request.deadline {
        Some(deadline) => {
            let (cancel, timer) = deadline_token(deadline);
            (cancel, Some(timer))
        }
        None => (CancellationToken::new(), None),
    };

    let updates = sign_in_and_parse(request, cancel, progress).await;
    if let Some(timer) = timer {
        timer.abort();
    }
    let updates = updates?;

    let result = CollectResult {
        updates,
        elapsed: start.elapsed(),
    };

    info!(
        updates = result.updates.len(),
        items = result.item_count(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "collect pipeline complete"
    );

    progress.done(&result);
    Ok(result)
}

async fn sign_in_and_parse(
    request: &CollectRequest,
    cancel: CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ServerUpdate>> {
    progress.phase("Signing in");
    let connect = Collector::with_options(request.credentials.clone(), request.options.clone());
    let collector = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RosbotError::Cancelled),
        connected = connect => connected?,
    };

    collector.parse_reporting(&request.filter, cancel, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rosbot_shared::QualityFilter;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.events.lock().unwrap().push(name.to_string());
        }

        fn done(&self, result: &CollectResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{}", result.item_count()));
        }
    }

    async fn mount_site(server: &MockServer, login_redirect: &str) {
        Mock::given(method("GET"))
            .and(path("/user/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("login.html")))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", login_redirect))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user/farmer"))
            .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("landing.html")))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user/1234567/bot-activity/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("activity.html")))
            .mount(server)
            .await;
    }

    fn request(server: &MockServer, filter: FilterConfig) -> CollectRequest {
        CollectRequest {
            credentials: Credentials::new("farmer", "s3cret"),
            options: SessionOptions::with_base_url(&server.uri()).unwrap(),
            filter,
            deadline: Some(Duration::from_secs(10)),
        }
    }

    #[tokio::test]
    async fn reports_phases_and_done() {
        let server = MockServer::start().await;
        mount_site(&server, "/user/farmer").await;

        let filter = FilterConfig {
            quality: QualityFilter::Set,
            ..FilterConfig::default()
        };
        let progress = RecordingProgress::default();
        let result = collect(&request(&server, filter), &progress).await.unwrap();

        // tyrael's might, the unidentified ring and sunwuko's paws.
        assert_eq!(result.item_count(), 3);
        assert_eq!(
            *progress.events.lock().unwrap(),
            vec!["Signing in", "Fetching activity", "Parsing updates", "done:3"]
        );
    }

    #[tokio::test]
    async fn bad_credentials_stop_before_collecting() {
        let server = MockServer::start().await;
        mount_site(&server, "/user/login").await;

        let progress = RecordingProgress::default();
        let err = collect(&request(&server, FilterConfig::default()), &progress)
            .await
            .unwrap_err();

        assert!(matches!(err, RosbotError::BadCredentials));
        assert_eq!(*progress.events.lock().unwrap(), vec!["Signing in"]);
    }

    #[tokio::test]
    async fn silent_progress_runs_without_deadline() {
        let server = MockServer::start().await;
        mount_site(&server, "/user/farmer").await;

        let mut req = request(&server, FilterConfig::default());
        req.deadline = None;
        let result = collect(&req, &SilentProgress).await.unwrap();
        assert_eq!(result.updates.len(), 4);
    }

    #[tokio::test]
    async fn deadline_covers_slow_sign_in() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/user/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(load_fixture("login.html"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let mut req = request(&server, FilterConfig::default());
        req.deadline = Some(Duration::from_millis(100));

        let progress = RecordingProgress::default();
        let started = Instant::now();
        let err = collect(&req, &progress).await.unwrap_err();

        assert!(matches!(err, RosbotError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(*progress.events.lock().unwrap(), vec!["Signing in"]);
    }
}
