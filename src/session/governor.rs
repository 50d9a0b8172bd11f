//! Session rotation and request pacing.
//!
//! The [`RateGovernor`] owns the current [`Session`] and is consulted before
//! every outbound request any component makes. It sleeps a randomized delay,
//! rotates the session when its request budget or age is exhausted, and
//! forces rotation plus a longer backoff after the remote signals blocking
//! (HTTP 403/429 or a challenge page). There are no automatic retries: a
//! blocked request is one failed attempt, and only the *next* request runs
//! under the fresh session.

use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::identity::{random_identity, Identity};

/// Maximum Retry-After value honored before capping (10 minutes).
const MAX_RETRY_AFTER: Duration = Duration::from_secs(600);

/// Errors raised while building the session's HTTP client.
#[derive(Debug, Error)]
pub enum SessionError {
    /// reqwest client construction failed.
    #[error("failed to build session HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Caution level selected at run start. More cautious profiles use larger
/// delays and smaller session budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StealthProfile {
    /// Everyday pacing.
    #[default]
    Default,
    /// Slower pacing, shorter sessions.
    Stealth,
    /// Slowest pacing, smallest session budget.
    Conservative,
}

/// Pacing and session-budget limits for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorLimits {
    /// Lower bound of the base inter-request delay.
    pub min_delay: Duration,
    /// Upper bound of the base inter-request delay.
    pub max_delay: Duration,
    /// Extra uniform jitter added on top of the base delay.
    pub jitter_range: Duration,
    /// Requests allowed before the session rotates.
    pub max_requests_per_session: u32,
    /// Session age after which it rotates regardless of request count.
    pub session_timeout: Duration,
}

impl StealthProfile {
    /// Returns the limits for this profile.
    #[must_use]
    pub fn limits(self) -> GovernorLimits {
        match self {
            Self::Default => GovernorLimits {
                min_delay: Duration::from_millis(3000),
                max_delay: Duration::from_millis(8000),
                jitter_range: Duration::from_millis(2000),
                max_requests_per_session: 40,
                session_timeout: Duration::from_secs(15 * 60),
            },
            Self::Stealth => GovernorLimits {
                min_delay: Duration::from_millis(5000),
                max_delay: Duration::from_millis(12000),
                jitter_range: Duration::from_millis(3000),
                max_requests_per_session: 25,
                session_timeout: Duration::from_secs(10 * 60),
            },
            Self::Conservative => GovernorLimits {
                min_delay: Duration::from_millis(8000),
                max_delay: Duration::from_millis(20000),
                jitter_range: Duration::from_millis(5000),
                max_requests_per_session: 12,
                session_timeout: Duration::from_secs(6 * 60),
            },
        }
    }
}

/// One rotation-unit of HTTP identity plus its request budget and age.
#[derive(Debug)]
pub struct Session {
    identity: &'static Identity,
    client: Client,
    request_count: u32,
    started_at: Instant,
}

impl Session {
    fn new() -> Result<Self, SessionError> {
        let identity = random_identity();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(identity.accept));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(identity.accept_language),
        );

        let client = Client::builder()
            .user_agent(identity.user_agent)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .gzip(true)
            .build()?;

        Ok(Self {
            identity,
            client,
            request_count: 0,
            started_at: Instant::now(),
        })
    }

    /// The identity active for this session. Immutable once selected.
    #[must_use]
    pub fn identity(&self) -> &'static Identity {
        self.identity
    }

    /// Requests made under this session so far.
    #[must_use]
    pub fn request_count(&self) -> u32 {
        self.request_count
    }

    /// Age of this session.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Returns true for statuses that indicate the remote is blocking us.
#[must_use]
pub fn is_blocked_status(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
}

/// Rate governor: the single piece of mutable shared state in the core.
///
/// Injected into every call site rather than living as a module-level
/// singleton, so tests can drive it with paused time and a future
/// per-host split stays a construction change.
#[derive(Debug)]
pub struct RateGovernor {
    limits: GovernorLimits,
    session: Session,
    /// Extra one-shot backoff applied to the next `pace()` after a block.
    pending_backoff: Option<Duration>,
    /// Rotation forced by a blocked response, regardless of budget.
    rotate_before_next: bool,
    /// Last request instant per remote host. Requests to distinct hosts do
    /// not wait on each other beyond the global pacing delay.
    last_request_per_host: DashMap<String, Instant>,
}

impl RateGovernor {
    /// Creates a governor for the given profile with a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the HTTP client cannot be built.
    pub fn new(profile: StealthProfile) -> Result<Self, SessionError> {
        let governor = Self::with_limits(profile.limits())?;
        info!(
            profile = ?profile,
            user_agent = governor.session.identity().user_agent,
            "session started"
        );
        Ok(governor)
    }

    /// Creates a governor with explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the HTTP client cannot be built.
    pub fn with_limits(limits: GovernorLimits) -> Result<Self, SessionError> {
        Ok(Self {
            limits,
            session: Session::new()?,
            pending_backoff: None,
            rotate_before_next: false,
            last_request_per_host: DashMap::new(),
        })
    }

    /// The limits the governor is operating under.
    #[must_use]
    pub fn limits(&self) -> &GovernorLimits {
        &self.limits
    }

    /// The HTTP client carrying the active identity's headers.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.session.client
    }

    /// The active session (read-only).
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Records one outbound request against the session budget.
    pub fn record_request(&mut self) {
        self.session.request_count += 1;
    }

    /// Whether the session should be replaced before the next request.
    #[must_use]
    pub fn should_rotate(&self) -> bool {
        self.rotate_before_next
            || self.session.request_count >= self.limits.max_requests_per_session
            || self.session.elapsed() >= self.limits.session_timeout
    }

    /// Discards the current session and activates a new random identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the replacement client cannot be built.
    #[instrument(skip(self))]
    pub fn rotate(&mut self) -> Result<(), SessionError> {
        let old_count = self.session.request_count;
        self.session = Session::new()?;
        self.rotate_before_next = false;
        info!(
            retired_after = old_count,
            user_agent = self.session.identity().user_agent,
            "rotated session"
        );
        Ok(())
    }

    /// Marks the session as blocked by the remote (HTTP 403/429 or a
    /// challenge page). Forces rotation and a longer delay before the next
    /// request. Honors a parsed Retry-After when the server sent one.
    pub fn note_blocked(&mut self, retry_after: Option<Duration>) {
        self.rotate_before_next = true;
        // Backoff: at least double the normal ceiling, or the server's ask.
        let backoff = retry_after
            .map(|d| d.min(MAX_RETRY_AFTER))
            .unwrap_or_else(|| self.limits.max_delay * 2);
        let backoff = backoff.max(self.limits.max_delay * 2);
        self.pending_backoff = Some(backoff);
        warn!(
            backoff_ms = backoff.as_millis(),
            "remote signaled blocking; session will rotate before next request"
        );
    }

    /// Samples one pacing delay: `uniform(min, max) + uniform(0, jitter)`.
    #[must_use]
    pub fn sample_delay(&self) -> Duration {
        let mut rng = rand::thread_rng();
        let base_ms = rng.gen_range(
            self.limits.min_delay.as_millis() as u64..=self.limits.max_delay.as_millis() as u64,
        );
        let jitter_ms = rng.gen_range(0..=self.limits.jitter_range.as_millis() as u64);
        Duration::from_millis(base_ms + jitter_ms)
    }

    /// Prepares for one outbound request to `host`: rotates if due, sleeps
    /// the pacing delay (plus any pending block backoff), and records the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a due rotation cannot build a client.
    #[instrument(skip(self))]
    pub async fn pace(&mut self, host: &str) -> Result<(), SessionError> {
        if self.should_rotate() {
            self.rotate()?;
        }

        let mut delay = self.sample_delay();
        if let Some(backoff) = self.pending_backoff.take() {
            delay += backoff;
        }

        // A request to the same host within the delay window extends the
        // wait; distinct hosts only pay the sampled delay.
        if let Some(last) = self.last_request_per_host.get(host).map(|e| *e.value()) {
            let since = last.elapsed();
            if since < self.limits.min_delay {
                delay = delay.max(self.limits.min_delay - since);
            }
        }

        debug!(host, delay_ms = delay.as_millis(), "pacing request");
        tokio::time::sleep(delay).await;

        self.last_request_per_host
            .insert(host.to_string(), Instant::now());
        self.record_request();
        Ok(())
    }
}

/// Parses a Retry-After header value (integer seconds or HTTP-date).
///
/// Returns `None` for unparseable or negative values. Values beyond the
/// governor's cap are capped.
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(duration.min(MAX_RETRY_AFTER));
    }

    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();
        return match datetime.duration_since(now) {
            Ok(duration) => Some(duration.min(MAX_RETRY_AFTER)),
            // Date in the past: no wait required.
            Err(_) => Some(Duration::ZERO),
        };
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_get_more_cautious_in_order() {
        let default = StealthProfile::Default.limits();
        let stealth = StealthProfile::Stealth.limits();
        let conservative = StealthProfile::Conservative.limits();

        assert!(default.min_delay < stealth.min_delay);
        assert!(stealth.min_delay < conservative.min_delay);
        assert!(default.max_requests_per_session > stealth.max_requests_per_session);
        assert!(stealth.max_requests_per_session > conservative.max_requests_per_session);
    }

    #[tokio::test]
    async fn test_sample_delay_stays_within_bounds() {
        // min=3000 max=8000 jitter=2000 -> all samples in [3000, 10000] ms.
        let governor = RateGovernor::new(StealthProfile::Default).unwrap();
        for _ in 0..1000 {
            let delay = governor.sample_delay();
            assert!(delay >= Duration::from_millis(3000), "delay {delay:?} below floor");
            assert!(delay <= Duration::from_millis(10000), "delay {delay:?} above ceiling");
        }
    }

    #[tokio::test]
    async fn test_should_rotate_after_request_budget() {
        let mut governor = RateGovernor::new(StealthProfile::Conservative).unwrap();
        assert!(!governor.should_rotate());
        for _ in 0..governor.limits().max_requests_per_session {
            governor.record_request();
        }
        assert!(governor.should_rotate());
    }

    #[tokio::test]
    async fn test_rotate_resets_counters() {
        let mut governor = RateGovernor::new(StealthProfile::Default).unwrap();
        governor.record_request();
        governor.record_request();
        governor.rotate().unwrap();
        assert_eq!(governor.session().request_count(), 0);
    }

    #[tokio::test]
    async fn test_note_blocked_forces_rotation() {
        let mut governor = RateGovernor::new(StealthProfile::Default).unwrap();
        assert!(!governor.should_rotate());
        governor.note_blocked(None);
        assert!(governor.should_rotate());
        governor.rotate().unwrap();
        assert!(!governor.should_rotate());
    }

    #[tokio::test]
    async fn test_note_blocked_extends_next_pace() {
        tokio::time::pause();
        let mut governor = RateGovernor::new(StealthProfile::Default).unwrap();
        governor.note_blocked(Some(Duration::from_secs(60)));

        let start = Instant::now();
        governor.pace("example.com").await.unwrap();
        // Backoff of at least 2 * max_delay (16s), so well past 10s.
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_pace_sleeps_at_least_min_delay() {
        tokio::time::pause();
        let mut governor = RateGovernor::new(StealthProfile::Default).unwrap();
        let start = Instant::now();
        governor.pace("example.com").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert_eq!(governor.session().request_count(), 1);
    }

    #[test]
    fn test_is_blocked_status() {
        assert!(is_blocked_status(StatusCode::FORBIDDEN));
        assert!(is_blocked_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_blocked_status(StatusCode::OK));
        assert!(!is_blocked_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("-5"), None);
        assert_eq!(parse_retry_after("bogus"), None);
    }

    #[test]
    fn test_parse_retry_after_caps_excessive_values() {
        assert_eq!(parse_retry_after("86400"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_http_date_in_past_is_zero() {
        assert_eq!(
            parse_retry_after("Wed, 01 Jan 2020 00:00:00 GMT"),
            Some(Duration::ZERO)
        );
    }
}
