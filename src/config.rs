//! Client configuration
//!
//! Everything the client needs to talk to one backend: where it lives, which
//! request contract it speaks, how uploaded ids are tracked, and how the
//! quick poll is paced. The CLI fills a [`ClientConfig`] from flags and
//! environment variables; library users build one with the `with_*` methods.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Deployed backend address
pub const DEPLOYED_API_BASE: &str = "http://13.125.81.117:8080";

/// Backend address for local development
pub const LOCAL_API_BASE: &str = "http://localhost:8080";

pub const DEFAULT_DB_PATH: &str = "turfcheck.db";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Length of the quick poll window
pub const QUICK_POLL_WINDOW: Duration = Duration::from_secs(5);

/// Pause between quick poll fetches
pub const QUICK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest pause `with_poll` accepts
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Backend contract variant. The two deployments disagree on the field name
/// that carries asset ids in the analyze request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Contract {
    /// `{"userId": .., "s3Urls": [..]}`
    #[default]
    S3Urls,
    /// `{"userId": .., "imageIdStrings": [..]}`
    ImageIdStrings,
}

impl Contract {
    /// JSON field that carries the asset id list in the analyze payload
    pub fn asset_field(&self) -> &'static str {
        match self {
            Contract::S3Urls => "s3Urls",
            Contract::ImageIdStrings => "imageIdStrings",
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contract::S3Urls => write!(f, "s3-urls"),
            Contract::ImageIdStrings => write!(f, "image-id-strings"),
        }
    }
}

impl FromStr for Contract {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3-urls" | "s3urls" => Ok(Contract::S3Urls),
            "image-id-strings" | "imageidstrings" => Ok(Contract::ImageIdStrings),
            other => Err(format!(
                "unknown contract '{}' (expected s3-urls or image-id-strings)",
                other
            )),
        }
    }
}

/// How the session keeps the ids returned by upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdTracking {
    /// Only the ids from the latest upload response
    #[default]
    Replace,
    /// Deduplicated union of every upload in the session
    Cumulative,
}

/// Pacing of the quick poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub window: Duration,
    pub interval: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            window: QUICK_POLL_WINDOW,
            interval: QUICK_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub contract: Contract,
    pub id_tracking: IdTracking,
    /// Per-request timeout; `None` waits forever
    pub timeout: Option<Duration>,
    pub poll: PollSchedule,
    pub db_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEPLOYED_API_BASE.to_string(),
            contract: Contract::default(),
            id_tracking: IdTracking::default(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            poll: PollSchedule::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_contract(mut self, contract: Contract) -> Self {
        self.contract = contract;
        self
    }

    pub fn with_id_tracking(mut self, id_tracking: IdTracking) -> Self {
        self.id_tracking = id_tracking;
        self
    }

    /// Set the request timeout. Zero disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it
    pub fn with_poll(mut self, poll: PollSchedule) -> Self {
        self.poll = PollSchedule {
            window: poll.window,
            interval: poll.interval.max(MIN_POLL_INTERVAL),
        };
        self
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_deployed_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEPLOYED_API_BASE);
        assert_eq!(config.contract, Contract::S3Urls);
        assert_eq!(config.id_tracking, IdTracking::Replace);
        assert_eq!(config.poll.window, Duration::from_secs(5));
        assert_eq!(config.poll.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_contract_field_names() {
        assert_eq!(Contract::S3Urls.asset_field(), "s3Urls");
        assert_eq!(Contract::ImageIdStrings.asset_field(), "imageIdStrings");
    }

    #[test]
    fn test_contract_parse_and_display() {
        assert_eq!("s3-urls".parse::<Contract>(), Ok(Contract::S3Urls));
        assert_eq!("Image-Id-Strings".parse::<Contract>(), Ok(Contract::ImageIdStrings));
        assert!("imageIds".parse::<Contract>().is_err());

        for contract in [Contract::S3Urls, Contract::ImageIdStrings] {
            assert_eq!(contract.to_string().parse::<Contract>(), Ok(contract));
        }
    }

    #[test]
    fn test_endpoint_joins_single_slash() {
        let config = ClientConfig::new().with_base_url("http://example.test:8080/");
        assert_eq!(config.endpoint("/images/upload"), "http://example.test:8080/images/upload");
        assert_eq!(config.endpoint("images/result"), "http://example.test:8080/images/result");
    }

    #[test]
    fn test_poll_interval_has_floor() {
        let config = ClientConfig::new().with_poll(PollSchedule {
            window: Duration::from_millis(500),
            interval: Duration::ZERO,
        });
        assert_eq!(config.poll.interval, MIN_POLL_INTERVAL);
        assert_eq!(config.poll.window, Duration::from_millis(500));

        let config = ClientConfig::new().with_poll(PollSchedule {
            window: Duration::from_secs(2),
            interval: Duration::from_millis(250),
        });
        assert_eq!(config.poll.interval, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = ClientConfig::new().with_timeout(Duration::ZERO);
        assert_eq!(config.timeout, None);

        let config = ClientConfig::new().with_timeout(Duration::from_secs(3));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }
}
