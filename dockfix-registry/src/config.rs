use dockfix_types::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_HUB_URL: &str = "https://hub.docker.com";
pub const DEFAULT_LAUNCHPAD_URL: &str = "https://api.launchpad.net/1.0";

/// Knobs shared by every registry client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub hub_url: String,
    pub launchpad_url: String,
    pub tag_page_size: u32,
    pub archive_page_size: u32,
    /// Pause between consecutive tag pages.
    pub tag_page_delay_ms: u64,
    /// Pause between consecutive archive pages.
    pub archive_page_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            launchpad_url: DEFAULT_LAUNCHPAD_URL.to_string(),
            tag_page_size: 25,
            archive_page_size: 100,
            tag_page_delay_ms: 2_000,
            archive_page_delay_ms: 1_000,
            request_timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl ResolverConfig {
    /// Same endpoints and sizes, no pauses and no backoff.
    pub fn without_delays(mut self) -> Self {
        self.tag_page_delay_ms = 0;
        self.archive_page_delay_ms = 0;
        self.retry.base_delay_ms = 0;
        self.retry.max_delay_ms = 0;
        self
    }

    pub fn tag_page_delay(&self) -> Duration {
        Duration::from_millis(self.tag_page_delay_ms)
    }

    pub fn archive_page_delay(&self) -> Duration {
        Duration::from_millis(self.archive_page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub(crate) fn hub_base(&self) -> &str {
        self.hub_url.trim_end_matches('/')
    }

    pub(crate) fn launchpad_base(&self) -> &str {
        self.launchpad_url.trim_end_matches('/')
    }
}

/// Sleeps for `delay` unless it is zero.
pub fn pace(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}
