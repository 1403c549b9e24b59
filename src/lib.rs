//! Scrapes alphabet-filtered directory listings by driving a live Chromium
//! page over CDP: discovers the A–Z/# filter controls below an anchor
//! header, clicks each in turn, waits for the dynamically-rendered content
//! to settle, and aggregates the revealed names into a deduplicated
//! plain-text report.

pub mod browser;
pub mod driver;
mod error;
pub mod extract;
pub mod roster;
pub mod scraper;
pub mod sections;
pub mod stability;
pub mod status;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use driver::{CdpDriver, PageDriver};
pub use error::{ScrapeError, ScrapeResult};
pub use roster::{Entry, NameKeyPolicy};
pub use scraper::{ScrapeReport, Scraper};
pub use stability::{Settle, SettleConfig};
pub use status::{LogSink, StatusEvent, StatusSink};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Case-insensitive substring that anchors the control search.
    #[serde(default = "default_header_title")]
    pub header_title: String,

    /// Floor on every settle wait, even if the page never mutates.
    #[serde(default = "default_min_wait_ms")]
    pub min_wait_ms: u64,

    /// Ceiling on every settle wait.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// How long the page must hold still to count as settled.
    #[serde(default = "default_stability_wait_ms")]
    pub stability_wait_ms: u64,

    /// Mutation-counter polling interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Lowercase substrings that reject an extracted line outright.
    #[serde(default = "default_ignore_list")]
    pub ignore_list: Vec<String>,

    /// Dedup key policy for names. `exact` retains case variants.
    #[serde(default)]
    pub name_key_policy: NameKeyPolicy,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Browser launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_header_title() -> String {
    "list of participating csps".to_string()
}

fn default_min_wait_ms() -> u64 {
    300
}

fn default_max_wait_ms() -> u64 {
    5_000
}

fn default_stability_wait_ms() -> u64 {
    600
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_ignore_list() -> Vec<String> {
    [
        "participating",
        "companies",
        "contact",
        "search",
        "menu",
        "home",
        "privacy",
        "terms",
        "sitemap",
        "login",
        "about us",
        "resources",
        "news & events",
        "infrastructure",
        "mnos",
        "vetting",
        "back to top",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for Config {
    fn default() -> Self {
        Self {
            header_title: default_header_title(),
            min_wait_ms: default_min_wait_ms(),
            max_wait_ms: default_max_wait_ms(),
            stability_wait_ms: default_stability_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            ignore_list: default_ignore_list(),
            name_key_policy: NameKeyPolicy::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Config {
    pub fn settle_config(&self) -> SettleConfig {
        SettleConfig {
            min_wait: Duration::from_millis(self.min_wait_ms),
            max_wait: Duration::from_millis(self.max_wait_ms),
            stability_wait: Duration::from_millis(self.stability_wait_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Load config from a YAML file.
///
/// With an explicit path the file must exist; otherwise `config.yaml` in
/// the working directory is used when present, and defaults apply when not.
pub fn load_yaml_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&contents)?)
        }
        None => {
            let fallback = Path::new("config.yaml");
            if fallback.exists() {
                let contents = fs::read_to_string(fallback)?;
                Ok(serde_yaml::from_str(&contents)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_yaml_falls_back_to_defaults_per_field() {
        let config: Config = serde_yaml::from_str("stability_wait_ms: 900\n").unwrap();
        assert_eq!(config.stability_wait_ms, 900);
        assert_eq!(config.min_wait_ms, 300);
        assert_eq!(config.header_title, "list of participating csps");
        assert!(config.browser.headless);
    }

    #[test]
    fn name_key_policy_parses_snake_case() {
        let config: Config =
            serde_yaml::from_str("name_key_policy: case_insensitive\n").unwrap();
        assert_eq!(config.name_key_policy, NameKeyPolicy::CaseInsensitive);
    }

    #[test]
    fn settle_config_converts_milliseconds() {
        let settle = Config::default().settle_config();
        assert_eq!(settle.max_wait, Duration::from_millis(5_000));
        assert_eq!(settle.stability_wait, Duration::from_millis(600));
    }
}
