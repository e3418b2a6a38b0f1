use std::collections::BTreeMap;

use log::Level;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::queue::OverflowPolicy;
use crate::analytics::tracker::RevokePolicy;
use crate::diagnostics::logger::Severity;

/// Name of the global object the hosting page may define before the bundle loads.
pub const CONFIG_GLOBAL: &str = "LunetixConfig";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window is not available")]
    NoWindow,
    #[error("invalid site configuration: {0}")]
    Js(#[from] serde_wasm_bindgen::Error),
    #[error("invalid site configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureFlags {
    pub custom_cursor: bool,
    pub chat_widget: bool,
    pub analytics: bool,
    pub performance_monitoring: bool,
    pub service_worker: bool,
    pub lazy_loading: bool,
    pub smooth_scrolling: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            custom_cursor: true,
            chat_widget: true,
            analytics: true,
            performance_monitoring: true,
            service_worker: true,
            lazy_loading: true,
            smooth_scrolling: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
    pub endpoint: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsConfig {
    pub endpoint: Option<String>,
    pub tracking_id: String,
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    pub revoke: RevokePolicy,
    pub consent_prompt_delay_ms: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            tracking_id: "GA_MEASUREMENT_ID".to_string(),
            queue_capacity: 500,
            overflow: OverflowPolicy::default(),
            revoke: RevokePolicy::default(),
            consent_prompt_delay_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
    pub website: String,
}

impl Default for ContactInfo {
    fn default() -> Self {
        Self {
            email: "brand@lunetix.com".to_string(),
            website: "lunetix.vercel.app".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub apps: BTreeMap<String, String>,
    pub social: BTreeMap<String, String>,
    pub contact: ContactInfo,
    pub features: FeatureFlags,
    pub debug: bool,
    pub logging: LoggingConfig,
    pub analytics: AnalyticsConfig,
    pub version: String,
}

const DEFAULT_APPS: &[(&str, &str)] = &[
    ("lunotes", "https://lunotes.vercel.app/"),
    ("lunotime", "https://lunotime.vercel.app/"),
    ("calcelix", "https://calcelix.vercel.app/"),
    ("lunomoney", "https://lunomoney.vercel.app/"),
    ("lunomove", "https://lunomove.vercel.app/"),
    ("lunosleep", "https://lunosleep.vercel.app/"),
    ("lunocare", "https://lunocare.vercel.app/"),
    ("lunohydra", "https://lunohydra.vercel.app/"),
    ("alquran", "https://alquran-digital-seven.vercel.app/"),
];

const DEFAULT_SOCIAL: &[(&str, &str)] = &[
    ("instagram", "https://instagram.com/lunetix"),
    ("twitter", "https://x.com/lunetix"),
    ("linkedin", "https://linkedin.com/company/lunetix"),
];

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            apps: to_map(DEFAULT_APPS),
            social: to_map(DEFAULT_SOCIAL),
            contact: ContactInfo::default(),
            features: FeatureFlags::default(),
            debug: false,
            logging: LoggingConfig::default(),
            analytics: AnalyticsConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl SiteConfig {
    /// Reads `window.LunetixConfig`, falling back to defaults when it is
    /// missing or malformed.
    pub fn load() -> Self {
        match Self::from_window() {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Using default site configuration: {}", e);
                Self::default()
            }
        }
    }

    fn from_window() -> Result<Option<Self>, ConfigError> {
        let window = web_sys::window().ok_or(ConfigError::NoWindow)?;
        match window.get(CONFIG_GLOBAL) {
            Some(object) => Ok(Some(serde_wasm_bindgen::from_value(object.into())?)),
            None => Ok(None),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Console verbosity: debug mode wins over the configured level.
    pub fn log_level(&self) -> Level {
        if self.debug {
            return Level::Debug;
        }
        self.logging.level.parse().unwrap_or(Level::Info)
    }

    pub fn diagnostic_threshold(&self) -> Severity {
        if self.debug {
            return Severity::Debug;
        }
        self.logging.level.parse().unwrap_or(Severity::Info)
    }

    pub fn analytics_endpoint(&self) -> Option<&str> {
        self.analytics
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
    }

    pub fn logging_endpoint(&self) -> Option<&str> {
        self.logging
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
    }
}
