use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
        }
    }
}

pub fn device_type(viewport_width: f64) -> DeviceType {
    if viewport_width < 768.0 {
        DeviceType::Mobile
    } else if viewport_width < 1024.0 {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Lets one call through, then rejects calls until `interval_ms` has passed.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: i64,
    last: Option<i64>,
}

impl Throttle {
    pub fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms,
            last: None,
        }
    }

    pub fn ready(&mut self, now_ms: i64) -> bool {
        match self.last {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last = Some(now_ms);
                true
            }
        }
    }
}
