//! Turning raw page interactions into event properties.

use serde_json::json;

use crate::analytics::event::{properties, Properties};

const SCROLL_MILESTONES: [u32; 4] = [25, 50, 75, 90];

const PRODUCTS: &[(&str, &str)] = &[
    ("lunotes", "Lunotes"),
    ("lunotime", "Lunotime"),
    ("calcelix", "Calcelix"),
    ("lunomoney", "Lunomoney"),
    ("lunomove", "Lunomove"),
    ("lunosleep", "Lunosleep"),
    ("lunocare", "Lunocare"),
    ("lunohydra", "Lunohydra"),
];

pub fn scroll_depth_percent(scroll_y: f64, scroll_height: f64, viewport_height: f64) -> u32 {
    let scrollable = scroll_height - viewport_height;
    if scrollable <= 0.0 {
        return 100;
    }
    ((scroll_y / scrollable) * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Remembers the deepest milestone reported so each one fires at most once
/// per page load.
#[derive(Debug, Default, Clone)]
pub struct ScrollDepth {
    max_depth: u32,
    reported: u32,
}

impl ScrollDepth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, depth: u32) -> Option<u32> {
        if depth <= self.max_depth {
            return None;
        }
        self.max_depth = depth;
        let milestone = SCROLL_MILESTONES
            .iter()
            .rev()
            .copied()
            .find(|m| depth >= *m)?;
        if milestone <= self.reported {
            return None;
        }
        self.reported = milestone;
        Some(milestone)
    }
}

/// Seconds spent on the page while it was visible.
#[derive(Debug, Clone)]
pub struct TimeOnPage {
    started_at: i64,
    active: bool,
}

impl TimeOnPage {
    pub fn new(now_ms: i64) -> Self {
        Self {
            started_at: now_ms,
            active: true,
        }
    }

    /// Elapsed seconds, or `None` while the page is hidden.
    pub fn elapsed(&self, now_ms: i64) -> Option<i64> {
        self.active
            .then(|| ((now_ms - self.started_at) as f64 / 1000.0).round() as i64)
    }

    /// Reports the visible stretch that just ended.
    pub fn hide(&mut self, now_ms: i64) -> Option<i64> {
        let elapsed = self.elapsed(now_ms);
        self.active = false;
        elapsed
    }

    pub fn show(&mut self, now_ms: i64) {
        self.active = true;
        self.started_at = now_ms;
    }
}

pub fn time_on_page(seconds: i64) -> Properties {
    properties(json!({ "seconds": seconds }))
}

pub fn scroll_depth(depth: u32) -> Properties {
    properties(json!({ "depth": depth }))
}

pub fn is_product_link(href: &str) -> bool {
    href.contains("vercel.app")
}

pub fn product_name(url: &str) -> &'static str {
    PRODUCTS
        .iter()
        .find(|(needle, _)| url.contains(needle))
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// A clicked `a`, `button` or `.btn`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClickTarget {
    pub element_type: String,
    pub text: String,
    pub href: String,
    pub class: String,
}

impl ClickTarget {
    pub fn element_click(&self) -> Properties {
        properties(json!({
            "element_type": self.element_type,
            "element_text": self.text.trim(),
            "element_href": self.href,
            "element_class": self.class,
        }))
    }

    pub fn product_click(&self) -> Option<Properties> {
        is_product_link(&self.href).then(|| {
            properties(json!({
                "product_name": product_name(&self.href),
                "link_url": self.href,
            }))
        })
    }
}

pub fn form_submit(form_id: &str, form_action: &str) -> Properties {
    let or_unknown = |value: &str| {
        if value.is_empty() {
            "unknown".to_string()
        } else {
            value.to_string()
        }
    };
    properties(json!({
        "form_id": or_unknown(form_id),
        "form_action": or_unknown(form_action),
    }))
}
