use serde_json::{json, Value};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Performance, PerformanceEntry, PerformanceNavigationTiming};

use crate::analytics::event::{properties, Properties};
use crate::diagnostics::logger::DiagnosticLog;

/// Navigation timestamps, in milliseconds from the start of navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavigationTimings {
    pub request_start: f64,
    pub response_start: f64,
    pub dom_interactive: f64,
    pub dom_content_loaded_start: f64,
    pub dom_content_loaded_end: f64,
    pub load_event_start: f64,
    pub load_event_end: f64,
}

fn span(start: f64, end: f64) -> i64 {
    (end - start).round() as i64
}

impl NavigationTimings {
    pub fn from_entry(entry: &PerformanceNavigationTiming) -> Self {
        Self {
            request_start: entry.request_start(),
            response_start: entry.response_start(),
            dom_interactive: entry.dom_interactive(),
            dom_content_loaded_start: entry.dom_content_loaded_event_start(),
            dom_content_loaded_end: entry.dom_content_loaded_event_end(),
            load_event_start: entry.load_event_start(),
            load_event_end: entry.load_event_end(),
        }
    }

    pub fn load_time(&self) -> i64 {
        span(self.load_event_start, self.load_event_end)
    }

    pub fn dom_content_loaded(&self) -> i64 {
        span(self.dom_content_loaded_start, self.dom_content_loaded_end)
    }

    pub fn first_byte(&self) -> i64 {
        span(self.request_start, self.response_start)
    }

    pub fn dom_interactive(&self) -> i64 {
        self.dom_interactive.round() as i64
    }

    /// Properties of the `page_performance` event.
    pub fn event_properties(&self) -> Properties {
        properties(json!({
            "load_time": self.load_time(),
            "dom_content_loaded": self.dom_content_loaded(),
            "first_byte": self.first_byte(),
        }))
    }

    /// Data of the "Page load performance" diagnostic entry.
    pub fn log_data(&self) -> Value {
        json!({
            "loadTime": self.load_time(),
            "domContentLoaded": self.dom_content_loaded(),
            "firstByte": self.first_byte(),
            "domInteractive": self.dom_interactive(),
        })
    }
}

fn performance() -> Option<Performance> {
    web_sys::window()?.performance()
}

/// Timings of the current document, once the navigation entry exists.
pub fn navigation_timings() -> Option<NavigationTimings> {
    performance()?
        .get_entries_by_type("navigation")
        .get(0)
        .dyn_into::<PerformanceNavigationTiming>()
        .ok()
        .map(|entry| NavigationTimings::from_entry(&entry))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measure {
    pub duration: f64,
    pub start: f64,
}

/// User timing marks and measures.
#[cfg_attr(test, mockall::automock)]
pub trait Timeline {
    fn mark(&self, name: &str) -> Result<(), String>;
    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> Result<Measure, String>;
}

/// `window.performance`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserTimeline;

fn js_reason(value: JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

impl Timeline for BrowserTimeline {
    fn mark(&self, name: &str) -> Result<(), String> {
        let performance = performance().ok_or("performance timeline unavailable")?;
        performance.mark(name).map(|_| ()).map_err(js_reason)
    }

    fn measure(&self, name: &str, start_mark: &str, end_mark: &str) -> Result<Measure, String> {
        let performance = performance().ok_or("performance timeline unavailable")?;
        performance
            .measure_with_start_mark_and_end_mark(name, start_mark, end_mark)
            .map(|_| ())
            .map_err(js_reason)?;
        let entry = performance
            .get_entries_by_name(name)
            .get(0)
            .dyn_into::<PerformanceEntry>()
            .map_err(|_| format!("no entry named `{}`", name))?;
        Ok(Measure {
            duration: entry.duration(),
            start: entry.start_time(),
        })
    }
}

impl DiagnosticLog {
    pub fn mark(&self, timeline: &dyn Timeline, name: &str) {
        match timeline.mark(name) {
            Ok(()) => {
                self.debug(&format!("Performance mark: {}", name), Value::Null);
            }
            Err(e) => log::debug!("Could not set mark {}: {}", name, e),
        }
    }

    /// Measures between two marks and records the duration.
    pub fn measure(
        &self,
        timeline: &dyn Timeline,
        name: &str,
        start_mark: &str,
        end_mark: &str,
    ) -> Option<f64> {
        match timeline.measure(name, start_mark, end_mark) {
            Ok(measure) => {
                self.info(
                    &format!("Performance measure: {}", name),
                    json!({ "duration": measure.duration, "start": measure.start }),
                );
                Some(measure.duration)
            }
            Err(e) => {
                self.warn(
                    &format!("Failed to measure performance: {}", name),
                    json!({ "error": e }),
                );
                None
            }
        }
    }

    pub fn log_page_load(&self, timings: &NavigationTimings) {
        self.info("Page load performance", timings.log_data());
    }
}
