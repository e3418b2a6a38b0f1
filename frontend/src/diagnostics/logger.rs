use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wasm_bindgen_futures::spawn_local;

use crate::analytics::context::PageContextProvider;
use crate::analytics::event::properties;
use crate::analytics::sink::{encode_body, post_json};
use crate::analytics::Analytics;
use crate::config::SiteConfig;
use crate::storage::JsonStorage;

pub const LOGS_KEY: &str = "lunetix_logs";
/// `log` target for the console echo of diagnostic entries.
pub const DIAGNOSTICS_TARGET: &str = "lunetix::diagnostics";
const MEMORY_CAPACITY: usize = 100;
const STORED_CAPACITY: usize = 50;

/// Ordered from most to least severe, so `level <= threshold` means "keep".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warn,
            log::Level::Info => Severity::Info,
            log::Level::Debug | log::Level::Trace => Severity::Debug,
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            other => Err(format!("unknown log level `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    pub level: Severity,
    pub message: String,
    pub data: Value,
    pub url: String,
    pub user_agent: String,
    pub session_id: String,
}

/// Recent diagnostic entries for one page load.
pub struct LogBook {
    threshold: Severity,
    entries: VecDeque<LogEntry>,
    storage: JsonStorage,
    page: Box<dyn PageContextProvider>,
    session_id: String,
    remote_endpoint: Option<String>,
}

impl LogBook {
    pub fn new(
        config: &SiteConfig,
        storage: JsonStorage,
        page: Box<dyn PageContextProvider>,
        session_id: String,
    ) -> Self {
        Self {
            threshold: config.diagnostic_threshold(),
            entries: VecDeque::with_capacity(MEMORY_CAPACITY),
            storage,
            page,
            session_id,
            remote_endpoint: config.logging_endpoint().map(str::to_string),
        }
    }

    pub fn record(&mut self, level: Severity, message: &str, data: Value) -> Option<LogEntry> {
        if level > self.threshold {
            return None;
        }
        let page = self.page.page_context();
        let entry = LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            message: message.to_string(),
            data,
            url: page.page_url,
            user_agent: page.user_agent,
            session_id: self.session_id.clone(),
        };

        self.entries.push_back(entry.clone());
        while self.entries.len() > MEMORY_CAPACITY {
            self.entries.pop_front();
        }
        self.store(&entry);
        Some(entry)
    }

    fn store(&self, entry: &LogEntry) {
        let mut stored = self.stored_entries();
        stored.push(entry.clone());
        let excess = stored.len().saturating_sub(STORED_CAPACITY);
        stored.drain(..excess);
        self.storage.set(LOGS_KEY, &stored);
    }

    pub fn entries(&self, level: Option<Severity>) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| level.map_or(true, |l| e.level == l))
            .cloned()
            .collect()
    }

    pub fn stored_entries(&self) -> Vec<LogEntry> {
        self.storage.get(LOGS_KEY).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.storage.remove(LOGS_KEY);
    }

    pub fn export(&self) -> Value {
        let page = self.page.page_context();
        json!({
            "current": self.entries(None),
            "stored": self.stored_entries(),
            "exported_at": chrono::Utc::now().to_rfc3339(),
            "user_agent": page.user_agent,
            "url": page.page_url,
        })
    }

    pub fn remote_endpoint(&self) -> Option<&str> {
        self.remote_endpoint.as_deref()
    }
}

/// Shared handle to the page's [`LogBook`]. Error entries are also reported
/// to analytics and to the remote logging endpoint.
#[derive(Clone)]
pub struct DiagnosticLog {
    book: Rc<RefCell<LogBook>>,
    analytics: Rc<RefCell<Option<Analytics>>>,
}

impl PartialEq for DiagnosticLog {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.book, &other.book)
    }
}

impl DiagnosticLog {
    pub fn new(book: LogBook) -> Self {
        Self {
            book: Rc::new(RefCell::new(book)),
            analytics: Rc::new(RefCell::new(None)),
        }
    }

    pub fn attach_analytics(&self, analytics: Analytics) {
        *self.analytics.borrow_mut() = Some(analytics);
    }

    pub fn log(&self, level: Severity, message: &str, data: Value) -> Option<LogEntry> {
        let target = DIAGNOSTICS_TARGET;
        match level {
            Severity::Error => log::error!(target: target, "{} {}", message, data),
            Severity::Warn => log::warn!(target: target, "{} {}", message, data),
            Severity::Info => log::info!(target: target, "{} {}", message, data),
            Severity::Debug => log::debug!(target: target, "{} {}", message, data),
        }
        self.capture(level, message, data)
    }

    /// Records an entry without echoing it to the console. Dropped when the
    /// book is already borrowed further up the stack.
    pub fn capture(&self, level: Severity, message: &str, data: Value) -> Option<LogEntry> {
        let entry = self.book.try_borrow_mut().ok()?.record(level, message, data)?;
        if level == Severity::Error {
            self.report(&entry);
        }
        Some(entry)
    }

    pub fn error(&self, message: &str, data: Value) -> Option<LogEntry> {
        self.log(Severity::Error, message, data)
    }

    pub fn warn(&self, message: &str, data: Value) -> Option<LogEntry> {
        self.log(Severity::Warn, message, data)
    }

    pub fn info(&self, message: &str, data: Value) -> Option<LogEntry> {
        self.log(Severity::Info, message, data)
    }

    pub fn debug(&self, message: &str, data: Value) -> Option<LogEntry> {
        self.log(Severity::Debug, message, data)
    }

    fn report(&self, entry: &LogEntry) {
        if let Some(analytics) = self.analytics.borrow().as_ref() {
            analytics.track(
                "error_logged",
                properties(json!({
                    "error_level": entry.level.as_str(),
                    "error_message": entry.message,
                    "error_data": entry.data.to_string(),
                })),
            );
        }

        let Some(endpoint) = self.book.borrow().remote_endpoint().map(str::to_string) else {
            return;
        };
        match encode_body("log_entry", entry) {
            Ok(body) => spawn_local(async move {
                if let Err(e) = post_json(&endpoint, body).await {
                    log::warn!("Failed to send log to remote: {}", e);
                }
            }),
            Err(e) => log::warn!("Failed to send log to remote: {}", e),
        }
    }

    pub fn entries(&self, level: Option<Severity>) -> Vec<LogEntry> {
        self.book.borrow().entries(level)
    }

    pub fn stored_entries(&self) -> Vec<LogEntry> {
        self.book.borrow().stored_entries()
    }

    pub fn clear(&self) {
        self.book.borrow_mut().clear();
    }

    pub fn export(&self) -> Value {
        self.book.borrow().export()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::consent::CONSENT_KEY;
    use crate::analytics::sink::EventSink;
    use crate::analytics::tracker::Tracker;
    use crate::storage::MemoryStore;
    use crate::test_support::{diagnostic_log as diagnostics, page, RecordingTransport};

    #[test]
    fn entries_below_threshold_are_ignored() {
        let (_, log) = diagnostics(&SiteConfig::default());

        assert!(log.debug("Performance mark: hero", Value::Null).is_none());
        let entry = log.info("Page load performance", json!({ "loadTime": 120 })).unwrap();

        assert_eq!(entry.level, Severity::Info);
        assert_eq!(entry.url, "https://lunetix.vercel.app/");
        assert_eq!(entry.session_id, "session_1_abcdefghi");
        assert_eq!(log.entries(None).len(), 1);
    }

    #[test]
    fn debug_mode_keeps_everything() {
        let mut config = SiteConfig::default();
        config.debug = true;
        let (_, log) = diagnostics(&config);

        log.debug("Performance mark: hero", Value::Null);
        log.warn("Slow image", Value::Null);

        assert_eq!(log.entries(None).len(), 2);
        assert_eq!(log.entries(Some(Severity::Warn)).len(), 1);
    }

    #[test]
    fn memory_and_storage_rings_are_bounded() {
        let (store, log) = diagnostics(&SiteConfig::default());
        for i in 0..120 {
            log.info(&format!("entry {}", i), Value::Null);
        }

        let current = log.entries(None);
        assert_eq!(current.len(), MEMORY_CAPACITY);
        assert_eq!(current[0].message, "entry 20");

        let stored = log.stored_entries();
        assert_eq!(stored.len(), STORED_CAPACITY);
        assert_eq!(stored[0].message, "entry 70");
        assert_eq!(stored[49].message, "entry 119");
        assert!(store.raw(LOGS_KEY).unwrap().contains("\"userAgent\""));
    }

    #[test]
    fn storage_failure_does_not_lose_memory_entries() {
        let (store, log) = diagnostics(&SiteConfig::default());
        store.set_fail_writes(true);

        assert!(log.warn("Quota exceeded", Value::Null).is_some());
        assert_eq!(log.entries(None).len(), 1);
        assert!(log.stored_entries().is_empty());
    }

    #[test]
    fn errors_are_forwarded_to_analytics() {
        let config = SiteConfig::default();
        let store = Rc::new(MemoryStore::new());
        let storage = JsonStorage::new(store.clone());
        storage.set(CONSENT_KEY, &true);
        let recorder = RecordingTransport::new();
        let analytics = Analytics::new(Tracker::new(
            &config,
            storage.clone(),
            EventSink::new().with(recorder.clone()),
            Box::new(page()),
        ));
        let log = DiagnosticLog::new(LogBook::new(
            &config,
            storage,
            Box::new(page()),
            analytics.session_id(),
        ));
        log.attach_analytics(analytics);

        log.warn("Not forwarded", Value::Null);
        log.error("JavaScript Error", json!({ "message": "x is undefined", "lineno": 3 }));

        let sent = recorder.delivered();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name(), "error_logged");
        assert_eq!(sent[0].property("error_level"), Some(&json!("ERROR")));
        assert_eq!(sent[0].property("error_message"), Some(&json!("JavaScript Error")));
        let data: Value =
            serde_json::from_str(sent[0].property("error_data").unwrap().as_str().unwrap()).unwrap();
        assert_eq!(data["lineno"], 3);
    }

    #[test]
    fn clear_and_export() {
        let (store, log) = diagnostics(&SiteConfig::default());
        log.info("one", Value::Null);

        let export = log.export();
        assert_eq!(export["current"].as_array().unwrap().len(), 1);
        assert_eq!(export["stored"].as_array().unwrap().len(), 1);
        assert_eq!(export["url"], "https://lunetix.vercel.app/");
        assert!(export["exported_at"].is_string());

        log.clear();
        assert!(log.entries(None).is_empty());
        assert!(store.raw(LOGS_KEY).is_none());
    }

    #[test]
    fn severity_parsing() {
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("debug".parse::<Severity>(), Ok(Severity::Debug));
        assert!("verbose".parse::<Severity>().is_err());
        assert!(Severity::Error < Severity::Debug);
        assert_eq!(Severity::from(log::Level::Trace), Severity::Debug);
    }

    #[test]
    fn capture_skips_a_busy_book() {
        let (_, log) = diagnostics(&SiteConfig::default());
        let _held = log.book.borrow_mut();
        assert!(log.capture(Severity::Warn, "nested", Value::Null).is_none());
    }
}
