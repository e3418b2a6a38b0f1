use std::cell::RefCell;
use std::rc::Rc;

use crate::analytics::context::PageContext;
use crate::analytics::event::{EventContext, EventRecord, Properties};
use crate::analytics::sink::{Transport, TransportError};
use crate::config::SiteConfig;
use crate::diagnostics::logger::{DiagnosticLog, LogBook};
use crate::diagnostics::site_logger;
use crate::storage::{JsonStorage, MemoryStore};

pub fn page() -> PageContext {
    PageContext {
        page_url: "https://lunetix.vercel.app/".to_string(),
        page_title: "Lunetix".to_string(),
        referrer: String::new(),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
        screen: (1920, 1080),
        viewport: (1440.0, 900.0),
        is_touch_device: false,
    }
}

pub fn record(name: &str, properties: Properties) -> EventRecord {
    let context = EventContext {
        timestamp: 1_700_000_000_000,
        session_id: "session_1700000000000_abcdefghi".to_string(),
        user_id: "user_1700000000000_jklmnopqr".to_string(),
        page: page(),
    };
    EventRecord::new(name, properties, &context)
}

/// Keeps every delivered record. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    delivered: Rc<RefCell<Vec<EventRecord>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<EventRecord> {
        self.delivered.borrow().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.delivered
            .borrow()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.delivered.borrow().len()
    }
}

impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, record: &EventRecord) -> Result<(), TransportError> {
        self.delivered.borrow_mut().push(record.clone());
        Ok(())
    }
}

pub struct FailingTransport;

impl Transport for FailingTransport {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn deliver(&self, _record: &EventRecord) -> Result<(), TransportError> {
        Err(TransportError::Network {
            endpoint: "https://collect.example.com".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

pub fn diagnostic_log(config: &SiteConfig) -> (Rc<MemoryStore>, DiagnosticLog) {
    let store = Rc::new(MemoryStore::new());
    let book = LogBook::new(
        config,
        JsonStorage::new(store.clone()),
        Box::new(page()),
        "session_1_abcdefghi".to_string(),
    );
    (store, DiagnosticLog::new(book))
}

/// Routes this thread's `log` warnings and errors into `diagnostics`.
pub fn capture_logs(diagnostics: &DiagnosticLog) {
    let _ = site_logger::init(log::Level::Debug);
    log::set_max_level(log::LevelFilter::Debug);
    site_logger::forward_to(Some(diagnostics.clone()));
}
