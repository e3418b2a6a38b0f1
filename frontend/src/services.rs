use std::rc::Rc;

use crate::analytics::context::BrowserPage;
use crate::analytics::sink::EventSink;
use crate::analytics::tracker::Tracker;
use crate::analytics::Analytics;
use crate::config::SiteConfig;
use crate::diagnostics::{DiagnosticLog, LogBook};
use crate::storage::{JsonStorage, LocalStorage};

/// Everything components need, built once in `main` and handed down through
/// props and context.
#[derive(Clone)]
pub struct Services {
    pub config: Rc<SiteConfig>,
    pub storage: JsonStorage,
    pub analytics: Analytics,
    pub diagnostics: DiagnosticLog,
}

impl PartialEq for Services {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.config, &other.config)
            && self.analytics == other.analytics
            && self.diagnostics == other.diagnostics
    }
}

impl Services {
    pub fn new(config: SiteConfig, storage: JsonStorage) -> Self {
        let analytics = Analytics::new(Tracker::new(
            &config,
            storage.clone(),
            EventSink::from_config(&config),
            Box::new(BrowserPage),
        ));
        let diagnostics = DiagnosticLog::new(LogBook::new(
            &config,
            storage.clone(),
            Box::new(BrowserPage),
            analytics.session_id(),
        ));
        diagnostics.attach_analytics(analytics.clone());

        Self {
            config: Rc::new(config),
            storage,
            analytics,
            diagnostics,
        }
    }

    pub fn browser(config: SiteConfig) -> Self {
        Self::new(config, JsonStorage::new(Rc::new(LocalStorage)))
    }
}
