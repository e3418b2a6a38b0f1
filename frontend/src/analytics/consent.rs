use std::cell::Cell;

use crate::storage::JsonStorage;

pub const CONSENT_KEY: &str = "analytics_consent";

pub const CONSENT_MESSAGE: &str =
    "This website uses analytics to improve user experience. Do you consent to analytics tracking?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentStatus {
    Granted,
    Denied,
    /// Never asked. Not granted, but the visitor should be prompted once.
    Unset,
}

impl ConsentStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, ConsentStatus::Granted)
    }

    fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => ConsentStatus::Granted,
            Some(false) => ConsentStatus::Denied,
            None => ConsentStatus::Unset,
        }
    }
}

/// A blocking yes/no question put to the visitor.
#[cfg_attr(test, mockall::automock)]
pub trait ConsentPrompt {
    fn ask(&self, message: &str) -> bool;
}

/// `window.confirm`. A missing window or a blocked dialog counts as "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserConfirm;

impl ConsentPrompt for BrowserConfirm {
    fn ask(&self, message: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(message).ok())
            .unwrap_or(false)
    }
}

/// Persisted consent flag. The in-memory copy is authoritative for the page
/// load, so a failed write still changes the answer for this visit.
pub struct ConsentGate {
    storage: JsonStorage,
    current: Cell<ConsentStatus>,
}

impl ConsentGate {
    pub fn load(storage: JsonStorage) -> Self {
        let current = ConsentStatus::from_flag(storage.get::<bool>(CONSENT_KEY));
        Self {
            storage,
            current: Cell::new(current),
        }
    }

    pub fn status(&self) -> ConsentStatus {
        self.current.get()
    }

    /// Records an explicit answer. There is no way back to `Unset`.
    pub fn record(&self, granted: bool) -> ConsentStatus {
        let status = ConsentStatus::from_flag(Some(granted));
        self.current.set(status);
        if !self.storage.set(CONSENT_KEY, &granted) {
            log::warn!(
                "Could not persist `{}`, consent kept in memory for this page load",
                CONSENT_KEY
            );
        }
        status
    }

    pub fn prompt(&self, prompt: &dyn ConsentPrompt) -> ConsentStatus {
        let granted = prompt.ask(CONSENT_MESSAGE);
        self.record(granted)
    }

    pub fn revoke(&self) -> ConsentStatus {
        self.record(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::diagnostics::logger::Severity;
    use crate::diagnostics::site_logger::forward_to;
    use crate::storage::MemoryStore;
    use crate::test_support::{capture_logs, diagnostic_log};
    use std::rc::Rc;

    fn gate() -> (Rc<MemoryStore>, ConsentGate) {
        let store = Rc::new(MemoryStore::new());
        let gate = ConsentGate::load(JsonStorage::new(store.clone()));
        (store, gate)
    }

    #[test]
    fn absent_flag_is_unset() {
        let (_, gate) = gate();
        assert_eq!(gate.status(), ConsentStatus::Unset);
        assert!(!gate.status().is_granted());
    }

    #[test]
    fn loads_persisted_answer() {
        let store = Rc::new(MemoryStore::new());
        JsonStorage::new(store.clone()).set(CONSENT_KEY, &true);
        let gate = ConsentGate::load(JsonStorage::new(store));
        assert_eq!(gate.status(), ConsentStatus::Granted);
    }

    #[test]
    fn prompt_answer_is_persisted() {
        let (store, gate) = gate();
        let mut prompt = MockConsentPrompt::new();
        prompt
            .expect_ask()
            .withf(|message| message == CONSENT_MESSAGE)
            .times(1)
            .return_const(true);

        assert_eq!(gate.prompt(&prompt), ConsentStatus::Granted);
        assert_eq!(store.raw(CONSENT_KEY).as_deref(), Some("true"));

        assert_eq!(gate.revoke(), ConsentStatus::Denied);
        assert_eq!(store.raw(CONSENT_KEY).as_deref(), Some("false"));
    }

    #[test]
    fn failed_write_keeps_in_memory_answer() {
        let (store, gate) = gate();
        store.set_fail_writes(true);

        assert_eq!(gate.record(true), ConsentStatus::Granted);
        assert_eq!(gate.status(), ConsentStatus::Granted);
        assert!(store.raw(CONSENT_KEY).is_none());
    }

    #[test]
    fn failed_write_logs_a_warning_naming_the_key() {
        let (_, diagnostics) = diagnostic_log(&SiteConfig::default());
        capture_logs(&diagnostics);
        let (store, gate) = gate();
        store.set_fail_writes(true);

        gate.record(false);
        forward_to(None);

        let warnings = diagnostics.entries(Some(Severity::Warn));
        assert!(!warnings.is_empty());
        assert!(warnings.iter().all(|e| e.message.contains(CONSENT_KEY)));
    }
}
