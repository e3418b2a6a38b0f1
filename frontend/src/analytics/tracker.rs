use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analytics::consent::{ConsentGate, ConsentPrompt, ConsentStatus};
use crate::analytics::context::PageContextProvider;
use crate::analytics::event::{properties, EventContext, EventRecord, Properties};
use crate::analytics::identity::{clear_user_id, generate_session_id, load_or_create_user_id};
use crate::analytics::queue::PendingQueue;
use crate::analytics::sink::{DeliveryReport, EventSink};
use crate::config::SiteConfig;
use crate::storage::JsonStorage;
use crate::utils::now_millis;

/// What revoking consent does to the visitor's persisted identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokePolicy {
    /// Forget the user id; a new one is minted on the next page load.
    #[default]
    ClearIdentity,
    KeepIdentity,
}

#[derive(Debug)]
pub enum TrackOutcome {
    Sent(DeliveryReport),
    Queued { dropped: Option<EventRecord> },
}

/// Consent gate, pending queue and sink for one page load.
pub struct Tracker {
    enabled: bool,
    /// `features.analytics`. While off, consent answers are still recorded
    /// but nothing is transmitted.
    feature_on: bool,
    session_id: String,
    user_id: String,
    gate: ConsentGate,
    queue: PendingQueue,
    sink: EventSink,
    page: Box<dyn PageContextProvider>,
    storage: JsonStorage,
    revoke_policy: RevokePolicy,
}

impl Tracker {
    /// Starts enabled only when consent was granted earlier and the
    /// `analytics` feature is on.
    pub fn new(
        config: &SiteConfig,
        storage: JsonStorage,
        sink: EventSink,
        page: Box<dyn PageContextProvider>,
    ) -> Self {
        let now = now_millis();
        let gate = ConsentGate::load(storage.clone());
        let mut tracker = Self {
            enabled: false,
            feature_on: config.features.analytics,
            session_id: generate_session_id(now),
            user_id: load_or_create_user_id(&storage, now),
            gate,
            queue: PendingQueue::new(config.analytics.queue_capacity, config.analytics.overflow),
            sink,
            page,
            storage,
            revoke_policy: config.analytics.revoke,
        };
        if tracker.gate.status().is_granted() {
            tracker.enable();
        }
        tracker
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn feature_on(&self) -> bool {
        self.feature_on
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Starts transmitting and flushes the queue. A no-op while the
    /// `analytics` feature is off.
    pub fn enable(&mut self) {
        if !self.feature_on {
            log::debug!("Analytics feature is off, not enabling");
            return;
        }
        self.enabled = true;
        self.process_queue();
        log::info!("Analytics enabled");
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        log::info!("Analytics disabled");
    }

    fn context(&self) -> EventContext {
        EventContext {
            timestamp: now_millis(),
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            page: self.page.page_context(),
        }
    }

    pub fn track(&mut self, name: &str, properties: Properties) -> TrackOutcome {
        let record = EventRecord::new(name, properties, &self.context());
        if self.enabled {
            TrackOutcome::Sent(self.send(&record))
        } else {
            let dropped = self.queue.push(record);
            if let Some(dropped) = &dropped {
                log::debug!("Pending queue full, dropped `{}`", dropped.name());
            }
            TrackOutcome::Queued { dropped }
        }
    }

    fn send(&self, record: &EventRecord) -> DeliveryReport {
        let report = self.sink.deliver(record);
        for (transport, e) in &report.failures {
            log::warn!("Failed to send analytics event via {}: {}", transport, e);
        }
        report
    }

    /// Sends every pending record, oldest first. Records are not requeued
    /// when a transport fails.
    pub fn process_queue(&mut self) -> usize {
        let pending: Vec<EventRecord> = self.queue.drain().collect();
        for record in &pending {
            self.send(record);
        }
        pending.len()
    }

    pub fn consent_status(&self) -> ConsentStatus {
        self.gate.status()
    }

    /// Asks the visitor and records the answer. Tracking only starts when
    /// the answer is yes and the `analytics` feature is on.
    pub fn request_consent(&mut self, prompt: &dyn ConsentPrompt) -> bool {
        let granted = self.gate.prompt(prompt).is_granted();
        if granted {
            self.enable();
        }
        granted
    }

    /// Grants without asking, for an in-page consent control.
    pub fn grant_consent(&mut self) {
        self.gate.record(true);
        self.enable();
    }

    pub fn revoke_consent(&mut self) {
        self.gate.revoke();
        self.disable();
        if self.revoke_policy == RevokePolicy::ClearIdentity {
            clear_user_id(&self.storage);
        }
    }
}

/// Shared handle to the page's [`Tracker`], handed to components through
/// context.
#[derive(Clone)]
pub struct Analytics(Rc<RefCell<Tracker>>);

impl PartialEq for Analytics {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Analytics {
    pub fn new(tracker: Tracker) -> Self {
        Self(Rc::new(RefCell::new(tracker)))
    }

    /// Runs `f` against the tracker unless it is already borrowed further up
    /// the stack, in which case the call is dropped.
    fn with<R>(&self, f: impl FnOnce(&mut Tracker) -> R) -> Option<R> {
        match self.0.try_borrow_mut() {
            Ok(mut tracker) => Some(f(&mut tracker)),
            Err(_) => {
                log::warn!("Analytics is busy, dropping re-entrant call");
                None
            }
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Tracker) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn track(&self, name: &str, properties: Properties) {
        self.with(|t| t.track(name, properties));
    }

    pub fn track_page_view(&self, page: &str) {
        self.track("page_view", properties(json!({ "page": page })));
    }

    pub fn track_conversion(&self, kind: &str, value: f64) {
        self.track("conversion", properties(json!({ "type": kind, "value": value })));
    }

    pub fn track_user_engagement(&self, action: &str, category: Option<&str>) {
        self.track(
            "user_engagement",
            properties(json!({ "action": action, "category": category.unwrap_or("engagement") })),
        );
    }

    pub fn consent_status(&self) -> ConsentStatus {
        self.read(|t| t.consent_status())
    }

    pub fn request_consent(&self, prompt: &dyn ConsentPrompt) -> bool {
        self.with(|t| t.request_consent(prompt)).unwrap_or(false)
    }

    pub fn grant_consent(&self) {
        self.with(|t| t.grant_consent());
    }

    pub fn revoke_consent(&self) {
        self.with(|t| t.revoke_consent());
    }

    pub fn is_enabled(&self) -> bool {
        self.read(|t| t.is_enabled())
    }

    pub fn feature_on(&self) -> bool {
        self.read(|t| t.feature_on())
    }

    pub fn session_id(&self) -> String {
        self.read(|t| t.session_id().to_string())
    }

    pub fn user_id(&self) -> String {
        self.read(|t| t.user_id().to_string())
    }

    pub fn queue_len(&self) -> usize {
        self.read(|t| t.queue_len())
    }
}
