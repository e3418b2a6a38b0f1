use gloo_net::http::Request;
use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;

use crate::analytics::event::EventRecord;
use crate::config::SiteConfig;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode `{event}`: {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("request to {endpoint} failed: {reason}")]
    Network { endpoint: String, reason: String },
    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("tag function failed: {0}")]
    Tag(String),
}

/// One destination for finalized events.
pub trait Transport {
    fn name(&self) -> &'static str;

    /// Hands the record over. `Ok` means the hand-off happened, not that the
    /// far end received it.
    fn deliver(&self, record: &EventRecord) -> Result<(), TransportError>;
}

/// Outcome of fanning one record out to every transport.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub failures: Vec<(&'static str, TransportError)>,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
pub struct EventSink {
    transports: Vec<Box<dyn Transport>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag function and HTTP endpoint when configured, console in debug mode.
    pub fn from_config(config: &SiteConfig) -> Self {
        let mut sink = Self::new().with(TagTransport);
        if let Some(endpoint) = config.analytics_endpoint() {
            sink = sink.with(HttpTransport::new(endpoint));
        }
        if config.debug {
            sink = sink.with(ConsoleTransport);
        }
        sink
    }

    pub fn with(mut self, transport: impl Transport + 'static) -> Self {
        self.push(Box::new(transport));
        self
    }

    pub fn push(&mut self, transport: Box<dyn Transport>) {
        self.transports.push(transport);
    }

    pub fn len(&self) -> usize {
        self.transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Every transport gets the record regardless of how the others fared.
    pub fn deliver(&self, record: &EventRecord) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for transport in &self.transports {
            report.attempted += 1;
            if let Err(e) = transport.deliver(record) {
                report.failures.push((transport.name(), e));
            }
        }
        report
    }
}

/// Calls `window.gtag('event', name, properties)` when the page loaded a tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagTransport;

impl Transport for TagTransport {
    fn name(&self) -> &'static str {
        "gtag"
    }

    fn deliver(&self, record: &EventRecord) -> Result<(), TransportError> {
        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let gtag = js_sys::Reflect::get(&window, &JsValue::from_str("gtag"))
            .map_err(|e| TransportError::Tag(format!("{:?}", e)))?;
        let Some(gtag) = gtag.dyn_ref::<js_sys::Function>() else {
            return Ok(());
        };

        let properties = record
            .properties()
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| TransportError::Tag(e.to_string()))?;
        gtag.call3(
            &JsValue::NULL,
            &JsValue::from_str("event"),
            &JsValue::from_str(record.name()),
            &properties,
        )
        .map(|_| ())
        .map_err(|e| TransportError::Tag(format!("{:?}", e)))
    }
}

pub fn encode_body<T: Serialize>(event: &str, body: &T) -> Result<String, TransportError> {
    serde_json::to_string(body).map_err(|source| TransportError::Encode {
        event: event.to_string(),
        source,
    })
}

/// POSTs a JSON body and reports how it went.
pub async fn post_json(endpoint: &str, body: String) -> Result<(), TransportError> {
    let response = Request::post(endpoint)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| TransportError::Network {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
    if !response.ok() {
        return Err(TransportError::Status {
            endpoint: endpoint.to_string(),
            status: response.status(),
        });
    }
    Ok(())
}

/// Fire-and-forget POST of the event to a collector. Network failures are
/// logged from the spawned task and never retried.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn deliver(&self, record: &EventRecord) -> Result<(), TransportError> {
        let body = encode_body(record.name(), record)?;
        let endpoint = self.endpoint.clone();
        spawn_local(async move {
            if let Err(e) = post_json(&endpoint, body).await {
                log::warn!("Failed to send analytics event: {}", e);
            }
        });
        Ok(())
    }
}

/// Prints each event to the browser console.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTransport;

impl Transport for ConsoleTransport {
    fn name(&self) -> &'static str {
        "console"
    }

    fn deliver(&self, record: &EventRecord) -> Result<(), TransportError> {
        let body = encode_body(record.name(), record)?;
        gloo_console::log!("Analytics Event:", body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::event::{properties, Properties};
    use crate::test_support::{record, FailingTransport, RecordingTransport};
    use serde_json::json;

    #[test]
    fn fans_out_to_every_transport() {
        let first = RecordingTransport::new();
        let second = RecordingTransport::new();
        let sink = EventSink::new().with(first.clone()).with(second.clone());

        let report = sink.deliver(&record("page_view", Properties::new()));

        assert_eq!(report.attempted, 2);
        assert!(report.is_success());
        assert_eq!(first.names(), ["page_view"]);
        assert_eq!(second.names(), ["page_view"]);
    }

    #[test]
    fn failing_transport_does_not_block_others() {
        let recorder = RecordingTransport::new();
        let sink = EventSink::new()
            .with(FailingTransport)
            .with(recorder.clone());

        let report = sink.deliver(&record("conversion", properties(json!({ "type": "signup" }))));

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "failing");
        assert_eq!(recorder.names(), ["conversion"]);
    }

    #[test]
    fn empty_sink_is_a_no_op() {
        let sink = EventSink::new();
        let report = sink.deliver(&record("page_view", Properties::new()));
        assert_eq!(report.attempted, 0);
        assert!(report.is_success());
    }

    #[test]
    fn endpoint_transport_only_when_configured() {
        let mut config = SiteConfig::default();
        assert_eq!(EventSink::from_config(&config).len(), 1);

        config.analytics.endpoint = Some("https://collect.example.com/events".to_string());
        config.debug = true;
        assert_eq!(EventSink::from_config(&config).len(), 3);
    }

    #[test]
    fn body_is_event_and_properties() {
        let record = record("page_view", properties(json!({ "page": "/" })));
        let body: serde_json::Value =
            serde_json::from_str(&encode_body(record.name(), &record).unwrap()).unwrap();

        assert_eq!(body["event"], "page_view");
        assert_eq!(body["properties"]["page"], "/");
        assert_eq!(body.as_object().unwrap().len(), 2);
    }
}
