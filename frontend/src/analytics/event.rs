use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analytics::context::PageContext;

pub type Properties = Map<String, Value>;

/// Turns a `json!({...})` literal into a property map. Anything that is
/// not an object is kept under a single `value` key.
pub fn properties(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        Value::Null => Properties::new(),
        other => {
            let mut map = Properties::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Fields stamped onto every event when it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub timestamp: i64,
    pub session_id: String,
    pub user_id: String,
    pub page: PageContext,
}

impl EventContext {
    fn apply(&self, properties: &mut Properties) {
        let page = &self.page;
        let fields: [(&str, Value); 11] = [
            ("timestamp", self.timestamp.into()),
            ("session_id", self.session_id.clone().into()),
            ("user_id", self.user_id.clone().into()),
            ("page_url", page.page_url.clone().into()),
            ("page_title", page.page_title.clone().into()),
            ("referrer", page.referrer.clone().into()),
            ("user_agent", page.user_agent.clone().into()),
            ("screen_resolution", page.screen_resolution().into()),
            ("viewport_size", page.viewport_size().into()),
            ("device_type", page.device_type().as_str().into()),
            ("is_touch_device", page.is_touch_device.into()),
        ];
        for (key, value) in fields {
            properties.insert(key.to_string(), value);
        }
    }
}

/// One tracked user action. Serializes to the wire body
/// `{ "event": ..., "properties": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    event: String,
    properties: Properties,
}

impl EventRecord {
    pub fn new(name: impl Into<String>, mut properties: Properties, context: &EventContext) -> Self {
        context.apply(&mut properties);
        Self {
            event: name.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.event
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> EventContext {
        EventContext {
            timestamp: 1_700_000_000_000,
            session_id: "session_1_abc".to_string(),
            user_id: "user_1_def".to_string(),
            page: PageContext {
                page_url: "https://lunetix.vercel.app/".to_string(),
                viewport: (390.0, 844.0),
                is_touch_device: true,
                ..PageContext::default()
            },
        }
    }

    #[test]
    fn merges_context_into_caller_properties() {
        let record = EventRecord::new(
            "conversion",
            properties(json!({ "type": "signup", "value": 0 })),
            &context(),
        );

        assert_eq!(record.name(), "conversion");
        assert_eq!(record.property("type"), Some(&json!("signup")));
        assert_eq!(record.property("value"), Some(&json!(0)));
        assert_eq!(record.property("session_id"), Some(&json!("session_1_abc")));
        assert_eq!(record.property("device_type"), Some(&json!("mobile")));
        assert_eq!(record.property("is_touch_device"), Some(&json!(true)));
    }

    #[test]
    fn context_wins_over_caller_keys() {
        let record = EventRecord::new(
            "page_view",
            properties(json!({ "user_id": "spoofed", "timestamp": 0 })),
            &context(),
        );
        assert_eq!(record.property("user_id"), Some(&json!("user_1_def")));
        assert_eq!(record.property("timestamp"), Some(&json!(1_700_000_000_000_i64)));
    }

    #[test]
    fn wire_body_shape() {
        let record = EventRecord::new("page_view", Properties::new(), &context());
        let body: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(body["event"], "page_view");
        assert_eq!(body["properties"]["page_url"], "https://lunetix.vercel.app/");
    }

    #[test]
    fn non_object_properties_are_wrapped() {
        assert!(properties(Value::Null).is_empty());
        assert_eq!(properties(json!(3))["value"], json!(3));
    }
}
