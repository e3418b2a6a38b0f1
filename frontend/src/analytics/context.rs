use wasm_bindgen::JsValue;

use crate::utils::{device_type, DeviceType};

/// What the page looks like at the moment an event is tracked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageContext {
    pub page_url: String,
    pub page_title: String,
    pub referrer: String,
    pub user_agent: String,
    pub screen: (i32, i32),
    pub viewport: (f64, f64),
    pub is_touch_device: bool,
}

impl PageContext {
    pub fn screen_resolution(&self) -> String {
        format!("{}x{}", self.screen.0, self.screen.1)
    }

    pub fn viewport_size(&self) -> String {
        format!("{}x{}", self.viewport.0.round(), self.viewport.1.round())
    }

    pub fn device_type(&self) -> DeviceType {
        device_type(self.viewport.0)
    }
}

pub trait PageContextProvider {
    fn page_context(&self) -> PageContext;
}

impl PageContextProvider for PageContext {
    fn page_context(&self) -> PageContext {
        self.clone()
    }
}

/// Reads the live document, window and navigator. Anything the browser
/// refuses to tell us is left empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserPage;

fn dimension(value: Result<JsValue, JsValue>) -> f64 {
    value.ok().and_then(|v| v.as_f64()).unwrap_or_default()
}

impl PageContextProvider for BrowserPage {
    fn page_context(&self) -> PageContext {
        let Some(window) = web_sys::window() else {
            return PageContext::default();
        };
        let document = window.document();
        let navigator = window.navigator();

        let screen = window
            .screen()
            .ok()
            .map(|s| (s.width().unwrap_or_default(), s.height().unwrap_or_default()))
            .unwrap_or_default();

        let has_touch_handler =
            js_sys::Reflect::has(&window, &JsValue::from_str("ontouchstart")).unwrap_or(false);

        PageContext {
            page_url: window.location().href().unwrap_or_default(),
            page_title: document.as_ref().map(|d| d.title()).unwrap_or_default(),
            referrer: document.as_ref().map(|d| d.referrer()).unwrap_or_default(),
            user_agent: navigator.user_agent().unwrap_or_default(),
            screen,
            viewport: (dimension(window.inner_width()), dimension(window.inner_height())),
            is_touch_device: has_touch_handler || navigator.max_touch_points() > 0,
        }
    }
}
