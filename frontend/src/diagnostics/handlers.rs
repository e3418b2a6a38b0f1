use serde_json::json;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, ErrorEvent, HtmlAnchorElement, PromiseRejectionEvent, Url};

use gloo_timers::callback::Timeout;

use crate::analytics::event::properties;
use crate::analytics::listeners::listen;
use crate::analytics::Analytics;
use crate::diagnostics::logger::DiagnosticLog;
use crate::diagnostics::performance::navigation_timings;
use crate::utils::now_millis;

fn describe(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", value)
}

/// Turns uncaught errors and unhandled rejections into diagnostic entries
/// and `javascript_error` events, and logs page load timings.
pub fn install_global_handlers(diagnostics: &DiagnosticLog, analytics: &Analytics) {
    let Some(window) = web_sys::window() else {
        return;
    };

    {
        let diagnostics = diagnostics.clone();
        let analytics = analytics.clone();
        let on_error = Closure::wrap(Box::new(move |event: ErrorEvent| {
            let stack = event
                .error()
                .dyn_ref::<js_sys::Error>()
                .and_then(|e| js_sys::Reflect::get(e, &JsValue::from_str("stack")).ok())
                .and_then(|s| s.as_string());
            let details = json!({
                "message": event.message(),
                "filename": event.filename(),
                "lineno": event.lineno(),
                "colno": event.colno(),
            });
            analytics.track("javascript_error", properties(details.clone()));

            let mut data = details;
            data["stack"] = json!(stack);
            diagnostics.error("JavaScript Error", data);
        }) as Box<dyn FnMut(ErrorEvent)>);
        if let Err(e) =
            window.add_event_listener_with_callback("error", on_error.as_ref().unchecked_ref())
        {
            log::warn!("Could not install error handler: {:?}", e);
        }
        on_error.forget();
    }

    {
        let diagnostics = diagnostics.clone();
        let on_rejection = Closure::wrap(Box::new(move |event: PromiseRejectionEvent| {
            diagnostics.error(
                "Unhandled Promise Rejection",
                json!({ "reason": describe(&event.reason()) }),
            );
        }) as Box<dyn FnMut(PromiseRejectionEvent)>);
        if let Err(e) = window.add_event_listener_with_callback(
            "unhandledrejection",
            on_rejection.as_ref().unchecked_ref(),
        ) {
            log::warn!("Could not install rejection handler: {:?}", e);
        }
        on_rejection.forget();
    }

    let diagnostics = diagnostics.clone();
    listen(&window, "load", move |_| {
        let diagnostics = diagnostics.clone();
        Timeout::new(0, move || {
            if let Some(timings) = navigation_timings() {
                diagnostics.log_page_load(&timings);
            }
        })
        .forget();
    });
}

/// Offers the diagnostic export as a JSON download.
pub fn download_export(diagnostics: &DiagnosticLog) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?;

    let export = serde_json::to_string_pretty(&diagnostics.export())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let parts = js_sys::Array::of1(&JsValue::from_str(&export));
    let mut options = BlobPropertyBag::new();
    options.type_("application/json");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let link: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    link.set_href(&url);
    link.set_download(&format!("lunetix-logs-{}.json", now_millis()));
    body.append_child(&link)?;
    link.click();
    body.remove_child(&link)?;
    Url::revoke_object_url(&url)
}
