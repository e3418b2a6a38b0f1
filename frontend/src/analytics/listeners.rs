use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlAnchorElement, HtmlFormElement, Window};

use crate::analytics::consent::{BrowserConfirm, ConsentStatus};
use crate::analytics::event::Properties;
use crate::analytics::interactions::{
    form_submit, scroll_depth, scroll_depth_percent, time_on_page, ClickTarget, ScrollDepth,
    TimeOnPage,
};
use crate::analytics::tracker::Analytics;
use crate::diagnostics::performance::navigation_timings;
use crate::utils::{now_millis, Throttle};

const TIME_ON_PAGE_INTERVAL_MS: u32 = 30_000;
const SCROLL_THROTTLE_MS: i64 = 1_000;
const CLICK_SELECTOR: &str = "a, button, .btn";

/// Registers a page-lifetime listener. The closure is leaked on purpose:
/// it must live as long as the document.
pub fn listen(target: &web_sys::EventTarget, event: &str, handler: impl FnMut(Event) + 'static) {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    if let Err(e) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
        log::warn!("Could not listen for {}: {:?}", event, e);
    }
    closure.forget();
}

/// Wires page view, scroll depth, time on page, click and form tracking.
pub fn install(analytics: &Analytics) {
    let Some(window) = web_sys::window() else {
        return;
    };

    analytics.track("page_view", Properties::new());
    install_scroll_depth(&window, analytics.clone());
    install_time_on_page(&window, analytics.clone());
    install_clicks(&window, analytics.clone());
    install_forms(&window, analytics.clone());
    install_page_performance(&window, analytics.clone());
}

fn install_scroll_depth(window: &Window, analytics: Analytics) {
    let mut throttle = Throttle::new(SCROLL_THROTTLE_MS);
    let mut depth = ScrollDepth::new();
    let win = window.clone();
    listen(window, "scroll", move |_| {
        if !throttle.ready(now_millis()) {
            return;
        }
        let Some(body) = win.document().and_then(|d| d.body()) else {
            return;
        };
        let scroll_y = win.scroll_y().unwrap_or_default();
        let viewport = win
            .inner_height()
            .ok()
            .and_then(|h| h.as_f64())
            .unwrap_or_default();
        let percent = scroll_depth_percent(scroll_y, f64::from(body.scroll_height()), viewport);
        if let Some(milestone) = depth.observe(percent) {
            analytics.track("scroll_depth", scroll_depth(milestone));
        }
    });
}

fn install_time_on_page(window: &Window, analytics: Analytics) {
    let clock = Rc::new(RefCell::new(TimeOnPage::new(now_millis())));

    {
        let clock = clock.clone();
        let analytics = analytics.clone();
        Interval::new(TIME_ON_PAGE_INTERVAL_MS, move || {
            if let Some(seconds) = clock.borrow().elapsed(now_millis()) {
                analytics.track("time_on_page", time_on_page(seconds));
            }
        })
        .forget();
    }

    if let Some(document) = window.document() {
        let clock = clock.clone();
        let analytics = analytics.clone();
        let doc = document.clone();
        listen(&document, "visibilitychange", move |_| {
            let mut clock = clock.borrow_mut();
            if doc.hidden() {
                if let Some(seconds) = clock.hide(now_millis()) {
                    analytics.track("time_on_page", time_on_page(seconds));
                }
            } else {
                clock.show(now_millis());
            }
        });
    }

    listen(window, "beforeunload", move |_| {
        if let Some(seconds) = clock.borrow().elapsed(now_millis()) {
            analytics.track("time_on_page", time_on_page(seconds));
        }
    });
}

fn click_target(event: &Event) -> Option<ClickTarget> {
    let element = event.target()?.dyn_into::<Element>().ok()?;
    let target = element.closest(CLICK_SELECTOR).ok()??;
    let href = target
        .dyn_ref::<HtmlAnchorElement>()
        .map(|a| a.href())
        .unwrap_or_default();
    Some(ClickTarget {
        element_type: target.tag_name().to_lowercase(),
        text: target.text_content().unwrap_or_default(),
        href,
        class: target.class_name(),
    })
}

fn install_clicks(window: &Window, analytics: Analytics) {
    let Some(document) = window.document() else {
        return;
    };
    listen(&document, "click", move |event| {
        let Some(target) = click_target(&event) else {
            return;
        };
        analytics.track("element_click", target.element_click());
        if let Some(product) = target.product_click() {
            analytics.track("product_click", product);
        }
    });
}

fn install_forms(window: &Window, analytics: Analytics) {
    let Some(document) = window.document() else {
        return;
    };
    listen(&document, "submit", move |event| {
        let Some(form) = event
            .target()
            .and_then(|t| t.dyn_into::<HtmlFormElement>().ok())
        else {
            return;
        };
        analytics.track("form_submit", form_submit(&form.id(), &form.action()));
    });
}

/// `page_performance` once the load event has finished.
fn install_page_performance(window: &Window, analytics: Analytics) {
    listen(window, "load", move |_| {
        let analytics = analytics.clone();
        Timeout::new(0, move || {
            if let Some(timings) = navigation_timings() {
                analytics.track("page_performance", timings.event_properties());
            }
        })
        .forget();
    });
}

pub fn should_prompt(analytics: &Analytics) -> bool {
    analytics.feature_on() && analytics.consent_status() == ConsentStatus::Unset
}

/// Asks once, after `delay_ms`, when the visitor has never answered and the
/// `analytics` feature is on.
pub fn schedule_consent_prompt(analytics: &Analytics, delay_ms: u32) {
    if !should_prompt(analytics) {
        return;
    }
    let analytics = analytics.clone();
    Timeout::new(delay_ms, move || {
        if should_prompt(&analytics) {
            analytics.request_consent(&BrowserConfirm);
        }
    })
    .forget();
}
