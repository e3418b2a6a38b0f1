use yew::prelude::*;
use yew_router::prelude::*;
use log::info;
use web_sys::MouseEvent;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

mod config;
mod services;
mod storage;
mod utils;
mod analytics {
    pub mod consent;
    pub mod context;
    pub mod event;
    pub mod identity;
    pub mod interactions;
    pub mod listeners;
    pub mod queue;
    pub mod sink;
    pub mod tracker;

    pub use consent::ConsentStatus;
    pub use tracker::Analytics;
}
mod diagnostics {
    pub mod handlers;
    pub mod logger;
    pub mod performance;
    pub mod site_logger;

    pub use logger::{DiagnosticLog, LogBook};
}
mod i18n {
    pub mod language;

    pub use language::Language;
}
mod pages {
    pub mod home;
    pub mod privacy;
}
mod components {
    pub mod language;
}
#[cfg(test)]
mod test_support;

use config::SiteConfig;
use diagnostics::performance::BrowserTimeline;
use services::Services;
use pages::{
    home::Home,
    privacy::Privacy,
};
use components::language::{Bilingual, LanguageProvider, LanguageSwitcher};

/// Past this many pixels the navbar switches to its solid background.
const NAV_SHADE_THRESHOLD: i32 = 50;

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/privacy")]
    Privacy,
    #[not_found]
    #[at("/404")]
    NotFound,
}


fn switch(routes: Route) -> Html {
    match routes {
        Route::Home => {
            info!("Rendering Home page");
            html! { <Home /> }
        },
        Route::Privacy => {
            info!("Rendering Privacy page");
            html! { <Privacy /> }
        },
        Route::NotFound => {
            html! { <Redirect<Route> to={Route::Home} /> }
        },
    }
}


#[function_component(Nav)]
pub fn nav() -> Html {
    let menu_open = use_state(|| false);
    let is_scrolled = use_state(|| false);

    {
        let is_scrolled = is_scrolled.clone();
        use_effect_with_deps(move |_| {
            let window = web_sys::window();
            let scroll_callback = window.as_ref().map(|window| {
                let win = window.clone();
                let callback = Closure::wrap(Box::new(move || {
                    let scroll_top = win
                        .document()
                        .and_then(|d| d.document_element())
                        .map(|el| el.scroll_top())
                        .unwrap_or_default();
                    is_scrolled.set(scroll_top > NAV_SHADE_THRESHOLD);
                }) as Box<dyn FnMut()>);
                let _ = window.add_event_listener_with_callback("scroll", callback.as_ref().unchecked_ref());
                callback
            });

            move || {
                if let (Some(window), Some(callback)) = (window, scroll_callback) {
                    let _ = window.remove_event_listener_with_callback("scroll", callback.as_ref().unchecked_ref());
                }
            }
        }, ());
    }

    let toggle_menu = {
        let menu_open = menu_open.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            menu_open.set(!*menu_open);
        })
    };

    let close_menu = {
        let menu_open = menu_open.clone();
        Callback::from(move |_: MouseEvent| {
            menu_open.set(false);
        })
    };

    let menu_class = if *menu_open {
        "nav-right mobile-menu-open"
    } else {
        "nav-right"
    };

    html! {
        <nav class={classes!("top-nav", (*is_scrolled).then(|| "scrolled"))}>
            <div class="nav-content">
                <Link<Route> to={Route::Home} classes="nav-logo">
                    {"lunetix"}
                </Link<Route>>

                <button class="burger-menu" onclick={toggle_menu}>
                    <span></span>
                    <span></span>
                    <span></span>
                </button>
                <div class={menu_class}>
                    <div onclick={close_menu.clone()}>
                        <Link<Route> to={Route::Home} classes="nav-link">
                            <Bilingual id="Beranda" en="Home" />
                        </Link<Route>>
                    </div>
                    <div onclick={close_menu}>
                        <Link<Route> to={Route::Privacy} classes="nav-link">
                            <Bilingual id="Privasi" en="Privacy" />
                        </Link<Route>>
                    </div>
                    <LanguageSwitcher />
                </div>
            </div>
        </nav>
    }
}


#[derive(Properties, PartialEq)]
pub struct AppProps {
    pub services: Services,
}

#[function_component(App)]
fn app(props: &AppProps) -> Html {
    html! {
        <ContextProvider<Services> context={props.services.clone()}>
            <LanguageProvider services={props.services.clone()}>
                <BrowserRouter>
                    <Nav />
                    <Switch<Route> render={switch} />
                </BrowserRouter>
            </LanguageProvider>
        </ContextProvider<Services>>
    }
}


fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    let config = SiteConfig::load();

    // Initialize logging
    diagnostics::site_logger::init(config.log_level()).expect("error initializing log");

    info!("Starting Lunetix site {}", config.version);
    let services = Services::browser(config);
    if !services.config.debug {
        diagnostics::site_logger::forward_to(Some(services.diagnostics.clone()));
    }
    let timeline = BrowserTimeline;
    services.diagnostics.mark(&timeline, "app_start");

    diagnostics::handlers::install_global_handlers(&services.diagnostics, &services.analytics);
    analytics::listeners::install(&services.analytics);
    analytics::listeners::schedule_consent_prompt(
        &services.analytics,
        services.config.analytics.consent_prompt_delay_ms,
    );

    let diagnostics = services.diagnostics.clone();
    yew::Renderer::<App>::with_props(AppProps { services }).render();
    diagnostics.mark(&timeline, "app_rendered");
    diagnostics.measure(&timeline, "app_boot", "app_start", "app_rendered");
}
