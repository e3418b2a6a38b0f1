use yew::prelude::*;
use yew_router::prelude::*;

use crate::components::language::Bilingual;
use crate::services::Services;
use crate::Route;

fn display_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[function_component(Home)]
pub fn home() -> Html {
    let services = use_context::<Services>();

    let apps: Vec<(String, String)> = services
        .as_ref()
        .map(|s| {
            s.config
                .apps
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    let contact_email = services
        .as_ref()
        .map(|s| s.config.contact.email.clone())
        .unwrap_or_default();

    let on_contact = {
        let analytics = services.as_ref().map(|s| s.analytics.clone());
        Callback::from(move |_: MouseEvent| {
            if let Some(analytics) = &analytics {
                analytics.track_conversion("contact", 0.0);
            }
        })
    };

    html! {
        <div class="home">
            <section class="hero">
                <h1>
                    <Bilingual
                        id="Aplikasi kecil untuk hidup yang lebih teratur"
                        en="Small apps for a more organised life"
                    />
                </h1>
                <p>
                    <Bilingual
                        id="Lunetix membuat aplikasi web sederhana yang bisa langsung dipakai."
                        en="Lunetix builds simple web apps you can use right away."
                    />
                </p>
            </section>

            <section class="departments-section">
                <h2><Bilingual id="Produk" en="Products" /></h2>
                <div class="product-grid">
                    { for apps.iter().map(|(key, url)| html! {
                        <a class="btn product-link" href={url.clone()} target="_blank" rel="noopener">
                            { display_name(key) }
                        </a>
                    }) }
                </div>
            </section>

            <section class="contact">
                <h2><Bilingual id="Hubungi kami" en="Contact us" /></h2>
                <a class="btn" href={format!("mailto:{}", contact_email)} onclick={on_contact}>
                    { contact_email.clone() }
                </a>
                <p class="privacy-note">
                    <Link<Route> to={Route::Privacy}>
                        <Bilingual id="Privasi & analitik" en="Privacy & analytics" />
                    </Link<Route>>
                </p>
            </section>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalises_app_keys() {
        assert_eq!(display_name("lunotes"), "Lunotes");
        assert_eq!(display_name(""), "");
    }
}
