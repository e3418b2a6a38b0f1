use yew::prelude::*;

use crate::analytics::ConsentStatus;
use crate::components::language::{use_language, Bilingual};
use crate::diagnostics::handlers::download_export;
use crate::i18n::Language;
use crate::services::Services;

fn status_label(status: ConsentStatus, language: Language) -> &'static str {
    match (status, language) {
        (ConsentStatus::Granted, Language::Id) => "Analitik aktif",
        (ConsentStatus::Granted, Language::En) => "Analytics enabled",
        (ConsentStatus::Denied, Language::Id) => "Analitik nonaktif",
        (ConsentStatus::Denied, Language::En) => "Analytics disabled",
        (ConsentStatus::Unset, Language::Id) => "Belum memilih",
        (ConsentStatus::Unset, Language::En) => "No choice made yet",
    }
}

#[function_component(Privacy)]
pub fn privacy() -> Html {
    let language = use_language();
    let services = use_context::<Services>();
    let status = use_state(|| {
        services
            .as_ref()
            .map(|s| s.analytics.consent_status())
            .unwrap_or(ConsentStatus::Unset)
    });
    let Some(services) = services else {
        return html! {};
    };

    let on_grant = {
        let analytics = services.analytics.clone();
        let status = status.clone();
        Callback::from(move |_: MouseEvent| {
            analytics.grant_consent();
            status.set(analytics.consent_status());
        })
    };

    let on_revoke = {
        let analytics = services.analytics.clone();
        let status = status.clone();
        Callback::from(move |_: MouseEvent| {
            analytics.revoke_consent();
            status.set(analytics.consent_status());
        })
    };

    let on_export = {
        let diagnostics = services.diagnostics.clone();
        Callback::from(move |_: MouseEvent| {
            if let Err(e) = download_export(&diagnostics) {
                log::warn!("Failed to export logs: {:?}", e);
            }
        })
    };

    html! {
        <div class="legal-content">
            <div>
                <h1><Bilingual id="Privasi" en="Privacy" /></h1>
                <section>
                    <h2><Bilingual id="Analitik" en="Analytics" /></h2>
                    <p>
                        <Bilingual
                            id="Kami hanya mengirim data penggunaan setelah Anda menyetujuinya. Sebelum itu, peristiwa disimpan sementara di browser Anda."
                            en="We only send usage data after you agree. Until then, events are held in your browser."
                        />
                    </p>
                    <p class="consent-status">{ status_label(*status, language) }</p>
                    <button class="btn" onclick={on_grant} disabled={status.is_granted()}>
                        <Bilingual id="Izinkan analitik" en="Allow analytics" />
                    </button>
                    <button class="btn" onclick={on_revoke} disabled={*status == ConsentStatus::Denied}>
                        <Bilingual id="Tolak analitik" en="Turn analytics off" />
                    </button>
                </section>
                if services.config.debug {
                    <section>
                        <h2>{"Diagnostics"}</h2>
                        <p>{ format!("{} entries this session", services.diagnostics.entries(None).len()) }</p>
                        <button class="btn" onclick={on_export}>{"Export logs"}</button>
                    </section>
                }
            </div>
        </div>
    }
}
