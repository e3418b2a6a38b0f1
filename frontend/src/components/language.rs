use gloo_timers::callback::Timeout;
use web_sys::KeyboardEvent;
use yew::prelude::*;
use yew_hooks::prelude::*;

use crate::i18n::Language;
use crate::services::Services;

const INDICATOR_MS: u32 = 1_500;

#[derive(Clone, PartialEq)]
pub struct LanguageContext {
    pub language: Language,
    pub set: Callback<Language>,
}

fn set_document_lang(language: Language) {
    if let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    {
        let _ = root.set_attribute("lang", language.code());
    }
}

#[derive(Properties, PartialEq)]
pub struct LanguageProviderProps {
    pub services: Services,
    #[prop_or_default]
    pub children: Children,
}

#[function_component(LanguageProvider)]
pub fn language_provider(props: &LanguageProviderProps) -> Html {
    let language = use_state(|| Language::load(&props.services.storage));
    let indicator = use_state(|| None::<Language>);

    {
        let storage = props.services.storage.clone();
        use_effect_with_deps(
            move |language: &Language| {
                set_document_lang(*language);
                language.save(&storage);
                || ()
            },
            *language,
        );
    }

    {
        let hide = indicator.clone();
        use_effect_with_deps(
            move |shown: &Option<Language>| {
                let timeout = shown.map(|_| Timeout::new(INDICATOR_MS, move || hide.set(None)));
                move || drop(timeout)
            },
            *indicator,
        );
    }

    let set = {
        let language = language.clone();
        let indicator = indicator.clone();
        let analytics = props.services.analytics.clone();
        Callback::from(move |next: Language| {
            if *language != next {
                log::debug!("Switching to language: {}", next);
                analytics.track_user_engagement(&format!("language_{}", next.code()), Some("language"));
            }
            language.set(next);
            indicator.set(Some(next));
        })
    };

    {
        let set = set.clone();
        let current = *language;
        use_event_with_window("keydown", move |e: KeyboardEvent| {
            if (e.ctrl_key() || e.meta_key()) && e.key() == "l" {
                e.prevent_default();
                set.emit(current.toggle());
            }
        });
    }

    let context = LanguageContext {
        language: *language,
        set,
    };

    html! {
        <ContextProvider<LanguageContext> {context}>
            { for props.children.iter() }
            if let Some(shown) = *indicator {
                <div class="language-indicator">{ shown.code().to_uppercase() }</div>
            }
        </ContextProvider<LanguageContext>>
    }
}

#[hook]
pub fn use_language() -> Language {
    use_context::<LanguageContext>()
        .map(|ctx| ctx.language)
        .unwrap_or_default()
}

#[derive(Properties, PartialEq)]
pub struct BilingualProps {
    pub id: AttrValue,
    pub en: AttrValue,
}

/// Text in the visitor's language.
#[function_component(Bilingual)]
pub fn bilingual(props: &BilingualProps) -> Html {
    let language = use_language();
    html! { { language.pick(&props.id, &props.en).to_string() } }
}

#[function_component(LanguageSwitcher)]
pub fn language_switcher() -> Html {
    let ctx = use_context::<LanguageContext>();
    let Some(ctx) = ctx else {
        return html! {};
    };

    let button = |language: Language| {
        let set = ctx.set.clone();
        let onclick = Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            set.emit(language);
        });
        html! {
            <button
                class={classes!("lang-btn", (ctx.language == language).then(|| "active"))}
                data-lang={language.code()}
                {onclick}
            >
                { language.code().to_uppercase() }
            </button>
        }
    };

    html! {
        <div class="lang-switcher">
            { button(Language::Id) }
            { button(Language::En) }
        </div>
    }
}
