use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::JsonStorage;

pub const LANGUAGE_KEY: &str = "lunetix_language";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Bahasa Indonesia, the site's primary language.
    #[default]
    Id,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Id => "id",
            Language::En => "en",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Language::Id => Language::En,
            Language::En => Language::Id,
        }
    }

    /// Picks the text for this language, falling back to the other one when
    /// a translation is missing.
    pub fn pick<'a>(self, id_text: &'a str, en_text: &'a str) -> &'a str {
        let (preferred, fallback) = match self {
            Language::Id => (id_text, en_text),
            Language::En => (en_text, id_text),
        };
        if preferred.is_empty() {
            fallback
        } else {
            preferred
        }
    }

    /// Reads the saved preference. Older pages stored the bare code (`en`)
    /// rather than a JSON string, so that form is accepted too.
    pub fn load(storage: &JsonStorage) -> Self {
        match storage.try_get::<Language>(LANGUAGE_KEY) {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => match storage.raw(LANGUAGE_KEY).map(|raw| raw.parse::<Language>()) {
                Some(Ok(language)) => language,
                _ => {
                    log::warn!("Ignoring saved language preference: {}", e);
                    Language::default()
                }
            },
        }
    }

    pub fn save(self, storage: &JsonStorage) -> bool {
        storage.set(LANGUAGE_KEY, &self)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Language::Id),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language `{}`", other)),
        }
    }
}
