// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const DEFAULT_LANG: &str = "en";
const SUPPORTED: &[&str] = &["en", "fr", "pt"];

// Extrator de idioma a partir do Accept-Language
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|header_str| {
                // "fr-FR,fr;q=0.9" -> ["fr-FR", "fr"] -> primeiro suportado
                accept_language::parse(header_str)
                    .into_iter()
                    .map(|tag| tag.split('-').next().unwrap_or_default().to_lowercase())
                    .find(|lang| SUPPORTED.contains(&lang.as_str()))
            })
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());

        Ok(Locale::from_header(header_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(Locale::from_header(Some("fr-FR,fr;q=0.9,en;q=0.8")).0, "fr");
        assert_eq!(Locale::from_header(Some("de-DE,pt-BR;q=0.5")).0, "pt");
    }

    #[test]
    fn defaults_to_english() {
        assert_eq!(Locale::from_header(None).0, "en");
        assert_eq!(Locale::from_header(Some("ja")).0, "en");
    }
}
