//! Bridge between semantic hints (`format` values, property names) and a
//! source of realistic random values.

mod faker;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::RngCore;
use serde_json::Value;

use crate::generators::text::plain_text;

pub use faker::{FakerProvider, Hint};

/// Locales understood by the bundled provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocaleKey {
    #[default]
    EnUs,
    PtBr,
}

impl LocaleKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en_US" | "en-US" | "en" => Some(Self::EnUs),
            "pt_BR" | "pt-BR" | "pt" => Some(Self::PtBr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::PtBr => "pt_BR",
        }
    }
}

impl FromStr for LocaleKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| format!("unsupported locale '{value}'"))
    }
}

impl fmt::Display for LocaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of realistic values keyed by a semantic hint such as `email`.
///
/// Implementations must draw all randomness from `rng` so output stays
/// reproducible under a seed.
pub trait ValueProvider: Send + Sync {
    fn supports(&self, hint: &str) -> bool;

    /// Value for `hint`, or `None` when the hint is not supported.
    fn provide(&self, hint: &str, rng: &mut dyn RngCore) -> Option<Value>;

    /// Like [`ValueProvider::provide`], for providers that can build a value
    /// whose character count lies in `[min_len, max_len]`. The default
    /// ignores the bounds and leaves length checks to the caller.
    fn provide_within(
        &self,
        hint: &str,
        min_len: usize,
        max_len: usize,
        rng: &mut dyn RngCore,
    ) -> Option<Value> {
        let _ = (min_len, max_len);
        self.provide(hint, rng)
    }
}

/// Property-name spellings (lowercased, separators removed) and their hints.
const PROPERTY_HINTS: &[(&str, &str)] = &[
    ("email", "email"),
    ("emailaddress", "email"),
    ("mail", "email"),
    ("firstname", "first-name"),
    ("givenname", "first-name"),
    ("lastname", "last-name"),
    ("surname", "last-name"),
    ("familyname", "last-name"),
    ("name", "name"),
    ("fullname", "name"),
    ("username", "username"),
    ("login", "username"),
    ("password", "password"),
    ("phone", "phone"),
    ("phonenumber", "phone"),
    ("mobile", "phone"),
    ("city", "city"),
    ("country", "country"),
    ("street", "street"),
    ("address", "street"),
    ("zip", "zip"),
    ("zipcode", "zip"),
    ("postcode", "zip"),
    ("postalcode", "zip"),
    ("company", "company"),
    ("organization", "company"),
    ("color", "color"),
    ("colour", "color"),
    ("uuid", "uuid"),
    ("guid", "uuid"),
    ("url", "uri"),
    ("website", "uri"),
    ("homepage", "uri"),
    ("hostname", "hostname"),
    ("domain", "hostname"),
    ("ip", "ipv4"),
    ("ipaddress", "ipv4"),
    ("title", "sentence"),
    ("description", "paragraph"),
    ("summary", "sentence"),
    ("date", "date"),
    ("birthdate", "date"),
    ("createdat", "date-time"),
    ("updatedat", "date-time"),
    ("timestamp", "date-time"),
];

/// Maps hints onto a [`ValueProvider`], falling back to plain text.
#[derive(Clone)]
pub struct ProviderBridge {
    provider: Arc<dyn ValueProvider>,
}

impl ProviderBridge {
    pub fn new(provider: Arc<dyn ValueProvider>) -> Self {
        Self { provider }
    }

    /// Bridge over the bundled faker provider for `locale`.
    pub fn for_locale(locale: LocaleKey) -> Self {
        Self::new(Arc::new(FakerProvider::new(locale)))
    }

    pub fn recognizes(&self, hint: &str) -> bool {
        self.provider.supports(hint)
    }

    /// Value for `hint`, or generic text when the provider has none.
    pub fn provide(&self, hint: &str, rng: &mut dyn RngCore) -> Value {
        match self.provider.provide(hint, rng) {
            Some(value) => value,
            None => Value::String(plain_text(1, 16, rng)),
        }
    }

    /// String form of [`ProviderBridge::provide`].
    pub fn provide_text(&self, hint: &str, rng: &mut dyn RngCore) -> String {
        match self.provide(hint, rng) {
            Value::String(text) => text,
            other => other.to_string(),
        }
    }

    /// Text for `hint` built within `[min_len, max_len]` where the provider
    /// supports it. `None` when the provider has no such value.
    pub fn provide_text_within(
        &self,
        hint: &str,
        min_len: usize,
        max_len: usize,
        rng: &mut dyn RngCore,
    ) -> Option<String> {
        match self.provider.provide_within(hint, min_len, max_len, rng)? {
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }

    /// Semantic hint suggested by a property name, if the provider supports it.
    pub fn property_hint(&self, name: &str) -> Option<&'static str> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
            .flat_map(char::to_lowercase)
            .collect();
        PROPERTY_HINTS
            .iter()
            .find(|(spelling, _)| *spelling == key)
            .map(|(_, hint)| *hint)
            .filter(|hint| self.recognizes(hint))
    }
}

impl Default for ProviderBridge {
    fn default() -> Self {
        Self::for_locale(LocaleKey::default())
    }
}

impl fmt::Debug for ProviderBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBridge").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn property_names_map_to_hints() {
        let bridge = ProviderBridge::default();
        assert_eq!(bridge.property_hint("first_name"), Some("first-name"));
        assert_eq!(bridge.property_hint("FirstName"), Some("first-name"));
        assert_eq!(bridge.property_hint("e-mail"), Some("email"));
        assert_eq!(bridge.property_hint("quantity"), None);
    }

    #[test]
    fn unknown_hints_fall_back_to_text() {
        let bridge = ProviderBridge::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(!bridge.recognizes("starship-registry"));
        let value = bridge.provide("starship-registry", &mut rng);
        let text = value.as_str().expect("text");
        assert!(!text.is_empty() && text.chars().count() <= 16);
    }

    #[test]
    fn locale_keys_parse_both_spellings() {
        assert_eq!(LocaleKey::parse("pt-BR"), Some(LocaleKey::PtBr));
        assert_eq!("en_US".parse::<LocaleKey>(), Ok(LocaleKey::EnUs));
        assert!("de_DE".parse::<LocaleKey>().is_err());
    }
}
