use base64::Engine;
use chrono::{Duration, NaiveDate, NaiveTime};
use fake::Fake;
use rand::{Rng, RngCore};
use serde_json::Value;

use super::{LocaleKey, ValueProvider};

/// Fakers that have per-locale data.
macro_rules! localized {
    ($locale:expr, $rng:expr, $module:ident :: $faker:ident) => {
        match $locale {
            LocaleKey::EnUs => {
                let value: String = fake::faker::$module::en::$faker().fake_with_rng($rng);
                value
            }
            LocaleKey::PtBr => {
                let value: String = fake::faker::$module::pt_br::$faker().fake_with_rng($rng);
                value
            }
        }
    };
}

/// Hints served by [`FakerProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Email,
    Uuid,
    Date,
    DateTime,
    Time,
    Duration,
    Uri,
    Hostname,
    Ipv4,
    Ipv6,
    Password,
    Byte,
    Binary,
    JsonPointer,
    Name,
    FirstName,
    LastName,
    Username,
    Word,
    Sentence,
    Paragraph,
    Phone,
    City,
    Country,
    Street,
    Zip,
    Company,
    Color,
}

impl Hint {
    pub fn parse(hint: &str) -> Option<Self> {
        let hint = match hint {
            "email" | "idn-email" => Self::Email,
            "uuid" | "guid" => Self::Uuid,
            "date" => Self::Date,
            "date-time" | "datetime" => Self::DateTime,
            "time" => Self::Time,
            "duration" => Self::Duration,
            "uri" | "uri-reference" | "iri" | "iri-reference" | "url" => Self::Uri,
            "hostname" | "idn-hostname" => Self::Hostname,
            "ipv4" => Self::Ipv4,
            "ipv6" => Self::Ipv6,
            "password" => Self::Password,
            "byte" => Self::Byte,
            "binary" => Self::Binary,
            "json-pointer" => Self::JsonPointer,
            "name" => Self::Name,
            "first-name" => Self::FirstName,
            "last-name" => Self::LastName,
            "username" => Self::Username,
            "word" => Self::Word,
            "sentence" => Self::Sentence,
            "paragraph" => Self::Paragraph,
            "phone" => Self::Phone,
            "city" => Self::City,
            "country" => Self::Country,
            "street" => Self::Street,
            "zip" => Self::Zip,
            "company" => Self::Company,
            "color" => Self::Color,
            _ => return None,
        };
        Some(hint)
    }
}

/// [`ValueProvider`] backed by the `fake` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakerProvider {
    locale: LocaleKey,
}

impl FakerProvider {
    pub fn new(locale: LocaleKey) -> Self {
        Self { locale }
    }

    fn text(&self, hint: Hint, rng: &mut dyn RngCore) -> String {
        match hint {
            Hint::Email => fake::faker::internet::en::SafeEmail().fake_with_rng(rng),
            Hint::Uuid => uuid_v4(rng),
            Hint::Date => random_date(rng).format("%Y-%m-%d").to_string(),
            Hint::DateTime => {
                let date = random_date(rng);
                let time = random_time(rng);
                format!("{}T{}Z", date.format("%Y-%m-%d"), time.format("%H:%M:%S"))
            }
            Hint::Time => format!("{}Z", random_time(rng).format("%H:%M:%S")),
            Hint::Duration => format!(
                "P{}DT{}H{}M",
                rng.random_range(0..30),
                rng.random_range(0..24),
                rng.random_range(0..60)
            ),
            Hint::Uri => {
                let host = hostname(rng);
                let path: String = fake::faker::lorem::en::Word().fake_with_rng(rng);
                format!("https://{host}/{}", path.to_lowercase())
            }
            Hint::Hostname => hostname(rng),
            Hint::Ipv4 => format!(
                "{}.{}.{}.{}",
                rng.random_range(1..=223_u8),
                rng.random::<u8>(),
                rng.random::<u8>(),
                rng.random::<u8>()
            ),
            Hint::Ipv6 => fake::faker::internet::en::IPv6().fake_with_rng(rng),
            Hint::Password => fake::faker::internet::en::Password(8..20).fake_with_rng(rng),
            Hint::Byte => {
                base64::engine::general_purpose::STANDARD.encode(random_bytes(rng, 4, 24))
            }
            Hint::Binary => hex::encode(random_bytes(rng, 4, 24)),
            Hint::JsonPointer => {
                let depth = rng.random_range(1..=3);
                let mut pointer = String::new();
                for _ in 0..depth {
                    let token: String = fake::faker::lorem::en::Word().fake_with_rng(rng);
                    pointer.push('/');
                    pointer.push_str(&token);
                }
                pointer
            }
            Hint::Name => localized!(self.locale, rng, name::Name),
            Hint::FirstName => localized!(self.locale, rng, name::FirstName),
            Hint::LastName => localized!(self.locale, rng, name::LastName),
            Hint::Username => localized!(self.locale, rng, internet::Username),
            Hint::Word => fake::faker::lorem::en::Word().fake_with_rng(rng),
            Hint::Sentence => fake::faker::lorem::en::Sentence(3..8).fake_with_rng(rng),
            Hint::Paragraph => fake::faker::lorem::en::Paragraph(1..3).fake_with_rng(rng),
            Hint::Phone => localized!(self.locale, rng, phone_number::PhoneNumber),
            Hint::City => localized!(self.locale, rng, address::CityName),
            Hint::Country => localized!(self.locale, rng, address::CountryName),
            Hint::Street => localized!(self.locale, rng, address::StreetName),
            Hint::Zip => localized!(self.locale, rng, address::ZipCode),
            Hint::Company => localized!(self.locale, rng, company::CompanyName),
            Hint::Color => fake::faker::color::en::HexColor().fake_with_rng(rng),
        }
    }

    /// Hints built to a chosen length. Returns `None` for other hints and
    /// `Some(None)` when no value of the hint fits `[min_len, max_len]`.
    fn sized_text(
        &self,
        hint: Hint,
        min_len: usize,
        max_len: usize,
        rng: &mut dyn RngCore,
    ) -> Option<Option<String>> {
        let text = match hint {
            Hint::Password => {
                let len = rng.random_range(min_len..=max_len);
                fake::faker::internet::en::Password(len..len + 1).fake_with_rng(rng)
            }
            // Padded base64 is 4 characters per 3 bytes.
            Hint::Byte => {
                let (lo, hi) = (min_len.div_ceil(4), max_len / 4);
                if lo > hi {
                    return Some(None);
                }
                let quads = rng.random_range(lo..=hi);
                let bytes = random_bytes(rng, quads * 3, quads * 3);
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
            // Hex is 2 characters per byte.
            Hint::Binary => {
                let (lo, hi) = (min_len.div_ceil(2), max_len / 2);
                if lo > hi {
                    return Some(None);
                }
                hex::encode(random_bytes(rng, lo, hi))
            }
            _ => return None,
        };
        Some(Some(text))
    }
}

impl ValueProvider for FakerProvider {
    fn supports(&self, hint: &str) -> bool {
        Hint::parse(hint).is_some()
    }

    fn provide(&self, hint: &str, rng: &mut dyn RngCore) -> Option<Value> {
        let hint = Hint::parse(hint)?;
        Some(Value::String(self.text(hint, rng)))
    }

    fn provide_within(
        &self,
        hint: &str,
        min_len: usize,
        max_len: usize,
        rng: &mut dyn RngCore,
    ) -> Option<Value> {
        let parsed = Hint::parse(hint)?;
        if min_len > max_len {
            return None;
        }
        match self.sized_text(parsed, min_len, max_len, rng) {
            Some(text) => text.map(Value::String),
            None => self.provide(hint, rng),
        }
    }
}

fn uuid_v4(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    uuid::Uuid::from_bytes(bytes).to_string()
}

fn random_bytes(rng: &mut dyn RngCore, min_len: usize, max_len: usize) -> Vec<u8> {
    let mut bytes = vec![0_u8; rng.random_range(min_len..=max_len)];
    rng.fill_bytes(&mut bytes);
    bytes
}

fn random_date(rng: &mut dyn RngCore) -> NaiveDate {
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    base + Duration::days(rng.random_range(0..=365 * 6))
}

fn random_time(rng: &mut dyn RngCore) -> NaiveTime {
    let seconds = rng.random_range(0..86_400);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default()
}

fn hostname(rng: &mut dyn RngCore) -> String {
    let label: String = fake::faker::lorem::en::Word().fake_with_rng(rng);
    let suffix: String = fake::faker::internet::en::DomainSuffix().fake_with_rng(rng);
    format!("{}.{}", label.to_lowercase(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn provide(provider: &FakerProvider, hint: &str, seed: u64) -> String {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        provider
            .provide(hint, &mut rng)
            .and_then(|value| value.as_str().map(str::to_string))
            .expect("string value")
    }

    #[test]
    fn formats_have_expected_shape() {
        let provider = FakerProvider::default();
        assert!(provide(&provider, "email", 1).contains('@'));
        assert!(uuid::Uuid::parse_str(&provide(&provider, "uuid", 1)).is_ok());
        assert!(NaiveDate::parse_from_str(&provide(&provider, "date", 1), "%Y-%m-%d").is_ok());
        assert!(
            chrono::DateTime::parse_from_rfc3339(&provide(&provider, "date-time", 1)).is_ok()
        );
        assert!(provide(&provider, "ipv4", 1).parse::<std::net::Ipv4Addr>().is_ok());
        assert!(provide(&provider, "ipv6", 1).parse::<std::net::Ipv6Addr>().is_ok());
        assert!(provide(&provider, "uri", 1).starts_with("https://"));
        assert!(hex::decode(provide(&provider, "binary", 1)).is_ok());
        assert!(
            base64::engine::general_purpose::STANDARD
                .decode(provide(&provider, "byte", 1))
                .is_ok()
        );
    }

    fn provide_within(hint: &str, min_len: usize, max_len: usize, seed: u64) -> Option<String> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        FakerProvider::default()
            .provide_within(hint, min_len, max_len, &mut rng)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    #[test]
    fn sized_formats_meet_length_bounds() {
        for seed in 0..20 {
            let password = provide_within("password", 30, 34, seed).expect("password");
            assert!((30..=34).contains(&password.chars().count()), "{password}");

            let byte = provide_within("byte", 64, 64, seed).expect("byte");
            assert_eq!(byte.len(), 64);
            assert!(base64::engine::general_purpose::STANDARD.decode(&byte).is_ok());

            let binary = provide_within("binary", 9, 12, seed).expect("binary");
            assert!((10..=12).contains(&binary.len()), "{binary}");
            assert!(hex::decode(&binary).is_ok());
        }
        assert_eq!(provide_within("byte", 5, 7, 1), None);
        assert_eq!(provide_within("binary", 3, 3, 1), None);
    }

    #[test]
    fn ipv4_first_octet_is_routable() {
        let provider = FakerProvider::default();
        for seed in 0..200 {
            let address: std::net::Ipv4Addr =
                provide(&provider, "ipv4", seed).parse().expect("ipv4");
            assert!((1..=223).contains(&address.octets()[0]), "{address}");
        }
    }

    #[test]
    fn same_seed_same_value() {
        let provider = FakerProvider::new(LocaleKey::PtBr);
        assert_eq!(provide(&provider, "name", 9), provide(&provider, "name", 9));
    }

    #[test]
    fn unsupported_hint_yields_none() {
        let provider = FakerProvider::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(!provider.supports("int64"));
        assert!(provider.provide("int64", &mut rng).is_none());
    }
}
