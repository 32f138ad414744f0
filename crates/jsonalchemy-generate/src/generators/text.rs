use rand::{Rng, RngCore};
use serde_json::Value;

use jsonalchemy_core::SchemaError;

use crate::constraints::ConstraintSet;
use crate::model::IssueCode;
use crate::session::GenerationContext;

use super::Synthesizer;

const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shortest length for which plain text is built from words.
const WORDS_FROM: usize = 6;

const LOREM_WORDS: &[&str] = &[
    "lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];

/// Text with a character count in `[min_len, max_len]`.
pub(crate) fn plain_text(min_len: usize, max_len: usize, rng: &mut dyn RngCore) -> String {
    let len = if min_len >= max_len {
        min_len
    } else {
        rng.random_range(min_len..=max_len)
    };
    if len < WORDS_FROM {
        return random_chars(len, rng);
    }

    let mut value = String::with_capacity(len + 12);
    while value.len() < len {
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(LOREM_WORDS[rng.random_range(0..LOREM_WORDS.len())]);
    }
    value.truncate(len);
    if value.ends_with(' ') {
        value.pop();
        value.push_str(&random_chars(1, rng));
    }
    value
}

fn random_chars(len: usize, rng: &mut dyn RngCore) -> String {
    let chars: Vec<char> = DEFAULT_CHARSET.chars().collect();
    (0..len)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect()
}

fn fits(value: &str, min_len: usize, max_len: usize) -> bool {
    let count = value.chars().count();
    count >= min_len && count <= max_len
}

impl Synthesizer<'_> {
    /// String satisfying `pattern`, `format` and length bounds, in that order
    /// of precedence. A property-name hint is used when neither keyword is set.
    pub(super) fn string(
        &self,
        set: &ConstraintSet,
        hint: Option<&str>,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        let (min_len, max_len) = self.length_bounds(set)?;

        if let Some(pattern) = &set.pattern {
            if let Some(value) = self.patterned(set, pattern, min_len, max_len, ctx) {
                return Ok(Value::String(value));
            }
        } else if let Some(format) = &set.format {
            if self.provider.recognizes(format) {
                if let Some(value) = self.hinted(format, min_len, max_len, ctx) {
                    return Ok(Value::String(value));
                }
                ctx.report.record(
                    IssueCode::FormatFallback,
                    &set.pointer,
                    format!("no '{format}' value within length [{min_len}, {max_len}]; plain text used"),
                );
            } else {
                ctx.report.record(
                    IssueCode::FormatFallback,
                    &set.pointer,
                    format!("format '{format}' is not recognized; plain text used"),
                );
            }
        } else if let Some(hint) = hint.and_then(|name| self.provider.property_hint(name))
            && let Some(value) = self.hinted(hint, min_len, max_len, ctx)
        {
            return Ok(Value::String(value));
        }

        Ok(Value::String(plain_text(min_len, max_len, &mut ctx.rng)))
    }

    fn length_bounds(&self, set: &ConstraintSet) -> Result<(usize, usize), SchemaError> {
        let defaults = self.options.string_length;
        let min_len = set.min_length.unwrap_or(0);
        let max_len = match set.max_length {
            Some(max) => max,
            None => defaults.max.max(min_len),
        };
        if min_len > max_len {
            return Err(SchemaError::unsatisfiable(
                &set.pointer,
                format!("minLength {min_len} exceeds maxLength {max_len}"),
            ));
        }
        let min_len = match set.min_length {
            Some(min) => min,
            None => defaults.min.min(max_len),
        };
        Ok((min_len, max_len))
    }

    /// Sample `pattern` until a value fits the length bounds. `None` when the
    /// pattern cannot be compiled.
    fn patterned(
        &self,
        set: &ConstraintSet,
        pattern: &str,
        min_len: usize,
        max_len: usize,
        ctx: &mut GenerationContext,
    ) -> Option<String> {
        let Some(sampler) = ctx.sampler(pattern, self.options.pattern_max_repeat) else {
            ctx.report.record(
                IssueCode::PatternUnsupported,
                &set.pointer,
                format!("pattern '{pattern}' cannot be sampled; plain text used"),
            );
            return None;
        };

        let mut last = String::new();
        for _ in 0..self.options.format_attempts {
            last = sampler.sample(&mut ctx.rng);
            if fits(&last, min_len, max_len) {
                return Some(last);
            }
        }
        ctx.report.record(
            IssueCode::PatternLengthRelaxed,
            &set.pointer,
            format!("no sample of '{pattern}' within length [{min_len}, {max_len}]; length relaxed"),
        );
        Some(last)
    }

    fn hinted(
        &self,
        hint: &str,
        min_len: usize,
        max_len: usize,
        ctx: &mut GenerationContext,
    ) -> Option<String> {
        for _ in 0..self.options.format_attempts {
            let value = self
                .provider
                .provide_text_within(hint, min_len, max_len, &mut ctx.rng)?;
            if fits(&value, min_len, max_len) {
                return Some(value);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn plain_text_respects_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for (min, max) in [(0, 0), (1, 3), (6, 6), (10, 40), (3, 3)] {
            for _ in 0..20 {
                let value = plain_text(min, max, &mut rng);
                assert!(fits(&value, min, max), "{value:?} not in [{min}, {max}]");
                assert!(!value.ends_with(' '));
            }
        }
    }
}
