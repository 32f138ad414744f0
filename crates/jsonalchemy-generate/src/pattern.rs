use rand::{Rng, RngCore};
use rand_regex::Regex as RandRegex;

/// ASCII expansions of the ECMA-262 shorthand classes.
const DIGIT: &str = "0-9";
const WORD: &str = "A-Za-z0-9_";
const SPACE: &str = " \\t\\n\\r";

/// Compiled `pattern` keyword able to produce matching strings.
#[derive(Debug, Clone)]
pub struct PatternSampler {
    regex: RandRegex,
}

impl PatternSampler {
    /// Compile an ECMA-262 pattern. Unbounded quantifiers repeat at most
    /// `max_repeat` times.
    pub fn compile(pattern: &str, max_repeat: u32) -> Result<Self, String> {
        let translated = translate(pattern, true);
        let regex = RandRegex::compile(&translated, max_repeat)
            .map_err(|err| format!("cannot sample pattern '{pattern}': {err}"))?;
        Ok(Self { regex })
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> String {
        rng.sample(&self.regex)
    }
}

/// Compile an ECMA-262 pattern for matching (search semantics, anchors kept).
pub fn matcher(pattern: &str) -> Option<regex::Regex> {
    regex::Regex::new(&translate(pattern, false)).ok()
}

/// Rewrite ECMA-262 syntax into the dialect understood by the `regex` crate.
///
/// Shorthand classes become ASCII classes, `\/` loses its escape. With
/// `for_sampling`, anchors and word boundaries are dropped: sampling yields a
/// whole string, and an unanchored pattern still matches it.
pub fn translate(pattern: &str, for_sampling: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    out.push_str("\\\\");
                    break;
                };
                match (escaped, in_class) {
                    ('d', false) => push_class(&mut out, DIGIT, false),
                    ('w', false) => push_class(&mut out, WORD, false),
                    ('s', false) => push_class(&mut out, SPACE, false),
                    ('D', false) => push_class(&mut out, DIGIT, true),
                    ('W', false) => push_class(&mut out, WORD, true),
                    ('S', false) => push_class(&mut out, SPACE, true),
                    ('d', true) => out.push_str(DIGIT),
                    ('w', true) => out.push_str(WORD),
                    ('s', true) => out.push_str(SPACE),
                    ('b' | 'B', false) if for_sampling => {}
                    ('/', _) => out.push('/'),
                    (other, _) => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
                // A leading `]` is a literal in ECMA classes.
                if chars.peek() == Some(&']') {
                    chars.next();
                    out.push_str("\\]");
                }
            }
            '[' => out.push_str("\\["),
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '^' | '$' if !in_class && for_sampling => {}
            _ => out.push(c),
        }
    }
    out
}

fn push_class(out: &mut String, ranges: &str, negated: bool) {
    out.push('[');
    if negated {
        out.push('^');
    }
    out.push_str(ranges);
    out.push(']');
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn translates_shorthand_classes() {
        assert_eq!(translate(r"^\d{3}-\w+$", true), "[0-9]{3}-[A-Za-z0-9_]+");
        assert_eq!(translate(r"^\d{3}$", false), "^[0-9]{3}$");
        assert_eq!(translate(r"[\d.]+", true), "[0-9.]+");
        assert_eq!(translate(r"a\/b", true), "a/b");
    }

    #[test]
    fn anchors_inside_classes_survive() {
        assert_eq!(translate("^[^$]+$", true), "[^$]+");
    }

    #[test]
    fn samples_match_the_untranslated_pattern() {
        let pattern = r"^[A-Z]{2}-\d{4}$";
        let sampler = PatternSampler::compile(pattern, 8).expect("compile");
        let check = matcher(pattern).expect("matcher");
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let value = sampler.sample(&mut rng);
            assert!(check.is_match(&value), "{value}");
        }
    }

    #[test]
    fn alternation_with_anchors_is_sampled() {
        let pattern = "^cat$|^dog$";
        let sampler = PatternSampler::compile(pattern, 8).expect("compile");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let value = sampler.sample(&mut rng);
        assert!(value == "cat" || value == "dog");
    }

    #[test]
    fn lookaround_is_rejected() {
        assert!(PatternSampler::compile("(?=a)b", 8).is_err());
        assert!(matcher("(?=a)b").is_none());
    }
}
