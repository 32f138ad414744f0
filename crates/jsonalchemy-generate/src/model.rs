use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GenerationError;
use crate::provider::LocaleKey;

/// Inclusive integer range used for engine fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

/// Inclusive float range used for engine fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FloatRange {
    pub min: f64,
    pub max: f64,
}

/// Inclusive length range (string characters, array items).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

/// Options for the generation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GenerateOptions {
    /// Recursion depth after which subtrees are replaced by terminal values.
    pub max_depth: usize,
    /// Range for integers whose schema leaves both bounds open.
    pub integer_range: IntRange,
    /// Range for numbers whose schema leaves both bounds open.
    pub number_range: FloatRange,
    /// Default string length when `minLength`/`maxLength` are absent.
    pub string_length: LengthRange,
    /// Default array length when `minItems`/`maxItems` are absent.
    pub array_length: LengthRange,
    /// Probability that a non-required property is emitted.
    pub optional_property_probability: f64,
    /// Attempts made to avoid duplicates (`uniqueItems`, `not`, synthetic keys).
    pub unique_attempts: u32,
    /// Upper bound for synthetic keys added through `additionalProperties`
    /// or `patternProperties`.
    pub max_extra_properties: usize,
    /// Repetition cap for unbounded quantifiers in `pattern`.
    pub pattern_max_repeat: u32,
    /// Attempts made to find a formatted or patterned string of a valid length.
    pub format_attempts: u32,
    /// Fail with a budget error after this many synthesized values.
    pub node_budget: Option<usize>,
    /// Locale passed to the realistic value provider.
    pub locale: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_depth: 25,
            integer_range: IntRange {
                min: 0,
                max: 1_000_000,
            },
            number_range: FloatRange {
                min: 0.0,
                max: 1_000_000.0,
            },
            string_length: LengthRange { min: 0, max: 40 },
            array_length: LengthRange { min: 0, max: 5 },
            optional_property_probability: 0.8,
            unique_attempts: 10,
            max_extra_properties: 3,
            pattern_max_repeat: 8,
            format_attempts: 100,
            node_budget: None,
            locale: LocaleKey::EnUs.as_str().to_string(),
        }
    }
}

impl GenerateOptions {
    /// Reject option combinations the engine cannot honour.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.max_depth == 0 {
            return Err(GenerationError::InvalidOptions(
                "max_depth must be > 0".to_string(),
            ));
        }
        if self.integer_range.min > self.integer_range.max {
            return Err(GenerationError::InvalidOptions(
                "integer_range min must be <= max".to_string(),
            ));
        }
        if !self.number_range.min.is_finite()
            || !self.number_range.max.is_finite()
            || self.number_range.min > self.number_range.max
        {
            return Err(GenerationError::InvalidOptions(
                "number_range must be finite with min <= max".to_string(),
            ));
        }
        if self.string_length.min > self.string_length.max {
            return Err(GenerationError::InvalidOptions(
                "string_length min must be <= max".to_string(),
            ));
        }
        if self.array_length.min > self.array_length.max {
            return Err(GenerationError::InvalidOptions(
                "array_length min must be <= max".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.optional_property_probability) {
            return Err(GenerationError::InvalidOptions(
                "optional_property_probability must be within [0, 1]".to_string(),
            ));
        }
        if self.unique_attempts == 0 || self.format_attempts == 0 {
            return Err(GenerationError::InvalidOptions(
                "unique_attempts and format_attempts must be > 0".to_string(),
            ));
        }
        if self.pattern_max_repeat == 0 {
            return Err(GenerationError::InvalidOptions(
                "pattern_max_repeat must be > 0".to_string(),
            ));
        }
        if LocaleKey::parse(&self.locale).is_none() {
            return Err(GenerationError::InvalidOptions(format!(
                "unsupported locale '{}'",
                self.locale
            )));
        }
        Ok(())
    }
}

/// Severity of a generation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueLevel {
    Info,
    Warning,
}

/// Documented degradations recorded while generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    NotIgnored,
    IfAdvisory,
    DepthTruncated,
    CycleBroken,
    UniqueItemsExhausted,
    FormatFallback,
    PatternLengthRelaxed,
    PatternUnsupported,
    ExcludedValueRetained,
    RequiredWithoutProperty,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::NotIgnored => "not_ignored",
            IssueCode::IfAdvisory => "if_advisory",
            IssueCode::DepthTruncated => "depth_truncated",
            IssueCode::CycleBroken => "cycle_broken",
            IssueCode::UniqueItemsExhausted => "unique_items_exhausted",
            IssueCode::FormatFallback => "format_fallback",
            IssueCode::PatternLengthRelaxed => "pattern_length_relaxed",
            IssueCode::PatternUnsupported => "pattern_unsupported",
            IssueCode::ExcludedValueRetained => "excluded_value_retained",
            IssueCode::RequiredWithoutProperty => "required_without_property",
        }
    }

    pub fn level(self) -> IssueLevel {
        match self {
            IssueCode::DepthTruncated | IssueCode::CycleBroken | IssueCode::IfAdvisory => {
                IssueLevel::Info
            }
            _ => IssueLevel::Warning,
        }
    }
}

/// Structured generation issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: IssueLevel,
    pub code: IssueCode,
    pub message: String,
    pub path: String,
}

/// Report for one generation call.
///
/// Each `(code, path)` pair is listed once in `issues`; `warnings_by_code`
/// counts every occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub nodes_generated: u64,
    pub max_depth_reached: usize,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub issues: Vec<GenerationIssue>,
    #[serde(skip)]
    seen: BTreeSet<(IssueCode, String)>,
}

impl GenerationReport {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            nodes_generated: 0,
            max_depth_reached: 0,
            warnings_by_code: BTreeMap::new(),
            issues: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    pub fn record(&mut self, code: IssueCode, path: impl ToString, message: impl Into<String>) {
        *self
            .warnings_by_code
            .entry(code.as_str().to_string())
            .or_insert(0) += 1;
        let path = path.to_string();
        if self.seen.insert((code, path.clone())) {
            self.issues.push(GenerationIssue {
                level: code.level(),
                code,
                message: message.into(),
                path,
            });
        }
    }

    pub fn count(&self, code: IssueCode) -> u64 {
        self.warnings_by_code
            .get(code.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn has(&self, code: IssueCode) -> bool {
        self.count(code) > 0
    }

    /// Fold a report from another instance of the same batch into this one.
    pub fn absorb(&mut self, other: GenerationReport) {
        self.nodes_generated += other.nodes_generated;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
        for (code, count) in other.warnings_by_code {
            *self.warnings_by_code.entry(code).or_insert(0) += count;
        }
        for issue in other.issues {
            if self.seen.insert((issue.code, issue.path.clone())) {
                self.issues.push(issue);
            }
        }
    }
}

/// Value produced by a generation call together with its report.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub value: Value,
    pub report: GenerationReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_validate() {
        assert!(GenerateOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_ranges_and_bad_probability() {
        let mut options = GenerateOptions::default();
        options.array_length = LengthRange { min: 4, max: 1 };
        assert!(matches!(
            options.validate(),
            Err(GenerationError::InvalidOptions(_))
        ));

        let options = GenerateOptions {
            optional_property_probability: 1.5,
            ..GenerateOptions::default()
        };
        assert!(options.validate().is_err());

        let options = GenerateOptions {
            locale: "xx_XX".to_string(),
            ..GenerateOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn report_dedupes_issues_but_counts_all() {
        let mut report = GenerationReport::new(7);
        report.record(IssueCode::CycleBroken, "#/items", "cycle");
        report.record(IssueCode::CycleBroken, "#/items", "cycle");
        report.record(IssueCode::CycleBroken, "#/other", "cycle");
        assert_eq!(report.count(IssueCode::CycleBroken), 3);
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn partial_options_deserialize_with_defaults() {
        let options: GenerateOptions =
            serde_json::from_str(r#"{"max_depth": 4, "array_length": {"min": 1, "max": 2}}"#)
                .expect("options");
        assert_eq!(options.max_depth, 4);
        assert_eq!(options.array_length, LengthRange { min: 1, max: 2 });
        assert_eq!(options.unique_attempts, 10);
    }
}
