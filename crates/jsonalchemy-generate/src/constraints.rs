use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

use jsonalchemy_core::{JsonPointer, SchemaError, SchemaNode};

const OBJECT_KEYWORDS: &[&str] = &[
    "properties",
    "required",
    "additionalProperties",
    "patternProperties",
    "propertyNames",
    "minProperties",
    "maxProperties",
    "dependentRequired",
];
const ARRAY_KEYWORDS: &[&str] = &[
    "items",
    "prefixItems",
    "additionalItems",
    "minItems",
    "maxItems",
    "uniqueItems",
    "contains",
];
const STRING_KEYWORDS: &[&str] = &["minLength", "maxLength", "pattern"];
const NUMBER_KEYWORDS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
];

/// JSON value kind a constraint set can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
    Unknown,
}

impl Kind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Unknown => "unknown",
        }
    }

    /// Whether `value` is an instance of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Null => value.is_null(),
            Self::Boolean => value.is_boolean(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|number| number.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Unknown => true,
        }
    }
}

/// Non-empty set of candidate kinds. `{unknown}` means unconstrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSet(BTreeSet<Kind>);

impl KindSet {
    pub fn unknown() -> Self {
        Self(BTreeSet::from([Kind::Unknown]))
    }

    /// Set of `kinds`, or `{unknown}` when the iterator is empty.
    pub fn of(kinds: impl IntoIterator<Item = Kind>) -> Self {
        let set: BTreeSet<Kind> = kinds
            .into_iter()
            .filter(|kind| *kind != Kind::Unknown)
            .collect();
        if set.is_empty() {
            Self::unknown()
        } else {
            Self(set)
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.0.contains(&Kind::Unknown)
    }

    pub fn contains(&self, kind: Kind) -> bool {
        self.0.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = Kind> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Kinds admitted by both sets. `integer` is a subset of `number`.
    pub fn intersect(&self, other: &KindSet) -> Option<KindSet> {
        if self.is_unknown() {
            return Some(other.clone());
        }
        if other.is_unknown() {
            return Some(self.clone());
        }
        let mut common: BTreeSet<Kind> = self.0.intersection(&other.0).copied().collect();
        let narrows = |a: &KindSet, b: &KindSet| a.contains(Kind::Integer) && b.contains(Kind::Number);
        if narrows(self, other) || narrows(other, self) {
            common.insert(Kind::Integer);
        }
        if common.is_empty() {
            None
        } else {
            Some(Self(common))
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        self.iter().any(|kind| kind.accepts(value))
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Kind::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Numeric bound; `exclusive` excludes `value` itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub exclusive: bool,
}

impl Bound {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: false,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: true,
        }
    }
}

/// Schema applied to members not covered by a more specific keyword
/// (`additionalProperties`, `items` after a tuple prefix).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Extra {
    /// Keyword absent: extra members are valid but never added unprompted.
    #[default]
    Unspecified,
    Allowed,
    Forbidden,
    Schema(SchemaNode),
}

impl Extra {
    fn from_keyword(node: &SchemaNode, keyword: &str) -> Self {
        match node.keyword(keyword) {
            Some(Value::Bool(true)) => Extra::Allowed,
            Some(Value::Bool(false)) => Extra::Forbidden,
            Some(Value::Object(_)) => node
                .subschema(keyword)
                .map(Extra::Schema)
                .unwrap_or(Extra::Unspecified),
            _ => Extra::Unspecified,
        }
    }

    fn merge(&self, later: &Extra) -> Extra {
        match (self, later) {
            (Extra::Forbidden, _) | (_, Extra::Forbidden) => Extra::Forbidden,
            (earlier, Extra::Unspecified) => earlier.clone(),
            (_, later) => later.clone(),
        }
    }

    pub fn permits_extra(&self) -> bool {
        !matches!(self, Extra::Forbidden)
    }

    pub fn schema(&self) -> Option<&SchemaNode> {
        match self {
            Extra::Schema(node) => Some(node),
            _ => None,
        }
    }
}

/// Flat, conflict-free record produced by normalizing one schema node.
///
/// Every field is optional with a documented default applied at synthesis
/// time, so generators never read raw keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    /// Position the set was normalized from, for diagnostics.
    pub pointer: JsonPointer,
    pub kinds: KindSet,
    /// Kinds implied by kind-specific keywords, used when `type` is absent.
    pub inferred: BTreeSet<Kind>,

    pub minimum: Option<Bound>,
    pub maximum: Option<Bound>,
    pub multiple_of: Option<f64>,

    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub format: Option<String>,

    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    /// Positional (tuple) item schemas.
    pub prefix_items: Vec<SchemaNode>,
    /// Schema for items past `prefix_items`; for a single `items` schema the
    /// prefix is empty and this covers every element.
    pub items: Extra,
    pub contains: Option<SchemaNode>,

    pub properties: BTreeMap<String, SchemaNode>,
    pub required: BTreeSet<String>,
    pub additional_properties: Extra,
    pub pattern_properties: Vec<(String, SchemaNode)>,
    pub property_names: Option<SchemaNode>,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub dependent_required: BTreeMap<String, BTreeSet<String>>,

    /// Closed candidate list from `enum`/`const`; overrides generation.
    pub candidates: Option<Vec<Value>>,
    /// Values removed from the candidate space by `not`.
    pub excluded: Vec<Value>,
}

impl ConstraintSet {
    /// Unconstrained set (the `true` schema).
    pub fn any(pointer: &JsonPointer) -> Self {
        Self {
            pointer: pointer.clone(),
            kinds: KindSet::unknown(),
            inferred: BTreeSet::new(),
            minimum: None,
            maximum: None,
            multiple_of: None,
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
            min_items: None,
            max_items: None,
            unique_items: false,
            prefix_items: Vec::new(),
            items: Extra::Unspecified,
            contains: None,
            properties: BTreeMap::new(),
            required: BTreeSet::new(),
            additional_properties: Extra::Unspecified,
            pattern_properties: Vec::new(),
            property_names: None,
            min_properties: None,
            max_properties: None,
            dependent_required: BTreeMap::new(),
            candidates: None,
            excluded: Vec::new(),
        }
    }

    /// Read the node's own keywords. Combinators and `$ref` are left to the
    /// normalizer.
    pub fn from_node(node: &SchemaNode) -> Result<Self, SchemaError> {
        let pointer = node.pointer();
        let mut set = Self::any(pointer);

        set.kinds = parse_kinds(node)?;
        set.inferred = infer_kinds(node);

        set.minimum = lower_bound(node)?;
        set.maximum = upper_bound(node)?;
        set.multiple_of = keyword_f64(node, "multipleOf")?;
        if let Some(step) = set.multiple_of
            && !(step > 0.0 && step.is_finite())
        {
            return Err(SchemaError::invalid(pointer, "multipleOf must be > 0"));
        }

        set.min_length = keyword_usize(node, "minLength")?;
        set.max_length = keyword_usize(node, "maxLength")?;
        set.pattern = keyword_string(node, "pattern")?;
        set.format = keyword_string(node, "format")?;

        set.min_items = keyword_usize(node, "minItems")?;
        set.max_items = keyword_usize(node, "maxItems")?;
        set.unique_items = node
            .keyword("uniqueItems")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if node.has_keyword("prefixItems") {
            set.prefix_items = node.subschema_list("prefixItems");
            set.items = Extra::from_keyword(node, "items");
        } else if let Some(Value::Array(_)) = node.keyword("items") {
            set.prefix_items = node.subschema_list("items");
            set.items = Extra::from_keyword(node, "additionalItems");
        } else {
            set.items = Extra::from_keyword(node, "items");
        }
        set.contains = node.subschema("contains");

        set.properties = node.subschema_map("properties").into_iter().collect();
        if let Some(required) = node.keyword("required") {
            set.required = string_list(node, "required", required)?;
        }
        set.additional_properties = Extra::from_keyword(node, "additionalProperties");
        set.pattern_properties = node.subschema_map("patternProperties");
        set.property_names = node.subschema("propertyNames");
        set.min_properties = keyword_usize(node, "minProperties")?;
        set.max_properties = keyword_usize(node, "maxProperties")?;
        set.dependent_required = dependent_required(node)?;

        set.candidates = candidates(node)?;
        Ok(set)
    }

    /// Intersect two sets, as `allOf` does. Bounds take the tightest value;
    /// maps union with `later` winning on key collisions.
    pub fn intersect(&self, later: &ConstraintSet) -> Result<ConstraintSet, SchemaError> {
        let kinds = self.kinds.intersect(&later.kinds).ok_or_else(|| {
            SchemaError::unsatisfiable(
                &self.pointer,
                format!(
                    "no common type between {} and {} (from {})",
                    self.kinds, later.kinds, later.pointer
                ),
            )
        })?;

        let mut properties = self.properties.clone();
        properties.extend(later.properties.clone());

        let mut pattern_properties = self.pattern_properties.clone();
        for (pattern, node) in &later.pattern_properties {
            match pattern_properties.iter_mut().find(|(existing, _)| existing == pattern) {
                Some(entry) => entry.1 = node.clone(),
                None => pattern_properties.push((pattern.clone(), node.clone())),
            }
        }

        let mut dependent_required = self.dependent_required.clone();
        for (name, dependents) in &later.dependent_required {
            dependent_required
                .entry(name.clone())
                .or_default()
                .extend(dependents.iter().cloned());
        }

        let candidates = match (&self.candidates, &later.candidates) {
            (Some(a), Some(b)) => {
                let common: Vec<Value> = a.iter().filter(|value| b.contains(value)).cloned().collect();
                if common.is_empty() {
                    return Err(SchemaError::unsatisfiable(
                        &self.pointer,
                        format!("enum/const lists share no value with {}", later.pointer),
                    ));
                }
                Some(common)
            }
            (Some(a), None) => Some(a.clone()),
            (None, other) => other.clone(),
        };

        let mut excluded = self.excluded.clone();
        excluded.extend(later.excluded.iter().cloned());

        Ok(ConstraintSet {
            pointer: self.pointer.clone(),
            kinds,
            inferred: self.inferred.union(&later.inferred).copied().collect(),
            minimum: tighter(self.minimum, later.minimum, |a, b| a > b),
            maximum: tighter(self.maximum, later.maximum, |a, b| a < b),
            multiple_of: combine_multiples(self.multiple_of, later.multiple_of),
            min_length: max_option(self.min_length, later.min_length),
            max_length: min_option(self.max_length, later.max_length),
            pattern: later.pattern.clone().or_else(|| self.pattern.clone()),
            format: later.format.clone().or_else(|| self.format.clone()),
            min_items: max_option(self.min_items, later.min_items),
            max_items: min_option(self.max_items, later.max_items),
            unique_items: self.unique_items || later.unique_items,
            prefix_items: if later.prefix_items.is_empty() {
                self.prefix_items.clone()
            } else {
                later.prefix_items.clone()
            },
            items: self.items.merge(&later.items),
            contains: later.contains.clone().or_else(|| self.contains.clone()),
            properties,
            required: self.required.union(&later.required).cloned().collect(),
            additional_properties: self.additional_properties.merge(&later.additional_properties),
            pattern_properties,
            property_names: later
                .property_names
                .clone()
                .or_else(|| self.property_names.clone()),
            min_properties: max_option(self.min_properties, later.min_properties),
            max_properties: min_option(self.max_properties, later.max_properties),
            dependent_required,
            candidates,
            excluded,
        })
    }

    /// Settle the kind set and candidate list once all merging is done.
    ///
    /// Kinds whose own constraints admit no value are dropped; a set left
    /// with no viable kind is unsatisfiable.
    pub fn finalize(mut self) -> Result<ConstraintSet, SchemaError> {
        if self.kinds.is_unknown() && !self.inferred.is_empty() {
            self.kinds = KindSet::of(self.inferred.iter().copied());
        }

        if let Some(candidates) = self.candidates.take() {
            let viable: Vec<Value> = candidates
                .into_iter()
                .filter(|value| !self.excluded.contains(value) && self.kinds.accepts(value))
                .collect();
            if viable.is_empty() {
                return Err(SchemaError::unsatisfiable(
                    &self.pointer,
                    "no enum/const value satisfies the type and `not` constraints",
                ));
            }
            self.candidates = Some(viable);
            return Ok(self);
        }

        if self.kinds.is_unknown() {
            return Ok(self);
        }

        let mut last_reason = String::new();
        let mut viable = Vec::new();
        for kind in self.kinds.iter() {
            match self.kind_conflict(kind) {
                None => viable.push(kind),
                Some(reason) => last_reason = reason,
            }
        }
        if viable.is_empty() {
            return Err(SchemaError::unsatisfiable(&self.pointer, last_reason));
        }
        self.kinds = KindSet::of(viable);
        Ok(self)
    }

    /// Integer bounds after applying exclusivity, `None` where open.
    /// Limits beyond 64 bits are clamped; `kind_conflict` rejects them first.
    pub fn integer_bounds(&self) -> (Option<i64>, Option<i64>) {
        let clamp = |limit: i128| limit.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        let (lower, upper) = self.integer_limits();
        (lower.map(clamp), upper.map(clamp))
    }

    fn integer_limits(&self) -> (Option<i128>, Option<i128>) {
        let lower = self.minimum.map(|bound| {
            if bound.exclusive {
                (bound.value.floor() as i128).saturating_add(1)
            } else {
                bound.value.ceil() as i128
            }
        });
        let upper = self.maximum.map(|bound| {
            if bound.exclusive {
                (bound.value.ceil() as i128).saturating_sub(1)
            } else {
                bound.value.floor() as i128
            }
        });
        (lower, upper)
    }

    /// Float bounds after shifting exclusive ends by a relative epsilon.
    pub fn number_bounds(&self) -> (Option<f64>, Option<f64>) {
        let lower = self.minimum.map(|bound| {
            if bound.exclusive {
                bound.value + epsilon(bound.value)
            } else {
                bound.value
            }
        });
        let upper = self.maximum.map(|bound| {
            if bound.exclusive {
                bound.value - epsilon(bound.value)
            } else {
                bound.value
            }
        });
        (lower, upper)
    }

    /// Kinds this set can produce, inferring from keywords when `type` is absent.
    pub fn effective_kinds(&self) -> KindSet {
        if self.kinds.is_unknown() && !self.inferred.is_empty() {
            KindSet::of(self.inferred.iter().copied())
        } else {
            self.kinds.clone()
        }
    }

    fn kind_conflict(&self, kind: Kind) -> Option<String> {
        match kind {
            Kind::Integer => match self.integer_limits() {
                (Some(lo), _) if lo > i64::MAX as i128 => Some(format!(
                    "no 64-bit integer satisfies minimum {}",
                    describe(self.minimum)
                )),
                (_, Some(hi)) if hi < i64::MIN as i128 => Some(format!(
                    "no 64-bit integer satisfies maximum {}",
                    describe(self.maximum)
                )),
                (Some(lo), Some(hi)) if lo > hi => Some(format!(
                    "no integer between minimum {} and maximum {}",
                    describe(self.minimum),
                    describe(self.maximum)
                )),
                _ => None,
            },
            Kind::Number => match self.number_bounds() {
                (Some(lo), Some(hi)) if lo > hi => Some(format!(
                    "minimum {} exceeds maximum {}",
                    describe(self.minimum),
                    describe(self.maximum)
                )),
                _ => None,
            },
            Kind::String => match (self.min_length, self.max_length) {
                (Some(min), Some(max)) if min > max => {
                    Some(format!("minLength {min} exceeds maxLength {max}"))
                }
                _ => None,
            },
            Kind::Array => {
                let min = self.min_items.unwrap_or(0);
                let mut max = self.max_items.unwrap_or(usize::MAX);
                if matches!(self.items, Extra::Forbidden) {
                    max = max.min(self.prefix_items.len());
                }
                if self.contains.is_some() && max == 0 {
                    return Some("contains requires at least one item".to_string());
                }
                (min > max).then(|| format!("minItems {min} exceeds the admissible length {max}"))
            }
            Kind::Object => {
                let max = self.max_properties.unwrap_or(usize::MAX);
                let min = self.min_properties.unwrap_or(0);
                if min > max {
                    return Some(format!("minProperties {min} exceeds maxProperties {max}"));
                }
                if self.required.len() > max {
                    return Some(format!(
                        "{} required properties exceed maxProperties {max}",
                        self.required.len()
                    ));
                }
                let closed = !self.additional_properties.permits_extra()
                    && self.pattern_properties.is_empty();
                let available = self.properties.len()
                    + self
                        .required
                        .iter()
                        .filter(|name| !self.properties.contains_key(*name))
                        .count();
                if closed && min > available {
                    return Some(format!(
                        "minProperties {min} exceeds the {available} properties a closed object allows"
                    ));
                }
                None
            }
            Kind::Null | Kind::Boolean | Kind::Unknown => None,
        }
    }
}

fn epsilon(value: f64) -> f64 {
    f64::EPSILON * value.abs().max(1.0) * 4.0
}

fn describe(bound: Option<Bound>) -> String {
    match bound {
        Some(bound) if bound.exclusive => format!("{} (exclusive)", bound.value),
        Some(bound) => bound.value.to_string(),
        None => "unbounded".to_string(),
    }
}

/// Pick the tighter of two bounds; `better(a, b)` says whether `a` is
/// strictly tighter than `b`. Equal values keep the exclusive one.
fn tighter(a: Option<Bound>, b: Option<Bound>, better: fn(f64, f64) -> bool) -> Option<Bound> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if better(a.value, b.value) {
                Some(a)
            } else if better(b.value, a.value) {
                Some(b)
            } else {
                Some(Bound {
                    value: a.value,
                    exclusive: a.exclusive || b.exclusive,
                })
            }
        }
        (a, b) => a.or(b),
    }
}

fn combine_multiples(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let integral = |step: f64| step.fract() == 0.0 && step <= u64::MAX as f64;
            if a == b {
                Some(a)
            } else if integral(a) && integral(b) {
                Some(lcm(a as u64, b as u64) as f64)
            } else if (a / b).fract() == 0.0 {
                Some(a)
            } else {
                // Incommensurable fractional steps: the later one wins.
                Some(b)
            }
        }
        (a, b) => a.or(b),
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    fn gcd(mut a: u64, mut b: u64) -> u64 {
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }
    if a == 0 || b == 0 {
        return a.max(b);
    }
    (a / gcd(a, b)).saturating_mul(b)
}

fn max_option(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn min_option(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn parse_kinds(node: &SchemaNode) -> Result<KindSet, SchemaError> {
    let mut kinds = Vec::new();
    match node.keyword("type") {
        None => {}
        Some(Value::String(name)) => kinds.extend(Kind::parse(name)),
        Some(Value::Array(names)) => {
            for name in names {
                let name = name.as_str().ok_or_else(|| {
                    SchemaError::invalid(node.pointer(), "type entries must be strings")
                })?;
                kinds.extend(Kind::parse(name));
            }
        }
        Some(_) => {
            return Err(SchemaError::invalid(
                node.pointer(),
                "type must be a string or an array of strings",
            ));
        }
    }
    if kinds.is_empty() {
        return Ok(KindSet::unknown());
    }
    if node.keyword("nullable").and_then(Value::as_bool) == Some(true) {
        kinds.push(Kind::Null);
    }
    Ok(KindSet::of(kinds))
}

fn infer_kinds(node: &SchemaNode) -> BTreeSet<Kind> {
    let mut inferred = BTreeSet::new();
    let present = |keywords: &[&str]| keywords.iter().any(|keyword| node.has_keyword(keyword));
    if present(OBJECT_KEYWORDS) {
        inferred.insert(Kind::Object);
    }
    if present(ARRAY_KEYWORDS) {
        inferred.insert(Kind::Array);
    }
    if present(STRING_KEYWORDS) {
        inferred.insert(Kind::String);
    }
    if present(NUMBER_KEYWORDS) {
        inferred.insert(Kind::Number);
    }
    match node.keyword("format").and_then(Value::as_str) {
        Some("int32" | "int64") => {
            inferred.insert(Kind::Integer);
        }
        Some("float" | "double") => {
            inferred.insert(Kind::Number);
        }
        Some(_) => {
            inferred.insert(Kind::String);
        }
        None => {}
    }
    if !inferred.is_empty() && node.keyword("nullable").and_then(Value::as_bool) == Some(true) {
        inferred.insert(Kind::Null);
    }
    inferred
}

fn keyword_f64(node: &SchemaNode, keyword: &str) -> Result<Option<f64>, SchemaError> {
    match node.keyword(keyword) {
        None => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            SchemaError::invalid(node.pointer(), format!("{keyword} must be a number"))
        }),
    }
}

fn keyword_usize(node: &SchemaNode, keyword: &str) -> Result<Option<usize>, SchemaError> {
    match node.keyword(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|number| *number >= 0.0 && number.fract() == 0.0)
            .map(|number| Some(number.min(usize::MAX as f64) as usize))
            .ok_or_else(|| {
                SchemaError::invalid(
                    node.pointer(),
                    format!("{keyword} must be a non-negative integer"),
                )
            }),
    }
}

fn keyword_string(node: &SchemaNode, keyword: &str) -> Result<Option<String>, SchemaError> {
    match node.keyword(keyword) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(SchemaError::invalid(
            node.pointer(),
            format!("{keyword} must be a string"),
        )),
    }
}

/// Lower bound from `minimum` and `exclusiveMinimum` (boolean draft-4 form
/// or numeric draft-6 form), keeping the tighter one.
fn lower_bound(node: &SchemaNode) -> Result<Option<Bound>, SchemaError> {
    bound(node, "minimum", "exclusiveMinimum", |a, b| a > b)
}

fn upper_bound(node: &SchemaNode) -> Result<Option<Bound>, SchemaError> {
    bound(node, "maximum", "exclusiveMaximum", |a, b| a < b)
}

fn bound(
    node: &SchemaNode,
    inclusive_keyword: &str,
    exclusive_keyword: &str,
    better: fn(f64, f64) -> bool,
) -> Result<Option<Bound>, SchemaError> {
    let inclusive = keyword_f64(node, inclusive_keyword)?;
    match node.keyword(exclusive_keyword) {
        None | Some(Value::Bool(false)) => Ok(inclusive.map(Bound::inclusive)),
        Some(Value::Bool(true)) => Ok(inclusive.map(Bound::exclusive)),
        Some(value) => {
            let exclusive = value.as_f64().ok_or_else(|| {
                SchemaError::invalid(
                    node.pointer(),
                    format!("{exclusive_keyword} must be a number or a boolean"),
                )
            })?;
            Ok(tighter(
                inclusive.map(Bound::inclusive),
                Some(Bound::exclusive(exclusive)),
                better,
            ))
        }
    }
}

fn string_list(
    node: &SchemaNode,
    keyword: &str,
    value: &Value,
) -> Result<BTreeSet<String>, SchemaError> {
    let invalid = || {
        SchemaError::invalid(node.pointer(), format!("{keyword} must be an array of strings"))
    };
    let Value::Array(items) = value else {
        return Err(invalid());
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn dependent_required(
    node: &SchemaNode,
) -> Result<BTreeMap<String, BTreeSet<String>>, SchemaError> {
    let mut map = BTreeMap::new();
    for keyword in ["dependentRequired", "dependencies"] {
        let Some(Value::Object(entries)) = node.keyword(keyword) else {
            continue;
        };
        for (name, dependents) in entries {
            // Schema-valued `dependencies` entries are not property lists.
            if keyword == "dependencies" && !dependents.is_array() {
                continue;
            }
            let list = string_list(node, keyword, dependents)?;
            map.entry(name.clone())
                .or_insert_with(BTreeSet::new)
                .extend(list);
        }
    }
    Ok(map)
}

fn candidates(node: &SchemaNode) -> Result<Option<Vec<Value>>, SchemaError> {
    let enumerated = match node.keyword("enum") {
        None => None,
        Some(Value::Array(values)) => Some(values.clone()),
        Some(_) => {
            return Err(SchemaError::invalid(node.pointer(), "enum must be an array"));
        }
    };
    match (enumerated, node.keyword("const")) {
        (None, None) => Ok(None),
        (Some(values), None) => Ok(Some(values)),
        (None, Some(constant)) => Ok(Some(vec![constant.clone()])),
        (Some(values), Some(constant)) => {
            if values.contains(constant) {
                Ok(Some(vec![constant.clone()]))
            } else {
                Err(SchemaError::unsatisfiable(
                    node.pointer(),
                    "const is not one of the enum values",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(schema: Value) -> ConstraintSet {
        ConstraintSet::from_node(&SchemaNode::root(schema)).expect("constraint set")
    }

    #[test]
    fn integer_narrows_number() {
        let number = KindSet::of([Kind::Number, Kind::String]);
        let integer = KindSet::of([Kind::Integer]);
        assert_eq!(number.intersect(&integer), Some(KindSet::of([Kind::Integer])));
        assert_eq!(
            KindSet::of([Kind::Boolean]).intersect(&integer),
            None
        );
        assert_eq!(KindSet::unknown().intersect(&integer), Some(integer));
    }

    #[test]
    fn exclusive_forms_are_both_read() {
        let draft4 = set(json!({"minimum": 5, "exclusiveMinimum": true}));
        assert_eq!(draft4.minimum, Some(Bound::exclusive(5.0)));

        let draft6 = set(json!({"minimum": 5, "exclusiveMinimum": 7}));
        assert_eq!(draft6.minimum, Some(Bound::exclusive(7.0)));
        assert_eq!(draft6.integer_bounds(), (Some(8), None));
    }

    #[test]
    fn intersection_takes_tightest_bounds() {
        let a = set(json!({"type": "integer", "minimum": 1, "maximum": 50, "multipleOf": 4}));
        let b = set(json!({"minimum": 10, "maximum": 100, "multipleOf": 6, "required": ["x"]}));
        let merged = a.intersect(&b).expect("merge");
        assert_eq!(merged.minimum, Some(Bound::inclusive(10.0)));
        assert_eq!(merged.maximum, Some(Bound::inclusive(50.0)));
        assert_eq!(merged.multiple_of, Some(12.0));
        assert!(merged.required.contains("x"));
    }

    #[test]
    fn later_properties_override_earlier() {
        let a = set(json!({"properties": {"id": {"type": "string"}, "a": {}}}));
        let b = set(json!({"properties": {"id": {"type": "integer"}}}));
        let merged = a.intersect(&b).expect("merge");
        assert_eq!(merged.properties.len(), 2);
        assert_eq!(
            merged.properties["id"].keyword("type"),
            Some(&json!("integer"))
        );
    }

    #[test]
    fn contradictory_bounds_are_unsatisfiable() {
        let err = set(json!({"type": "integer", "minimum": 10, "maximum": 1}))
            .finalize()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Unsatisfiable { .. }));

        let err = set(json!({"type": "integer", "minimum": 5.2, "maximum": 5.8}))
            .finalize()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Unsatisfiable { .. }));
    }

    #[test]
    fn integer_bounds_beyond_64_bits_are_unsatisfiable() {
        for schema in [
            json!({"type": "integer", "exclusiveMinimum": 1e19}),
            json!({"type": "integer", "minimum": 1e19}),
            json!({"type": "integer", "exclusiveMaximum": -1e19}),
            json!({"type": "integer", "maximum": -1e300}),
        ] {
            let err = set(schema.clone()).finalize().unwrap_err();
            assert!(matches!(err, SchemaError::Unsatisfiable { .. }), "{schema}");
        }

        let wide = set(json!({"type": "integer", "minimum": -1e300, "maximum": 1e300}));
        assert_eq!(wide.integer_bounds(), (Some(i64::MIN), Some(i64::MAX)));

        let finalized = set(json!({"type": ["integer", "number"], "minimum": 1e19}))
            .finalize()
            .expect("number remains");
        assert_eq!(finalized.kinds, KindSet::of([Kind::Number]));
    }

    #[test]
    fn contradiction_only_prunes_the_affected_kind() {
        let finalized = set(json!({"type": ["integer", "string"], "minimum": 10, "maximum": 1}))
            .finalize()
            .expect("string remains");
        assert_eq!(finalized.kinds, KindSet::of([Kind::String]));
    }

    #[test]
    fn kinds_are_inferred_without_type() {
        let finalized = set(json!({"properties": {"a": {}}})).finalize().expect("object");
        assert_eq!(finalized.kinds, KindSet::of([Kind::Object]));
        let finalized = set(json!({"description": "anything"})).finalize().expect("any");
        assert!(finalized.kinds.is_unknown());
    }

    #[test]
    fn enum_candidates_filter_by_type_and_exclusions() {
        let mut raw = set(json!({"type": "string", "enum": ["a", 1, "b"]}));
        raw.excluded.push(json!("b"));
        let finalized = raw.finalize().expect("candidates");
        assert_eq!(finalized.candidates, Some(vec![json!("a")]));
    }

    #[test]
    fn nullable_adds_null_kind() {
        let raw = set(json!({"type": "string", "nullable": true}));
        assert_eq!(raw.kinds, KindSet::of([Kind::String, Kind::Null]));
    }

    #[test]
    fn tuple_items_forms() {
        let legacy = set(json!({"items": [{"type": "string"}, {"type": "integer"}], "additionalItems": false}));
        assert_eq!(legacy.prefix_items.len(), 2);
        assert_eq!(legacy.items, Extra::Forbidden);

        let modern = set(json!({"prefixItems": [{"type": "string"}], "items": {"type": "boolean"}}));
        assert_eq!(modern.prefix_items.len(), 1);
        assert!(modern.items.schema().is_some());
    }

    #[test]
    fn invalid_keyword_values_are_reported() {
        let err = ConstraintSet::from_node(&SchemaNode::root(json!({"multipleOf": 0}))).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
        let err = ConstraintSet::from_node(&SchemaNode::root(json!({"minLength": "3"}))).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }
}
