//! Value synthesis: walks normalized constraint sets and draws values.

mod array;
mod numeric;
mod object;
pub(crate) mod text;

use rand::Rng;
use serde_json::{Map, Value};

use jsonalchemy_core::{ReferenceResolver, SchemaError, SchemaNode};

use crate::constraints::{ConstraintSet, Kind};
use crate::model::{GenerateOptions, IssueCode};
use crate::normalize::{NormalizedSchema, Normalizer};
use crate::provider::ProviderBridge;
use crate::session::GenerationContext;

/// Recursive value synthesizer for one schema document.
pub(crate) struct Synthesizer<'a> {
    options: &'a GenerateOptions,
    resolver: &'a ReferenceResolver,
    normalizer: Normalizer<'a>,
    provider: &'a ProviderBridge,
}

impl<'a> Synthesizer<'a> {
    pub(crate) fn new(
        options: &'a GenerateOptions,
        resolver: &'a ReferenceResolver,
        provider: &'a ProviderBridge,
    ) -> Self {
        Self {
            options,
            resolver,
            normalizer: Normalizer::new(resolver),
            provider,
        }
    }

    /// Generate one value for `node`. `hint` is the property name the value
    /// will be stored under, if any.
    pub(crate) fn synthesize_node(
        &self,
        node: &SchemaNode,
        hint: Option<&str>,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        ctx.count_node(self.options.node_budget)?;

        if ctx.depth() >= self.options.max_depth {
            ctx.report.record(
                IssueCode::DepthTruncated,
                node.pointer(),
                format!("depth limit {} reached; terminal value used", self.options.max_depth),
            );
            return Ok(self.terminal_value(node));
        }

        let normalization = self
            .normalizer
            .normalize(node, &ctx.ref_stack, &mut ctx.report)?;
        let set = match normalization.schema {
            NormalizedSchema::Cycle { target } => {
                ctx.report.record(
                    IssueCode::CycleBroken,
                    node.pointer(),
                    format!("reference to {} re-enters the current path", target.pointer()),
                );
                return Ok(self.terminal_value(&target));
            }
            NormalizedSchema::Single(set) => set,
            NormalizedSchema::Choice(mut sets) => {
                let index = ctx.rng.random_range(0..sets.len());
                sets.swap_remove(index)
            }
        };

        let mark = ctx.enter(normalization.entered);
        let value = self.synthesize(&set, hint, ctx);
        ctx.leave(mark);
        value
    }

    /// Draw a value from a finalized constraint set.
    fn synthesize(
        &self,
        set: &ConstraintSet,
        hint: Option<&str>,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        if let Some(candidates) = &set.candidates {
            let index = ctx.rng.random_range(0..candidates.len());
            return Ok(candidates[index].clone());
        }

        let kinds: Vec<Kind> = set.kinds.iter().collect();
        let mut value = Value::Null;
        for _ in 0..self.options.unique_attempts {
            let kind = kinds[ctx.rng.random_range(0..kinds.len())];
            value = self.synthesize_kind(kind, set, hint, ctx)?;
            if !set.excluded.contains(&value) {
                return Ok(value);
            }
        }
        ctx.report.record(
            IssueCode::ExcludedValueRetained,
            &set.pointer,
            "every attempt produced a value excluded by `not`",
        );
        Ok(value)
    }

    fn synthesize_kind(
        &self,
        kind: Kind,
        set: &ConstraintSet,
        hint: Option<&str>,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        match kind {
            Kind::Null => Ok(Value::Null),
            Kind::Boolean => {
                let allowed: Vec<bool> = [false, true]
                    .into_iter()
                    .filter(|flag| !set.excluded.contains(&Value::Bool(*flag)))
                    .collect();
                Ok(Value::Bool(match allowed.as_slice() {
                    [only] => *only,
                    _ => ctx.rng.random_bool(0.5),
                }))
            }
            Kind::Integer => numeric::integer(
                set,
                self.options.integer_range,
                self.options.unique_attempts,
                &mut ctx.rng,
            ),
            Kind::Number => numeric::number(set, self.options.number_range, &mut ctx.rng),
            Kind::String => self.string(set, hint, ctx),
            Kind::Array => self.array(set, ctx),
            Kind::Object => self.object(set, ctx),
            Kind::Unknown => Ok(self.unknown_value(hint, ctx)),
        }
    }

    /// Value for a position with no kind information: realistic text when the
    /// property name suggests one, otherwise null.
    fn unknown_value(&self, hint: Option<&str>, ctx: &mut GenerationContext) -> Value {
        match hint.and_then(|name| self.provider.property_hint(name)) {
            Some(hint) => self.provider.provide(hint, &mut ctx.rng),
            None => Value::Null,
        }
    }

    /// Cheapest value compatible with `node`'s declared type, used where
    /// recursion stops (depth limit, reference cycles).
    fn terminal_value(&self, node: &SchemaNode) -> Value {
        let target = self.resolver.resolve(node).unwrap_or_else(|_| node.clone());
        let Ok(set) = ConstraintSet::from_node(&target) else {
            return Value::Null;
        };
        if let Some(first) = set.candidates.as_ref().and_then(|values| values.first()) {
            return first.clone();
        }
        let kinds = set.effective_kinds();
        if kinds.is_unknown() || kinds.contains(Kind::Null) {
            return Value::Null;
        }
        match kinds.iter().next() {
            Some(Kind::Boolean) => Value::Bool(false),
            Some(Kind::Integer) => {
                let (lo, hi) = set.integer_bounds();
                Value::from(clamp_zero(lo, hi))
            }
            Some(Kind::Number) => {
                let (lo, hi) = set.number_bounds();
                serde_json::Number::from_f64(clamp_zero(lo, hi))
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            Some(Kind::String) => Value::String("a".repeat(set.min_length.unwrap_or(0))),
            Some(Kind::Array) => Value::Array(Vec::new()),
            Some(Kind::Object) => Value::Object(Map::new()),
            Some(Kind::Null | Kind::Unknown) | None => Value::Null,
        }
    }
}

fn clamp_zero<T: PartialOrd + Default + Copy>(lo: Option<T>, hi: Option<T>) -> T {
    let zero = T::default();
    match (lo, hi) {
        (Some(lo), _) if lo > zero => lo,
        (_, Some(hi)) if hi < zero => hi,
        _ => zero,
    }
}
