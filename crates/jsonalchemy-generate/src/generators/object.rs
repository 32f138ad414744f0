use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use jsonalchemy_core::{SchemaError, SchemaNode};

use crate::constraints::{ConstraintSet, Extra};
use crate::model::IssueCode;
use crate::session::GenerationContext;

use super::Synthesizer;

impl Synthesizer<'_> {
    pub(super) fn object(
        &self,
        set: &ConstraintSet,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        let chosen = self.choose_properties(set, ctx)?;
        let max_properties = set.max_properties.unwrap_or(usize::MAX);
        let min_properties = set.min_properties.unwrap_or(0);

        let mut object = Map::new();
        for name in &chosen {
            let value = self.property_value(set, name, ctx)?;
            object.insert(name.clone(), value);
        }

        let room = max_properties.saturating_sub(object.len());
        let needed = min_properties.saturating_sub(object.len());
        let spontaneous = if self.invites_extras(set) {
            ctx.rng.random_range(0..=self.options.max_extra_properties)
        } else {
            0
        };
        let extras = needed.max(spontaneous).min(room);
        for _ in 0..extras {
            if !self.extra_property(set, &mut object, needed > 0, ctx)? {
                break;
            }
        }

        if object.len() < min_properties {
            return Err(SchemaError::unsatisfiable(
                &set.pointer,
                format!(
                    "minProperties {min_properties} cannot be met; only {} properties could be produced",
                    object.len()
                ),
            ));
        }
        Ok(Value::Object(object))
    }

    /// Names of declared and required properties to emit, after applying
    /// optional-property sampling, dependencies and property-count bounds.
    fn choose_properties(
        &self,
        set: &ConstraintSet,
        ctx: &mut GenerationContext,
    ) -> Result<BTreeSet<String>, SchemaError> {
        let probability = self.options.optional_property_probability;
        let optional: Vec<&String> = set
            .properties
            .iter()
            .filter(|(name, node)| !set.required.contains(*name) && node.as_bool_schema() != Some(false))
            .map(|(name, _)| name)
            .collect();

        let mut chosen = set.required.clone();
        for name in &optional {
            if ctx.rng.random_bool(probability) {
                chosen.insert((*name).clone());
            }
        }
        close_dependencies(&mut chosen, set);

        let forced = {
            let mut forced = set.required.clone();
            close_dependencies(&mut forced, set);
            forced
        };

        if let Some(max) = set.max_properties {
            if forced.len() > max {
                return Err(SchemaError::unsatisfiable(
                    &set.pointer,
                    format!(
                        "{} required properties (with dependencies) exceed maxProperties {max}",
                        forced.len()
                    ),
                ));
            }
            let mut droppable: Vec<String> = chosen.difference(&forced).cloned().collect();
            droppable.shuffle(&mut ctx.rng);
            for name in droppable {
                if chosen.len() <= max {
                    break;
                }
                let depended_on = chosen.iter().any(|other| {
                    other != &name
                        && set
                            .dependent_required
                            .get(other)
                            .is_some_and(|deps| deps.contains(&name))
                });
                if !depended_on {
                    chosen.remove(&name);
                }
            }
            if chosen.len() > max {
                chosen = forced.clone();
            }
        }

        if let Some(min) = set.min_properties {
            let max = set.max_properties.unwrap_or(usize::MAX);
            let mut addable: Vec<&String> = optional
                .into_iter()
                .filter(|name| !chosen.contains(*name))
                .collect();
            addable.shuffle(&mut ctx.rng);
            for name in addable {
                if chosen.len() >= min {
                    break;
                }
                let mut grown = chosen.clone();
                grown.insert(name.clone());
                close_dependencies(&mut grown, set);
                if grown.len() <= max {
                    chosen = grown;
                }
            }
        }
        Ok(chosen)
    }

    fn property_value(
        &self,
        set: &ConstraintSet,
        name: &str,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        if let Some(node) = set.properties.get(name) {
            return self.synthesize_node(node, Some(name), ctx);
        }
        if let Some(node) = self.pattern_schema(set, name, ctx) {
            return self.synthesize_node(&node, Some(name), ctx);
        }
        match &set.additional_properties {
            Extra::Schema(node) => self.synthesize_node(node, Some(name), ctx),
            Extra::Forbidden => {
                ctx.report.record(
                    IssueCode::RequiredWithoutProperty,
                    &set.pointer,
                    format!("required property '{name}' has no schema; unconstrained value used"),
                );
                Ok(self.unknown_value(Some(name), ctx))
            }
            Extra::Allowed | Extra::Unspecified => Ok(self.unknown_value(Some(name), ctx)),
        }
    }

    /// First `patternProperties` schema whose pattern matches `name`.
    fn pattern_schema(
        &self,
        set: &ConstraintSet,
        name: &str,
        ctx: &mut GenerationContext,
    ) -> Option<SchemaNode> {
        set.pattern_properties
            .iter()
            .find(|(pattern, _)| ctx.matcher(pattern).is_some_and(|regex| regex.is_match(name)))
            .map(|(_, node)| node.clone())
    }

    fn invites_extras(&self, set: &ConstraintSet) -> bool {
        !set.pattern_properties.is_empty()
            || matches!(set.additional_properties, Extra::Allowed | Extra::Schema(_))
    }

    /// Add one synthetic property. Returns `false` when no fresh key could be
    /// found.
    fn extra_property(
        &self,
        set: &ConstraintSet,
        object: &mut Map<String, Value>,
        required: bool,
        ctx: &mut GenerationContext,
    ) -> Result<bool, SchemaError> {
        let additional = match &set.additional_properties {
            Extra::Forbidden => false,
            Extra::Unspecified => required || set.pattern_properties.is_empty(),
            Extra::Allowed | Extra::Schema(_) => true,
        };

        for _ in 0..self.options.unique_attempts {
            let use_pattern = !set.pattern_properties.is_empty()
                && (!additional || ctx.rng.random_bool(0.5));
            if use_pattern {
                let index = ctx.rng.random_range(0..set.pattern_properties.len());
                let (pattern, node) = &set.pattern_properties[index];
                let Some(sampler) = ctx.sampler(pattern, self.options.pattern_max_repeat) else {
                    ctx.report.record(
                        IssueCode::PatternUnsupported,
                        node.pointer(),
                        format!("property pattern '{pattern}' cannot be sampled"),
                    );
                    continue;
                };
                let key = sampler.sample(&mut ctx.rng);
                if object.contains_key(&key) || set.properties.contains_key(&key) {
                    continue;
                }
                let value = self.synthesize_node(node, Some(&key), ctx)?;
                object.insert(key, value);
                return Ok(true);
            }

            if !additional {
                return Ok(false);
            }
            let key = self.synthetic_key(set, ctx)?;
            if key.is_empty()
                || object.contains_key(&key)
                || set.properties.contains_key(&key)
                || self.pattern_schema(set, &key, ctx).is_some()
            {
                continue;
            }
            let value = match &set.additional_properties {
                Extra::Schema(node) => self.synthesize_node(node, Some(&key), ctx)?,
                _ => self.unknown_value(Some(&key), ctx),
            };
            object.insert(key, value);
            return Ok(true);
        }
        Ok(false)
    }

    fn synthetic_key(
        &self,
        set: &ConstraintSet,
        ctx: &mut GenerationContext,
    ) -> Result<String, SchemaError> {
        match &set.property_names {
            Some(node) => Ok(match self.synthesize_node(node, None, ctx)? {
                Value::String(key) => key,
                other => other.to_string(),
            }),
            None => Ok(self.provider.provide_text("word", &mut ctx.rng).to_lowercase()),
        }
    }
}

/// Add every property required by `dependentRequired` until stable.
fn close_dependencies(chosen: &mut BTreeSet<String>, set: &ConstraintSet) {
    loop {
        let missing: Vec<String> = chosen
            .iter()
            .filter_map(|name| set.dependent_required.get(name))
            .flatten()
            .filter(|dependent| !chosen.contains(*dependent))
            .cloned()
            .collect();
        if missing.is_empty() {
            return;
        }
        chosen.extend(missing);
    }
}
