use std::collections::HashSet;

use rand::Rng;
use serde_json::Value;

use jsonalchemy_core::{SchemaError, SchemaNode};

use crate::constraints::{ConstraintSet, Extra};
use crate::model::IssueCode;
use crate::session::GenerationContext;

use super::Synthesizer;

/// Canonical text of a value; object keys are already sorted, so equal
/// values share one rendering.
fn canonical(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

impl Synthesizer<'_> {
    pub(super) fn array(
        &self,
        set: &ConstraintSet,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        let (min_len, max_len) = self.array_bounds(set)?;
        let len = if min_len == max_len {
            min_len
        } else {
            ctx.rng.random_range(min_len..=max_len)
        };
        let contains_at = set
            .contains
            .as_ref()
            .map(|_| ctx.rng.random_range(0..len));

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            let schema = if contains_at == Some(index) {
                set.contains.as_ref()
            } else {
                item_schema(set, index)
            };

            let mut item = self.element(schema, ctx)?;
            if set.unique_items {
                let mut key = canonical(&item);
                let mut attempts = 1;
                while seen.contains(&key) && attempts < self.options.unique_attempts {
                    item = self.element(schema, ctx)?;
                    key = canonical(&item);
                    attempts += 1;
                }
                if !seen.insert(key) {
                    ctx.report.record(
                        IssueCode::UniqueItemsExhausted,
                        &set.pointer,
                        format!(
                            "no distinct item after {} attempts; duplicate kept",
                            self.options.unique_attempts
                        ),
                    );
                }
            }
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn array_bounds(&self, set: &ConstraintSet) -> Result<(usize, usize), SchemaError> {
        let defaults = self.options.array_length;
        let mut min_len = set.min_items.unwrap_or(0);
        let mut max_len = set.max_items.unwrap_or(defaults.max.max(min_len));
        if matches!(set.items, Extra::Forbidden) {
            max_len = max_len.min(set.prefix_items.len());
        }
        if set.min_items.is_none() {
            min_len = defaults.min.min(max_len);
        }
        // Fill the tuple prefix whenever the upper bound leaves room for it.
        min_len = min_len.max(set.prefix_items.len().min(max_len));
        if set.contains.is_some() {
            min_len = min_len.max(1);
        }
        if min_len > max_len {
            return Err(SchemaError::unsatisfiable(
                &set.pointer,
                format!("array needs at least {min_len} items but at most {max_len} are allowed"),
            ));
        }
        Ok((min_len, max_len))
    }

    fn element(
        &self,
        schema: Option<&SchemaNode>,
        ctx: &mut GenerationContext,
    ) -> Result<Value, SchemaError> {
        match schema {
            Some(node) => self.synthesize_node(node, None, ctx),
            None => Ok(Value::Null),
        }
    }
}

/// Schema governing position `index`, `None` when any value is allowed.
fn item_schema(set: &ConstraintSet, index: usize) -> Option<&SchemaNode> {
    match set.prefix_items.get(index) {
        Some(node) => Some(node),
        None => set.items.schema(),
    }
}
