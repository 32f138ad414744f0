//! Flattens a schema node (`$ref`, `allOf`, `anyOf`/`oneOf`, `not`,
//! conditionals) into finalized [`ConstraintSet`]s.

use jsonalchemy_core::{JsonPointer, ReferenceResolver, SchemaError, SchemaNode};

use crate::constraints::ConstraintSet;
use crate::model::{GenerationReport, IssueCode};

/// Upper bound on the alternatives produced by nested `anyOf`/`oneOf`.
const MAX_ALTERNATIVES: usize = 256;

/// Result of normalizing one node.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedSchema {
    Single(ConstraintSet),
    /// Alternatives from `anyOf`/`oneOf`, each already merged with the
    /// surrounding constraints.
    Choice(Vec<ConstraintSet>),
    /// The node is a `$ref` back into the current generation path.
    Cycle { target: SchemaNode },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub schema: NormalizedSchema,
    /// `$ref` targets merged into the result. They stay on the reference
    /// stack while the node's children are synthesized.
    pub entered: Vec<JsonPointer>,
}

/// Reads constraints; never draws randomness.
pub struct Normalizer<'a> {
    resolver: &'a ReferenceResolver,
}

struct Walk<'w> {
    /// Reference targets on the generation path above this node.
    path: &'w [JsonPointer],
    /// Reference targets being merged within this normalization.
    active: Vec<JsonPointer>,
    entered: Vec<JsonPointer>,
    report: &'w mut GenerationReport,
}

impl Walk<'_> {
    fn is_open(&self, pointer: &JsonPointer) -> bool {
        self.path.contains(pointer) || self.active.contains(pointer)
    }
}

impl<'a> Normalizer<'a> {
    pub fn new(resolver: &'a ReferenceResolver) -> Self {
        Self { resolver }
    }

    /// Normalize `node`. `path` holds the reference targets already entered
    /// by enclosing nodes; a `$ref` on `node` itself that points into it is
    /// reported as [`NormalizedSchema::Cycle`].
    pub fn normalize(
        &self,
        node: &SchemaNode,
        path: &[JsonPointer],
        report: &mut GenerationReport,
    ) -> Result<Normalization, SchemaError> {
        if let Some(reference) = self.resolver.reference_of(node)? {
            let target = self.resolver.resolve_reference(reference, node.pointer())?;
            if path.contains(target.pointer()) {
                return Ok(Normalization {
                    schema: NormalizedSchema::Cycle { target },
                    entered: Vec::new(),
                });
            }
        }

        let mut walk = Walk {
            path,
            active: Vec::new(),
            entered: Vec::new(),
            report,
        };
        let alternatives = self.walk(node, &mut walk)?;

        let mut finalized = Vec::with_capacity(alternatives.len());
        let mut first_error = None;
        for alternative in alternatives {
            match alternative.finalize() {
                Ok(set) => finalized.push(set),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        let schema = match finalized.len() {
            0 => {
                return Err(first_error.unwrap_or_else(|| {
                    SchemaError::unsatisfiable(node.pointer(), "no alternative is satisfiable")
                }));
            }
            1 => NormalizedSchema::Single(finalized.remove(0)),
            _ => NormalizedSchema::Choice(finalized),
        };
        Ok(Normalization {
            schema,
            entered: walk.entered,
        })
    }

    fn walk(&self, node: &SchemaNode, walk: &mut Walk<'_>) -> Result<Vec<ConstraintSet>, SchemaError> {
        match node.as_bool_schema() {
            Some(true) => return Ok(vec![ConstraintSet::any(node.pointer())]),
            Some(false) => {
                return Err(SchemaError::unsatisfiable(
                    node.pointer(),
                    "schema `false` admits no value",
                ));
            }
            None => {}
        }
        if node.as_object().is_none() {
            return Err(SchemaError::invalid(
                node.pointer(),
                "schema must be an object or a boolean",
            ));
        }

        let mut base = ConstraintSet::from_node(node)?;
        if let Some(negated) = node.subschema("not") {
            self.apply_not(&mut base, &negated, walk);
        }
        let mut alternatives = vec![base];

        if let Some(reference) = self.resolver.reference_of(node)? {
            let target = self.resolver.resolve_reference(reference, node.pointer())?;
            if walk.is_open(target.pointer()) {
                walk.report.record(
                    IssueCode::CycleBroken,
                    node.pointer(),
                    format!("reference '{reference}' re-enters {}; left unconstrained", target.pointer()),
                );
            } else {
                walk.entered.push(target.pointer().clone());
                walk.active.push(target.pointer().clone());
                let merged = self.walk(&target, walk);
                walk.active.pop();
                alternatives = product(&alternatives, &merged?, node)?;
            }
        }

        for member in node.subschema_list("allOf") {
            let member_alternatives = self.walk(&member, walk)?;
            alternatives = product(&alternatives, &member_alternatives, node)?;
        }

        if node.has_keyword("if") {
            walk.report.record(
                IssueCode::IfAdvisory,
                node.pointer(),
                "`if` is not evaluated; `then` is applied and `else` ignored",
            );
        }
        if let Some(then) = node.subschema("then") {
            let then_alternatives = self.walk(&then, walk)?;
            alternatives = product(&alternatives, &then_alternatives, node)?;
        }

        for keyword in ["anyOf", "oneOf"] {
            let branches = node.subschema_list(keyword);
            if branches.is_empty() {
                continue;
            }
            let mut options = Vec::new();
            let mut first_error = None;
            for branch in branches {
                match self.walk(&branch, walk) {
                    Ok(branch_alternatives) => options.extend(branch_alternatives),
                    Err(err @ SchemaError::Unsatisfiable { .. }) => {
                        first_error.get_or_insert(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            if options.is_empty() {
                return Err(first_error.unwrap_or_else(|| {
                    SchemaError::unsatisfiable(node.pointer(), format!("every {keyword} branch is unsatisfiable"))
                }));
            }
            alternatives = product(&alternatives, &options, node)?;
        }

        Ok(alternatives)
    }

    /// `not` only narrows the candidate space through its `enum`/`const`.
    fn apply_not(&self, set: &mut ConstraintSet, negated: &SchemaNode, walk: &mut Walk<'_>) {
        let mut understood = false;
        if let Some(values) = negated.keyword("enum").and_then(|value| value.as_array()) {
            set.excluded.extend(values.iter().cloned());
            understood = true;
        }
        if let Some(value) = negated.keyword("const") {
            set.excluded.push(value.clone());
            understood = true;
        }
        let other_keywords = negated
            .as_object()
            .is_some_and(|map| map.keys().any(|key| key != "enum" && key != "const"));
        if !understood || other_keywords {
            walk.report.record(
                IssueCode::NotIgnored,
                negated.pointer(),
                "`not` is applied only through enum/const; other keywords ignored",
            );
        }
    }
}

/// Pairwise intersection of two alternative lists. Pairs that contradict are
/// dropped; if none survive, the first contradiction is returned.
fn product(
    lefts: &[ConstraintSet],
    rights: &[ConstraintSet],
    node: &SchemaNode,
) -> Result<Vec<ConstraintSet>, SchemaError> {
    let mut merged = Vec::new();
    let mut first_error = None;
    'outer: for left in lefts {
        for right in rights {
            if merged.len() >= MAX_ALTERNATIVES {
                break 'outer;
            }
            match left.intersect(right) {
                Ok(set) => merged.push(set),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
    }
    if merged.is_empty() {
        return Err(first_error.unwrap_or_else(|| {
            SchemaError::unsatisfiable(node.pointer(), "constraints admit no value")
        }));
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Bound, Kind, KindSet};
    use serde_json::{Value, json};

    fn normalize(schema: Value) -> (Result<Normalization, SchemaError>, GenerationReport) {
        let root = SchemaNode::root(schema);
        let resolver = ReferenceResolver::for_node(&root);
        let mut report = GenerationReport::new(0);
        let result = Normalizer::new(&resolver).normalize(&root, &[], &mut report);
        (result, report)
    }

    fn single(schema: Value) -> ConstraintSet {
        match normalize(schema).0.expect("normalize").schema {
            NormalizedSchema::Single(set) => set,
            other => panic!("expected a single set, got {other:?}"),
        }
    }

    #[test]
    fn all_of_members_are_intersected() {
        let set = single(json!({
            "allOf": [
                {"type": "integer", "minimum": 0},
                {"maximum": 9},
                {"minimum": 3}
            ]
        }));
        assert_eq!(set.kinds, KindSet::of([Kind::Integer]));
        assert_eq!(set.minimum, Some(Bound::inclusive(3.0)));
        assert_eq!(set.maximum, Some(Bound::inclusive(9.0)));
    }

    #[test]
    fn ref_siblings_merge_with_target() {
        let set = single(json!({
            "definitions": {"base": {"type": "string", "maxLength": 10}},
            "$ref": "#/definitions/base",
            "minLength": 2
        }));
        assert_eq!(set.kinds, KindSet::of([Kind::String]));
        assert_eq!((set.min_length, set.max_length), (Some(2), Some(10)));
    }

    #[test]
    fn one_of_yields_merged_alternatives() {
        let (result, _) = normalize(json!({
            "required": ["id"],
            "oneOf": [{"type": "string"}, {"type": "object"}, {"type": "integer"}]
        }));
        let NormalizedSchema::Choice(sets) = result.expect("normalize").schema else {
            panic!("expected choice");
        };
        assert_eq!(sets.len(), 3);
        assert!(sets.iter().all(|set| set.required.contains("id")));
    }

    #[test]
    fn contradictory_branches_are_dropped() {
        let set = single(json!({
            "type": "string",
            "anyOf": [{"type": "integer"}, {"minLength": 3}]
        }));
        assert_eq!(set.min_length, Some(3));

        let (result, _) = normalize(json!({"type": "string", "anyOf": [{"type": "integer"}, false]}));
        assert!(matches!(result, Err(SchemaError::Unsatisfiable { .. })));
    }

    #[test]
    fn not_enum_becomes_exclusion() {
        let (result, report) = normalize(json!({"enum": [1, 2, 3], "not": {"enum": [1, 2]}}));
        let NormalizedSchema::Single(set) = result.expect("normalize").schema else {
            panic!("expected single");
        };
        assert_eq!(set.candidates, Some(vec![json!(3)]));
        assert!(!report.has(IssueCode::NotIgnored));

        let (_, report) = normalize(json!({"type": "string", "not": {"minLength": 3}}));
        assert!(report.has(IssueCode::NotIgnored));
    }

    #[test]
    fn then_applies_and_if_is_reported() {
        let (result, report) = normalize(json!({
            "if": {"properties": {"kind": {"const": "a"}}},
            "then": {"required": ["a"]},
            "else": {"required": ["b"]}
        }));
        let NormalizedSchema::Single(set) = result.expect("normalize").schema else {
            panic!("expected single");
        };
        assert!(set.required.contains("a"));
        assert!(!set.required.contains("b"));
        assert!(report.has(IssueCode::IfAdvisory));
    }

    #[test]
    fn self_reference_on_the_path_is_a_cycle() {
        let root = SchemaNode::root(json!({
            "type": "object",
            "properties": {"next": {"$ref": "#"}}
        }));
        let resolver = ReferenceResolver::for_node(&root);
        let next = root.subschema("properties").unwrap().subschema("next").unwrap();
        let mut report = GenerationReport::new(0);
        let result = Normalizer::new(&resolver)
            .normalize(&next, &[JsonPointer::root()], &mut report)
            .expect("normalize");
        assert!(matches!(result.schema, NormalizedSchema::Cycle { .. }));
    }

    #[test]
    fn entered_references_are_returned() {
        let (result, _) = normalize(json!({
            "$defs": {"node": {"type": "object"}},
            "$ref": "#/$defs/node"
        }));
        let normalization = result.expect("normalize");
        assert_eq!(normalization.entered, vec![JsonPointer::root().push("$defs").push("node")]);
    }

    #[test]
    fn false_schema_is_unsatisfiable() {
        let (result, _) = normalize(json!(false));
        assert!(matches!(result, Err(SchemaError::Unsatisfiable { .. })));
    }

    #[test]
    fn unresolved_reference_propagates() {
        let (result, _) = normalize(json!({"$ref": "#/definitions/missing"}));
        assert!(matches!(result, Err(SchemaError::UnresolvedReference { .. })));
    }
}
