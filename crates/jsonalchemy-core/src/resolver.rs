use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::node::SchemaNode;
use crate::pointer::JsonPointer;

/// Keywords whose values are instance data rather than subschemas.
const DATA_KEYWORDS: &[&str] = &["enum", "const", "default", "examples", "example"];

/// Looks up `$ref` targets inside a single schema document.
///
/// The resolver only performs lookups. Breaking reference cycles is left to
/// the caller, which uses the returned node's pointer as the cycle key.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    document: Arc<Value>,
    base_id: Option<String>,
    anchors: HashMap<String, JsonPointer>,
}

impl ReferenceResolver {
    pub fn new(document: Arc<Value>) -> Self {
        let base_id = document
            .get("$id")
            .or_else(|| document.get("id"))
            .and_then(Value::as_str)
            .map(|id| id.trim_end_matches('#').to_string())
            .filter(|id| !id.is_empty() && !id.starts_with('#'));
        let mut anchors = HashMap::new();
        collect_anchors(&document, &JsonPointer::root(), &mut anchors);
        Self {
            document,
            base_id,
            anchors,
        }
    }

    pub fn for_node(node: &SchemaNode) -> Self {
        Self::new(Arc::clone(node.document()))
    }

    /// The `$ref` string carried by `node`, if any.
    pub fn reference_of<'a>(&self, node: &'a SchemaNode) -> Result<Option<&'a str>> {
        match node.keyword("$ref") {
            None => Ok(None),
            Some(Value::String(reference)) => Ok(Some(reference.as_str())),
            Some(_) => Err(SchemaError::invalid(node.pointer(), "$ref must be a string")),
        }
    }

    /// Resolve one `$ref` string found at `from` to its target node.
    pub fn resolve_reference(&self, reference: &str, from: &JsonPointer) -> Result<SchemaNode> {
        let (base, fragment) = match reference.split_once('#') {
            Some((base, fragment)) => (base, fragment),
            None => (reference, ""),
        };

        if !base.is_empty() && self.base_id.as_deref() != Some(base) {
            return Err(SchemaError::UnsupportedReference(reference.to_string()));
        }

        let pointer = if fragment.is_empty() || fragment.starts_with('/') {
            JsonPointer::from_fragment(fragment).map_err(|_| self.unresolved(reference, from))?
        } else {
            let anchor = urlencoding::decode(fragment)
                .map_err(|_| self.unresolved(reference, from))?;
            self.anchors
                .get(anchor.as_ref())
                .cloned()
                .ok_or_else(|| self.unresolved(reference, from))?
        };

        SchemaNode::at(&self.document, pointer).ok_or_else(|| self.unresolved(reference, from))
    }

    /// Fully dereference `node`: follow `$ref` hops until reaching a node
    /// without one. Nodes without `$ref` are returned unchanged.
    pub fn resolve(&self, node: &SchemaNode) -> Result<SchemaNode> {
        let mut current = node.clone();
        let mut seen = HashSet::new();
        while let Some(reference) = self.reference_of(&current)? {
            if !seen.insert(current.pointer().clone()) {
                return Err(SchemaError::invalid(
                    node.pointer(),
                    format!("reference '{reference}' loops without reaching a schema"),
                ));
            }
            current = self.resolve_reference(reference, current.pointer())?;
        }
        Ok(current)
    }

    fn unresolved(&self, reference: &str, from: &JsonPointer) -> SchemaError {
        SchemaError::UnresolvedReference {
            reference: reference.to_string(),
            pointer: from.to_string(),
        }
    }
}

fn collect_anchors(value: &Value, at: &JsonPointer, anchors: &mut HashMap<String, JsonPointer>) {
    match value {
        Value::Object(map) => {
            if let Some(anchor) = map.get("$anchor").and_then(Value::as_str) {
                anchors.entry(anchor.to_string()).or_insert_with(|| at.clone());
            }
            if let Some(id) = map.get("$id").and_then(Value::as_str)
                && let Some(name) = id.strip_prefix('#')
                && !name.is_empty()
            {
                anchors.entry(name.to_string()).or_insert_with(|| at.clone());
            }
            for (key, child) in map {
                if DATA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                collect_anchors(child, &at.push(key.clone()), anchors);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_anchors(child, &at.push(index.to_string()), anchors);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver(doc: Value) -> (ReferenceResolver, SchemaNode) {
        let node = SchemaNode::root(doc);
        (ReferenceResolver::for_node(&node), node)
    }

    #[test]
    fn resolves_definitions_and_defs() {
        let (resolver, _) = resolver(json!({
            "definitions": {"a": {"type": "string"}},
            "$defs": {"b": {"type": "integer"}}
        }));
        let a = resolver
            .resolve_reference("#/definitions/a", &JsonPointer::root())
            .unwrap();
        assert_eq!(a.keyword("type"), Some(&json!("string")));
        let b = resolver
            .resolve_reference("#/%24defs/b", &JsonPointer::root())
            .unwrap();
        assert_eq!(b.pointer().to_string(), "#/$defs/b");
    }

    #[test]
    fn hash_alone_is_the_root() {
        let (resolver, root) = resolver(json!({"type": "object"}));
        let target = resolver.resolve_reference("#", &JsonPointer::root()).unwrap();
        assert_eq!(target, root);
    }

    #[test]
    fn missing_pointer_is_unresolved() {
        let (resolver, _) = resolver(json!({}));
        let err = resolver
            .resolve_reference("#/definitions/nope", &JsonPointer::root())
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedReference { .. }));
    }

    #[test]
    fn external_documents_are_unsupported() {
        let (resolver, _) = resolver(json!({"$id": "https://example.com/root.json"}));
        let err = resolver
            .resolve_reference("other.json#/a", &JsonPointer::root())
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedReference(_)));

        assert!(
            resolver
                .resolve_reference("https://example.com/root.json#", &JsonPointer::root())
                .is_ok()
        );
    }

    #[test]
    fn anchors_resolve_by_name() {
        let (resolver, _) = resolver(json!({
            "$defs": {
                "item": {"$anchor": "item", "type": "string"},
                "legacy": {"$id": "#legacy", "type": "number"}
            }
        }));
        let item = resolver.resolve_reference("#item", &JsonPointer::root()).unwrap();
        assert_eq!(item.pointer().to_string(), "#/$defs/item");
        let legacy = resolver
            .resolve_reference("#legacy", &JsonPointer::root())
            .unwrap();
        assert_eq!(legacy.keyword("type"), Some(&json!("number")));
    }

    #[test]
    fn resolve_follows_chains_and_rejects_empty_loops() {
        let (resolver, root) = resolver(json!({
            "$defs": {
                "a": {"$ref": "#/$defs/b"},
                "b": {"type": "boolean"},
                "x": {"$ref": "#/$defs/y"},
                "y": {"$ref": "#/$defs/x"}
            }
        }));
        let a = root.subschema("$defs").unwrap().subschema("a").unwrap();
        let resolved = resolver.resolve(&a).unwrap();
        assert_eq!(resolved.keyword("type"), Some(&json!("boolean")));

        let x = root.subschema("$defs").unwrap().subschema("x").unwrap();
        assert!(matches!(
            resolver.resolve(&x),
            Err(SchemaError::InvalidSchema { .. })
        ));
    }
}
