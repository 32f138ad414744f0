use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::pointer::JsonPointer;

static NULL: Value = Value::Null;

/// Immutable view over one fragment of a parsed schema document.
///
/// A node is identified by its position in the shared document, never by the
/// address of the fragment, so clones are cheap and cycle detection compares
/// positions.
#[derive(Clone)]
pub struct SchemaNode {
    document: Arc<Value>,
    pointer: JsonPointer,
}

impl SchemaNode {
    /// Node for the root of `document`.
    pub fn root(document: Value) -> Self {
        Self::from_shared(Arc::new(document))
    }

    pub fn from_shared(document: Arc<Value>) -> Self {
        Self {
            document,
            pointer: JsonPointer::root(),
        }
    }

    /// Node at `pointer`, if the position exists in the document.
    pub fn at(document: &Arc<Value>, pointer: JsonPointer) -> Option<Self> {
        pointer.lookup(document)?;
        Some(Self {
            document: Arc::clone(document),
            pointer,
        })
    }

    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }

    pub fn document(&self) -> &Arc<Value> {
        &self.document
    }

    /// Raw JSON value of this fragment.
    pub fn value(&self) -> &Value {
        self.pointer.lookup(&self.document).unwrap_or(&NULL)
    }

    /// `Some(flag)` for the boolean schemas `true` and `false`.
    pub fn as_bool_schema(&self) -> Option<bool> {
        self.value().as_bool()
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.value().as_object()
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(name))
    }

    pub fn has_keyword(&self, name: &str) -> bool {
        self.keyword(name).is_some()
    }

    /// Subschema stored directly under `keyword` (`not`, `items`, ...).
    pub fn subschema(&self, keyword: &str) -> Option<SchemaNode> {
        let value = self.keyword(keyword)?;
        if !is_schema(value) {
            return None;
        }
        Some(self.descend(self.pointer.push(keyword)))
    }

    /// Subschemas stored in an array under `keyword` (`allOf`, `prefixItems`, ...).
    pub fn subschema_list(&self, keyword: &str) -> Vec<SchemaNode> {
        let Some(Value::Array(items)) = self.keyword(keyword) else {
            return Vec::new();
        };
        let base = self.pointer.push(keyword);
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| is_schema(item))
            .map(|(index, _)| self.descend(base.push(index.to_string())))
            .collect()
    }

    /// Subschemas stored in an object under `keyword` (`properties`, ...),
    /// in document key order.
    pub fn subschema_map(&self, keyword: &str) -> Vec<(String, SchemaNode)> {
        let Some(Value::Object(map)) = self.keyword(keyword) else {
            return Vec::new();
        };
        let base = self.pointer.push(keyword);
        map.iter()
            .filter(|(_, item)| is_schema(item))
            .map(|(name, _)| (name.clone(), self.descend(base.push(name.clone()))))
            .collect()
    }

    fn descend(&self, pointer: JsonPointer) -> SchemaNode {
        SchemaNode {
            document: Arc::clone(&self.document),
            pointer,
        }
    }
}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.document, &other.document) && self.pointer == other.pointer
    }
}

impl Eq for SchemaNode {}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("pointer", &self.pointer.to_string())
            .finish()
    }
}

fn is_schema(value: &Value) -> bool {
    value.is_object() || value.is_boolean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn children_carry_their_position() {
        let node = SchemaNode::root(json!({
            "properties": {"a": {"type": "integer"}, "b": true},
            "allOf": [{"minimum": 1}, 3]
        }));
        let props = node.subschema_map("properties");
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].1.pointer().to_string(), "#/properties/a");
        assert_eq!(props[1].1.as_bool_schema(), Some(true));

        let all_of = node.subschema_list("allOf");
        assert_eq!(all_of.len(), 1);
        assert_eq!(all_of[0].keyword("minimum"), Some(&json!(1)));
    }

    #[test]
    fn equality_is_positional() {
        let node = SchemaNode::root(json!({"a": {}, "b": {}}));
        let a = node.subschema("a").unwrap();
        let b = node.subschema("b").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, node.subschema("a").unwrap());
        assert_eq!(a.value(), b.value());
    }
}
