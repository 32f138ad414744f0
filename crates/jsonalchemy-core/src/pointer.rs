use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// RFC 6901 pointer identifying a position inside a schema document.
///
/// Positions are compared token by token, so two references that reach the
/// same fragment through different spellings (`#/$defs/a` vs `#/%24defs/a`)
/// share one canonical position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// Pointer to the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse the textual pointer form (`""` or `"/a/b"`).
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(SchemaError::UnresolvedReference {
                reference: text.to_string(),
                pointer: "#".to_string(),
            });
        };
        let tokens = rest.split('/').map(unescape_token).collect();
        Ok(Self { tokens })
    }

    /// Parse a URI fragment (the part after `#`), percent-decoding it first.
    pub fn from_fragment(fragment: &str) -> Result<Self> {
        let decoded = urlencoding::decode(fragment).map_err(|_| SchemaError::UnresolvedReference {
            reference: format!("#{fragment}"),
            pointer: "#".to_string(),
        })?;
        Self::parse(&decoded)
    }

    /// New pointer with `token` appended.
    pub fn push(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Follow the pointer through `document`.
    pub fn lookup<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for token in &self.tokens {
            current = match current {
                Value::Object(map) => map.get(token)?,
                Value::Array(items) => {
                    let index = parse_index(token)?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("#")?;
        for token in &self.tokens {
            write!(f, "/{}", escape_token(token))?;
        }
        Ok(())
    }
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn parse_index(token: &str) -> Option<usize> {
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_and_escapes_tokens() {
        let pointer = JsonPointer::parse("/a~1b/c~0d/0").unwrap();
        assert_eq!(pointer.tokens(), &["a/b", "c~d", "0"]);
        assert_eq!(pointer.to_string(), "#/a~1b/c~0d/0");
    }

    #[test]
    fn fragment_is_percent_decoded() {
        let pointer = JsonPointer::from_fragment("/%24defs/node").unwrap();
        assert_eq!(pointer, JsonPointer::root().push("$defs").push("node"));
    }

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let doc = json!({"items": [{"type": "string"}, {"type": "integer"}]});
        let pointer = JsonPointer::parse("/items/1/type").unwrap();
        assert_eq!(pointer.lookup(&doc), Some(&json!("integer")));
        assert!(JsonPointer::parse("/items/01").unwrap().lookup(&doc).is_none());
        assert!(JsonPointer::parse("/missing").unwrap().lookup(&doc).is_none());
    }

    #[test]
    fn rejects_relative_pointer_text() {
        assert!(JsonPointer::parse("defs/a").is_err());
    }
}
