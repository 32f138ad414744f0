use thiserror::Error;

/// Error taxonomy shared by every jsonalchemy crate.
///
/// All variants are terminal for the generation call that raised them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A `$ref` pointer does not exist in the document.
    #[error("unresolved reference '{reference}' at {pointer}")]
    UnresolvedReference { reference: String, pointer: String },
    /// A `$ref` points outside the current document.
    #[error("unsupported reference: {0}")]
    UnsupportedReference(String),
    /// The normalized constraints admit no value.
    #[error("unsatisfiable schema at {pointer}: {reason}")]
    Unsatisfiable { pointer: String, reason: String },
    /// More values were synthesized than the configured node budget allows.
    #[error("generation budget of {limit} nodes exceeded")]
    BudgetExceeded { limit: usize },
    /// A keyword carries a value the engine cannot interpret.
    #[error("invalid schema at {pointer}: {reason}")]
    InvalidSchema { pointer: String, reason: String },
}

impl SchemaError {
    pub fn unsatisfiable(pointer: impl ToString, reason: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid(pointer: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnresolvedReference { .. } => "unresolved_reference",
            Self::UnsupportedReference(_) => "unsupported_reference",
            Self::Unsatisfiable { .. } => "unsatisfiable",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::InvalidSchema { .. } => "invalid_schema",
        }
    }
}

/// Convenience alias for results returned by jsonalchemy crates.
pub type Result<T> = std::result::Result<T, SchemaError>;
