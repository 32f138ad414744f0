//! Example-data generation engine for jsonalchemy.
//!
//! This crate turns a JSON Schema document into concrete, deterministic
//! instances: constraints are normalized per node, then values are drawn
//! from a seeded random source.

pub mod constraints;
pub mod errors;
mod generators;
pub mod model;
pub mod normalize;
pub mod pattern;
pub mod provider;
pub mod session;

pub use errors::GenerationError;
pub use model::{
    GenerateOptions, GenerationIssue, GenerationOutcome, GenerationReport, IssueCode, IssueLevel,
};
pub use provider::{FakerProvider, LocaleKey, ProviderBridge, ValueProvider};
pub use session::{GenerationContext, GenerationSession, Seed};
