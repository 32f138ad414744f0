use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use sha2::{Digest, Sha256};

use jsonalchemy_core::{JsonPointer, ReferenceResolver, SchemaError, SchemaNode};

use crate::errors::GenerationError;
use crate::generators::Synthesizer;
use crate::model::{GenerateOptions, GenerationOutcome, GenerationReport};
use crate::pattern::{self, PatternSampler};
use crate::provider::{LocaleKey, ProviderBridge, ValueProvider};

/// Seed for a generation call. Text seeds are hashed, so any label works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    Number(u64),
    Text(String),
}

impl Seed {
    pub fn to_u64(&self) -> u64 {
        match self {
            Seed::Number(seed) => *seed,
            Seed::Text(text) => {
                let digest = Sha256::digest(text.as_bytes());
                let mut bytes = [0_u8; 8];
                bytes.copy_from_slice(&digest[..8]);
                u64::from_le_bytes(bytes)
            }
        }
    }
}

impl From<u64> for Seed {
    fn from(seed: u64) -> Self {
        Seed::Number(seed)
    }
}

impl From<&str> for Seed {
    fn from(text: &str) -> Self {
        text.parse().unwrap_or_else(|never: Infallible| match never {})
    }
}

impl FromStr for Seed {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(match text.parse::<u64>() {
            Ok(seed) => Seed::Number(seed),
            Err(_) => Seed::Text(text.to_string()),
        })
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Number(seed) => write!(f, "{seed}"),
            Seed::Text(text) => f.write_str(text),
        }
    }
}

/// Mutable state of one generation call: the random source, the stack of
/// entered reference targets, recursion depth and the issue report.
pub struct GenerationContext {
    pub(crate) rng: ChaCha8Rng,
    pub(crate) ref_stack: Vec<JsonPointer>,
    pub(crate) report: GenerationReport,
    depth: usize,
    samplers: HashMap<String, Option<Arc<PatternSampler>>>,
    matchers: HashMap<String, Option<Arc<regex::Regex>>>,
}

impl GenerationContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            ref_stack: Vec::new(),
            report: GenerationReport::new(seed),
            depth: 0,
            samplers: HashMap::new(),
            matchers: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn report(&self) -> &GenerationReport {
        &self.report
    }

    pub fn into_report(self) -> GenerationReport {
        self.report
    }

    /// Descend one level, pushing the reference targets merged by the node
    /// being synthesized. Returns the mark to pass to [`Self::leave`].
    pub(crate) fn enter(&mut self, targets: Vec<JsonPointer>) -> usize {
        let mark = self.ref_stack.len();
        self.ref_stack.extend(targets);
        self.depth += 1;
        self.report.max_depth_reached = self.report.max_depth_reached.max(self.depth);
        mark
    }

    pub(crate) fn leave(&mut self, mark: usize) {
        self.ref_stack.truncate(mark);
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn count_node(&mut self, budget: Option<usize>) -> Result<(), SchemaError> {
        self.report.nodes_generated += 1;
        match budget {
            Some(limit) if self.report.nodes_generated > limit as u64 => {
                Err(SchemaError::BudgetExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    /// Compiled sampler for `pattern`, cached for the rest of the call.
    pub(crate) fn sampler(&mut self, pattern: &str, max_repeat: u32) -> Option<Arc<PatternSampler>> {
        self.samplers
            .entry(pattern.to_string())
            .or_insert_with(|| PatternSampler::compile(pattern, max_repeat).ok().map(Arc::new))
            .clone()
    }

    /// Compiled matcher for `pattern`, cached for the rest of the call.
    pub(crate) fn matcher(&mut self, pattern: &str) -> Option<Arc<regex::Regex>> {
        self.matchers
            .entry(pattern.to_string())
            .or_insert_with(|| pattern::matcher(pattern).map(Arc::new))
            .clone()
    }
}

/// Entry point for generating values from a schema document.
///
/// A session holds configuration only; every call builds its own
/// [`GenerationContext`], so one session can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct GenerationSession {
    options: GenerateOptions,
    provider: ProviderBridge,
}

impl GenerationSession {
    pub fn new(options: GenerateOptions) -> Result<Self, GenerationError> {
        options.validate()?;
        let locale = LocaleKey::parse(&options.locale).unwrap_or_default();
        Ok(Self {
            options,
            provider: ProviderBridge::for_locale(locale),
        })
    }

    /// Session using a caller-supplied realistic value source.
    pub fn with_provider(
        options: GenerateOptions,
        provider: Arc<dyn ValueProvider>,
    ) -> Result<Self, GenerationError> {
        options.validate()?;
        Ok(Self {
            options,
            provider: ProviderBridge::new(provider),
        })
    }

    /// Generate one value for `root`. Without a seed, one is drawn from the
    /// thread-local entropy source and recorded in the report.
    pub fn generate(
        &self,
        root: &SchemaNode,
        seed: Option<Seed>,
    ) -> Result<GenerationOutcome, GenerationError> {
        let seed = seed
            .map(|seed| seed.to_u64())
            .unwrap_or_else(|| rand::rng().random());
        self.run(root, seed)
    }

    /// Parse-free convenience: generate one value straight from a JSON document.
    pub fn generate_value(
        &self,
        document: Value,
        seed: Option<Seed>,
    ) -> Result<Value, GenerationError> {
        let root = SchemaNode::root(document);
        Ok(self.generate(&root, seed)?.value)
    }

    /// Generate `count` values. Instance `i` uses a seed derived from the base
    /// seed and `i`, so any instance can be regenerated on its own.
    pub fn generate_many(
        &self,
        root: &SchemaNode,
        seed: Option<Seed>,
        count: usize,
    ) -> Result<(Vec<Value>, GenerationReport), GenerationError> {
        let base = seed
            .map(|seed| seed.to_u64())
            .unwrap_or_else(|| rand::rng().random());
        let mut report = GenerationReport::new(base);
        let mut values = Vec::with_capacity(count.min(1024));
        for index in 0..count {
            let outcome = self.run(root, instance_seed(base, index as u64))?;
            values.push(outcome.value);
            report.absorb(outcome.report);
        }
        Ok((values, report))
    }

    fn run(&self, root: &SchemaNode, seed: u64) -> Result<GenerationOutcome, GenerationError> {
        let resolver = ReferenceResolver::for_node(root);
        let synthesizer = Synthesizer::new(&self.options, &resolver, &self.provider);
        let mut ctx = GenerationContext::new(seed);
        ctx.ref_stack.push(root.pointer().clone());
        let value = synthesizer.synthesize_node(root, None, &mut ctx)?;
        Ok(GenerationOutcome {
            value,
            report: ctx.into_report(),
        })
    }
}

/// Seed of instance `index` in a batch. Index 0 keeps the base seed so a
/// batch of one matches a single `generate` call.
pub fn instance_seed(seed: u64, index: u64) -> u64 {
    if index == 0 {
        return seed;
    }
    let mut hash = seed ^ 0xcbf2_9ce4_8422_2325;
    hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    hash ^= index;
    hash.wrapping_mul(0x0000_0100_0000_01b3)
}
