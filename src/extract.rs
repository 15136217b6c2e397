//! Single-sentence dependent extraction
//!
//! Composes parse → graph → resolve → walk. All inputs travel in an
//! immutable [`ExtractRequest`]; the only state is the parser the caller
//! passes in.

use crate::backend::Parser;
use crate::chunk::ParsedSentence;
use crate::error::ExtractError;
use crate::graph::DependencyGraph;
use crate::resolver::{ResolvePolicy, resolve_with};
use crate::walker::dependents_of;

/// What to extract from which sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub sentence: String,
    pub target: String,
    pub policy: ResolvePolicy,
}

impl ExtractRequest {
    pub fn new(sentence: &str, target: &str) -> Self {
        Self {
            sentence: sentence.to_string(),
            target: target.to_string(),
            policy: ResolvePolicy::First,
        }
    }

    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Parse the request's sentence and return the words depending on its target
pub fn extract<P: Parser + ?Sized>(
    parser: &mut P,
    request: &ExtractRequest,
) -> Result<Vec<String>, ExtractError> {
    let parsed = parser.parse(&request.sentence)?;
    extract_parsed(&parsed, &request.target, request.policy)
}

/// Extract dependents from an already parsed sentence
///
/// With [`ResolvePolicy::All`] the dependents of every occurrence are
/// concatenated in parse order.
pub fn extract_parsed(
    parsed: &ParsedSentence,
    target: &str,
    policy: ResolvePolicy,
) -> Result<Vec<String>, ExtractError> {
    let graph = DependencyGraph::build(parsed)?;
    let heads = resolve_with(&graph, target, policy);
    if heads.is_empty() {
        return Err(ExtractError::TargetNotFound(target.to_string()));
    }

    Ok(heads
        .into_iter()
        .flat_map(|head| dependents_of(&graph, head))
        .collect())
}
