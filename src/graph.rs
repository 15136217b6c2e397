//! Chunk-link graph for one parsed sentence
//!
//! Indexes the chunks of a [`ParsedSentence`] by id so that token lists and
//! link targets can be looked up directly, while keeping the parse order
//! for left-to-right scans.

use crate::chunk::{ChunkId, ParsedSentence, Token};
use crate::error::GraphError;
use rustc_hash::FxHashMap;

/// How to treat a chunk id that appears more than once in a parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with [`GraphError::DuplicateChunk`]
    #[default]
    Reject,
    /// Later chunk replaces the earlier one; the id keeps its first position
    LastWins,
}

/// Chunk id → tokens and chunk id → link target
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Chunk ids in parse order
    order: Vec<ChunkId>,
    tokens: FxHashMap<ChunkId, Vec<Token>>,
    links: FxHashMap<ChunkId, Option<ChunkId>>,
}

impl DependencyGraph {
    /// Build a graph, rejecting duplicate chunk ids
    pub fn build(sentence: &ParsedSentence) -> Result<Self, GraphError> {
        Self::build_with(sentence, DuplicatePolicy::Reject)
    }

    pub fn build_with(
        sentence: &ParsedSentence,
        policy: DuplicatePolicy,
    ) -> Result<Self, GraphError> {
        let capacity = sentence.chunks.len();
        let mut graph = Self {
            order: Vec::with_capacity(capacity),
            tokens: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            links: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        };

        for chunk in &sentence.chunks {
            let previous = graph.tokens.insert(chunk.id, chunk.tokens.clone());
            if previous.is_some() {
                match policy {
                    DuplicatePolicy::Reject => return Err(GraphError::DuplicateChunk(chunk.id)),
                    DuplicatePolicy::LastWins => {
                        log::debug!("chunk {} redefined, keeping the later one", chunk.id);
                    }
                }
            } else {
                graph.order.push(chunk.id);
            }
            graph.links.insert(chunk.id, chunk.link);
        }

        for (&id, link) in &graph.links {
            if let Some(target) = link {
                if !graph.tokens.contains_key(target) {
                    log::warn!("chunk {} links to missing chunk {}", id, target);
                }
            }
        }

        Ok(graph)
    }

    /// Surface forms of a chunk's tokens, in reading order
    pub fn tokens_of(&self, id: ChunkId) -> Result<Vec<&str>, GraphError> {
        Ok(self
            .chunk_tokens(id)?
            .iter()
            .map(|t| t.surface.as_str())
            .collect())
    }

    /// Full tokens of a chunk
    pub fn chunk_tokens(&self, id: ChunkId) -> Result<&[Token], GraphError> {
        self.tokens
            .get(&id)
            .map(|v| v.as_slice())
            .ok_or(GraphError::ChunkNotFound(id))
    }

    /// Link target of a chunk; `None` for roots and unknown ids
    pub fn link_target_of(&self, id: ChunkId) -> Option<ChunkId> {
        self.links.get(&id).copied().flatten()
    }

    pub fn contains(&self, id: ChunkId) -> bool {
        self.tokens.contains_key(&id)
    }

    /// Chunk ids in parse order
    pub fn chunk_ids(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.order.iter().copied()
    }

    /// First chunk without a link
    pub fn root(&self) -> Option<ChunkId> {
        self.chunk_ids().find(|&id| self.link_target_of(id).is_none())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
