//! One-hop dependent lookup
//!
//! A chunk `C` is a dependent of `head` iff `C` links to `head`. Only direct
//! dependents are returned; the walk never recurses.

use crate::chunk::ChunkId;
use crate::error::GraphError;
use crate::graph::DependencyGraph;

/// Ids of the chunks linking to `head`, in parse order
pub fn dependent_chunks(graph: &DependencyGraph, head: ChunkId) -> Vec<ChunkId> {
    if !graph.contains(head) {
        log::warn!("{}; treating as having no dependents", GraphError::ChunkNotFound(head));
        return Vec::new();
    }

    graph
        .chunk_ids()
        .filter(|&id| graph.link_target_of(id) == Some(head))
        .collect()
}

/// Tokens of every direct dependent of `head`, concatenated in parse order
pub fn dependents_of(graph: &DependencyGraph, head: ChunkId) -> Vec<String> {
    let mut words = Vec::new();
    for id in dependent_chunks(graph, head) {
        match graph.tokens_of(id) {
            Ok(tokens) => words.extend(tokens.into_iter().map(str::to_string)),
            Err(e) => log::warn!("{}; skipping dependent", e),
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ParsedSentence};
    use crate::resolver::resolve;

    /// 私 → しゃぶしゃぶしました ← 手錠
    fn shabu_graph() -> DependencyGraph {
        let mut sentence = ParsedSentence::new();
        sentence.add_chunk(Chunk::from_surfaces(1, Some(3), &["私"]));
        sentence.add_chunk(Chunk::from_surfaces(2, Some(3), &["手錠"]));
        sentence.add_chunk(Chunk::from_surfaces(3, None, &["しゃぶしゃぶ", "しました"]));
        DependencyGraph::build(&sentence).unwrap()
    }

    #[test]
    fn test_dependents_of_resolved_target() {
        let graph = shabu_graph();
        let head = resolve(&graph, "しゃぶしゃぶ").unwrap();

        assert_eq!(head, 3);
        assert_eq!(dependents_of(&graph, head), vec!["私", "手錠"]);
        assert_eq!(dependent_chunks(&graph, head), vec![1, 2]);
    }

    #[test]
    fn test_no_incoming_links() {
        let graph = shabu_graph();
        assert!(dependents_of(&graph, 1).is_empty());
    }

    #[test]
    fn test_unknown_head_has_no_dependents() {
        let graph = shabu_graph();
        assert!(dependents_of(&graph, 42).is_empty());
    }

    #[test]
    fn test_one_hop_only() {
        // 大きな → 犬が → 走る: 大きな is not a dependent of 走る
        let mut sentence = ParsedSentence::new();
        sentence.add_chunk(Chunk::from_surfaces(0, Some(1), &["大きな"]));
        sentence.add_chunk(Chunk::from_surfaces(1, Some(2), &["犬", "が"]));
        sentence.add_chunk(Chunk::from_surfaces(2, None, &["走る"]));
        let graph = DependencyGraph::build(&sentence).unwrap();

        assert_eq!(dependents_of(&graph, 2), vec!["犬", "が"]);
        assert_eq!(dependents_of(&graph, 1), vec!["大きな"]);
    }

    #[test]
    fn test_dependents_match_links_exactly() {
        let graph = shabu_graph();
        for head in graph.chunk_ids() {
            let expected: Vec<ChunkId> = graph
                .chunk_ids()
                .filter(|&c| graph.link_target_of(c) == Some(head))
                .collect();
            assert_eq!(dependent_chunks(&graph, head), expected);
        }
    }
}
