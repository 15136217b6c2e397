//! Target resolution: which chunk holds a given word
//!
//! A word can occur in several chunks of the same sentence. [`resolve`]
//! keeps the simple first-occurrence behaviour (dependents of later
//! occurrences are not found); [`resolve_all`] exposes every candidate so
//! callers can pick their own policy via [`ResolvePolicy`].

use crate::chunk::{ChunkId, Token};
use crate::graph::DependencyGraph;

/// Which candidate chunks a lookup keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvePolicy {
    /// Leftmost occurrence only
    #[default]
    First,
    /// Rightmost occurrence only (closest to the sentence-final predicate)
    Last,
    /// Every occurrence, in parse order
    All,
}

/// First chunk, in parse order, whose tokens include `target` exactly
pub fn resolve(graph: &DependencyGraph, target: &str) -> Option<ChunkId> {
    candidates(graph, |t| t.surface == target).next()
}

/// Every chunk whose tokens include `target` exactly
pub fn resolve_all(graph: &DependencyGraph, target: &str) -> Vec<ChunkId> {
    candidates(graph, |t| t.surface == target).collect()
}

/// Resolve `target` by surface form under `policy`
pub fn resolve_with(graph: &DependencyGraph, target: &str, policy: ResolvePolicy) -> Vec<ChunkId> {
    resolve_matching(graph, policy, |t| t.surface == target)
}

/// Resolve with an arbitrary token predicate (e.g. surface-or-lemma)
pub fn resolve_matching<F>(graph: &DependencyGraph, policy: ResolvePolicy, pred: F) -> Vec<ChunkId>
where
    F: Fn(&Token) -> bool,
{
    let mut found = candidates(graph, pred);
    match policy {
        ResolvePolicy::First => found.next().into_iter().collect(),
        ResolvePolicy::Last => found.last().into_iter().collect(),
        ResolvePolicy::All => found.collect(),
    }
}

fn candidates<'a, F>(graph: &'a DependencyGraph, pred: F) -> impl Iterator<Item = ChunkId> + 'a
where
    F: Fn(&Token) -> bool + 'a,
{
    graph.chunk_ids().filter(move |&id| {
        graph
            .chunk_tokens(id)
            .map(|tokens| tokens.iter().any(&pred))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ParsedSentence};

    /// 猫が 猫を 見た: the word 猫 appears in chunks 0 and 1
    fn repeated_word_graph() -> DependencyGraph {
        let mut sentence = ParsedSentence::new();
        sentence.add_chunk(Chunk::from_surfaces(0, Some(2), &["猫", "が"]));
        sentence.add_chunk(Chunk::from_surfaces(1, Some(2), &["猫", "を"]));
        sentence.add_chunk(Chunk::from_surfaces(2, None, &["見た"]));
        DependencyGraph::build(&sentence).unwrap()
    }

    #[test]
    fn test_resolve_first_match() {
        let graph = repeated_word_graph();
        assert_eq!(resolve(&graph, "猫"), Some(0));
        assert_eq!(resolve(&graph, "見た"), Some(2));
    }

    #[test]
    fn test_resolve_absent_word() {
        let graph = repeated_word_graph();
        assert_eq!(resolve(&graph, "犬"), None);
        assert!(resolve_all(&graph, "犬").is_empty());
    }

    #[test]
    fn test_resolve_requires_exact_token() {
        let graph = repeated_word_graph();
        // substring of a token is not a match
        assert_eq!(resolve(&graph, "見"), None);
    }

    #[test]
    fn test_resolve_policies() {
        let graph = repeated_word_graph();
        assert_eq!(resolve_all(&graph, "猫"), vec![0, 1]);
        assert_eq!(resolve_with(&graph, "猫", ResolvePolicy::First), vec![0]);
        assert_eq!(resolve_with(&graph, "猫", ResolvePolicy::Last), vec![1]);
        assert_eq!(resolve_with(&graph, "猫", ResolvePolicy::All), vec![0, 1]);
    }

    #[test]
    fn test_resolve_by_lemma() {
        let mut sentence = ParsedSentence::new();
        let mut chunk = Chunk::new(0, None);
        chunk.push_token(Token::new("渡っ", "動詞").with_lemma("渡る"));
        sentence.add_chunk(chunk);
        let graph = DependencyGraph::build(&sentence).unwrap();

        assert_eq!(resolve(&graph, "渡る"), None);
        assert_eq!(
            resolve_matching(&graph, ResolvePolicy::First, |t| t.matches_word("渡る")),
            vec![0]
        );
    }
}
