//! Per-line analysis run inside scan workers
//!
//! A [`LineAnalyzer`] owns whatever backend it needs and turns one corpus
//! line into match records. Two analyzers are provided:
//!
//! - [`DependencyAnalyzer`]: parses the line, finds the chunks holding the
//!   keyword and reports the predicates around them.
//! - [`PatternAnalyzer`]: tokenizes the line and runs a [`LineMatcher`].

use crate::backend::{Parser, Tagger};
use crate::chunk::{ChunkId, Token};
use crate::error::{AnalysisError, ConfigError};
use crate::graph::DependencyGraph;
use crate::matcher::LineMatcher;
use crate::resolver::{ResolvePolicy, resolve_matching};
use crate::sink::MatchRecord;
use crate::walker::dependent_chunks;
use std::sync::Arc;

pub const VERB_CLASS: &str = "動詞";
pub const ADJECTIVE_CLASS: &str = "形容詞";

pub const VERB_CATEGORY: &str = "verb";
pub const ADJECTIVE_CATEGORY: &str = "adj";
pub const PATTERN_CATEGORY: &str = "match";

/// Turns one line into zero or more match records
pub trait LineAnalyzer: Send {
    fn analyze(&mut self, line: &str) -> Result<Vec<MatchRecord>, AnalysisError>;
}

impl<F> LineAnalyzer for F
where
    F: FnMut(&str) -> Result<Vec<MatchRecord>, AnalysisError> + Send,
{
    fn analyze(&mut self, line: &str) -> Result<Vec<MatchRecord>, AnalysisError> {
        self(line)
    }
}

/// Words governing or modifying a keyword
///
/// For every chunk that contains the keyword (by surface or dictionary
/// form) the analyzer reports
/// - the predicate of the chunk the keyword depends on (e.g. the verb
///   taking it as object or subject), and
/// - the predicate of every chunk depending on the keyword's chunk (e.g.
///   an adjective or relative clause verb modifying it).
///
/// A chunk's predicate is its first verb or adjective token, reported in
/// dictionary form.
pub struct DependencyAnalyzer<P> {
    parser: P,
    keyword: Arc<str>,
}

impl<P: Parser> DependencyAnalyzer<P> {
    pub fn new(parser: P, keyword: Arc<str>) -> Self {
        Self { parser, keyword }
    }

    fn predicate_record(graph: &DependencyGraph, id: ChunkId) -> Option<MatchRecord> {
        let tokens = graph.chunk_tokens(id).ok()?;
        tokens.iter().find_map(|token| {
            let category = category_of(token)?;
            Some(MatchRecord::new(token.base_form(), category))
        })
    }
}

fn category_of(token: &Token) -> Option<&'static str> {
    match token.feature_class.as_str() {
        VERB_CLASS => Some(VERB_CATEGORY),
        ADJECTIVE_CLASS => Some(ADJECTIVE_CATEGORY),
        _ => None,
    }
}

impl<P: Parser + Send> LineAnalyzer for DependencyAnalyzer<P> {
    fn analyze(&mut self, line: &str) -> Result<Vec<MatchRecord>, AnalysisError> {
        let parsed = self.parser.parse(line.trim())?;
        let graph = DependencyGraph::build(&parsed)?;
        let keyword = &*self.keyword;

        let mut records = Vec::new();
        for target in resolve_matching(&graph, ResolvePolicy::All, |t| t.matches_word(keyword)) {
            if let Some(head) = graph.link_target_of(target) {
                records.extend(Self::predicate_record(&graph, head));
            }
            for dependent in dependent_chunks(&graph, target) {
                records.extend(Self::predicate_record(&graph, dependent));
            }
        }
        Ok(records)
    }
}

/// Condition-sequence matches over tagged lines
pub struct PatternAnalyzer<T> {
    tagger: T,
    matcher: Arc<LineMatcher>,
}

impl<T: Tagger> PatternAnalyzer<T> {
    pub fn new(tagger: T, matcher: Arc<LineMatcher>) -> Self {
        Self { tagger, matcher }
    }
}

impl<T: Tagger + Send> LineAnalyzer for PatternAnalyzer<T> {
    fn analyze(&mut self, line: &str) -> Result<Vec<MatchRecord>, AnalysisError> {
        let line = line.trim();
        let tokens = self.tagger.tokenize(line)?;
        Ok(self
            .matcher
            .match_tokens(line, &tokens)
            .into_iter()
            .map(|text| MatchRecord::new(&text, PATTERN_CATEGORY))
            .collect())
    }
}

/// Fail unless the tagger knows `keyword` as a word of its own
///
/// A keyword the dictionary splits into several tokens never appears as
/// a single token, so a dependency scan for it could not find anything.
pub fn ensure_known_keyword<T: Tagger + ?Sized>(tagger: &mut T, keyword: &str) -> Result<(), ConfigError> {
    let tokens = tagger.tokenize(keyword)?;
    if tokens.iter().any(|t| t.matches_word(keyword)) {
        Ok(())
    } else {
        Err(ConfigError::UnknownKeyword(keyword.to_string()))
    }
}
