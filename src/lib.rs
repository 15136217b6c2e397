//! Kakari: dependency-relation extraction and pattern scanning for Japanese text
//!
//! Turns parser output (bunsetsu chunks and their head links) into a
//! queryable dependency graph, answers "which words modify X" for one
//! sentence, and scans large corpora in parallel for dependency relations
//! or part-of-speech condition sequences.

// Sentence model and dependency queries
pub mod chunk; // Tokens, chunks and parsed sentences
pub mod extract; // Single-sentence dependent extraction
pub mod graph; // Chunk graph indexed by id
pub mod resolver; // Target word -> chunk
pub mod walker; // Chunk -> dependent chunks

// Analysis backends and their output formats
pub mod backend;
pub mod lattice; // CaboCha -f1 reader
pub mod mecab; // MeCab output reader

// Pattern scans
pub mod condition; // Condition language parser
pub mod matcher;
pub mod prefilter;

// Corpus scanning
pub mod analyzer;
pub mod corpus;
pub mod pipeline;
pub mod progress;
pub mod sink;
pub mod split;

pub mod config;
pub mod error;

// Re-exports for convenience
pub use analyzer::{DependencyAnalyzer, LineAnalyzer, PatternAnalyzer, ensure_known_keyword};
pub use backend::{CabochaCommand, CommandSpec, MecabCommand, Parser, Tagger};
pub use chunk::{Chunk, ChunkId, ParsedSentence, Token};
pub use condition::parse_conditions;
pub use config::Config;
pub use error::{AnalysisError, BackendError, ConfigError, ExtractError, GraphError, ScanError};
pub use extract::{ExtractRequest, extract, extract_parsed};
pub use graph::{DependencyGraph, DuplicatePolicy};
pub use matcher::{LineMatcher, LiteralMode, MatchCondition};
pub use pipeline::{CorpusScanPipeline, ScanSummary};
pub use prefilter::KeywordFilter;
pub use resolver::{ResolvePolicy, resolve, resolve_all};
pub use sink::{CsvSink, MatchRecord, RecordSink};
pub use walker::dependents_of;
