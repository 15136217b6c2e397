//! Error types shared across the extraction and scan layers

use crate::chunk::ChunkId;
use crate::lattice::LatticeError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Lookup or construction failure in a dependency graph
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Graph error: chunk {0} not found")]
    ChunkNotFound(ChunkId),

    #[error("Graph error: duplicate chunk id {0}")]
    DuplicateChunk(ChunkId),
}

/// Failure talking to an external parser or tagger process
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend process exited unexpectedly")]
    Exited,

    #[error("Backend split one input line into {0} sentences")]
    SplitInput(usize),

    #[error(transparent)]
    Lattice(#[from] LatticeError),
}

/// Failure of the single-sentence extraction path
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Target word not found: {0}")]
    TargetNotFound(String),
}

/// Failure while analysing one corpus line
///
/// The scan pipeline logs these and counts the line as having no matches.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Analysis panicked: {0}")]
    Panicked(String),
}

/// Missing or invalid resource detected before any work begins
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Configuration error: cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: invalid input pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Configuration error: no input files match {0}")]
    NoInputs(String),

    #[error("Configuration error: keyword not in dictionary: {0}")]
    UnknownKeyword(String),

    #[error("Configuration error: {0}")]
    Conditions(#[from] crate::condition::ConditionError),

    #[error("Configuration error: {0}")]
    Backend(#[from] BackendError),
}

/// Failure writing match records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Output error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-scan failure
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Failed to start scan worker: {0}")]
    Worker(#[source] std::io::Error),
}

/// Failure reading the corpus tables
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Corpus error: {0}")]
    Io(#[from] std::io::Error),
}
