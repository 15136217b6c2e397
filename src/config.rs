//! TOML configuration
//!
//! Every section is optional; missing keys take their defaults. Unknown
//! keys are rejected so typos surface before a long scan starts.
//!
//! ```toml
//! [scan]
//! workers = 8
//! line_timeout_secs = 30
//! literal_mode = "exact"
//! conditions = ["横断歩道", ["助詞", "助動詞"]]
//!
//! [parser]
//! program = "cabocha"
//! args = ["-f1"]
//!
//! [corpus]
//! index = "corpus/wikipedia_index.csv"
//! data = "corpus/wikipedia.csv"
//! ```

use crate::backend::CommandSpec;
use crate::error::ConfigError;
use crate::matcher::{LiteralMode, MatchCondition};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default = "CommandConfig::cabocha")]
    pub parser: CommandConfig,

    #[serde(default = "CommandConfig::mecab")]
    pub tagger: CommandConfig,

    #[serde(default)]
    pub corpus: Option<CorpusConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            parser: CommandConfig::cabocha(),
            tagger: CommandConfig::mecab(),
            corpus: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Worker threads, each with its own backend process
    pub workers: usize,

    /// Per-line backend timeout
    pub line_timeout_secs: u64,

    pub literal_mode: LiteralMode,

    /// Verify the dependency-scan keyword is a dictionary word
    pub keyword_check: bool,

    /// Default condition sequence for pattern scans
    pub conditions: Vec<ConditionSpec>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            line_timeout_secs: 30,
            literal_mode: LiteralMode::default(),
            keyword_check: true,
            conditions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    fn cabocha() -> Self {
        Self::from_spec(CommandSpec::cabocha())
    }

    fn mecab() -> Self {
        Self::from_spec(CommandSpec::mecab())
    }

    fn from_spec(spec: CommandSpec) -> Self {
        Self {
            program: spec.program,
            args: spec.args,
        }
    }

    pub fn to_spec(&self, timeout: Duration) -> CommandSpec {
        CommandSpec::new(&self.program)
            .with_args(self.args.iter().cloned())
            .with_timeout(timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    pub index: PathBuf,
    pub data: PathBuf,
}

/// A condition as written in TOML: a string literal or a list of classes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    Literal(String),
    Classes(Vec<String>),
}

impl From<&ConditionSpec> for MatchCondition {
    fn from(spec: &ConditionSpec) -> Self {
        match spec {
            ConditionSpec::Literal(text) => MatchCondition::literal(text),
            ConditionSpec::Classes(classes) => MatchCondition::classes(classes.iter().cloned()),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn line_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.line_timeout_secs)
    }

    pub fn parser_spec(&self) -> CommandSpec {
        self.parser.to_spec(self.line_timeout())
    }

    pub fn tagger_spec(&self) -> CommandSpec {
        self.tagger.to_spec(self.line_timeout())
    }

    pub fn conditions(&self) -> Vec<MatchCondition> {
        self.scan.conditions.iter().map(MatchCondition::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.scan.workers, 4);
        assert_eq!(config.line_timeout(), Duration::from_secs(30));
        assert_eq!(config.scan.literal_mode, LiteralMode::LineFallback);
        assert!(config.scan.keyword_check);
        assert_eq!(config.parser_spec(), CommandSpec::cabocha());
        assert_eq!(config.tagger_spec(), CommandSpec::mecab());
        assert!(config.corpus.is_none());
        assert!(config.conditions().is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [scan]
            workers = 8
            line_timeout_secs = 5
            literal_mode = "exact"
            conditions = ["横断歩道", ["助詞", "助動詞"]]

            [parser]
            program = "/opt/cabocha/bin/cabocha"
            args = ["-f1", "-n1"]

            [corpus]
            index = "corpus/index.csv"
            data = "corpus/data.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.workers, 8);
        assert_eq!(config.scan.literal_mode, LiteralMode::Exact);
        assert_eq!(
            config.conditions(),
            vec![MatchCondition::literal("横断歩道"), MatchCondition::classes(["助詞", "助動詞"])]
        );

        let parser = config.parser_spec();
        assert_eq!(parser.program, PathBuf::from("/opt/cabocha/bin/cabocha"));
        assert_eq!(parser.args, vec!["-f1", "-n1"]);
        assert_eq!(parser.timeout, Duration::from_secs(5));

        let corpus = config.corpus.unwrap();
        assert_eq!(corpus.index, PathBuf::from("corpus/index.csv"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml_str("[scan]\nworkerz = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/kakari.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }
}
