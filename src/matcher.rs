//! Sequential condition matching over tokenized lines
//!
//! A condition sequence of length `k` is slid over every window of `k`
//! consecutive tokens. Each condition is checked against the token at the
//! same position; a window matches only if all conditions hold. Overlapping
//! windows are reported independently.

use crate::chunk::Token;
use rustc_hash::FxHashSet;
use serde::Deserialize;

/// One element of a condition sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchCondition {
    /// Token surface must equal the text (see [`LiteralMode`])
    Literal(String),
    /// Token feature class must be one of the set
    ClassSet(FxHashSet<String>),
}

impl MatchCondition {
    pub fn literal(text: &str) -> Self {
        MatchCondition::Literal(text.to_string())
    }

    pub fn classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MatchCondition::ClassSet(classes.into_iter().map(Into::into).collect())
    }
}

/// How a [`MatchCondition::Literal`] is tested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiteralMode {
    /// Token surface must equal the literal
    Exact,
    /// Surface equality, or the literal occurs anywhere in the raw line.
    ///
    /// Tolerates a tokenizer splitting a keyword across several tokens.
    /// Note that once the line contains the literal, the condition holds
    /// at every position.
    #[default]
    LineFallback,
}

/// A condition sequence plus its literal-matching mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatcher {
    conditions: Vec<MatchCondition>,
    mode: LiteralMode,
}

impl LineMatcher {
    pub fn new(conditions: Vec<MatchCondition>) -> Self {
        Self {
            conditions,
            mode: LiteralMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: LiteralMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn conditions(&self) -> &[MatchCondition] {
        &self.conditions
    }

    pub fn mode(&self) -> LiteralMode {
        self.mode
    }

    /// Literal texts, used to prefilter corpus lines
    pub fn keywords(&self) -> Vec<&str> {
        self.conditions
            .iter()
            .filter_map(|c| match c {
                MatchCondition::Literal(text) => Some(text.as_str()),
                MatchCondition::ClassSet(_) => None,
            })
            .collect()
    }

    /// All window matches in `tokens`, each as the concatenation of its parts
    ///
    /// A literal condition contributes its own text, a class condition the
    /// token's surface. `line` is the raw text the tokens came from.
    pub fn match_tokens(&self, line: &str, tokens: &[Token]) -> Vec<String> {
        let k = self.conditions.len();
        let n = tokens.len();
        if k == 0 || k > n {
            return Vec::new();
        }

        // line-level containment does not depend on the window
        let in_line: Vec<bool> = self
            .conditions
            .iter()
            .map(|c| match (c, self.mode) {
                (MatchCondition::Literal(text), LiteralMode::LineFallback) => line.contains(text.as_str()),
                _ => false,
            })
            .collect();

        let mut matches = Vec::new();
        'windows: for offset in 0..=n - k {
            let mut matched = String::new();
            for (j, condition) in self.conditions.iter().enumerate() {
                let token = &tokens[offset + j];
                match condition {
                    MatchCondition::Literal(text) => {
                        if token.surface != *text && !in_line[j] {
                            continue 'windows;
                        }
                        matched.push_str(text);
                    }
                    MatchCondition::ClassSet(classes) => {
                        if !classes.contains(&token.feature_class) {
                            continue 'windows;
                        }
                        matched.push_str(&token.surface);
                    }
                }
            }
            matches.push(matched);
        }
        matches
    }
}
