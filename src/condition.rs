//! Condition language parser
//!
//! Parses textual condition sequences into [`MatchCondition`]s using a pest
//! grammar. Quoted or bare words are literals; bracketed names are
//! part-of-speech class sets:
//!
//! ```text
//! "横断歩道" [助詞|助動詞] [動詞]
//! ```

use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::matcher::MatchCondition;

#[derive(Parser)]
#[grammar = "conditions.pest"]
struct ConditionParser;

/// Error type for condition parsing failures
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("Condition error: {0}")]
    Syntax(#[from] pest::error::Error<Rule>),

    #[error("Condition error: empty literal")]
    EmptyLiteral,

    #[error("Condition error: no conditions given")]
    Empty,
}

/// Parse a condition string into a condition sequence
pub fn parse_conditions(input: &str) -> Result<Vec<MatchCondition>, ConditionError> {
    let mut pairs = ConditionParser::parse(Rule::conditions, input)?;
    let Some(root) = pairs.next() else {
        return Err(ConditionError::Empty);
    };

    let mut conditions = Vec::new();
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::literal => conditions.push(parse_literal(pair)?),
            Rule::class_set => {
                conditions.push(MatchCondition::classes(pair.into_inner().map(|p| p.as_str())));
            }
            _ => {} // EOI
        }
    }

    if conditions.is_empty() {
        return Err(ConditionError::Empty);
    }
    Ok(conditions)
}

/// Parse a quoted or bare literal
fn parse_literal(pair: pest::iterators::Pair<Rule>) -> Result<MatchCondition, ConditionError> {
    let Some(inner) = pair.into_inner().next() else {
        return Err(ConditionError::EmptyLiteral);
    };
    let text = match inner.as_rule() {
        Rule::quoted => inner.into_inner().as_str(),
        _ => inner.as_str(),
    };
    if text.is_empty() {
        return Err(ConditionError::EmptyLiteral);
    }
    Ok(MatchCondition::literal(text))
}
