//! MeCab output parsing
//!
//! MeCab's default format prints one morpheme per line as
//! `surface<TAB>feature,feature,...` and terminates each sentence with
//! `EOS`. With IPADIC the first feature is the coarse part of speech and
//! the seventh is the dictionary form (`*` when unknown).

use crate::chunk::Token;

/// Position of the dictionary form in an IPADIC feature string
const LEMMA_FIELD: usize = 6;

pub const EOS: &str = "EOS";

/// Build a token from a surface form and its comma-separated features
pub fn token_from_features(surface: &str, features: &str) -> Token {
    let mut fields = features.split(',');
    let feature_class = fields.next().unwrap_or_default();
    let lemma = fields
        .nth(LEMMA_FIELD - 1)
        .filter(|lemma| !lemma.is_empty() && *lemma != "*");

    let token = Token::new(surface, feature_class);
    match lemma {
        Some(lemma) => token.with_lemma(lemma),
        None => token,
    }
}

/// Parse one output line; `None` for `EOS`, blank lines and lines without features
pub fn parse_line(line: &str) -> Option<Token> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line == EOS {
        return None;
    }
    let (surface, features) = line.split_once('\t')?;
    // some dictionaries append extra tab-separated columns
    let features = features.split('\t').next().unwrap_or_default();
    Some(token_from_features(surface, features))
}

/// Parse the lines of one sentence, stopping at `EOS`
pub fn parse_output<I, S>(lines: I) -> Vec<Token>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tokens = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim_end() == EOS {
            break;
        }
        if let Some(token) = parse_line(line) {
            tokens.push(token);
        }
    }
    tokens
}
