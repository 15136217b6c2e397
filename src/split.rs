//! Sentence splitting on Japanese terminal punctuation
//!
//! Text is cut after every `。`, `！`, `？` or `?`, keeping the terminator
//! with its sentence. Pieces are trimmed and empty ones dropped.

use crate::corpus::open_corpus;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

static SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^。！？?]*[。！？?]|[^。！？?]+").unwrap_or_else(|e| panic!("sentence pattern: {}", e))
});

/// Sentences of one line of text
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Write the sentences of `input`, one per line, to `output`
///
/// Returns the number of sentences written.
pub fn split_file(input: &Path, output: &Path) -> io::Result<usize> {
    let reader = open_corpus(input)?;
    let mut writer = BufWriter::new(File::create(output)?);

    let mut count = 0;
    for line in reader.lines() {
        for sentence in split_sentences(&line?) {
            writeln!(writer, "{}", sentence)?;
            count += 1;
        }
    }
    writer.flush()?;
    Ok(count)
}
