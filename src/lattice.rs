//! CaboCha lattice (`-f1`) parsing
//!
//! Parses CaboCha's lattice output into [`ParsedSentence`] values.
//! Each chunk starts with a header line and is followed by its tokens:
//!
//! ```text
//! * 0 2D 0/1 -0.764522
//! 私	名詞,代名詞,一般,*,*,*,私,ワタシ,ワタシ
//! は	助詞,係助詞,*,*,*,*,は,ハ,ワ
//! * 1 2D 0/1 -0.764522
//! ...
//! EOS
//! ```
//!
//! The header fields are the chunk id, the link target suffixed with `D`
//! (`-1D` for the root), the head/function token positions and a score.

use crate::chunk::{Chunk, ChunkId, ParsedSentence, Token};
use crate::corpus::open_corpus;
use crate::mecab::{EOS, token_from_features};
use atoi::{FromRadix10Checked, FromRadix10SignedChecked};
use bstr::ByteSlice;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

/// Error during lattice parsing
#[derive(Debug, Error)]
#[error("Lattice error at line {line_num}: {message}")]
pub struct LatticeError {
    pub line_num: usize,
    pub message: String,
}

impl LatticeError {
    fn new(line_num: usize, message: impl Into<String>) -> Self {
        Self {
            line_num,
            message: message.into(),
        }
    }
}

/// Parse the first sentence in `text`
pub fn parse_lattice(text: &str) -> Result<ParsedSentence, LatticeError> {
    parse_lattice_lines(text.lines())
}

/// Parse lattice lines up to (and excluding) the first `EOS`
pub fn parse_lattice_lines<I, S>(lines: I) -> Result<ParsedSentence, LatticeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut builder = SentenceBuilder::default();
    for (idx, line) in lines.into_iter().enumerate() {
        if builder.push_line(line.as_ref(), idx + 1)? {
            break;
        }
    }
    Ok(builder.finish())
}

#[derive(Default)]
struct SentenceBuilder {
    sentence: ParsedSentence,
    current: Option<Chunk>,
    lines_seen: usize,
}

impl SentenceBuilder {
    /// Consume one line; returns true at end of sentence
    fn push_line(&mut self, line: &[u8], line_num: usize) -> Result<bool, LatticeError> {
        let line = line.trim_end_with(|c| c == '\n' || c == '\r');
        if line.is_empty() {
            return Ok(false);
        }
        self.lines_seen += 1;

        if line == EOS.as_bytes() {
            return Ok(true);
        }

        if line.starts_with(b"* ") {
            let chunk = parse_chunk_header(line, line_num)?;
            if let Some(done) = self.current.replace(chunk) {
                self.sentence.add_chunk(done);
            }
            return Ok(false);
        }

        let token = parse_token_line(line, line_num)?;
        match self.current.as_mut() {
            Some(chunk) => chunk.push_token(token),
            None => {
                return Err(LatticeError::new(line_num, "token before first chunk header"));
            }
        }
        Ok(false)
    }

    fn finish(mut self) -> ParsedSentence {
        if let Some(done) = self.current.take() {
            self.sentence.add_chunk(done);
        }
        self.sentence.text = Some(self.sentence.surface_text());
        self.sentence
    }
}

/// Parse `* id linkD head/func score`
fn parse_chunk_header(line: &[u8], line_num: usize) -> Result<Chunk, LatticeError> {
    let mut fields = line.fields();
    fields.next(); // "*"

    let id_field = fields
        .next()
        .ok_or_else(|| LatticeError::new(line_num, "missing chunk id"))?;
    let id = parse_id(id_field)
        .ok_or_else(|| LatticeError::new(line_num, format!("invalid chunk id: {}", id_field.as_bstr())))?;

    let link_field = fields
        .next()
        .ok_or_else(|| LatticeError::new(line_num, "missing chunk link"))?;
    let link = parse_link(link_field)
        .ok_or_else(|| LatticeError::new(line_num, format!("invalid chunk link: {}", link_field.as_bstr())))?;

    Ok(Chunk::new(id, link))
}

fn parse_id(field: &[u8]) -> Option<ChunkId> {
    match ChunkId::from_radix_10_checked(field) {
        (Some(id), used) if used == field.len() => Some(id),
        _ => None,
    }
}

/// `2D` → `Some(Some(2))`, `-1D` → `Some(None)`
fn parse_link(field: &[u8]) -> Option<Option<ChunkId>> {
    let digits = field.strip_suffix(b"D")?;
    let (value, used) = i64::from_radix_10_signed_checked(digits);
    let value = value?;
    if digits.is_empty() || used != digits.len() {
        return None;
    }
    Some(usize::try_from(value).ok())
}

/// Parse `surface<TAB>features[<TAB>named-entity]`
fn parse_token_line(line: &[u8], line_num: usize) -> Result<Token, LatticeError> {
    let (surface, rest) = line
        .split_once_str("\t")
        .ok_or_else(|| LatticeError::new(line_num, "expected surface<TAB>features"))?;
    let features = match memchr::memchr(b'\t', rest) {
        Some(pos) => &rest[..pos],
        None => rest,
    };

    let surface = surface
        .to_str()
        .map_err(|_| LatticeError::new(line_num, "surface is not valid UTF-8"))?;
    let features = features
        .to_str()
        .map_err(|_| LatticeError::new(line_num, "features are not valid UTF-8"))?;

    Ok(token_from_features(surface, features))
}

/// Lattice reader that iterates over sentences
pub struct LatticeReader<R: BufRead> {
    reader: R,
    line_num: usize,
    buf: Vec<u8>,
}

impl LatticeReader<Box<dyn BufRead + Send>> {
    /// Open a lattice file; `.gz` files are decompressed on the fly
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(open_corpus(path)?))
    }
}

impl<'a> LatticeReader<&'a [u8]> {
    pub fn from_str(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> LatticeReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_num: 0,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LatticeReader<R> {
    type Item = Result<ParsedSentence, LatticeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut builder = SentenceBuilder::default();

        loop {
            self.buf.clear();
            self.line_num += 1;
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    // EOF; a final sentence may lack its EOS line
                    if builder.lines_seen == 0 {
                        return None;
                    }
                    break;
                }
                Ok(_) => match builder.push_line(&self.buf, self.line_num) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => {
                        self.skip_to_eos();
                        return Some(Err(e));
                    }
                },
                Err(e) => {
                    return Some(Err(LatticeError::new(
                        self.line_num,
                        format!("IO error: {}", e),
                    )));
                }
            }
        }

        Some(Ok(builder.finish()))
    }
}

impl<R: BufRead> LatticeReader<R> {
    /// Resynchronise after a malformed sentence
    fn skip_to_eos(&mut self) {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) | Err(_) => return,
                Ok(_) => {
                    self.line_num += 1;
                    if self.buf.trim_end_with(|c| c == '\n' || c == '\r') == EOS.as_bytes() {
                        return;
                    }
                }
            }
        }
    }
}
