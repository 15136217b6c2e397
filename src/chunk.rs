//! Chunk-level sentence annotations
//!
//! A dependency parser such as CaboCha groups the tokens of a sentence into
//! chunks (bunsetsu) and links every chunk to the chunk it depends on.
//! These are the plain data structures produced by the backends and
//! consumed by [`DependencyGraph`](crate::graph::DependencyGraph).

/// Identifier of a chunk, scoped to one parse result
pub type ChunkId = usize;

/// A single morpheme with its coarse part-of-speech class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub surface: String,
    /// First feature field of the tagger output, e.g. "名詞" or "助詞"
    pub feature_class: String,
    /// Dictionary form, when the tagger reports one
    pub lemma: Option<String>,
}

impl Token {
    /// Create a token without a lemma
    pub fn new(surface: &str, feature_class: &str) -> Self {
        Self {
            surface: surface.to_string(),
            feature_class: feature_class.to_string(),
            lemma: None,
        }
    }

    pub fn with_lemma(mut self, lemma: &str) -> Self {
        self.lemma = Some(lemma.to_string());
        self
    }

    /// True if `word` equals the surface form or the dictionary form
    pub fn matches_word(&self, word: &str) -> bool {
        self.surface == word || self.lemma.as_deref() == Some(word)
    }

    /// Dictionary form if known, surface form otherwise
    pub fn base_form(&self) -> &str {
        self.lemma.as_deref().unwrap_or(&self.surface)
    }
}

/// A chunk in a sentence's dependency structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    /// Chunk this one depends on; `None` for the root
    pub link: Option<ChunkId>,
    /// Tokens in reading order
    pub tokens: Vec<Token>,
}

impl Chunk {
    pub fn new(id: ChunkId, link: Option<ChunkId>) -> Self {
        Self {
            id,
            link,
            tokens: Vec::new(),
        }
    }

    /// Create a chunk from bare surface strings (feature class left empty)
    pub fn from_surfaces(id: ChunkId, link: Option<ChunkId>, surfaces: &[&str]) -> Self {
        Self {
            id,
            link,
            tokens: surfaces.iter().map(|s| Token::new(s, "")).collect(),
        }
    }

    pub fn push_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.surface.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.link.is_none()
    }
}

/// Full annotation of one input sentence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSentence {
    /// Source text, when known
    pub text: Option<String>,
    /// Chunks in parse (left-to-right) order
    pub chunks: Vec<Chunk>,
}

impl ParsedSentence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            chunks: Vec::new(),
        }
    }

    pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkId {
        let id = chunk.id;
        self.chunks.push(chunk);
        id
    }

    /// Concatenated surface forms of every token
    pub fn surface_text(&self) -> String {
        self.chunks.iter().flat_map(|c| c.surfaces()).collect()
    }

    pub fn token_count(&self) -> usize {
        self.chunks.iter().map(|c| c.tokens.len()).sum()
    }
}
