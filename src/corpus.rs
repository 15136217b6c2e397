//! Corpus input: line streams over plain or gzip files, glob expansion,
//! and the two-table CSV article store
//!
//! The store is a pair of CSV files: an index mapping article titles to
//! ids (`title,id`) and the article data (`id,text`). Both are scanned
//! front to back on every lookup, so nothing is held in memory.

use crate::error::{ConfigError, CorpusError};
use bstr::ByteSlice;
use bstr::io::BufReadExt;
use flate2::read::MultiGzDecoder;
use log::{debug, warn};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Open a corpus file, decompressing `.gz` on the fly
pub fn open_corpus(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Lines of every file in order
///
/// Files that cannot be opened or read are logged and skipped. Invalid
/// UTF-8 is replaced rather than rejected.
pub fn corpus_lines(paths: Vec<PathBuf>) -> Box<dyn Iterator<Item = String> + Send> {
    Box::new(paths.into_iter().flat_map(file_lines))
}

fn file_lines(path: PathBuf) -> Box<dyn Iterator<Item = String> + Send> {
    match open_corpus(&path) {
        Ok(reader) => {
            debug!("reading {}", path.display());
            Box::new(reader.byte_lines().map_while(move |line| match line {
                Ok(bytes) => Some(bytes.to_str_lossy().into_owned()),
                Err(e) => {
                    warn!("stopped reading {}: {}", path.display(), e);
                    None
                }
            }))
        }
        Err(e) => {
            warn!("failed to open {}: {}", path.display(), e);
            Box::new(std::iter::empty())
        }
    }
}

/// Expand glob patterns into a sorted, deduplicated list of files
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let before = files.len();
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("skipping {}: {}", e.path().display(), e.error()),
            }
        }
        if files.len() == before {
            return Err(ConfigError::NoInputs(pattern.to_string()));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

#[derive(Debug, Deserialize)]
struct IndexRow {
    title: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct ArticleRow {
    id: String,
    text: String,
}

/// Article lookup over an index table and a data table
#[derive(Debug, Clone)]
pub struct CorpusStore {
    index_path: PathBuf,
    data_path: PathBuf,
}

impl CorpusStore {
    /// Both tables must exist
    pub fn open(index_path: impl Into<PathBuf>, data_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let index_path = index_path.into();
        let data_path = data_path.into();
        for path in [&index_path, &data_path] {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.clone()));
            }
        }
        Ok(Self { index_path, data_path })
    }

    /// Id of the first article titled `title`
    pub fn lookup_by_title(&self, title: &str) -> Result<Option<String>, CorpusError> {
        let mut reader = csv::Reader::from_path(&self.index_path)?;
        for row in reader.deserialize::<IndexRow>() {
            let row = row?;
            if row.title == title {
                return Ok(Some(row.id));
            }
        }
        Ok(None)
    }

    /// Trimmed text of the first article with `id`
    pub fn lookup_by_id(&self, id: &str) -> Result<Option<String>, CorpusError> {
        let mut reader = csv::Reader::from_path(&self.data_path)?;
        for row in reader.deserialize::<ArticleRow>() {
            let row = row?;
            if row.id == id {
                return Ok(Some(row.text.trim().to_string()));
            }
        }
        Ok(None)
    }

    /// Title to text in one go
    pub fn text_for_title(&self, title: &str) -> Result<Option<String>, CorpusError> {
        match self.lookup_by_title(title)? {
            Some(id) => {
                let text = self.lookup_by_id(&id)?;
                if text.is_none() {
                    warn!("article {} is indexed but has no data row", id);
                }
                Ok(text)
            }
            None => Ok(None),
        }
    }
}
