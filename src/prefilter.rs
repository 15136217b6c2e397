//! Cheap keyword prefilter applied before any parsing
//!
//! A line is kept if it contains at least one keyword. With no keywords
//! (for instance a condition sequence made only of class sets) every line
//! is kept.

use memchr::memmem::Finder;

#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    finders: Vec<Finder<'static>>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let finders = keywords
            .into_iter()
            .filter(|k| !k.as_ref().is_empty())
            .map(|k| Finder::new(k.as_ref().as_bytes()).into_owned())
            .collect();
        Self { finders }
    }

    /// A filter that keeps everything
    pub fn pass_all() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.finders.is_empty()
    }

    pub fn retains(&self, line: &str) -> bool {
        self.is_noop()
            || self
                .finders
                .iter()
                .any(|f| f.find(line.as_bytes()).is_some())
    }
}
