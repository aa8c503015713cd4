//! Line delimiter table.
//!
//! A [`DelimiterSet`] is an ordered list of strings that terminate a line. Detection is
//! greedy: the earliest occurrence wins, and among candidates starting at the same
//! offset the longest one wins (so `"\r\n"` is never split into `"\r"` + `"\n"`).
//! Remaining ties are broken by table order.

use crate::error::{DocumentError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// The default ("legal") line delimiters.
pub const DEFAULT_DELIMITERS: [&str; 3] = ["\r", "\n", "\r\n"];

/// Matcher for [`DEFAULT_DELIMITERS`], longest alternative first.
///
/// The pattern is a constant alternation of literals; compiling it only fails if
/// the regex engine itself is broken.
static DEFAULT_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n|\r|\n").expect("literal delimiter alternation compiles")
});

/// A delimiter occurrence found in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterInfo {
    /// Character offset of the delimiter in the scanned text.
    pub offset: usize,
    /// Delimiter length in characters.
    pub length: usize,
    /// Index of the delimiter in the table.
    pub index: usize,
}

/// Immutable, validated delimiter table.
#[derive(Debug, Clone)]
pub struct DelimiterSet {
    delimiters: Vec<String>,
    matcher: Regex,
    max_length: usize,
    context_sensitive: bool,
}

impl DelimiterSet {
    /// Build a delimiter table. Duplicates keep their first position.
    ///
    /// Fails if the table is empty or contains an empty delimiter.
    pub fn new<I, S>(delimiters: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table: Vec<String> = Vec::new();
        for delimiter in delimiters {
            let delimiter = delimiter.into();
            if delimiter.is_empty() {
                return Err(DocumentError::InvalidDelimiters(
                    "delimiters must not be empty".to_string(),
                ));
            }
            if !table.contains(&delimiter) {
                table.push(delimiter);
            }
        }
        if table.is_empty() {
            return Err(DocumentError::InvalidDelimiters(
                "at least one delimiter is required".to_string(),
            ));
        }

        let char_lengths: Vec<usize> = table.iter().map(|d| d.chars().count()).collect();

        // Alternation order encodes the tie-break: regex alternation is leftmost-first,
        // so listing longer delimiters first picks the longest match at a given start.
        let mut order: Vec<usize> = (0..table.len()).collect();
        order.sort_by(|a, b| char_lengths[*b].cmp(&char_lengths[*a]));
        let pattern = order
            .iter()
            .map(|index| regex::escape(&table[*index]))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&pattern)
            .map_err(|err| DocumentError::InvalidDelimiters(err.to_string()))?;

        let max_length = char_lengths.iter().copied().max().unwrap_or(1);
        let context_sensitive = table.iter().any(|delimiter| {
            delimiter.chars().count() > 1
                && delimiter.chars().any(|c| !table.contains(&c.to_string()))
        });
        Ok(Self {
            delimiters: table,
            matcher,
            max_length,
            context_sensitive,
        })
    }

    /// The delimiter strings in table order.
    pub fn delimiters(&self) -> &[String] {
        &self.delimiters
    }

    /// Delimiter string at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.delimiters.get(index).map(String::as_str)
    }

    /// Whether some delimiter contains a character that is not a delimiter on its
    /// own (`"<br>"`, `"::"`).
    ///
    /// Line content next to an edit can then complete a delimiter, so an incremental
    /// update has to look at the text around the edit.
    pub fn needs_context(&self) -> bool {
        self.context_sensitive
    }

    /// Length in characters of the longest delimiter.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Earliest delimiter at or after the character offset `offset` in `text`.
    pub fn next_delimiter_info(&self, text: &str, offset: usize) -> Option<DelimiterInfo> {
        let byte = if offset == 0 {
            0
        } else {
            let mut indices = text.char_indices().map(|(byte, _)| byte).chain([text.len()]);
            indices.nth(offset)?
        };
        let found = self.matcher.find_at(text, byte)?;
        let length = found.as_str().chars().count();
        Some(DelimiterInfo {
            offset: offset + text[byte..found.start()].chars().count(),
            length,
            index: self.index_of(found.as_str()),
        })
    }

    /// All delimiters of `text`, scanned greedily from the start.
    pub fn matches<'t>(&'t self, text: &'t str) -> impl Iterator<Item = DelimiterInfo> + 't {
        let mut byte = 0;
        let mut chars = 0;
        self.matcher.find_iter(text).map(move |found| {
            chars += text[byte..found.start()].chars().count();
            let length = found.as_str().chars().count();
            let info = DelimiterInfo {
                offset: chars,
                length,
                index: self.index_of(found.as_str()),
            };
            chars += length;
            byte = found.end();
            info
        })
    }

    /// Number of delimiters in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.matcher.find_iter(text).count()
    }

    fn index_of(&self, delimiter: &str) -> usize {
        self.delimiters
            .iter()
            .position(|d| d == delimiter)
            .unwrap_or_default()
    }
}

impl Default for DelimiterSet {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS.iter().map(|d| d.to_string()).collect(),
            matcher: DEFAULT_MATCHER.clone(),
            max_length: 2,
            context_sensitive: false,
        }
    }
}
