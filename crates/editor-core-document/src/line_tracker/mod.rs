//! Line Tracker
//!
//! Maps character offsets to line numbers (and back) for a delimiter-segmented text.
//!
//! The tracker keeps only line lengths and which delimiter ends each line, never the
//! text itself. Owners must report every change through [`LineTracker::set`] or
//! [`LineTracker::replace`], in order.
//!
//! Storage starts out as an ordered array, which is cheap to build for a freshly
//! loaded document. The first [`LineTracker::replace`] converts it, once and for good,
//! into a balanced tree keyed by cumulative line length so that later edits and
//! lookups are logarithmic.

mod list;
mod scan;
mod tree;

use crate::delimiters::{DelimiterInfo, DelimiterSet};
use crate::error::{BadLocation, DocumentError, Result};
use list::ListLines;
use scan::{LineScanner, Piece, char_slice, scan_text};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use tracing::{debug, trace};
use tree::TreeLines;

/// Stored shape of one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LineRecord {
    /// Line length including the delimiter.
    pub(crate) length: usize,
    /// Delimiter table index, `None` for the last line.
    pub(crate) delimiter: Option<usize>,
    pub(crate) delimiter_length: usize,
}

impl LineRecord {
    pub(crate) fn delimited(length: usize, delimiter: usize, delimiter_length: usize) -> Self {
        Self {
            length,
            delimiter: Some(delimiter),
            delimiter_length,
        }
    }

    pub(crate) fn last(length: usize) -> Self {
        Self {
            length,
            delimiter: None,
            delimiter_length: 0,
        }
    }

    pub(crate) fn content_length(&self) -> usize {
        self.length - self.delimiter_length
    }
}

/// Storage strategy behind [`LineTracker`].
pub(crate) trait LineTable: fmt::Debug + Send + Sync {
    fn line_count(&self) -> usize;
    fn text_length(&self) -> usize;
    /// Start offset and record of a line.
    fn line(&self, index: usize) -> Option<(usize, LineRecord)>;
    /// Line containing `offset` and its start; `offset <= text_length()`.
    fn line_at_offset(&self, offset: usize) -> (usize, usize);
    /// Replace a run of lines.
    fn splice(&mut self, lines: Range<usize>, replacement: &[LineRecord]);
    fn records(&self) -> Vec<LineRecord>;
}

/// Location and shape of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInformation {
    /// Start offset of the line.
    pub offset: usize,
    /// Length including the delimiter.
    pub length: usize,
    /// Length of the delimiter (0 for the last line).
    pub delimiter_length: usize,
}

impl LineInformation {
    /// Length without the delimiter.
    pub fn content_length(&self) -> usize {
        self.length - self.delimiter_length
    }

    /// Exclusive end offset, delimiter included.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Replaced range of an incremental update, in pre-edit offsets.
struct Edit {
    offset: usize,
    end: usize,
    inserted: usize,
}

impl Edit {
    /// Post-edit offset of a pre-edit offset at or after the replaced range.
    fn shifted(&self, offset: usize) -> usize {
        offset - self.end + self.offset + self.inserted
    }
}

/// Incrementally maintained line index.
#[derive(Debug)]
pub struct LineTracker {
    delimiters: DelimiterSet,
    table: Box<dyn LineTable>,
    tree_backed: bool,
}

impl LineTracker {
    /// Tracker for an empty text.
    pub fn new(delimiters: DelimiterSet) -> Self {
        Self {
            delimiters,
            table: Box::new(ListLines::from_records(vec![LineRecord::last(0)])),
            tree_backed: false,
        }
    }

    /// Tracker initialised with `text`.
    pub fn with_text(delimiters: DelimiterSet, text: &str) -> Self {
        let mut tracker = Self::new(delimiters);
        tracker.set(text);
        tracker
    }

    /// The delimiter table.
    pub fn delimiters(&self) -> &DelimiterSet {
        &self.delimiters
    }

    /// Delimiter strings in table order.
    pub fn legal_line_delimiters(&self) -> &[String] {
        self.delimiters.delimiters()
    }

    /// Whether the tree representation is active.
    pub fn is_tree_backed(&self) -> bool {
        self.tree_backed
    }

    /// Discard the index and rebuild it for `text`.
    pub fn set(&mut self, text: &str) {
        let records = scan_text(&self.delimiters, text);
        if self.tree_backed {
            self.table = Box::new(TreeLines::from_records(&records));
        } else {
            self.table = Box::new(ListLines::from_records(records));
        }
    }

    /// Update the index for the replacement of `length` characters at `offset` by
    /// `text`.
    ///
    /// Only the lines touching the edit (plus enough neighbours to re-evaluate any
    /// delimiter the edit may split or join) are rescanned. Fails with
    /// `IllegalState` for a table that [needs context](DelimiterSet::needs_context);
    /// use [`replace_with_context`](Self::replace_with_context) there.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        if self.delimiters.needs_context() {
            return Err(DocumentError::IllegalState(
                "delimiter table needs the text around the edit",
            ));
        }
        self.rescan(offset, length, text, None)
    }

    /// [`replace`](Self::replace) for owners that can read the post-edit text.
    ///
    /// `context(offset, length)` returns that many characters of the text after the
    /// edit. It is only consulted when the delimiter table needs it, and only for
    /// the few characters on either side of the edit and past the rescanned lines.
    pub fn replace_with_context<F>(
        &mut self,
        offset: usize,
        length: usize,
        text: &str,
        context: F,
    ) -> Result<()>
    where
        F: Fn(usize, usize) -> Result<String>,
    {
        if self.delimiters.needs_context() {
            let context: &dyn Fn(usize, usize) -> Result<String> = &context;
            self.rescan(offset, length, text, Some(context))
        } else {
            self.rescan(offset, length, text, None)
        }
    }

    fn rescan(
        &mut self,
        offset: usize,
        length: usize,
        text: &str,
        context: Option<&dyn Fn(usize, usize) -> Result<String>>,
    ) -> Result<()> {
        BadLocation::check_range(offset, length, self.text_length())?;
        self.promote();

        let max = self.delimiters.max_length();
        let end = offset + length;
        let edit = Edit {
            offset,
            end,
            inserted: text.chars().count(),
        };

        let (mut first, mut first_start) = self.table.line_at_offset(offset);
        while first > 0 && offset - first_start < max {
            first -= 1;
            first_start = self.entry(first).0;
        }

        let (mut last, last_start) = self.table.line_at_offset(end);
        let mut window_end = last_start + self.entry(last).1.length;
        // Blank lines right after the edit may combine with a delimiter it creates.
        while last + 1 < self.table.line_count() && window_end - end < max {
            let (_, next) = self.entry(last + 1);
            if next.content_length() != 0 || next.delimiter.is_none() {
                break;
            }
            last += 1;
            window_end += next.length;
        }

        loop {
            let mut scanner = LineScanner::new(&self.delimiters);
            for piece in self.window(first..last + 1, &edit, text, context)? {
                scanner.feed(&piece);
            }
            let is_last = last + 1 == self.table.line_count();
            let lookahead = match context {
                Some(read) if !is_last => {
                    let (start, record) = self.entry(last);
                    let boundary = start + record.length;
                    let available = self.text_length() - boundary;
                    read(edit.shifted(boundary), available.min(max - 1))?
                }
                _ => String::new(),
            };
            let (mut records, trailing, crossed) = scanner.finish_with_lookahead(&lookahead);
            if is_last {
                records.push(LineRecord::last(trailing));
            } else if trailing > 0 || crossed {
                // The window no longer ends on a line boundary; pull in the next line.
                last += 1;
                continue;
            }
            trace!(
                first,
                last,
                replacement = records.len(),
                "rescanned line window"
            );
            self.table.splice(first..last + 1, &records);
            return Ok(());
        }
    }

    fn promote(&mut self) {
        if self.tree_backed {
            return;
        }
        let records = self.table.records();
        debug!(lines = records.len(), "converting line table to tree");
        self.table = Box::new(TreeLines::from_records(&records));
        self.tree_backed = true;
    }

    fn entry(&self, line: usize) -> (usize, LineRecord) {
        self.table.line(line).unwrap_or_default()
    }

    fn delimiter_text(&self, record: &LineRecord) -> &str {
        record
            .delimiter
            .and_then(|index| self.delimiters.get(index))
            .unwrap_or("")
    }

    /// Pieces of the post-edit text covered by `lines`.
    ///
    /// With a `context`, line content within `max_length - 1` characters of the
    /// edit is read as text instead of being left opaque.
    fn window<'t>(
        &self,
        lines: Range<usize>,
        edit: &Edit,
        text: &'t str,
        context: Option<&dyn Fn(usize, usize) -> Result<String>>,
    ) -> Result<Vec<Piece<'t>>> {
        let reach = self.delimiters.max_length() - 1;
        let tail_start = edit.offset.saturating_sub(reach);
        let head_end = edit.end + reach;

        let mut before = Vec::new();
        let mut after = Vec::new();
        for line in lines {
            let (start, record) = self.entry(line);
            let content_end = start + record.content_length();
            let line_end = start + record.length;
            let delimiter = self.delimiter_text(&record);

            if start < edit.offset {
                let content = content_end.min(edit.offset);
                if content > start {
                    match context {
                        Some(read) if content > tail_start => {
                            let split = start.max(tail_start);
                            if split > start {
                                before.push(Piece::Opaque(split - start));
                            }
                            before.push(Piece::Text(Cow::Owned(read(split, content - split)?)));
                        }
                        _ => before.push(Piece::Opaque(content - start)),
                    }
                }
                if edit.offset > content_end {
                    let kept = edit.offset.min(line_end) - content_end;
                    before.push(Piece::Text(Cow::Owned(char_slice(delimiter, 0, kept))));
                }
            }
            if line_end > edit.end {
                let from = start.max(edit.end);
                if content_end > from {
                    match context {
                        Some(read) if from < head_end => {
                            let split = content_end.min(head_end);
                            after.push(Piece::Text(Cow::Owned(read(
                                edit.shifted(from),
                                split - from,
                            )?)));
                            if content_end > split {
                                after.push(Piece::Opaque(content_end - split));
                            }
                        }
                        _ => after.push(Piece::Opaque(content_end - from)),
                    }
                }
                let from = content_end.max(edit.end);
                if line_end > from {
                    after.push(Piece::Text(Cow::Owned(char_slice(
                        delimiter,
                        from - content_end,
                        line_end - content_end,
                    ))));
                }
            }
        }
        before.push(Piece::Text(Cow::Borrowed(text)));
        before.extend(after);
        Ok(before)
    }

    /// Total text length.
    pub fn text_length(&self) -> usize {
        self.table.text_length()
    }

    /// Number of lines (at least one).
    pub fn line_count(&self) -> usize {
        self.table.line_count()
    }

    /// Number of lines touched by the range `[offset, offset + length)`.
    pub fn lines_spanned(&self, offset: usize, length: usize) -> Result<usize> {
        BadLocation::check_range(offset, length, self.text_length())?;
        if length == 0 {
            return Ok(1);
        }
        let first = self.table.line_at_offset(offset).0;
        let last = self.table.line_at_offset(offset + length).0;
        Ok(last - first + 1)
    }

    /// Number of line delimiters in `text`.
    pub fn count_line_breaks(&self, text: &str) -> usize {
        self.delimiters.count(text)
    }

    /// Line containing `offset`; the text length maps to the last line.
    pub fn line_of_offset(&self, offset: usize) -> Result<usize> {
        BadLocation::check_offset(offset, self.text_length())?;
        Ok(self.table.line_at_offset(offset).0)
    }

    /// Offset, length and delimiter length of `line`.
    pub fn line_information(&self, line: usize) -> Result<LineInformation> {
        BadLocation::check_line(line, self.line_count())?;
        let (offset, record) = self.entry(line);
        Ok(LineInformation {
            offset,
            length: record.length,
            delimiter_length: record.delimiter_length,
        })
    }

    /// The line containing `offset`.
    pub fn line_information_of_offset(&self, offset: usize) -> Result<LineInformation> {
        let line = self.line_of_offset(offset)?;
        self.line_information(line)
    }

    /// Start offset of `line`.
    pub fn line_offset(&self, line: usize) -> Result<usize> {
        Ok(self.line_information(line)?.offset)
    }

    /// Length of `line` including its delimiter.
    pub fn line_length(&self, line: usize) -> Result<usize> {
        Ok(self.line_information(line)?.length)
    }

    /// Delimiter ending `line`, `None` for the last line.
    pub fn line_delimiter(&self, line: usize) -> Result<Option<&str>> {
        BadLocation::check_line(line, self.line_count())?;
        let (_, record) = self.entry(line);
        Ok(record
            .delimiter
            .and_then(|index| self.delimiters.get(index)))
    }

    /// Earliest delimiter at or after `offset` in `text`.
    pub fn next_delimiter_info(&self, text: &str, offset: usize) -> Option<DelimiterInfo> {
        self.delimiters.next_delimiter_info(text, offset)
    }

    /// Snapshot of every line.
    pub fn lines(&self) -> Vec<LineInformation> {
        let mut offset = 0;
        self.table
            .records()
            .into_iter()
            .map(|record| {
                let info = LineInformation {
                    offset,
                    length: record.length,
                    delimiter_length: record.delimiter_length,
                };
                offset += record.length;
                info
            })
            .collect()
    }
}

impl Default for LineTracker {
    fn default() -> Self {
        Self::new(DelimiterSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(tracker: &LineTracker) -> Vec<(usize, usize)> {
        tracker
            .lines()
            .iter()
            .map(|line| (line.offset, line.length))
            .collect()
    }

    fn check(text: &str, offset: usize, length: usize, insert: &str) {
        let mut tracker = LineTracker::with_text(DelimiterSet::default(), text);
        tracker.replace(offset, length, insert).unwrap();
        let edited: String = text
            .chars()
            .take(offset)
            .chain(insert.chars())
            .chain(text.chars().skip(offset + length))
            .collect();
        let fresh = LineTracker::with_text(DelimiterSet::default(), &edited);
        assert_eq!(
            tracker.lines(),
            fresh.lines(),
            "{text:?} replace({offset}, {length}, {insert:?})"
        );
    }

    #[test]
    fn test_literal_line_scheme() {
        let tracker = LineTracker::with_text(DelimiterSet::default(), "a\nbc\n");
        assert_eq!(pairs(&tracker), vec![(0, 2), (2, 3), (5, 0)]);
        assert_eq!(tracker.line_delimiter(0).unwrap(), Some("\n"));
        assert_eq!(tracker.line_delimiter(2).unwrap(), None);
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let tracker = LineTracker::default();
        assert_eq!(tracker.line_count(), 1);
        assert_eq!(tracker.line_of_offset(0).unwrap(), 0);
        assert!(tracker.line_of_offset(1).is_err());
    }

    #[test]
    fn test_first_replace_promotes_to_tree() {
        let mut tracker = LineTracker::with_text(DelimiterSet::default(), "x\ny");
        assert!(!tracker.is_tree_backed());
        tracker.replace(1, 0, "z").unwrap();
        assert!(tracker.is_tree_backed());
        tracker.set("a\nb\nc");
        assert!(tracker.is_tree_backed());
        assert_eq!(tracker.line_count(), 3);
    }

    #[test]
    fn test_crlf_joins_and_splits() {
        check("a\rb", 2, 1, "\n");
        check("a\r\nb", 2, 0, "x");
        check("a\r\nb", 1, 1, "");
        check("a\r\nb", 2, 1, "");
        check("a\rx\nb", 2, 1, "");
        check("\n\n\n", 1, 0, "\r");
        check("ab", 1, 0, "\r\n\r");
        check("a\r", 2, 0, "\n");
        check("", 0, 0, "a\r\n");
        check("a\nb\nc", 0, 5, "");
    }

    #[test]
    fn test_multi_char_delimiter_runs() {
        // "\n\n\n" beats "\n" at the same start.
        let delimiters = DelimiterSet::new(["\n", "\n\n\n"]).unwrap();
        let mut tracker = LineTracker::with_text(delimiters.clone(), "a\n\nX");
        tracker.replace(1, 0, "\n").unwrap();
        let fresh = LineTracker::with_text(delimiters, "a\n\n\nX");
        assert_eq!(tracker.lines(), fresh.lines());
        assert_eq!(tracker.line_count(), 2);
    }

    fn check_with_context(
        delimiters: &DelimiterSet,
        text: &str,
        offset: usize,
        length: usize,
        insert: &str,
    ) {
        let mut tracker = LineTracker::with_text(delimiters.clone(), text);
        let edited: Vec<char> = text
            .chars()
            .take(offset)
            .chain(insert.chars())
            .chain(text.chars().skip(offset + length))
            .collect();
        tracker
            .replace_with_context(offset, length, insert, |at, len| {
                Ok(edited[at..at + len].iter().collect())
            })
            .unwrap();
        let edited: String = edited.into_iter().collect();
        let fresh = LineTracker::with_text(delimiters.clone(), &edited);
        assert_eq!(
            tracker.lines(),
            fresh.lines(),
            "{text:?} replace({offset}, {length}, {insert:?})"
        );
    }

    #[test]
    fn test_edits_complete_and_break_markup_delimiters() {
        let delimiters = DelimiterSet::new(["<br>", "\n"]).unwrap();
        check_with_context(&delimiters, "a<br", 4, 0, ">b");
        check_with_context(&delimiters, "a<b\nr>c", 3, 1, "");
        check_with_context(&delimiters, "<br>x<br>", 4, 1, "");
        check_with_context(&delimiters, "a<br>b", 2, 1, "");
        check_with_context(&delimiters, "x<", 2, 0, "br");
        check_with_context(&delimiters, "xx<\n\nr>", 3, 2, "b");
    }

    #[test]
    fn test_delimiter_running_past_the_window() {
        let delimiters = DelimiterSet::new(["\n", "x\ny"]).unwrap();
        check_with_context(&delimiters, "a\nyb", 1, 0, "x");
        check_with_context(&delimiters, "ax\nyb\nc", 1, 1, "");
        check_with_context(&delimiters, "a\nyb\nc\nyd", 6, 0, "x");
    }

    #[test]
    fn test_context_sensitive_table_rejects_blind_replace() {
        let mut tracker = LineTracker::with_text(DelimiterSet::new(["::"]).unwrap(), "a:");
        assert!(matches!(
            tracker.replace(2, 0, ":"),
            Err(DocumentError::IllegalState(_))
        ));
        assert_eq!(tracker.text_length(), 2);
        assert_eq!(tracker.line_count(), 1);
    }

    #[test]
    fn test_line_queries() {
        let tracker = LineTracker::with_text(DelimiterSet::default(), "one\r\ntwo\nthree");
        assert_eq!(tracker.line_of_offset(4).unwrap(), 0);
        assert_eq!(tracker.line_of_offset(5).unwrap(), 1);
        assert_eq!(tracker.line_of_offset(14).unwrap(), 2);
        assert_eq!(
            tracker.line_information(0).unwrap(),
            LineInformation {
                offset: 0,
                length: 5,
                delimiter_length: 2
            }
        );
        assert_eq!(tracker.line_information_of_offset(7).unwrap().offset, 5);
        assert_eq!(tracker.line_length(2).unwrap(), 5);
        assert_eq!(tracker.lines_spanned(0, 0).unwrap(), 1);
        assert_eq!(tracker.lines_spanned(3, 3).unwrap(), 2);
        assert_eq!(tracker.lines_spanned(0, 14).unwrap(), 3);
        assert_eq!(tracker.count_line_breaks("a\r\nb\rc\n"), 3);
        assert!(tracker.line_information(3).is_err());
        assert!(tracker.lines_spanned(10, 5).is_err());
    }

    #[test]
    fn test_replace_rejects_bad_range() {
        let mut tracker = LineTracker::with_text(DelimiterSet::default(), "abc");
        assert!(tracker.replace(2, 2, "").is_err());
        assert_eq!(tracker.text_length(), 3);
    }
}
