//! Line scanning over partially known text.
//!
//! The tracker never stores the document text. For an incremental update it rebuilds
//! a window of lines from what it does know: the delimiters it recorded, the inserted
//! text, and the lengths of line contents it did not keep. Content is opaque; a
//! delimiter match never spans across it. Content close to the edit is fed as text
//! when the owner can supply it.

use super::LineRecord;
use crate::delimiters::DelimiterSet;
use std::borrow::Cow;

/// One piece of a rescan window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    /// `n` characters of line content that contain no delimiter.
    Opaque(usize),
    /// Text whose characters are known.
    Text(Cow<'a, str>),
}

/// Accumulates line records while pieces are fed in order.
pub(crate) struct LineScanner<'d> {
    delimiters: &'d DelimiterSet,
    records: Vec<LineRecord>,
    current: usize,
    run: String,
}

impl<'d> LineScanner<'d> {
    pub(crate) fn new(delimiters: &'d DelimiterSet) -> Self {
        Self {
            delimiters,
            records: Vec::new(),
            current: 0,
            run: String::new(),
        }
    }

    pub(crate) fn feed(&mut self, piece: &Piece<'_>) {
        match piece {
            Piece::Opaque(length) => {
                self.flush_run("");
                self.current += length;
            }
            Piece::Text(text) => self.run.push_str(text),
        }
    }

    /// Scan the pending known run; adjacent text pieces are scanned as one string so
    /// that delimiters straddling piece borders are found.
    ///
    /// `lookahead` is text following the run. It only decides between candidates
    /// starting inside the run; returns `true` if the chosen match reaches into it.
    fn flush_run(&mut self, lookahead: &str) -> bool {
        if self.run.is_empty() {
            return false;
        }
        let run_length = self.run.chars().count();
        let mut run = std::mem::take(&mut self.run);
        run.push_str(lookahead);
        let mut cursor = 0;
        for info in self.delimiters.matches(&run) {
            if info.offset >= run_length {
                break;
            }
            if info.offset + info.length > run_length {
                self.current += run_length - cursor;
                return true;
            }
            self.current += info.offset + info.length - cursor;
            self.records.push(LineRecord::delimited(
                self.current,
                info.index,
                info.length,
            ));
            self.current = 0;
            cursor = info.offset + info.length;
        }
        self.current += run_length - cursor;
        false
    }

    /// Finished (delimited) lines plus the length of the trailing, undelimited part.
    pub(crate) fn finish(mut self) -> (Vec<LineRecord>, usize) {
        self.flush_run("");
        (self.records, self.current)
    }

    /// Like [`finish`](Self::finish), with `lookahead` as the text right after the
    /// scanned pieces. The flag is set when a delimiter runs past the pieces, in
    /// which case the records are incomplete.
    pub(crate) fn finish_with_lookahead(mut self, lookahead: &str) -> (Vec<LineRecord>, usize, bool) {
        let crossed = self.flush_run(lookahead);
        (self.records, self.current, crossed)
    }
}

/// Lines of a complete text; the last line never has a delimiter.
pub(crate) fn scan_text(delimiters: &DelimiterSet, text: &str) -> Vec<LineRecord> {
    let mut scanner = LineScanner::new(delimiters);
    scanner.feed(&Piece::Text(Cow::Borrowed(text)));
    let (mut records, trailing) = scanner.finish();
    records.push(LineRecord::last(trailing));
    records
}

pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_text_literal() {
        let records = scan_text(&DelimiterSet::default(), "a\nbc\n");
        let lengths: Vec<_> = records.iter().map(|r| r.length).collect();
        assert_eq!(lengths, vec![2, 3, 0]);
        assert_eq!(records[2].delimiter, None);
    }

    #[test]
    fn test_adjacent_text_pieces_join() {
        let delimiters = DelimiterSet::default();
        let mut scanner = LineScanner::new(&delimiters);
        scanner.feed(&Piece::Opaque(3));
        scanner.feed(&Piece::Text(Cow::Borrowed("\r")));
        scanner.feed(&Piece::Text(Cow::Borrowed("\n")));
        scanner.feed(&Piece::Opaque(2));
        let (records, trailing) = scanner.finish();
        assert_eq!(records, vec![LineRecord::delimited(5, 2, 2)]);
        assert_eq!(trailing, 2);
    }

    #[test]
    fn test_opaque_content_breaks_runs() {
        let delimiters = DelimiterSet::default();
        let mut scanner = LineScanner::new(&delimiters);
        scanner.feed(&Piece::Text(Cow::Borrowed("\r")));
        scanner.feed(&Piece::Opaque(1));
        scanner.feed(&Piece::Text(Cow::Borrowed("\n")));
        let (records, trailing) = scanner.finish();
        assert_eq!(
            records,
            vec![LineRecord::delimited(1, 0, 1), LineRecord::delimited(2, 1, 1)]
        );
        assert_eq!(trailing, 0);
    }

    #[test]
    fn test_lookahead_picks_longer_delimiter() {
        let delimiters = DelimiterSet::new(["\n", "x\ny"]).unwrap();
        let mut scanner = LineScanner::new(&delimiters);
        scanner.feed(&Piece::Text(Cow::Borrowed("ax\n")));
        let (records, _, crossed) = scanner.finish_with_lookahead("yb");
        assert!(crossed);
        assert!(records.is_empty());

        let mut scanner = LineScanner::new(&delimiters);
        scanner.feed(&Piece::Text(Cow::Borrowed("ax\n")));
        let (records, trailing, crossed) = scanner.finish_with_lookahead("zz\n");
        assert!(!crossed);
        assert_eq!(records, vec![LineRecord::delimited(3, 0, 1)]);
        assert_eq!(trailing, 0);
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("\r\n", 1, 2), "\n");
        assert_eq!(char_slice("äbc", 0, 2), "äb");
    }
}
