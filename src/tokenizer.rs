use std::ops::Range;

use crate::grammars::CharClasses;

/// Appended to every line before scanning so a delimited run always has somewhere to stop
pub(crate) const LINE_TERMINATOR: char = '\n';

/// A candidate word found on a line, not classified yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Byte span within the scanned text (start inclusive, end exclusive, 0-based)
    pub span: Range<usize>,
    /// Next character after the word once ignored characters are skipped.
    /// `None` when the line ends first.
    pub lookahead: Option<char>,
}

/// Cuts one line into words according to the grammar's character classes.
///
/// Words come out lazily through [`Iterator`]. The matcher can move the cursor back with
/// [`WordScanner::rewind`] when it only consumed part of a word, so the rest gets scanned
/// again as fresh input.
#[derive(Debug, Clone)]
pub struct WordScanner<'c> {
    classes: &'c CharClasses,
    /// The line with its terminator
    text: String,
    pos: usize,
}

impl<'c> WordScanner<'c> {
    pub fn new(classes: &'c CharClasses, line: &str) -> Self {
        let mut text = String::with_capacity(line.len() + 1);
        text.push_str(line);
        text.push(LINE_TERMINATOR);
        Self {
            classes,
            text,
            pos: 0,
        }
    }

    /// The scanned text, terminator included. Word spans index into it.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the line without the terminator
    pub fn line_len(&self) -> usize {
        self.text.len() - LINE_TERMINATOR.len_utf8()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor back to `pos`, which has to be a char boundary inside the last word
    pub fn rewind(&mut self, pos: usize) {
        debug_assert!(pos <= self.pos && self.text.is_char_boundary(pos));
        self.pos = pos;
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text[pos..].chars().next()
    }

    /// Advances from `pos` while `pred` holds, returning where it stopped
    fn scan_while(&self, pos: usize, end: usize, pred: impl Fn(char) -> bool) -> usize {
        if pos >= end {
            return pos;
        }
        self.text[pos..end]
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map_or(end, |(idx, _)| pos + idx)
    }

    fn skip_ignored(&self, pos: usize) -> usize {
        self.scan_while(pos, self.line_len(), |c| self.classes.ignored.contains(c))
    }

    fn is_plain(&self, c: char) -> bool {
        !self.classes.separators.contains(c)
            && !self.classes.delimiters.contains(c)
            && !self.classes.ignored.contains(c)
    }
}

impl Iterator for WordScanner<'_> {
    type Item = Word;

    fn next(&mut self) -> Option<Word> {
        let line_len = self.line_len();
        let start = self.skip_ignored(self.pos);
        // The terminator never starts a word
        if start >= line_len {
            self.pos = self.text.len();
            return None;
        }

        let c = self.char_at(start)?;
        let end = if self.classes.separators.contains(c) {
            self.scan_while(start, line_len, |c| self.classes.separators.contains(c))
        } else if self.classes.delimiters.contains(c) {
            let after_open = start + c.len_utf8();
            // An unclosed delimiter runs to the end, terminator included
            self.text[after_open..]
                .find(c)
                .map_or(self.text.len(), |idx| after_open + idx + c.len_utf8())
        } else {
            self.scan_while(start, line_len, |c| self.is_plain(c))
        };
        self.pos = end;

        let next = self.skip_ignored(end);
        let lookahead = if next < line_len {
            self.char_at(next)
        } else {
            None
        };

        #[cfg(feature = "debug")]
        log::debug!(
            "[scan] word {:?} at {start}..{end}, lookahead {lookahead:?}",
            &self.text[start..end]
        );

        Some(Word {
            span: start..end,
            lookahead,
        })
    }
}
