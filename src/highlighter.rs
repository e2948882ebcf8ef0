use std::ops::Range;
use std::sync::Arc;

use crate::error::OcraResult;
use crate::grammars::{Grammar, GroupId, LoadError, RawGrammar};
use crate::matcher::GroupMatcher;
use crate::policy::{RehighlightPolicy, RehighlightState, TextChange};
use crate::spans::SpanTracker;
use crate::style::Style;
use crate::tokenizer::WordScanner;

/// A classified run of text on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub group: GroupId,
    /// Byte span within the line (start inclusive, end exclusive, 0-based)
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loaded(Arc<Grammar>),
    /// The last load attempt failed, nothing is loaded
    LoadFailed,
}

/// Highlights one document, line by line.
///
/// The grammar is shared and read-only, the spans and per-line bookkeeping belong to this
/// document only. Every method takes `&mut self` when it can touch them so the host has to
/// serialize edits and tokenizing on its own.
#[derive(Debug, Default)]
pub struct Highlighter {
    state: LoadState,
    spans: SpanTracker,
    policy: RehighlightPolicy,
}

impl Highlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A highlighter using an already loaded grammar, typically shared with other documents
    pub fn with_grammar(grammar: Arc<Grammar>) -> Self {
        Self {
            state: LoadState::Loaded(grammar),
            ..Default::default()
        }
    }

    /// Replaces the current grammar with the one described by `raw`.
    ///
    /// The previous grammar and all spans are dropped first, even if loading fails.
    pub fn load_grammar(&mut self, raw: &RawGrammar) -> Result<(), LoadError> {
        self.clear();
        match Grammar::load(raw) {
            Ok(grammar) => {
                self.state = LoadState::Loaded(Arc::new(grammar));
                Ok(())
            }
            Err(err) => {
                #[cfg(feature = "debug")]
                log::debug!("[load_grammar] failed: {err}");
                self.state = LoadState::LoadFailed;
                Err(err)
            }
        }
    }

    /// Same as [`Highlighter::load_grammar`] but reads the source from JSON first
    pub fn load_grammar_json(&mut self, json: &str) -> OcraResult<()> {
        let raw = RawGrammar::from_json_str(json).inspect_err(|_| {
            self.clear();
            self.state = LoadState::LoadFailed;
        })?;
        Ok(self.load_grammar(&raw)?)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn grammar(&self) -> Option<&Arc<Grammar>> {
        match &self.state {
            LoadState::Loaded(grammar) => Some(grammar),
            _ => None,
        }
    }

    /// Unloads the grammar and forgets everything known about the document
    pub fn clear(&mut self) {
        self.state = LoadState::Unloaded;
        self.spans.clear();
        self.policy.clear();
    }

    pub fn spans(&self) -> &SpanTracker {
        &self.spans
    }

    pub fn rehighlight_state(&self) -> RehighlightState {
        self.policy.state()
    }

    pub fn style_of(&self, group: GroupId) -> Option<&Style> {
        self.grammar()
            .and_then(|g| g.groups().get(group.as_index()))
            .map(|g| &g.style)
    }

    pub fn group_name(&self, group: GroupId) -> Option<&str> {
        self.grammar()
            .and_then(|g| g.groups().get(group.as_index()))
            .map(|g| g.name.as_str())
    }

    /// Tokenizes line `block` of the document.
    ///
    /// Spans previously opened on that line are dropped first, so calling this again on the
    /// same text gives the same result. Returns nothing without a grammar.
    pub fn tokenize_line(&mut self, block: usize, text: &str) -> Vec<Token> {
        let Some(grammar) = self.grammar().cloned() else {
            return Vec::new();
        };
        self.spans.purge_block(block);

        let mut tokens = Vec::new();
        if !text.is_empty() {
            let matcher = GroupMatcher::new(&grammar);
            let mut scanner = WordScanner::new(grammar.classes(), text);
            let line_len = scanner.line_len();

            while let Some(word) = scanner.next() {
                let word_text = &scanner.text()[word.span.clone()];
                let Some(m) = matcher.classify(
                    word_text,
                    word.span.start,
                    word.lookahead,
                    block,
                    &mut self.spans,
                ) else {
                    continue;
                };

                let start = word.span.start + m.offset;
                let end = (start + m.len).min(line_len);
                if start < end {
                    tokens.push(Token {
                        group: m.group,
                        span: start..end,
                    });
                }
                if m.end() < word.span.len() {
                    scanner.rewind(word.span.start + m.end());
                }
            }
        }

        self.policy
            .record_pass(block, self.spans.count_in_block(block));
        tokens
    }

    /// To call after an edit of line `block`, once it has been tokenized again.
    /// Returns true when the whole document has to go through [`Highlighter::rehighlight`].
    pub fn on_text_changed(&mut self, block: usize, removed: usize, inserted: usize) -> bool {
        let change = TextChange {
            block,
            removed,
            inserted,
        };
        self.policy
            .on_text_changed(change, self.spans.count_in_block(block))
    }

    /// Drops every span and tokenizes all `lines` from the top
    pub fn rehighlight<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> Vec<Vec<Token>> {
        self.spans.clear();
        self.policy.start_full_rehighlight();
        let tokens = lines
            .into_iter()
            .enumerate()
            .map(|(block, line)| self.tokenize_line(block, line))
            .collect();
        self.policy.finish_full_rehighlight();
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::grammars::RawElement;
    use crate::style::FontStyle;

    const GRAMMAR: &str = r##"{
      "element": "highlight",
      "children": [
        { "element": "wordSeparators", "attributes": { "value": "+-*/=<>(),;" } },
        { "element": "wordDelimiters", "attributes": { "value": "'" } },
        { "element": "ignoredChars", "attributes": { "value": " \t" } },
        { "element": "highlightOrder", "children": [
          { "element": "group", "attributes": { "name": "comment" } },
          { "element": "group", "attributes": { "name": "string" } },
          { "element": "group", "attributes": { "name": "kw" } },
          { "element": "group", "attributes": { "name": "func" } },
          { "element": "group", "attributes": { "name": "ident" } }
        ] },
        { "element": "group",
          "attributes": {
            "name": "comment", "partialMatch": true, "italic": true, "foregroundColor": "#888888"
          },
          "children": [
            { "element": "pattern", "attributes": { "value": "/*" } },
            { "element": "pattern", "attributes": { "type": "final", "value": "*/" } }
          ] },
        { "element": "group", "attributes": { "name": "string" },
          "children": [
            { "element": "pattern", "attributes": { "isRegex": true, "value": "'[^']*'" } }
          ] },
        { "element": "group", "attributes": { "name": "kw", "bold": true },
          "children": [
            { "element": "pattern", "attributes": { "value": "select" } },
            { "element": "pattern", "attributes": { "value": "from" } },
            { "element": "pattern", "attributes": { "value": "where" } }
          ] },
        { "element": "group", "attributes": { "name": "func", "lookupChar": "(" },
          "children": [
            { "element": "pattern", "attributes": { "isRegex": true, "value": "[a-z_]+" } }
          ] },
        { "element": "group",
          "attributes": { "name": "ident", "partialMatch": true, "caseSensitive": true },
          "children": [
            { "element": "pattern", "attributes": { "isRegex": true, "value": "[a-z]+" } }
          ] }
      ]
    }"##;

    fn highlighter() -> Highlighter {
        let mut highlighter = Highlighter::new();
        highlighter.load_grammar_json(GRAMMAR).unwrap();
        highlighter
    }

    fn dump(highlighter: &Highlighter, line: &str, tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|t| {
                format!(
                    "{} {}..{} '{}'",
                    highlighter.group_name(t.group).unwrap(),
                    t.span.start,
                    t.span.end,
                    &line[t.span.clone()]
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn can_tokenize_a_line() {
        let mut highlighter = highlighter();
        let line = "SELECT count(x) FROM t WHERE a = 'b' /* c */;";
        let tokens = highlighter.tokenize_line(0, line);
        insta::assert_snapshot!(dump(&highlighter, line, &tokens), @r"
        kw 0..6 'SELECT'
        func 7..12 'count'
        ident 13..14 'x'
        kw 16..20 'FROM'
        ident 21..22 't'
        kw 23..28 'WHERE'
        ident 29..30 'a'
        string 33..36 ''b''
        comment 37..39 '/*'
        comment 40..41 'c'
        comment 42..44 '*/'
        ");
        // opened and closed on the same line
        let (_, span) = highlighter.spans().iter().next().unwrap();
        assert_eq!((span.start_col, span.end), (39, Some((0, 43))));
    }

    #[test]
    fn group_order_decides() {
        let mut highlighter = highlighter();
        let tokens = highlighter.tokenize_line(0, "SELECT");
        let kw = highlighter.grammar().unwrap().group_id("kw").unwrap();
        assert_eq!(tokens, vec![Token { group: kw, span: 0..6 }]);
        assert!(
            highlighter
                .style_of(kw)
                .unwrap()
                .font_style
                .contains(FontStyle::BOLD)
        );
    }

    #[test]
    fn colors_survive_the_json_source() {
        let highlighter = highlighter();
        let comment = highlighter.grammar().unwrap().group_id("comment").unwrap();
        let style = highlighter.style_of(comment).unwrap();
        assert_eq!(style.foreground, Some(crate::Color::new(0x88, 0x88, 0x88)));
        assert!(style.font_style.contains(FontStyle::ITALIC));
    }

    #[test]
    fn lookahead_must_match() {
        let mut highlighter = highlighter();
        let grammar = highlighter.grammar().unwrap().clone();
        let func = grammar.group_id("func").unwrap();
        let ident = grammar.group_id("ident").unwrap();

        let tokens = highlighter.tokenize_line(0, "count  (");
        assert_eq!(tokens[0].group, func);
        let tokens = highlighter.tokenize_line(0, "count + 1");
        assert_eq!(tokens[0].group, ident);
        let tokens = highlighter.tokenize_line(0, "count");
        assert_eq!(tokens[0].group, ident);
    }

    #[test]
    fn partial_match_realigns_the_rest_of_the_word() {
        let mut highlighter = highlighter();
        let line = "9abc1de";
        let tokens = highlighter.tokenize_line(0, line);
        insta::assert_snapshot!(dump(&highlighter, line, &tokens), @r"
        ident 1..4 'abc'
        ident 5..7 'de'
        ");
    }

    #[test]
    fn multiline_span_lifecycle() {
        let mut highlighter = highlighter();
        let comment = highlighter.grammar().unwrap().group_id("comment").unwrap();

        let line0 = highlighter.tokenize_line(0, "/* start");
        assert_eq!(
            line0,
            vec![
                Token { group: comment, span: 0..2 },
                Token { group: comment, span: 3..8 },
            ]
        );
        let (id, span) = highlighter.spans().iter().next().unwrap();
        assert_eq!((span.start_block, span.start_col, span.end), (0, 2, None));

        let line1 = highlighter.tokenize_line(1, "end */");
        assert_eq!(
            line1,
            vec![
                Token { group: comment, span: 0..3 },
                Token { group: comment, span: 4..6 },
            ]
        );
        let span = highlighter.spans().get(id).unwrap();
        assert_eq!(span.end, Some((1, 5)));

        let spans = highlighter.spans();
        assert_eq!(spans.enclosing(0, 2, 2), Some(id));
        assert_eq!(spans.enclosing(0, 7, 7), Some(id));
        assert_eq!(spans.enclosing(1, 0, 5), Some(id));
        assert_eq!(spans.enclosing(1, 6, 6), None);
        assert_eq!(spans.enclosing(2, 0, 0), None);
    }

    #[test]
    fn retokenizing_is_idempotent() {
        let mut highlighter = highlighter();
        let line = "x /* a */ y /* b";
        let first = highlighter.tokenize_line(3, line);
        let count = highlighter.spans().count_in_block(3);
        let second = highlighter.tokenize_line(3, line);

        assert_eq!(first, second);
        assert_eq!(count, 2);
        assert_eq!(highlighter.spans().count_in_block(3), count);
        assert_eq!(highlighter.spans().len(), 2);
    }

    #[test]
    fn tokens_never_cover_the_terminator() {
        let mut highlighter = highlighter();
        let tokens = highlighter.tokenize_line(0, "/* 'open");
        assert_eq!(tokens.last().unwrap().span, 3..8);

        // an unterminated string is not a string, and the rest after `open` is only the terminator
        let line = "'open";
        let tokens = highlighter.tokenize_line(0, line);
        assert!(highlighter.spans().is_empty());
        insta::assert_snapshot!(dump(&highlighter, line, &tokens), @"ident 1..5 'open'");
    }

    #[test]
    fn rehighlight_rebuilds_spans_across_empty_lines() {
        let mut highlighter = highlighter();
        highlighter.tokenize_line(7, "/* stale");

        let lines = ["select /* a", "", "b */ from"];
        let tokens = highlighter.rehighlight(lines);
        assert_eq!(tokens.len(), 3);
        assert!(tokens[1].is_empty());
        let text = dump(&highlighter, lines[2], &tokens[2]);
        insta::assert_snapshot!(text, @r"
        comment 0..1 'b'
        comment 2..4 '*/'
        kw 5..9 'from'
        ");

        assert_eq!(highlighter.spans().len(), 1);
        assert_eq!(highlighter.spans().count_in_block(7), 0);
        let (_, span) = highlighter.spans().iter().next().unwrap();
        assert_eq!(span.end, Some((2, 3)));
    }

    #[test]
    fn edits_trigger_full_rehighlight() {
        let mut highlighter = highlighter();
        highlighter.tokenize_line(0, "select /* a");
        highlighter.tokenize_line(0, "select /* a");
        assert!(!highlighter.on_text_changed(0, 0, 0));
        assert_eq!(highlighter.rehighlight_state(), RehighlightState::Stable);

        highlighter.tokenize_line(0, "select /* ab");
        assert!(highlighter.on_text_changed(0, 0, 1));
        assert_eq!(
            highlighter.rehighlight_state(),
            RehighlightState::NeedsFullRehighlight
        );
        highlighter.rehighlight(["select /* ab"]);
        assert_eq!(highlighter.rehighlight_state(), RehighlightState::Stable);

        // closing the comment without touching the char counts still changes the span count
        highlighter.tokenize_line(0, "select");
        assert!(highlighter.on_text_changed(0, 0, 0));
    }

    #[test]
    fn failed_load_leaves_nothing_loaded() {
        let mut highlighter = highlighter();
        highlighter.tokenize_line(0, "/* a");
        assert!(highlighter.is_loaded());

        let err = highlighter
            .load_grammar_json(
                r#"{"element": "highlight", "children": [
                    { "element": "highlightOrder", "children": [
                      { "element": "group", "attributes": { "name": "x" } } ] } ] }"#,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Load(LoadError::DeclaredNotDefined { .. })
        ));
        assert!(!highlighter.is_loaded());
        assert!(matches!(highlighter.load_state(), LoadState::LoadFailed));
        assert!(highlighter.spans().is_empty());
        assert!(highlighter.tokenize_line(0, "select").is_empty());

        assert!(matches!(
            highlighter.load_grammar_json("{"),
            Err(Error::Json(_))
        ));
        assert!(!highlighter.is_loaded());
    }

    #[test]
    fn bundled_sql_grammar_works() {
        let raw = RawGrammar::load_from_file("grammars/sql.json").unwrap();
        let mut highlighter = Highlighter::new();
        highlighter.load_grammar(&raw).unwrap();

        let line = "select count(*) from t where a <> 'x';";
        let tokens = highlighter.tokenize_line(0, line);
        insta::assert_snapshot!(dump(&highlighter, line, &tokens), @r"
        keyword 0..6 'select'
        function 7..12 'count'
        operator 13..14 '*'
        keyword 16..20 'from'
        keyword 23..28 'where'
        operator 31..33 '<>'
        string 34..37 ''x''
        ");
    }

    /// A `begin ... end` block that only opens and closes right before a `;`
    fn block_highlighter() -> Highlighter {
        let pattern = |value: &str| RawElement::new("pattern").attr("value", value);
        let raw = RawGrammar::new(
            RawElement::new("highlight")
                .child(RawElement::new("wordSeparators").attr("value", ";("))
                .child(RawElement::new("ignoredChars").attr("value", " "))
                .child(
                    RawElement::new("highlightOrder")
                        .child(RawElement::new("group").attr("name", "block")),
                )
                .child(
                    RawElement::new("group")
                        .attr("name", "block")
                        .attr("lookupChar", ";")
                        .child(pattern("begin"))
                        .child(pattern("end").attr("type", "final")),
                ),
        );
        let mut highlighter = Highlighter::new();
        highlighter.load_grammar(&raw).unwrap();
        highlighter
    }

    #[test]
    fn exact_final_pattern_honors_lookahead() {
        let mut highlighter = block_highlighter();
        let block = highlighter.grammar().unwrap().group_id("block").unwrap();

        let tokens = highlighter.tokenize_line(0, "begin;");
        assert_eq!(
            tokens,
            vec![
                Token { group: block, span: 0..5 },
                Token { group: block, span: 5..6 },
            ]
        );
        let (id, span) = highlighter.spans().iter().next().unwrap();
        assert_eq!((span.start_col, span.end), (5, None));

        // `end` not followed by `;` does not close the block
        let tokens = highlighter.tokenize_line(1, "x end (");
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| t.group == block));
        assert!(highlighter.spans().get(id).unwrap().is_open());

        // neither does a word merely containing `end`
        highlighter.tokenize_line(2, "endless;");
        assert!(highlighter.spans().get(id).unwrap().is_open());

        let tokens = highlighter.tokenize_line(2, "x end;");
        assert_eq!(
            tokens,
            vec![
                Token { group: block, span: 0..1 },
                Token { group: block, span: 2..5 },
            ]
        );
        assert_eq!(highlighter.spans().get(id).unwrap().end, Some((2, 4)));
    }

    #[test]
    fn empty_line_drops_the_spans_it_started() {
        let mut highlighter = block_highlighter();
        // a block opened on line 5 does not cover line 0
        highlighter.tokenize_line(5, "begin;");
        highlighter.tokenize_line(0, "begin;");
        assert_eq!(highlighter.spans().count_in_block(0), 1);
        assert_eq!(highlighter.spans().count_in_block(5), 1);

        assert!(highlighter.tokenize_line(0, "").is_empty());
        assert_eq!(highlighter.spans().count_in_block(0), 0);
        assert_eq!(highlighter.spans().count_in_block(5), 1);
        assert_eq!(highlighter.spans().len(), 1);
        // the empty pass is recorded: the line went from one span to none
        assert!(highlighter.on_text_changed(0, 0, 0));
    }

    #[test]
    fn grammar_can_be_shared() {
        let grammar = highlighter().grammar().unwrap().clone();
        let mut a = Highlighter::with_grammar(grammar.clone());
        let mut b = Highlighter::with_grammar(grammar);
        a.tokenize_line(0, "/* a");
        assert_eq!(a.spans().len(), 1);
        assert!(b.spans().is_empty());
        assert_eq!(b.tokenize_line(0, "from").len(), 1);

        a.clear();
        assert!(!a.is_loaded());
        assert!(a.tokenize_line(0, "from").is_empty());
    }
}
