use crate::grammars::{Grammar, GroupId};
use crate::spans::SpanTracker;

/// The outcome of classifying a word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordMatch {
    pub group: GroupId,
    /// Styled region, relative to the word start
    pub offset: usize,
    pub len: usize,
}

impl WordMatch {
    /// Where the matched region ends, relative to the word start.
    /// Anything in the word past it should be scanned again.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Decides which group a word belongs to, opening and closing multi-line spans on the way.
#[derive(Debug, Clone, Copy)]
pub struct GroupMatcher<'g> {
    grammar: &'g Grammar,
}

impl<'g> GroupMatcher<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Classifies `word`, found at column `start` of `block`.
    ///
    /// Inside a multi-line span only the final patterns of that span's group are tried: a
    /// match closes the span, otherwise the whole word still belongs to the group. Outside of
    /// any span, groups are tried in priority order and the first one with a matching initial
    /// pattern wins, opening a span if it is a multi-line group.
    pub fn classify(
        &self,
        word: &str,
        start: usize,
        lookahead: Option<char>,
        block: usize,
        spans: &mut SpanTracker,
    ) -> Option<WordMatch> {
        if word.is_empty() {
            return None;
        }

        if let Some(span_id) = spans.enclosing(block, start, start) {
            let group_id = spans.get(span_id)?.group;
            let group = self.grammar.group(group_id);

            return match group.match_final(word, lookahead) {
                Some(m) => {
                    spans.close(span_id, block, start + m.end() - 1);
                    #[cfg(feature = "debug")]
                    log::debug!(
                        "[classify] '{}' closed span {span_id:?} at {block}:{}",
                        group.name,
                        start + m.end() - 1
                    );
                    Some(WordMatch {
                        group: group_id,
                        offset: 0,
                        len: m.end(),
                    })
                }
                None => Some(WordMatch {
                    group: group_id,
                    offset: 0,
                    len: word.len(),
                }),
            };
        }

        let (group, m) = self
            .grammar
            .groups()
            .iter()
            .find_map(|group| group.match_initial(word, lookahead).map(|m| (group, m)))?;

        if group.is_multiline() {
            let _span_id = spans.open(group.id, block, start + m.end());
            #[cfg(feature = "debug")]
            log::debug!(
                "[classify] '{}' opened span {_span_id:?} at {block}:{}",
                group.name,
                start + m.end()
            );
        }

        Some(WordMatch {
            group: group.id,
            offset: m.offset,
            len: m.len,
        })
    }
}
