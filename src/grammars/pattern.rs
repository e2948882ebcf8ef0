use crate::grammars::regex::Regex;

/// Whether a pattern has to cover the whole word or can match inside it.
/// Set per group by its `partialMatch` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Partial,
}

/// Where a pattern matched, relative to the start of the word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    pub offset: usize,
    pub len: usize,
}

impl PatternMatch {
    /// Offset just past the matched region
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// A single initial or final pattern of a group.
///
/// Both variants answer the same question through [`Pattern::matches`]: where in a word does
/// this pattern match, if at all.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal {
        text: String,
        case_sensitive: bool,
        mode: MatchMode,
    },
    Regex {
        regex: Regex,
        case_sensitive: bool,
        mode: MatchMode,
    },
}

impl Pattern {
    pub fn literal(text: &str, case_sensitive: bool, mode: MatchMode) -> Self {
        Pattern::Literal {
            text: text.to_string(),
            case_sensitive,
            mode,
        }
    }

    pub fn regex(
        pattern: &str,
        case_sensitive: bool,
        mode: MatchMode,
    ) -> Result<Self, onig::Error> {
        let regex = Regex::new(pattern, case_sensitive, mode == MatchMode::Exact)?;
        Ok(Pattern::Regex {
            regex,
            case_sensitive,
            mode,
        })
    }

    /// The pattern text as written in the grammar
    pub fn source(&self) -> &str {
        match self {
            Pattern::Literal { text, .. } => text,
            Pattern::Regex { regex, .. } => regex.pattern(),
        }
    }

    pub fn mode(&self) -> MatchMode {
        match self {
            Pattern::Literal { mode, .. } | Pattern::Regex { mode, .. } => *mode,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        match self {
            Pattern::Literal { case_sensitive, .. } | Pattern::Regex { case_sensitive, .. } => {
                *case_sensitive
            }
        }
    }

    /// Matches the pattern against `word`.
    ///
    /// In exact mode the match always covers the whole word. In partial mode it is the first
    /// occurrence inside it. Empty matches are never reported.
    pub fn matches(&self, word: &str) -> Option<PatternMatch> {
        let (start, end) = match self {
            Pattern::Literal {
                text,
                case_sensitive,
                mode,
            } => match (mode, case_sensitive) {
                (MatchMode::Exact, true) => (text == word).then_some((0, word.len()))?,
                (MatchMode::Exact, false) => {
                    (prefix_len_ignore_case(word, text)? == word.len()).then_some((0, word.len()))?
                }
                (MatchMode::Partial, true) => {
                    let start = word.find(text.as_str())?;
                    (start, start + text.len())
                }
                (MatchMode::Partial, false) => find_ignore_case(word, text)?,
            },
            Pattern::Regex { regex, .. } => regex.find(word)?,
        };

        if start == end {
            return None;
        }
        Some(PatternMatch {
            offset: start,
            len: end - start,
        })
    }
}

#[inline]
fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte length of the prefix of `haystack` equal to `needle` ignoring case
fn prefix_len_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let mut hay_chars = haystack.char_indices();
    for n in needle.chars() {
        let (_, h) = hay_chars.next()?;
        if !chars_eq_ignore_case(h, n) {
            return None;
        }
    }
    Some(hay_chars.next().map_or(haystack.len(), |(idx, _)| idx))
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    haystack.char_indices().find_map(|(start, _)| {
        prefix_len_ignore_case(&haystack[start..], needle).map(|len| (start, start + len))
    })
}
