use std::fmt;
use std::sync::Arc;

use onig::{RegexOptions, Syntax};

/// A compiled oniguruma regex that remembers the pattern it was built from.
///
/// Unlike a lazily compiled regex, this one is compiled when the grammar is loaded so a bad
/// pattern fails the load instead of silently never matching.
pub struct Regex {
    pattern: String,
    compiled: Arc<onig::Regex>,
}

impl Clone for Regex {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            compiled: Arc::clone(&self.compiled),
        }
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

impl Regex {
    /// Compiles `pattern`. When `whole_word` is set the pattern has to cover the entire input,
    /// otherwise it can match anywhere in it.
    pub fn new(pattern: &str, case_sensitive: bool, whole_word: bool) -> Result<Self, onig::Error> {
        let options = if case_sensitive {
            RegexOptions::REGEX_OPTION_NONE
        } else {
            RegexOptions::REGEX_OPTION_IGNORECASE
        };
        let source = if whole_word {
            format!(r"\A(?:{pattern})\z")
        } else {
            pattern.to_string()
        };
        let compiled = onig::Regex::with_options(&source, options, Syntax::default())?;

        Ok(Self {
            pattern: pattern.to_string(),
            compiled: Arc::new(compiled),
        })
    }

    /// The pattern as written in the grammar, without any anchoring we added
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Byte range of the first match in `text`
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.compiled.find(text)
    }
}
