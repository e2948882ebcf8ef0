mod error;
mod grammars;
mod highlighter;
mod matcher;
mod policy;
mod spans;
mod style;
mod tokenizer;

pub use error::Error;
pub use grammars::{
    AttributeValue, CharClasses, CharSet, Grammar, Group, GroupId, LoadError, MatchMode, Pattern,
    PatternMatch, RawElement, RawGrammar, Regex, Site,
};
pub use highlighter::{Highlighter, LoadState, Token};
pub use matcher::{GroupMatcher, WordMatch};
pub use policy::{BlockInfo, RehighlightPolicy, RehighlightState, TextChange};
pub use spans::{MultiLineSpan, SpanId, SpanTracker};
pub use style::{Color, FontStyle, InvalidColor, Style};
pub use tokenizer::{Word, WordScanner};
