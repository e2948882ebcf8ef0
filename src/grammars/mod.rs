mod compiled;
mod loader;
mod pattern;
mod raw;
mod regex;

pub use compiled::*;
pub use loader::{LoadError, Site};
pub use pattern::{MatchMode, Pattern, PatternMatch};
pub use raw::{AttributeValue, RawElement, RawGrammar};
pub use regex::Regex;
