use std::collections::HashMap;
use std::ops::Deref;

use crate::grammars::pattern::{MatchMode, Pattern, PatternMatch};
use crate::style::Style;

/// Index of a group in [`Grammar::groups`], which is also its matching priority
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u16);

impl Deref for GroupId {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl GroupId {
    #[inline]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// A set of characters declared in the grammar, e.g. the word separators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet(Vec<char>);

impl CharSet {
    pub fn new(chars: &str) -> Self {
        let mut chars: Vec<char> = chars.chars().collect();
        chars.sort_unstable();
        chars.dedup();
        Self(chars)
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.0.binary_search(&c).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The three character classes driving how a line is cut into words
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharClasses {
    /// Consecutive separators form a single word, e.g. `+=`
    pub separators: CharSet,
    /// A delimiter opens a word that runs until the same character shows up again
    pub delimiters: CharSet,
    /// Skipped between words, never part of one unless inside delimiters
    pub ignored: CharSet,
}

/// A named token category: its patterns, how they apply and how to render matches
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Patterns that identify the group, or open it for multi-line groups
    pub initial: Vec<Pattern>,
    /// Patterns closing a multi-line span of this group
    pub final_: Vec<Pattern>,
    pub mode: MatchMode,
    /// The next significant character after the word must be this one
    pub lookahead: Option<char>,
    pub case_sensitive: bool,
    pub style: Style,
}

impl Group {
    pub(crate) fn new(id: GroupId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            initial: Vec::new(),
            final_: Vec::new(),
            mode: MatchMode::Exact,
            lookahead: None,
            case_sensitive: false,
            style: Style::default(),
        }
    }

    /// A group with final patterns can span several lines
    #[inline]
    pub fn is_multiline(&self) -> bool {
        !self.final_.is_empty()
    }

    pub fn match_initial(&self, word: &str, lookahead: Option<char>) -> Option<PatternMatch> {
        self.first_match(&self.initial, word, lookahead)
    }

    pub fn match_final(&self, word: &str, lookahead: Option<char>) -> Option<PatternMatch> {
        self.first_match(&self.final_, word, lookahead)
    }

    fn first_match(
        &self,
        patterns: &[Pattern],
        word: &str,
        lookahead: Option<char>,
    ) -> Option<PatternMatch> {
        if self.lookahead.is_some() && self.lookahead != lookahead {
            return None;
        }
        patterns.iter().find_map(|p| p.matches(word))
    }
}

/// A loaded rule set. Immutable once built by the loader and cheap to share behind an `Arc`
/// between documents.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub(crate) classes: CharClasses,
    /// In matching priority order
    pub(crate) groups: Vec<Group>,
    pub(crate) group_id_by_name: HashMap<String, GroupId>,
}

impl Grammar {
    pub fn classes(&self) -> &CharClasses {
        &self.classes
    }

    /// All groups, in the order they are tried
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.as_index()]
    }

    pub fn group_id(&self, name: &str) -> Option<GroupId> {
        self.group_id_by_name.get(name).copied()
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.group_id(name).map(|id| self.group(id))
    }

    /// Group names in matching priority order
    pub fn group_order(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }
}
