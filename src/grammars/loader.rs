use std::collections::HashMap;
use std::fmt;

use crate::grammars::compiled::{CharClasses, CharSet, Grammar, Group, GroupId};
use crate::grammars::pattern::{MatchMode, Pattern};
use crate::grammars::raw::{RawElement, RawGrammar};
use crate::style::{Color, FontStyle, InvalidColor, Style};

const WORD_SEPARATORS: &str = "wordSeparators";
const WORD_DELIMITERS: &str = "wordDelimiters";
const IGNORED_CHARS: &str = "ignoredChars";
const HIGHLIGHT_ORDER: &str = "highlightOrder";
const GROUP: &str = "group";
const PATTERN: &str = "pattern";

const NAME: &str = "name";
const VALUE: &str = "value";
const CASE_SENSITIVE: &str = "caseSensitive";
const ITALIC: &str = "italic";
const BOLD: &str = "bold";
const UNDERLINE: &str = "underline";
const PARTIAL_MATCH: &str = "partialMatch";
const FOREGROUND_COLOR: &str = "foregroundColor";
const BACKGROUND_COLOR: &str = "backgroundColor";
const LOOKUP_CHAR: &str = "lookupChar";
const TYPE: &str = "type";
const IS_REGEX: &str = "isRegex";

/// Position of an element in the source: child indices from the root down
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Site(Vec<usize>);

impl Site {
    pub fn new(path: &[usize]) -> Self {
        Self(path.to_vec())
    }

    pub fn path(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for idx in &self.0 {
            write!(f, "/{idx}")?;
        }
        Ok(())
    }
}

/// Errors that can occur while loading a grammar. Any of them aborts the whole load.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LoadError {
    /// The same group name appears twice in the ordering containers
    RedeclaredGroup { group: String, site: Site },
    /// A declaration carries attributes besides its name, or has children
    InvalidGroupDeclaration { group: String, site: Site },
    /// A group with initial patterns is defined again
    DuplicateGroupDefinition { group: String, site: Site },
    /// A group is defined without an earlier declaration
    UndeclaredGroupDefinition { group: String, site: Site },
    /// A group definition without any pattern
    EmptyGroupDefinition { group: String, site: Site },
    /// A declared group never got initial patterns. The site is the declaration.
    DeclaredNotDefined { group: String, site: Site },
    InvalidPattern {
        group: String,
        pattern: String,
        reason: String,
        site: Site,
    },
    InvalidColor {
        group: String,
        color: InvalidColor,
        site: Site,
    },
    /// Anything structurally wrong: unknown elements, missing attributes...
    MalformedSource { reason: String, site: Site },
}

impl LoadError {
    /// The group the error is about, if any
    pub fn group(&self) -> Option<&str> {
        match self {
            LoadError::RedeclaredGroup { group, .. }
            | LoadError::InvalidGroupDeclaration { group, .. }
            | LoadError::DuplicateGroupDefinition { group, .. }
            | LoadError::UndeclaredGroupDefinition { group, .. }
            | LoadError::EmptyGroupDefinition { group, .. }
            | LoadError::DeclaredNotDefined { group, .. }
            | LoadError::InvalidPattern { group, .. }
            | LoadError::InvalidColor { group, .. } => Some(group),
            LoadError::MalformedSource { .. } => None,
        }
    }

    pub fn site(&self) -> &Site {
        match self {
            LoadError::RedeclaredGroup { site, .. }
            | LoadError::InvalidGroupDeclaration { site, .. }
            | LoadError::DuplicateGroupDefinition { site, .. }
            | LoadError::UndeclaredGroupDefinition { site, .. }
            | LoadError::EmptyGroupDefinition { site, .. }
            | LoadError::DeclaredNotDefined { site, .. }
            | LoadError::InvalidPattern { site, .. }
            | LoadError::InvalidColor { site, .. }
            | LoadError::MalformedSource { site, .. } => site,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::RedeclaredGroup { group, site } => {
                write!(f, "group '{group}' is declared more than once (at {site})")
            }
            LoadError::InvalidGroupDeclaration { group, site } => write!(
                f,
                "group '{group}' is defined inside '{HIGHLIGHT_ORDER}' (at {site}), \
                 declarations only take a name"
            ),
            LoadError::DuplicateGroupDefinition { group, site } => {
                write!(f, "group '{group}' is defined more than once (at {site})")
            }
            LoadError::UndeclaredGroupDefinition { group, site } => write!(
                f,
                "group '{group}' is defined (at {site}) without being declared \
                 first in '{HIGHLIGHT_ORDER}'"
            ),
            LoadError::EmptyGroupDefinition { group, site } => {
                write!(f, "group '{group}' is defined without patterns (at {site})")
            }
            LoadError::DeclaredNotDefined { group, site } => {
                write!(f, "group '{group}' is declared (at {site}) but never defined")
            }
            LoadError::InvalidPattern {
                group,
                pattern,
                reason,
                site,
            } => write!(
                f,
                "invalid pattern '{pattern}' in group '{group}' (at {site}): {reason}"
            ),
            LoadError::InvalidColor { group, color, site } => {
                write!(f, "group '{group}' (at {site}): {color}")
            }
            LoadError::MalformedSource { reason, site } => {
                write!(f, "malformed grammar source at {site}: {reason}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::InvalidColor { color, .. } => Some(color),
            _ => None,
        }
    }
}

fn malformed(reason: impl Into<String>, site: Site) -> LoadError {
    LoadError::MalformedSource {
        reason: reason.into(),
        site,
    }
}

fn required_attribute<'a>(
    element: &'a RawElement,
    attribute: &str,
    site: &Site,
) -> Result<&'a str, LoadError> {
    element.attribute(attribute).ok_or_else(|| {
        malformed(
            format!("'{}' is missing the '{attribute}' attribute", element.element),
            site.clone(),
        )
    })
}

/// Builds a [`Grammar`] out of a [`RawGrammar`] in two passes.
///
/// The first pass collects the group declarations of every `highlightOrder` container, which
/// fixes the matching order. The second pass walks the top-level elements in document order,
/// reading character classes and group definitions. A definition only counts as declared when
/// the container declaring it comes before it in the document.
#[derive(Debug, Default)]
pub(crate) struct GrammarLoader {
    classes: CharClasses,
    groups: Vec<Group>,
    group_id_by_name: HashMap<String, GroupId>,
    /// For each group: the top-level element index of its container and its full site
    declared_at: Vec<(usize, Site)>,
}

impl GrammarLoader {
    pub(crate) fn load(raw: &RawGrammar) -> Result<Grammar, LoadError> {
        let mut loader = Self::default();
        loader.collect_declarations(&raw.root)?;
        loader.read_definitions(&raw.root)?;
        loader.check_all_defined()?;

        #[cfg(feature = "debug")]
        log::debug!(
            "[load] grammar loaded with {} groups: {:?}",
            loader.groups.len(),
            loader.groups.iter().map(|g| &g.name).collect::<Vec<_>>()
        );

        Ok(Grammar {
            classes: loader.classes,
            groups: loader.groups,
            group_id_by_name: loader.group_id_by_name,
        })
    }

    fn collect_declarations(&mut self, root: &RawElement) -> Result<(), LoadError> {
        let containers = root
            .children
            .iter()
            .enumerate()
            .filter(|(_, el)| el.element == HIGHLIGHT_ORDER);

        for (idx, container) in containers {
            for (child_idx, declaration) in container.children.iter().enumerate() {
                let site = Site::new(&[idx, child_idx]);
                if declaration.element != GROUP {
                    return Err(malformed(
                        format!(
                            "'{HIGHLIGHT_ORDER}' can only contain '{GROUP}', found '{}'",
                            declaration.element
                        ),
                        site,
                    ));
                }
                let name = required_attribute(declaration, NAME, &site)?;

                if self.group_id_by_name.contains_key(name) {
                    return Err(LoadError::RedeclaredGroup {
                        group: name.to_string(),
                        site,
                    });
                }
                if declaration.attributes.len() > 1 || !declaration.children.is_empty() {
                    return Err(LoadError::InvalidGroupDeclaration {
                        group: name.to_string(),
                        site,
                    });
                }

                let id = u16::try_from(self.groups.len())
                    .map(GroupId)
                    .map_err(|_| malformed("too many groups", site.clone()))?;
                self.groups.push(Group::new(id, name));
                self.group_id_by_name.insert(name.to_string(), id);
                self.declared_at.push((idx, site));
            }
        }

        Ok(())
    }

    fn read_definitions(&mut self, root: &RawElement) -> Result<(), LoadError> {
        for (idx, element) in root.children.iter().enumerate() {
            let site = Site::new(&[idx]);
            match element.element.as_str() {
                WORD_SEPARATORS => {
                    self.classes.separators =
                        CharSet::new(required_attribute(element, VALUE, &site)?);
                }
                WORD_DELIMITERS => {
                    self.classes.delimiters =
                        CharSet::new(required_attribute(element, VALUE, &site)?);
                }
                IGNORED_CHARS => {
                    self.classes.ignored =
                        CharSet::new(required_attribute(element, VALUE, &site)?);
                }
                HIGHLIGHT_ORDER => {}
                GROUP => self.define_group(idx, element, site)?,
                other => return Err(malformed(format!("unknown element '{other}'"), site)),
            }
        }
        Ok(())
    }

    fn define_group(
        &mut self,
        idx: usize,
        element: &RawElement,
        site: Site,
    ) -> Result<(), LoadError> {
        let name = required_attribute(element, NAME, &site)?;
        let id = match self.group_id_by_name.get(name) {
            Some(id) if self.declared_at[id.as_index()].0 < idx => *id,
            _ => {
                return Err(LoadError::UndeclaredGroupDefinition {
                    group: name.to_string(),
                    site,
                });
            }
        };
        if !self.groups[id.as_index()].initial.is_empty() {
            return Err(LoadError::DuplicateGroupDefinition {
                group: name.to_string(),
                site,
            });
        }
        if element.children.is_empty() {
            return Err(LoadError::EmptyGroupDefinition {
                group: name.to_string(),
                site,
            });
        }

        let color = |attribute: &str| -> Result<Option<Color>, LoadError> {
            match element.attribute(attribute) {
                None | Some("") => Ok(None),
                Some(value) => Color::from_hex(value).map(Some).map_err(|color| {
                    LoadError::InvalidColor {
                        group: name.to_string(),
                        color,
                        site: site.clone(),
                    }
                }),
            }
        };
        let style = Style {
            foreground: color(FOREGROUND_COLOR)?,
            background: color(BACKGROUND_COLOR)?,
            font_style: FontStyle::empty()
                .with(FontStyle::BOLD, element.flag(BOLD))
                .with(FontStyle::ITALIC, element.flag(ITALIC))
                .with(FontStyle::UNDERLINE, element.flag(UNDERLINE)),
        };
        let case_sensitive = element.flag(CASE_SENSITIVE);
        let mode = if element.flag(PARTIAL_MATCH) {
            MatchMode::Partial
        } else {
            MatchMode::Exact
        };

        let mut initial = Vec::new();
        let mut final_ = Vec::new();
        for (child_idx, child) in element.children.iter().enumerate() {
            let site = Site::new(&[idx, child_idx]);
            if child.element != PATTERN {
                return Err(malformed(
                    format!("'{GROUP}' can only contain '{PATTERN}', found '{}'", child.element),
                    site,
                ));
            }
            let value = required_attribute(child, VALUE, &site)?;
            let pattern = if child.flag(IS_REGEX) {
                Pattern::regex(value, case_sensitive, mode).map_err(|e| LoadError::InvalidPattern {
                    group: name.to_string(),
                    pattern: value.to_string(),
                    reason: e.to_string(),
                    site: site.clone(),
                })?
            } else {
                Pattern::literal(value, case_sensitive, mode)
            };

            match child.attribute(TYPE).unwrap_or_default() {
                "" | "initial" => initial.push(pattern),
                "final" => final_.push(pattern),
                other => {
                    return Err(malformed(
                        format!("unknown pattern type '{other}', expected 'initial' or 'final'"),
                        site,
                    ));
                }
            }
        }

        let group = &mut self.groups[id.as_index()];
        group.style = style;
        group.case_sensitive = case_sensitive;
        group.mode = mode;
        group.lookahead = element.attribute(LOOKUP_CHAR).and_then(|s| s.chars().next());
        group.initial = initial;
        group.final_.extend(final_);

        Ok(())
    }

    fn check_all_defined(&self) -> Result<(), LoadError> {
        match self.groups.iter().find(|g| g.initial.is_empty()) {
            Some(group) => Err(LoadError::DeclaredNotDefined {
                group: group.name.clone(),
                site: self.declared_at[group.id.as_index()].1.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Grammar {
    /// Validates and compiles a grammar source
    pub fn load(raw: &RawGrammar) -> Result<Grammar, LoadError> {
        GrammarLoader::load(raw)
    }
}
