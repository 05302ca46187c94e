//! Pluggable phone number grammars.
//!
//! A [`ParserUnit`] finds [`MatchSpan`]s in a string and judges whether a
//! neighbouring element means the number is already interactive. Units are
//! registered in a [`ParserRegistry`] as factories; the annotator instantiates
//! every registered unit afresh for each text node it looks at, so the
//! registry can change while the engine runs.

mod dutch;

pub use dutch::DutchParser;

use crate::dom::ElementRef;

/// A phone number found in one text snapshot.
///
/// `[start, end)` is a byte range into the string handed to
/// [`ParserUnit::parse`]; `number` is the normalized number to dial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub number: String,
}

impl MatchSpan {
    pub fn new(start: usize, end: usize, number: impl Into<String>) -> Self {
        Self {
            start,
            end,
            number: number.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &MatchSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Parser failed: {0}")]
    Failed(String),
}

/// One number grammar.
///
/// Implementations must be pure: the same input always yields the same spans,
/// and spans returned from one call never overlap each other.
pub trait ParserUnit {
    fn parse(&self, text: &str) -> Result<Vec<MatchSpan>, ParseError>;

    /// Whether `element`, sitting right before the text being annotated,
    /// suppresses this unit's matches.
    fn is_blocking_node(&self, element: ElementRef<'_>) -> bool;
}

pub type ParserFactory = Box<dyn Fn() -> Box<dyn ParserUnit>>;

pub struct ParserEntry {
    pub name: String,
    factory: ParserFactory,
}

impl ParserEntry {
    pub fn instantiate(&self) -> Box<dyn ParserUnit> {
        (self.factory)()
    }
}

impl std::fmt::Debug for ParserEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of parser factories.
#[derive(Debug, Default)]
pub struct ParserRegistry {
    entries: Vec<ParserEntry>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the grammars built into this crate, keyed by locale.
    /// Unknown locales are skipped.
    pub fn with_locales<S: AsRef<str>>(locales: &[S]) -> Self {
        let mut registry = Self::new();
        for locale in locales {
            match locale.as_ref() {
                "nl" => registry.register("nl", || Box::new(DutchParser::new())),
                other => log::warn!("No built-in phone number parser for locale {other:?}"),
            }
        }
        registry
    }

    /// Append a unit; a unit already registered under `name` is replaced in place.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn ParserUnit> + 'static,
    {
        let entry = ParserEntry {
            name: name.to_string(),
            factory: Box::new(factory),
        };
        match self.entries.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.name != name);
        self.entries.len() != before
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParserEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Nothing;

    impl ParserUnit for Nothing {
        fn parse(&self, _text: &str) -> Result<Vec<MatchSpan>, ParseError> {
            Ok(Vec::new())
        }

        fn is_blocking_node(&self, _element: ElementRef<'_>) -> bool {
            false
        }
    }

    #[test]
    fn test_register_keeps_order_and_replaces_by_name() {
        let mut registry = ParserRegistry::new();
        registry.register("b", || Box::new(Nothing));
        registry.register("a", || Box::new(Nothing));
        registry.register("b", || Box::new(DutchParser::new()));

        assert_eq!(registry.names(), vec!["b", "a"]);
        assert!(registry.unregister("b"));
        assert!(!registry.unregister("b"));
        assert_eq!(registry.names(), vec!["a"]);
    }

    #[test]
    fn test_with_locales_skips_unknown() {
        let registry = ParserRegistry::with_locales(&["nl", "xx"]);
        assert_eq!(registry.names(), vec!["nl"]);
    }

    #[test]
    fn test_span_overlap() {
        let a = MatchSpan::new(0, 5, "1");
        assert!(a.overlaps(&MatchSpan::new(4, 8, "2")));
        assert!(!a.overlaps(&MatchSpan::new(5, 8, "2")));
        assert!(MatchSpan::new(3, 3, "").is_empty());
    }
}
