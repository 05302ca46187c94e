//! Shared fixtures for unit tests.

use crate::dom::{Document, ElementRef, NodeId};
use crate::parser::{DutchParser, MatchSpan, ParseError, ParserRegistry, ParserUnit};

pub fn add_element(doc: &mut Document, parent: NodeId, tag: &str) -> NodeId {
    let element = doc.create_element(tag);
    doc.append_child(parent, element).unwrap();
    element
}

pub fn add_text(doc: &mut Document, parent: NodeId, text: &str) -> NodeId {
    let node = doc.create_text(text);
    doc.append_child(parent, node).unwrap();
    node
}

/// Append `<p>text</p>` to the body and return the paragraph.
pub fn add_paragraph(doc: &mut Document, text: &str) -> NodeId {
    let body = doc.body();
    let p = add_element(doc, body, "p");
    add_text(doc, p, text);
    p
}

pub fn dutch_registry() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register("nl", || Box::new(DutchParser::new()));
    registry
}

/// A parser that always fails.
pub struct FailingParser;

impl ParserUnit for FailingParser {
    fn parse(&self, _text: &str) -> Result<Vec<MatchSpan>, ParseError> {
        Err(ParseError::Failed("grammar exploded".to_string()))
    }

    fn is_blocking_node(&self, _element: ElementRef<'_>) -> bool {
        false
    }
}

/// A parser returning the same spans for any input.
pub struct FixedParser {
    spans: Vec<MatchSpan>,
}

impl FixedParser {
    pub fn new(spans: Vec<MatchSpan>) -> Self {
        Self { spans }
    }
}

impl ParserUnit for FixedParser {
    fn parse(&self, _text: &str) -> Result<Vec<MatchSpan>, ParseError> {
        Ok(self.spans.clone())
    }

    fn is_blocking_node(&self, _element: ElementRef<'_>) -> bool {
        false
    }
}
