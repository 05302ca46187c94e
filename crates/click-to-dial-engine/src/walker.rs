//! Depth-first traversal over the text a user can actually see.

use crate::annotator::{ANNOTATION_CLASS, ANNOTATION_TAG, ICON_CLASS};
use crate::dom::{Document, NodeData, NodeId};

/// Elements whose content is never scanned.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "textarea", "input", "select", "option", "head",
    "title", "iframe", "svg", ANNOTATION_TAG,
];

/// Finds the text nodes below a root that are worth handing to the annotator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Walker;

impl Walker {
    pub fn new() -> Self {
        Self
    }

    /// Whether `node` (and everything below it) is uninteresting.
    ///
    /// Used both while walking and to filter freshly added nodes before they
    /// are parked.
    pub fn skip_node(&self, doc: &Document, node: NodeId) -> bool {
        self.skip_self(doc, node)
            || Self::produced_by_engine(doc, node)
            || Self::inside_unscannable(doc, node)
    }

    /// Visit every text node below `root` in document order.
    ///
    /// `root` itself may be a text node. The visibility check is not applied
    /// to `root`: a caller processing it explicitly has already decided it is
    /// worth looking at. Detached roots are walked like any other subtree; it
    /// is the caller's job to decide whether that is useful.
    pub fn walk(&self, doc: &mut Document, root: NodeId, mut visit: impl FnMut(&mut Document, NodeId)) {
        // Collect first: visiting replaces nodes, which must not disturb the
        // traversal of their siblings.
        for node in self.text_nodes(doc, root) {
            visit(doc, node);
        }
    }

    /// The text nodes [`Walker::walk`] would visit.
    pub fn text_nodes(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        if doc.data(root).is_none() || Self::produced_by_engine(doc, root) {
            return found;
        }
        if Self::is_unscannable(doc, root) || Self::inside_unscannable(doc, root) {
            return found;
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node != root && self.skip_self(doc, node) {
                continue;
            }
            match doc.data(node) {
                Some(NodeData::Text(_)) => found.push(node),
                Some(_) => stack.extend(doc.children(node).iter().rev().copied()),
                None => {}
            }
        }
        found
    }

    fn skip_self(&self, doc: &Document, node: NodeId) -> bool {
        match doc.data(node) {
            None | Some(NodeData::Document) => true,
            Some(NodeData::Text(text)) => text.trim().is_empty(),
            Some(NodeData::Element(_)) => {
                Self::is_unscannable(doc, node)
                    || doc.size(node).is_some_and(|size| size.is_zero())
            }
        }
    }

    fn is_unscannable(doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        SKIPPED_TAGS.contains(&tag)
            || doc.has_class(node, ANNOTATION_CLASS)
            || doc.has_class(node, ICON_CLASS)
            || doc
                .attribute(node, "contenteditable")
                .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
    }

    /// Whether some ancestor of `node` is a skipped tag or an editable region.
    fn inside_unscannable(doc: &Document, node: NodeId) -> bool {
        doc.parent(node)
            .and_then(|parent| doc.closest(parent, Self::is_unscannable))
            .is_some()
    }

    /// True for annotations, icons and anything nested inside an annotation.
    fn produced_by_engine(doc: &Document, node: NodeId) -> bool {
        doc.closest(node, |doc, id| {
            doc.has_class(id, ANNOTATION_CLASS) || doc.has_class(id, ICON_CLASS)
        })
        .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Size;
    use crate::tests::{add_element, add_text};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_visits_text_in_document_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = add_element(&mut doc, body, "div");
        let first = add_text(&mut doc, div, "first");
        let p = add_element(&mut doc, div, "p");
        let second = add_text(&mut doc, p, "second");
        let third = add_text(&mut doc, body, "third");

        let mut visited = Vec::new();
        Walker::new().walk(&mut doc, body, |_, node| visited.push(node));

        assert_eq!(visited, vec![first, second, third]);
    }

    #[test]
    fn test_skips_scripts_whitespace_and_editable_regions() {
        let mut doc = Document::new();
        let body = doc.body();
        let script = add_element(&mut doc, body, "script");
        add_text(&mut doc, script, "var n = '0201234567'");
        add_text(&mut doc, body, "   \n ");
        let editor = add_element(&mut doc, body, "div");
        doc.set_attribute(editor, "contenteditable", "true").unwrap();
        add_text(&mut doc, editor, "draft");
        let kept = add_text(&mut doc, body, "kept");

        assert_eq!(Walker::new().text_nodes(&doc, body), vec![kept]);
    }

    #[test]
    fn test_skips_hidden_elements_but_not_a_hidden_root() {
        let mut doc = Document::new();
        let body = doc.body();
        let hidden = add_element(&mut doc, body, "div");
        doc.set_size(hidden, Size::new(0.0, 0.0)).unwrap();
        let inside = add_text(&mut doc, hidden, "inside");
        let thin = add_element(&mut doc, body, "div");
        doc.set_size(thin, Size::new(0.0, 12.0)).unwrap();
        let visible = add_text(&mut doc, thin, "visible");

        let walker = Walker::new();
        assert_eq!(walker.text_nodes(&doc, body), vec![visible]);
        assert_eq!(walker.text_nodes(&doc, hidden), vec![inside]);
    }

    #[test]
    fn test_skips_engine_output() {
        let mut doc = Document::new();
        let body = doc.body();
        let annotation = add_element(&mut doc, body, "ctd");
        doc.set_attribute(annotation, "class", ANNOTATION_CLASS)
            .unwrap();
        let inner = add_text(&mut doc, annotation, "020-1234567 ");

        let walker = Walker::new();
        assert!(walker.skip_node(&doc, annotation));
        assert!(walker.skip_node(&doc, inner));
        assert!(walker.text_nodes(&doc, body).is_empty());
        assert!(walker.text_nodes(&doc, inner).is_empty());
    }

    #[test]
    fn test_nodes_below_skipped_ancestors_are_skipped() {
        let mut doc = Document::new();
        let body = doc.body();
        let script = add_element(&mut doc, body, "script");
        let json = add_text(&mut doc, script, r#"{"telephone": "020-1234567"}"#);
        let editor = add_element(&mut doc, body, "div");
        doc.set_attribute(editor, "contenteditable", "true").unwrap();
        let line = add_element(&mut doc, editor, "div");
        let draft = add_text(&mut doc, line, "bel me op 020-1234567");

        let walker = Walker::new();
        for node in [json, line, draft] {
            assert!(walker.skip_node(&doc, node), "{node:?} should be skipped");
            assert!(walker.text_nodes(&doc, node).is_empty());
        }
    }

    #[test]
    fn test_text_root_is_visited_directly() {
        let mut doc = Document::new();
        let body = doc.body();
        let text = add_text(&mut doc, body, "0201234567");

        assert_eq!(Walker::new().text_nodes(&doc, text), vec![text]);
        assert!(!Walker::new().skip_node(&doc, text));
    }
}
