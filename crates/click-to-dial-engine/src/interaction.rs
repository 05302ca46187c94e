//! Click handling for dial icons and `tel:` links.
//!
//! Both handlers are delegated from the body: a click bubbles from its target
//! towards the body and the first icon or `tel:` link on that path handles
//! it. Delegation means icons inserted after start-up need no extra wiring.

use crate::annotator::{ANNOTATION_CLASS, ICON_CLASS};
use crate::dom::{Document, NodeId};
use crate::events::DialRequest;

const TEL_SCHEME: &str = "tel:";

/// What the host must do with the click event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickOutcome {
    /// Suppress the browser's default action (following the link).
    pub default_prevented: bool,
    /// Keep the page's own handlers from seeing the click.
    pub propagation_stopped: bool,
    pub dial: Option<DialRequest>,
}

impl ClickOutcome {
    fn dial(number: &str) -> Self {
        Self {
            default_prevented: true,
            propagation_stopped: true,
            dial: Some(DialRequest {
                number: number.to_string(),
            }),
        }
    }

    fn swallowed() -> Self {
        Self {
            default_prevented: true,
            propagation_stopped: true,
            dial: None,
        }
    }
}

/// Dispatch a click on `target` through the delegated handlers.
pub fn handle_click(doc: &mut Document, target: NodeId) -> ClickOutcome {
    let body = doc.body();
    if !doc.contains(target) || !doc.is_inclusive_ancestor(body, target) {
        return ClickOutcome::default();
    }

    let mut current = Some(target);
    while let Some(node) = current {
        if node == body {
            break;
        }
        if doc.has_class(node, ICON_CLASS)
            && let Some(number) = dialable_icon_number(doc, node)
        {
            disable_icons(doc);
            return ClickOutcome::dial(&number);
        }
        if let Some(href) = doc.attribute(node, "href")
            && let Some(number) = href.strip_prefix(TEL_SCHEME)
        {
            if number.trim().is_empty() {
                return ClickOutcome::swallowed();
            }
            return ClickOutcome::dial(number);
        }
        current = doc.parent(node);
    }
    ClickOutcome::default()
}

/// The number of an enabled icon that sits inside one of our annotations.
fn dialable_icon_number(doc: &Document, icon: NodeId) -> Option<String> {
    if doc.has_attribute(icon, "disabled") {
        return None;
    }
    let number = doc.attribute(icon, "data-number")?;
    if number.is_empty() {
        return None;
    }
    let parent = doc.parent(icon)?;
    doc.closest(parent, |doc, id| doc.has_class(id, ANNOTATION_CLASS))?;
    Some(number.to_string())
}

/// Mark every icon in the page as disabled until the host re-enables them.
pub fn disable_icons(doc: &mut Document) {
    for icon in doc.elements_with_class(ICON_CLASS) {
        if let Err(err) = doc.set_attribute(icon, "disabled", "true") {
            log::warn!("Could not disable icon {icon:?}: {err}");
        }
    }
}

pub fn enable_icons(doc: &mut Document) {
    for icon in doc.elements_with_class(ICON_CLASS) {
        if let Err(err) = doc.remove_attribute(icon, "disabled") {
            log::warn!("Could not enable icon {icon:?}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotator::Annotator;
    use crate::tests::{add_element, add_paragraph, add_text, dutch_registry};
    use pretty_assertions::assert_eq;

    fn annotated_page(text: &str) -> Document {
        let mut doc = Document::new();
        let p = add_paragraph(&mut doc, text);
        let node = doc.children(p)[0];
        Annotator::new("i").annotate(&mut doc, node, &dutch_registry());
        doc
    }

    #[test]
    fn test_icon_click_dials_once_and_disables_all_icons() {
        let mut doc = annotated_page("020-1234567 of 06-12345678");
        let icons = doc.elements_with_class(ICON_CLASS);
        assert_eq!(icons.len(), 2);

        let first = handle_click(&mut doc, icons[0]);
        let second = handle_click(&mut doc, icons[0]);
        let other = handle_click(&mut doc, icons[1]);

        assert_eq!(
            first,
            ClickOutcome {
                default_prevented: true,
                propagation_stopped: true,
                dial: Some(DialRequest {
                    number: "0201234567".to_string()
                }),
            }
        );
        assert_eq!(second, ClickOutcome::default());
        assert_eq!(other, ClickOutcome::default());
        assert!(icons.iter().all(|&icon| doc.has_attribute(icon, "disabled")));
    }

    #[test]
    fn test_click_on_icon_text_bubbles_to_icon() {
        let mut doc = annotated_page("020-1234567");
        let icon = doc.elements_with_class(ICON_CLASS)[0];
        let separator = doc.children(icon)[0];

        let outcome = handle_click(&mut doc, separator);

        assert_eq!(outcome.dial.unwrap().number, "0201234567");
    }

    #[test]
    fn test_enable_icons_allows_the_next_dial() {
        let mut doc = annotated_page("020-1234567");
        let icon = doc.elements_with_class(ICON_CLASS)[0];
        handle_click(&mut doc, icon);

        enable_icons(&mut doc);

        assert!(handle_click(&mut doc, icon).dial.is_some());
    }

    #[test]
    fn test_icon_outside_annotation_is_ignored() {
        let mut doc = Document::new();
        let body = doc.body();
        let icon = add_element(&mut doc, body, "a");
        doc.set_attribute(icon, "class", ICON_CLASS).unwrap();
        doc.set_attribute(icon, "data-number", "0201234567").unwrap();

        assert_eq!(handle_click(&mut doc, icon), ClickOutcome::default());
        assert!(!doc.has_attribute(icon, "disabled"));
    }

    #[test]
    fn test_tel_link_click_dials_link_target() {
        let mut doc = Document::new();
        let body = doc.body();
        let link = add_element(&mut doc, body, "a");
        doc.set_attribute(link, "href", "tel:+31201234567").unwrap();
        let label = add_element(&mut doc, link, "span");
        let text = add_text(&mut doc, label, "Bel ons");

        let outcome = handle_click(&mut doc, text);

        assert!(outcome.default_prevented);
        assert!(outcome.propagation_stopped);
        assert_eq!(
            outcome.dial,
            Some(DialRequest {
                number: "+31201234567".to_string()
            })
        );
    }

    #[test]
    fn test_ordinary_clicks_pass_through() {
        let mut doc = Document::new();
        let body = doc.body();
        let link = add_element(&mut doc, body, "a");
        doc.set_attribute(link, "href", "https://example.com").unwrap();
        let detached = doc.create_element("a");
        doc.set_attribute(detached, "href", "tel:0201234567").unwrap();

        assert_eq!(handle_click(&mut doc, link), ClickOutcome::default());
        assert_eq!(handle_click(&mut doc, body), ClickOutcome::default());
        assert_eq!(handle_click(&mut doc, detached), ClickOutcome::default());
    }
}
