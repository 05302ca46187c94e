//! Rewrites a single text node so every phone number in it is followed by a
//! dial icon.
//!
//! The rewrite is planned on an HTML-escaped copy of the node's text, the
//! same string every parser unit sees. Accepted spans are spliced right to
//! left, so offsets of spans still waiting to be applied stay valid, and the
//! result is materialized as one annotation element that replaces the
//! original text node in a single tree operation.

use std::borrow::Cow;
use std::fmt::Write;

use crate::dom::{Document, NodeId};
use crate::parser::{MatchSpan, ParserRegistry};

/// Tag of the element that replaces an annotated text node.
pub const ANNOTATION_TAG: &str = "ctd";
/// Marker class of annotation elements.
pub const ANNOTATION_CLASS: &str = "voipgrid-phone-number";
/// Marker class of dial icons.
pub const ICON_CLASS: &str = "voipgrid-phone-icon";
/// Per-number class added next to [`ICON_CLASS`].
pub const ICON_NUMBER_CLASS_PREFIX: &str = "c2d-icon-";

const ANNOTATION_STYLE: &str = "font-style: inherit; font-family: inherit;";

/// Separator between a number and its icon, carried as the icon's own text.
const ICON_SEPARATOR: &str = " ";

/// Escape the characters that matter when text is reinserted as markup:
/// `&`, `"`, `<` and `>`.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(text)
}

/// Inline style for dial icons, with `!important` where host styles must not win.
pub fn icon_style(image_url: &str) -> String {
    let background_image = format!("url(\"{image_url}\")");
    let properties = [
        ("background-color", "transparent !important"),
        ("background-image", background_image.as_str()),
        ("background-repeat", "no-repeat"),
        ("bottom", "-3px !important"),
        ("background-position", "center center"),
        ("-moz-border-radius", "9px !important"),
        ("border-radius", "9px !important"),
        ("-moz-box-shadow", "0 1px 1px rgba(0, 0, 0, 0.2) !important"),
        ("box-shadow", "0 1px 1px rgba(0, 0, 0, 0.2) !important"),
        ("display", "inline-block"),
        ("height", "18px !important"),
        ("margin", "0 4px !important"),
        ("line-height", "18px !important"),
        ("padding", "0 !important"),
        ("position", "relative !important"),
        ("width", "18px !important"),
    ];
    let mut style = String::new();
    for (property, value) in properties {
        let _ = write!(style, "{property}: {value}; ");
    }
    style
}

fn icon_attributes(style: &str, number: &str) -> [(&'static str, String); 4] {
    [
        ("style", style.to_string()),
        ("href", String::new()),
        ("class", format!("{ICON_CLASS} {ICON_NUMBER_CLASS_PREFIX}{number}")),
        ("data-number", number.to_string()),
    ]
}

/// Why a parser's spans were thrown away for one node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpanError {
    #[error("Span {start}..{end} is empty or outside text of length {len}")]
    OutOfRange { start: usize, end: usize, len: usize },
    #[error("Span {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },
    #[error("Span {start}..{end} cuts through an escaped entity")]
    SplitsEntity { start: usize, end: usize },
    #[error("Span {start}..{end} overlaps another match")]
    Overlap { start: usize, end: usize },
    #[error("Span {start}..{end} carries no number")]
    MissingNumber { start: usize, end: usize },
}

/// Check `spans` against the escaped text and the spans already accepted
/// for this node. One bad span rejects the whole set.
pub fn validate_spans(
    escaped: &str,
    spans: Vec<MatchSpan>,
    accepted: &[MatchSpan],
) -> Result<Vec<MatchSpan>, SpanError> {
    let mut valid: Vec<MatchSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        let (start, end) = (span.start, span.end);
        if start >= end || end > escaped.len() {
            return Err(SpanError::OutOfRange {
                start,
                end,
                len: escaped.len(),
            });
        }
        if !escaped.is_char_boundary(start) || !escaped.is_char_boundary(end) {
            return Err(SpanError::NotCharBoundary { start, end });
        }
        if inside_entity(escaped, start) || inside_entity(escaped, end) {
            return Err(SpanError::SplitsEntity { start, end });
        }
        if span.number.trim().is_empty() {
            return Err(SpanError::MissingNumber { start, end });
        }
        if accepted
            .iter()
            .chain(valid.iter())
            .any(|other| other.overlaps(&span))
        {
            return Err(SpanError::Overlap { start, end });
        }
        valid.push(span);
    }
    Ok(valid)
}

/// Every `&` in escaped text opens an entity that runs up to the next `;`.
fn inside_entity(escaped: &str, boundary: usize) -> bool {
    escaped[..boundary]
        .rfind('&')
        .is_some_and(|amp| !escaped[amp..boundary].contains(';'))
}

/// A piece of a planned rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Escaped text, copied verbatim from the original.
    Text(String),
    /// A dial icon for `number`.
    Icon { number: String },
}

/// The escaped text of one node with icons spliced in after each match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    segments: Vec<Segment>,
}

impl Rewrite {
    /// Splice an icon after each span. `spans` must be sorted by `start`
    /// and must not overlap; splicing walks them from the last to the first.
    pub fn splice(escaped: &str, spans: &[MatchSpan]) -> Self {
        let mut rest = escaped.to_string();
        let mut reversed = Vec::with_capacity(spans.len() * 2 + 1);
        for span in spans.iter().rev() {
            let after = rest.split_off(span.end);
            // `rest` keeps everything up to and including the match.
            reversed.push(Segment::Text(after));
            reversed.push(Segment::Icon {
                number: span.number.clone(),
            });
        }
        reversed.push(Segment::Text(rest));
        reversed.reverse();

        let mut segments: Vec<Segment> = Vec::with_capacity(reversed.len());
        for segment in reversed {
            match segment {
                Segment::Text(text) if text.is_empty() => {}
                Segment::Text(text) => {
                    if let Some(Segment::Text(previous)) = segments.last_mut() {
                        previous.push_str(&text);
                    } else {
                        segments.push(Segment::Text(text));
                    }
                }
                icon => segments.push(icon),
            }
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn numbers(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Icon { number } => Some(number.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// The spliced string as markup, icons rendered with `icon_style`.
    pub fn to_html(&self, icon_style: &str) -> String {
        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => html.push_str(text),
                Segment::Icon { number } => {
                    html.push_str("<a");
                    for (name, value) in icon_attributes(icon_style, number) {
                        let _ = write!(
                            html,
                            " {name}=\"{}\"",
                            html_escape::encode_double_quoted_attribute(&value)
                        );
                    }
                    html.push('>');
                    html.push_str(ICON_SEPARATOR);
                    html.push_str("</a>");
                }
            }
        }
        html
    }
}

/// Remove every dial icon from markup produced by [`Rewrite::to_html`].
pub fn strip_icon_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let marker = format!("class=\"{ICON_CLASS} ");
    while let Some(open) = rest.find("<a ") {
        let Some(tag_end) = rest[open..].find('>').map(|offset| open + offset) else {
            break;
        };
        if !rest[open..tag_end].contains(&marker) {
            out.push_str(&rest[..tag_end + 1]);
            rest = &rest[tag_end + 1..];
            continue;
        }
        let Some(close) = rest[tag_end..].find("</a>").map(|offset| tag_end + offset) else {
            break;
        };
        out.push_str(&rest[..open]);
        rest = &rest[close + "</a>".len()..];
    }
    out.push_str(rest);
    out
}

/// Plans and applies rewrites for single text nodes.
#[derive(Debug, Clone)]
pub struct Annotator {
    icon_style: String,
}

impl Annotator {
    pub fn new(icon_image_url: &str) -> Self {
        Self {
            icon_style: icon_style(icon_image_url),
        }
    }

    pub fn icon_style(&self) -> &str {
        &self.icon_style
    }

    /// Run every registered parser over `text_node` and plan the rewrite.
    ///
    /// Returns `None` when nothing should change: no parser matched, every
    /// match was blocked or rejected, or the node is not an attached text node.
    pub fn plan(&self, doc: &Document, text_node: NodeId, parsers: &ParserRegistry) -> Option<Rewrite> {
        let text = doc.text(text_node)?;
        let parent = doc.parent(text_node)?;
        let escaped = escape_html(text);
        let neighbours = [
            doc.previous_element_sibling(text_node),
            doc.previous_element_sibling(parent),
        ];

        let mut accepted: Vec<MatchSpan> = Vec::new();
        for entry in parsers.iter() {
            let parser = entry.instantiate();
            let spans = match parser.parse(&escaped) {
                Ok(spans) => spans,
                Err(err) => {
                    log::debug!("Parser {} failed on {text_node:?}: {err}", entry.name);
                    continue;
                }
            };
            if spans.is_empty() {
                continue;
            }

            let blocked = neighbours
                .iter()
                .flatten()
                .filter_map(|&neighbour| doc.element(neighbour))
                .any(|element| parser.is_blocking_node(element));
            if blocked {
                log::debug!("Parser {} blocked next to {text_node:?}", entry.name);
                continue;
            }

            match validate_spans(&escaped, spans, &accepted) {
                Ok(valid) => accepted.extend(valid),
                Err(err) => log::debug!("Discarding spans of parser {}: {err}", entry.name),
            }
        }

        if accepted.is_empty() {
            return None;
        }
        accepted.sort_by_key(|span| span.start);
        Some(Rewrite::splice(&escaped, &accepted))
    }

    /// Replace `text_node` with its annotated form. Returns whether the tree changed.
    pub fn annotate(&self, doc: &mut Document, text_node: NodeId, parsers: &ParserRegistry) -> bool {
        let Some(rewrite) = self.plan(doc, text_node, parsers) else {
            return false;
        };
        let annotation = self.materialize(doc, &rewrite);
        match doc.replace_with(text_node, annotation) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not replace {text_node:?} with its annotation: {err}");
                false
            }
        }
    }

    /// Build the detached annotation element for `rewrite`.
    fn materialize(&self, doc: &mut Document, rewrite: &Rewrite) -> NodeId {
        let annotation = doc.create_element(ANNOTATION_TAG);
        let built = self.fill_annotation(doc, annotation, rewrite);
        if let Err(err) = built {
            // Only reachable with a corrupted arena; the node stays detached.
            log::warn!("Failed to build annotation: {err}");
        }
        annotation
    }

    fn fill_annotation(
        &self,
        doc: &mut Document,
        annotation: NodeId,
        rewrite: &Rewrite,
    ) -> Result<(), crate::dom::DomError> {
        doc.set_attribute(annotation, "style", ANNOTATION_STYLE)?;
        doc.set_attribute(annotation, "class", ANNOTATION_CLASS)?;
        for segment in rewrite.segments() {
            match segment {
                Segment::Text(escaped) => {
                    let text = doc.create_text(&html_escape::decode_html_entities(escaped));
                    doc.append_child(annotation, text)?;
                }
                Segment::Icon { number } => {
                    let icon = doc.create_element("a");
                    for (name, value) in icon_attributes(&self.icon_style, number) {
                        doc.set_attribute(icon, name, &value)?;
                    }
                    let separator = doc.create_text(ICON_SEPARATOR);
                    doc.append_child(icon, separator)?;
                    doc.append_child(annotation, icon)?;
                }
            }
        }
        Ok(())
    }
}
