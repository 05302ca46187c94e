//! One annotation pass over a subtree: size guard, walk, annotate.

use std::time::Instant;

use crate::annotator::Annotator;
use crate::dom::{Document, NodeId};
use crate::parser::ParserRegistry;
use crate::settings::Settings;
use crate::walker::Walker;

/// Outcome of [`Scanner::scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Text nodes handed to the annotator.
    pub visited: usize,
    /// Text nodes that were replaced by an annotation.
    pub annotated: usize,
    /// The subtree exceeded the element ceiling and was left alone.
    pub oversized: bool,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    walker: Walker,
    annotator: Annotator,
    max_elements: usize,
}

impl Scanner {
    pub fn new(settings: &Settings) -> Self {
        Self {
            walker: Walker::new(),
            annotator: Annotator::new(&settings.icon_image_url),
            max_elements: settings.max_scan_elements,
        }
    }

    pub fn walker(&self) -> &Walker {
        &self.walker
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// Annotate every visible text node below `root`, unless the subtree is
    /// too large to process without stalling the page.
    pub fn scan(&self, doc: &mut Document, root: NodeId, parsers: &ParserRegistry) -> ScanReport {
        let elements = doc.element_count_within(root);
        if elements > self.max_elements {
            log::debug!("Not scanning {elements} elements below {root:?}");
            return ScanReport {
                oversized: true,
                ..Default::default()
            };
        }
        log::debug!("Scanning {elements} elements below {root:?}");

        let started = Instant::now();
        let mut report = ScanReport::default();
        self.walker.walk(doc, root, |doc, node| {
            report.visited += 1;
            if self.annotator.annotate(doc, node, parsers) {
                report.annotated += 1;
            }
        });
        log::debug!(
            "Scan of {root:?} annotated {} of {} text nodes in {:?}",
            report.annotated,
            report.visited,
            started.elapsed()
        );
        report
    }
}
