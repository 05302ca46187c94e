pub mod annotator;
pub mod dom;
pub mod events;
pub mod interaction;
pub mod lifecycle;
pub mod observer;
pub mod parser;
pub mod scan;
pub mod scheduler;
pub mod settings;
pub mod walker;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use annotator::{ANNOTATION_CLASS, ANNOTATION_TAG, Annotator, ICON_CLASS};
pub use dom::{Document, DomError, NodeId, Size};
pub use events::{DialRequest, OutboundEvent, ReadyResponse, Signal};
pub use interaction::ClickOutcome;
pub use lifecycle::{Engine, EngineState};
pub use observer::CoordinatorStats;
pub use parser::{DutchParser, MatchSpan, ParseError, ParserRegistry, ParserUnit};
pub use scan::{ScanReport, Scanner};
pub use settings::Settings;
