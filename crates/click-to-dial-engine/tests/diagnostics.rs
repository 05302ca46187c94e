//! Log output of the engine. Kept apart from the behaviour tests because the
//! logger is process wide.

use std::sync::Mutex;
use std::time::Duration;

use click_to_dial_engine::{Document, Engine, ParserRegistry, ReadyResponse, Settings, Signal};
use log::{LevelFilter, Log, Metadata, Record};
use pretty_assertions::assert_eq;

struct CapturingLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("click_to_dial_engine")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    lines: Mutex::new(Vec::new()),
};

fn captured(needle: &str) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.contains(needle))
        .cloned()
        .collect()
}

#[test]
fn oversized_burst_logs_one_drop() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Debug);

    let mut doc = Document::new();
    let mut engine = Engine::new(Settings::default(), ParserRegistry::with_locales(&["nl"]));
    engine.handle(&mut doc, Signal::Ready(ReadyResponse { observe: true }));

    let body = doc.body();
    for _ in 0..151 {
        let p = doc.create_element("p");
        doc.append_child(body, p).unwrap();
        let text = doc.create_text("020-1234567");
        doc.append_child(p, text).unwrap();
    }
    engine.advance(&mut doc, Duration::from_secs(10));

    assert_eq!(
        captured("Dropping"),
        vec!["DEBUG Dropping 151 parked nodes, more than 150".to_string()]
    );
    assert_eq!(engine.stats().batches_dropped, 1);
    assert!(captured("Processing").is_empty());
}
