//! The engine as the host sees it: handshake, start-up sweep, observation,
//! clicks and teardown.

use std::time::{Duration, Instant};

use crate::annotator::ICON_CLASS;
use crate::dom::{Document, DomError, NodeId};
use crate::events::{OutboundEvent, ReadyResponse, Signal};
use crate::interaction::{self, ClickOutcome};
use crate::observer::{CoordinatorStats, MutationCoordinator, ObserverTask};
use crate::parser::ParserRegistry;
use crate::scan::{ScanReport, Scanner};
use crate::scheduler::TaskQueue;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// [`OutboundEvent::ObserverReady`] went out; no answer yet.
    AwaitingReady,
    /// The host answered that this page is not to be annotated.
    Disabled,
    /// Loaded in a hidden frame; waiting for it to be resized.
    AwaitingVisibility,
    Running,
    Stopped,
}

/// One engine instance bound to one document.
#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    state: EngineState,
    parsers: ParserRegistry,
    scanner: Scanner,
    coordinator: MutationCoordinator,
    tasks: TaskQueue<ObserverTask>,
    print_style: Option<NodeId>,
    sweep: Option<ScanReport>,
    outbox: Vec<OutboundEvent>,
}

impl Engine {
    /// Create an engine and queue the ready request for the host.
    pub fn new(settings: Settings, parsers: ParserRegistry) -> Self {
        Self {
            scanner: Scanner::new(&settings),
            coordinator: MutationCoordinator::new(&settings),
            settings,
            state: EngineState::AwaitingReady,
            parsers,
            tasks: TaskQueue::new(),
            print_style: None,
            sweep: None,
            outbox: vec![OutboundEvent::ObserverReady],
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Parsers can be swapped at any time; the next annotation uses the new set.
    pub fn parsers_mut(&mut self) -> &mut ParserRegistry {
        &mut self.parsers
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    /// Result of the start-up sweep, once it ran.
    pub fn sweep_report(&self) -> Option<ScanReport> {
        self.sweep
    }

    pub fn is_observing(&self) -> bool {
        self.coordinator.is_observing()
    }

    pub fn now(&self) -> Duration {
        self.tasks.now()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn handle(&mut self, doc: &mut Document, signal: Signal) {
        match signal {
            Signal::Ready(response) => self.on_ready(doc, response),
            Signal::Resize => {
                if self.state == EngineState::AwaitingVisibility {
                    self.do_run(doc);
                }
            }
            Signal::Stop => self.stop(doc),
            Signal::EnableIcons => interaction::enable_icons(doc),
        }
    }

    fn on_ready(&mut self, doc: &mut Document, response: ReadyResponse) {
        if self.state != EngineState::AwaitingReady {
            log::debug!("Ignoring ready response in state {:?}", self.state);
            return;
        }
        if !response.observe {
            self.state = EngineState::Disabled;
            return;
        }

        let hidden = doc.size(doc.body()).is_some_and(|size| size.is_zero());
        if !doc.is_top_level() && hidden {
            // This hidden frame might become visible later.
            log::debug!("Hidden frame; waiting for a resize before scanning");
            self.state = EngineState::AwaitingVisibility;
        } else {
            self.do_run(doc);
        }
    }

    fn do_run(&mut self, doc: &mut Document) {
        log::debug!("Start observing");
        self.inject_print_style(doc);

        let body = doc.body();
        let started = Instant::now();
        let report = self.scanner.scan(doc, body, &self.parsers);
        log::debug!("Initial scan took {:?}", started.elapsed());
        self.sweep = Some(report);

        self.coordinator.start(doc);
        self.state = EngineState::Running;
    }

    /// Stop observing, strip every icon and the print stylesheet. Safe to repeat.
    pub fn stop(&mut self, doc: &mut Document) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.coordinator.stop(doc, &mut self.tasks);
        self.remove_icons(doc);
        if let Some(link) = self.print_style.take()
            && doc.contains(link)
            && let Err(err) = doc.remove(link)
        {
            log::warn!("Could not remove print stylesheet: {err}");
        }
        self.state = EngineState::Stopped;
    }

    fn remove_icons(&self, doc: &mut Document) {
        let icons = doc.elements_with_class(ICON_CLASS);
        log::debug!("Removing {} icons", icons.len());
        for icon in icons {
            if let Err(err) = doc.remove(icon) {
                log::warn!("Could not remove icon {icon:?}: {err}");
            }
        }
    }

    fn inject_print_style(&mut self, doc: &mut Document) {
        match Self::print_style_link(doc, &self.settings.print_stylesheet_href) {
            Ok(link) => self.print_style = Some(link),
            Err(err) => log::warn!("Could not inject print stylesheet: {err}"),
        }
    }

    fn print_style_link(doc: &mut Document, href: &str) -> Result<NodeId, DomError> {
        let link = doc.create_element("link");
        doc.set_attribute(link, "rel", "stylesheet")?;
        doc.set_attribute(link, "href", href)?;
        doc.set_attribute(link, "media", "print")?;
        let head = doc.head();
        doc.append_child(head, link)?;
        Ok(link)
    }

    /// Dispatch a user click. The handlers are live from construction until
    /// stop; the ready answer only decides whether the page is annotated.
    pub fn click(&mut self, doc: &mut Document, target: NodeId) -> ClickOutcome {
        if self.state == EngineState::Stopped {
            return ClickOutcome::default();
        }
        let outcome = interaction::handle_click(doc, target);
        if let Some(request) = &outcome.dial {
            log::debug!("Dialing {}", request.number);
            self.outbox.push(OutboundEvent::Dial(request.clone()));
        }
        outcome
    }

    /// Deliver pending change records to the coordinator.
    pub fn flush_records(&mut self, doc: &mut Document) {
        if !doc.has_pending_records() {
            return;
        }
        let records = doc.take_records();
        self.coordinator
            .on_records(doc, records, &self.scanner, &mut self.tasks);
    }

    /// Let `elapsed` pass, running every task that falls due on the way.
    pub fn advance(&mut self, doc: &mut Document, elapsed: Duration) {
        let deadline = self.tasks.now() + elapsed;
        self.run_until(doc, deadline);
    }

    pub fn run_until(&mut self, doc: &mut Document, deadline: Duration) {
        self.flush_records(doc);
        while let Some(task) = self.tasks.pop_due(deadline) {
            self.coordinator
                .run_task(doc, task, &self.scanner, &self.parsers, &mut self.tasks);
            self.flush_records(doc);
        }
        self.tasks.set_now(deadline);
    }

    /// Run until nothing is scheduled any more.
    pub fn run_until_idle(&mut self, doc: &mut Document) {
        self.flush_records(doc);
        while let Some(due) = self.tasks.next_due() {
            self.run_until(doc, due);
        }
    }
}
