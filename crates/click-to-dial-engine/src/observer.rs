//! Mutation coordinator: turns the page's structural changes into bounded,
//! debounced annotation work.
//!
//! Changes are not handled as they arrive. Interesting nodes are parked, and
//! only once the page has been quiet for [`Settings::quiet_period`] is the
//! parked set swapped out and processed, in chunks that each run as their own
//! deferred task.

use std::collections::HashSet;

use crate::dom::{Document, MutationRecord, NodeId, ObserveOptions};
use crate::parser::ParserRegistry;
use crate::scan::Scanner;
use crate::scheduler::{TaskId, TaskQueue};
use crate::settings::Settings;

/// Deferred work owned by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverTask {
    /// The quiet period elapsed.
    HandleMutations,
    /// Annotate one chunk of a parked batch.
    ProcessChunk { nodes: Vec<NodeId>, epoch: u64 },
}

/// Nodes waiting for the quiet period to end, deduplicated, in park order.
#[derive(Debug, Default, Clone)]
pub struct ParkedNodes {
    order: Vec<NodeId>,
    seen: HashSet<NodeId>,
}

impl ParkedNodes {
    pub fn park(&mut self, node: NodeId) {
        if self.seen.insert(node) {
            self.order.push(node);
        }
    }

    /// Hand over the parked nodes and start empty.
    pub fn take(&mut self) -> Vec<NodeId> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.order
    }
}

/// Per-instance observation state.
#[derive(Debug, Default, Clone)]
pub struct ObserverState {
    pub observing: bool,
    pub parked: ParkedNodes,
    pub pending_timer: Option<TaskId>,
    /// Bumped on every start and stop; chunks from an older epoch are stale.
    pub epoch: u64,
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub records_delivered: usize,
    pub batches_processed: usize,
    pub batches_dropped: usize,
    pub chunks_scheduled: usize,
    pub chunks_discarded: usize,
    pub detached_skipped: usize,
    pub annotated: usize,
}

#[derive(Debug)]
pub struct MutationCoordinator {
    state: ObserverState,
    stats: CoordinatorStats,
    quiet_period: std::time::Duration,
    max_parked_nodes: usize,
    chunk_size: usize,
    options: ObserveOptions,
}

impl MutationCoordinator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            state: ObserverState::default(),
            stats: CoordinatorStats::default(),
            quiet_period: settings.quiet_period,
            max_parked_nodes: settings.max_parked_nodes,
            chunk_size: settings.chunk_size.max(1),
            options: ObserveOptions {
                child_list: true,
                character_data: settings.watch_character_data,
                attributes: false,
                subtree: true,
            },
        }
    }

    pub fn state(&self) -> &ObserverState {
        &self.state
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    pub fn is_observing(&self) -> bool {
        self.state.observing
    }

    /// Idle → Observing: subscribe to changes anywhere in the body.
    pub fn start(&mut self, doc: &mut Document) {
        if self.state.observing {
            return;
        }
        self.state.observing = true;
        self.state.epoch += 1;
        self.subscribe(doc);
        log::debug!("Observing {:?}", doc.body());
    }

    /// Observing → Idle. Annotations already in the page are left alone.
    pub fn stop(&mut self, doc: &mut Document, tasks: &mut TaskQueue<ObserverTask>) {
        if !self.state.observing {
            return;
        }
        self.state.observing = false;
        self.state.epoch += 1;
        doc.disconnect();
        if let Some(timer) = self.state.pending_timer.take() {
            tasks.cancel(timer);
        }
        self.state.parked.take();
        log::debug!("Stopped observing");
    }

    fn subscribe(&self, doc: &mut Document) {
        doc.observe(doc.body(), self.options);
    }

    /// Take one delivery of change records and park what is worth scanning.
    pub fn on_records(
        &mut self,
        doc: &Document,
        records: Vec<MutationRecord>,
        scanner: &Scanner,
        tasks: &mut TaskQueue<ObserverTask>,
    ) {
        if !self.state.observing || records.is_empty() {
            return;
        }
        if let Some(timer) = self.state.pending_timer.take() {
            // Still busy; push processing back.
            tasks.cancel(timer);
        }

        self.stats.records_delivered += records.len();
        let walker = scanner.walker();
        for record in records {
            if !record.added.is_empty() {
                for node in record.added {
                    if !walker.skip_node(doc, node) {
                        self.state.parked.park(node);
                    }
                }
            } else if record.removed.is_empty() && !walker.skip_node(doc, record.target) {
                self.state.parked.park(record.target);
            }
        }

        if !self.state.parked.is_empty() {
            let timer = tasks.schedule(self.quiet_period, ObserverTask::HandleMutations);
            self.state.pending_timer = Some(timer);
        }
    }

    /// Run one of this coordinator's deferred tasks.
    pub fn run_task(
        &mut self,
        doc: &mut Document,
        task: ObserverTask,
        scanner: &Scanner,
        parsers: &ParserRegistry,
        tasks: &mut TaskQueue<ObserverTask>,
    ) {
        match task {
            ObserverTask::HandleMutations => self.handle_mutations(tasks),
            ObserverTask::ProcessChunk { nodes, epoch } => {
                self.process_chunk(doc, &nodes, epoch, scanner, parsers)
            }
        }
    }

    /// The quiet period is over: swap out the parked set and schedule it.
    pub fn handle_mutations(&mut self, tasks: &mut TaskQueue<ObserverTask>) {
        self.state.pending_timer = None;
        let batch = self.state.parked.take();
        if !self.state.observing || batch.is_empty() {
            return;
        }
        if batch.len() > self.max_parked_nodes {
            self.stats.batches_dropped += 1;
            log::debug!(
                "Dropping {} parked nodes, more than {}",
                batch.len(),
                self.max_parked_nodes
            );
            return;
        }

        log::debug!("Processing {} parked nodes", batch.len());
        self.stats.batches_processed += 1;
        for chunk in batch.chunks(self.chunk_size) {
            tasks.schedule(
                std::time::Duration::ZERO,
                ObserverTask::ProcessChunk {
                    nodes: chunk.to_vec(),
                    epoch: self.state.epoch,
                },
            );
            self.stats.chunks_scheduled += 1;
        }
    }

    fn process_chunk(
        &mut self,
        doc: &mut Document,
        nodes: &[NodeId],
        epoch: u64,
        scanner: &Scanner,
        parsers: &ParserRegistry,
    ) {
        if !self.state.observing || epoch != self.state.epoch {
            self.stats.chunks_discarded += 1;
            return;
        }

        // Our own rewrites must not come back as parked nodes.
        doc.disconnect();
        for &node in nodes {
            if !doc.contains(node) {
                self.stats.detached_skipped += 1;
                log::debug!("Parked node {node:?} was removed before processing");
                continue;
            }
            let started = std::time::Instant::now();
            let report = scanner.scan(doc, node, parsers);
            self.stats.annotated += report.annotated;
            log::debug!("Scan of parked {node:?} took {:?}", started.elapsed());
        }
        self.subscribe(doc);
    }
}
