//! Cooperative macrotask queue on a virtual clock.
//!
//! Everything the engine defers (the quiet-period timer, chunks of parked
//! nodes) goes through a [`TaskQueue`]. The host advances the clock; due tasks
//! come out ordered by due time, then by the order they were scheduled in.

use std::collections::BTreeMap;
use std::time::Duration;

/// Handle to a scheduled task, usable to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
pub struct TaskQueue<T> {
    now: Duration,
    next_id: u64,
    tasks: BTreeMap<(Duration, TaskId), T>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            tasks: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run `task` once `delay` has passed. A zero delay defers it to the
    /// next turn of the queue.
    pub fn schedule(&mut self, delay: Duration, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert((self.now + delay, id), task);
        id
    }

    /// Returns the task if it had not run yet.
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let key = self.tasks.keys().find(|(_, task_id)| *task_id == id).copied()?;
        self.tasks.remove(&key)
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.tasks.keys().any(|(_, task_id)| *task_id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// When the earliest pending task becomes due.
    pub fn next_due(&self) -> Option<Duration> {
        self.tasks.keys().next().map(|(due, _)| *due)
    }

    /// Pop the earliest task due at or before `deadline`, moving the clock to
    /// its due time. Tasks scheduled while handling it are seen on the next call.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<T> {
        let (&(due, id), _) = self.tasks.iter().next()?;
        if due > deadline {
            return None;
        }
        self.now = self.now.max(due);
        self.tasks.remove(&(due, id))
    }

    /// Move the clock forward without running anything.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_tasks_run_by_due_time_then_schedule_order() {
        let mut queue = TaskQueue::new();
        queue.schedule(ms(10), "late");
        queue.schedule(ms(0), "first");
        queue.schedule(ms(0), "second");

        let mut order = Vec::new();
        while let Some(task) = queue.pop_due(ms(100)) {
            order.push(task);
        }

        assert_eq!(order, vec!["first", "second", "late"]);
        assert_eq!(queue.now(), ms(10));
    }

    #[test]
    fn test_tasks_wait_for_their_deadline() {
        let mut queue = TaskQueue::new();
        queue.schedule(ms(500), ());

        assert_eq!(queue.pop_due(ms(499)), None);
        assert_eq!(queue.next_due(), Some(ms(500)));
        assert_eq!(queue.pop_due(ms(500)), Some(()));
    }

    #[test]
    fn test_cancel() {
        let mut queue = TaskQueue::new();
        let id = queue.schedule(ms(5), 1);
        queue.schedule(ms(5), 2);

        assert!(queue.is_scheduled(id));
        assert_eq!(queue.cancel(id), Some(1));
        assert_eq!(queue.cancel(id), None);
        assert!(!queue.is_scheduled(id));
        assert_eq!(queue.pop_due(ms(5)), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_delays_are_relative_to_the_clock() {
        let mut queue = TaskQueue::new();
        queue.set_now(ms(1000));
        queue.schedule(ms(500), ());

        assert_eq!(queue.next_due(), Some(ms(1500)));
    }
}
