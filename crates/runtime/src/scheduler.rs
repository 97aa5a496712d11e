//! Timer and microtask queues on a virtual clock

use std::collections::VecDeque;
use std::fmt;

use crate::page::Page;

/// Identifier of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

pub(crate) type Task = Box<dyn FnOnce(&Page)>;

pub(crate) struct ScheduledTask {
    pub(crate) id: TimerId,
    pub(crate) due_at: u64,
    pub(crate) order: u64,
    pub(crate) task: Task,
}

pub(crate) struct Scheduler {
    task_queue: Vec<ScheduledTask>,
    microtask_queue: VecDeque<Task>,
    pub(crate) now_ms: u64,
    pub(crate) step_limit: usize,
    next_timer_id: u64,
    next_task_order: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            task_queue: Vec::new(),
            microtask_queue: VecDeque::new(),
            now_ms: 0,
            step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }
}

impl Scheduler {
    pub(crate) fn schedule_timeout(&mut self, delay_ms: u64, task: Task) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        let due_at = self.now_ms.saturating_add(delay_ms);

        self.task_queue.push(ScheduledTask { id, due_at, order, task });
        log::trace!("[timer] schedule id={} due_at={} delay_ms={}", id.0, due_at, delay_ms);
        id
    }

    pub(crate) fn clear_timeout(&mut self, id: TimerId) -> bool {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != id);
        let removed = before != self.task_queue.len();
        log::trace!("[timer] clear id={} removed={}", id.0, removed);
        removed
    }

    pub(crate) fn queue_microtask(&mut self, task: Task) {
        self.microtask_queue.push_back(task);
    }

    pub(crate) fn pop_microtask(&mut self) -> Option<Task> {
        self.microtask_queue.pop_front()
    }

    pub(crate) fn pending_timers(&self) -> usize {
        self.task_queue.len()
    }

    /// Remove the earliest timer, optionally only if due by `due_limit`
    pub(crate) fn pop_next_task(&mut self, due_limit: Option<u64>) -> Option<ScheduledTask> {
        let index = self
            .task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.map(|limit| task.due_at <= limit).unwrap_or(true))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(index, _)| index)?;
        Some(self.task_queue.remove(index))
    }
}
