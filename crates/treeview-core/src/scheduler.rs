//! Cancelable timers driven by a host clock.
//!
//! Nothing here sleeps or spawns: the host reports the current time through
//! [`Timers::advance`], which returns the tasks that came due, in deadline
//! order. Each owner (a tree, a drag controller) keeps its own `Timers`, so
//! clearing one instance can never touch another's callbacks.
//!
//! Cancelling is idempotent: cancelling a task that already fired or was
//! already cancelled is a no-op that returns `false`.

use std::collections::{BTreeMap, HashMap};

/// Handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
pub struct Timers<T> {
    now_ms: u64,
    next_id: u64,
    queue: BTreeMap<(u64, u64), T>,
    deadlines: HashMap<TaskId, u64>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `task` to fire `delay_ms` after the current time.
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let deadline = self.now_ms.saturating_add(delay_ms);
        self.queue.insert((deadline, id.0), task);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Cancel a pending task. Returns whether anything was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.queue.remove(&(deadline, id.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Move the clock to `now_ms` and return every task that came due.
    /// The clock never runs backwards.
    pub fn advance(&mut self, now_ms: u64) -> Vec<(TaskId, T)> {
        self.now_ms = self.now_ms.max(now_ms);
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > self.now_ms {
                break;
            }
            let ((_, raw), task) = entry.remove_entry();
            let id = TaskId(raw);
            self.deadlines.remove(&id);
            due.push((id, task));
        }
        due
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }
}
