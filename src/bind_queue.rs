use std::collections::VecDeque;

use crate::value::NullableValue;

/// A value queued while statement text is still being composed.
#[derive(Clone, Debug)]
pub struct QueuedBind {
    /// Placeholder label written into the text, e.g. `:q1`.
    pub label: String,
    pub value: NullableValue,
}

/// FIFO of deferred binds and the placeholder labels generated for them.
///
/// Values are snapshotted when queued: later changes to the caller's value
/// do not reach the engine. Labels are numbered from 1 and never reused
/// within one queue, even after entries are popped.
#[derive(Clone, Debug, Default)]
pub struct BindQueue {
    pending: VecDeque<QueuedBind>,
    issued: usize,
}

impl BindQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a copy of `value` and returns the placeholder label to splice
    /// into the statement text.
    pub fn push(&mut self, value: &NullableValue, prefix: &str) -> String {
        self.issued += 1;
        let label = placeholder(prefix, self.issued);
        self.pending.push_back(QueuedBind {
            label: label.clone(),
            value: value.clone(),
        });
        label
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of labels generated so far.
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedBind> {
        self.pending.iter()
    }

    /// Oldest entry still waiting to be bound.
    pub fn front(&self) -> Option<&QueuedBind> {
        self.pending.front()
    }

    pub fn pop_front(&mut self) -> Option<QueuedBind> {
        self.pending.pop_front()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.issued = 0;
    }
}

/// Placeholder token for the `index`-th (one-based) queued value.
pub fn placeholder(prefix: &str, index: usize) -> String {
    format!(":{prefix}{index}")
}
