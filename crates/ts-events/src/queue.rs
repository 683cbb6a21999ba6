use crate::error::EventResult;
use crate::service::EventTable;

/// A queued invocation with its payload type erased.
pub(crate) trait Pending: Send {
    /// The intrusive link to the next queued invocation.
    fn link(&mut self) -> &mut Option<Box<dyn Pending>>;

    /// Hand the payload to its event's listeners and recycle the record.
    fn deliver(self: Box<Self>, table: &mut EventTable) -> EventResult<()>;
}

/// Singly linked list threaded through the invocation records themselves.
///
/// Pushing, popping and taking the whole list only move pointers, so holding
/// the waiting queue's lock never reaches the allocator.
#[derive(Default)]
pub(crate) struct PendingList {
    head: Option<Box<dyn Pending>>,
    len: usize,
}

impl PendingList {
    /// Link `node` in front of the current head.
    pub(crate) fn push_front(&mut self, mut node: Box<dyn Pending>) {
        *node.link() = self.head.take();
        self.head = Some(node);
        self.len += 1;
    }

    /// Unlink and return the head.
    pub(crate) fn pop_front(&mut self) -> Option<Box<dyn Pending>> {
        let mut node = self.head.take()?;
        self.head = node.link().take();
        self.len -= 1;
        Some(node)
    }

    /// Move every node out, leaving this list empty.
    pub(crate) fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Reverse the link order in place.
    pub(crate) fn reverse(&mut self) {
        let mut reversed: Option<Box<dyn Pending>> = None;
        while let Some(mut node) = self.head.take() {
            self.head = node.link().take();
            *node.link() = reversed;
            reversed = Some(node);
        }
        self.head = reversed;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl Drop for PendingList {
    fn drop(&mut self) {
        // Iterative, so a long backlog cannot overflow the stack.
        while self.pop_front().is_some() {}
    }
}
