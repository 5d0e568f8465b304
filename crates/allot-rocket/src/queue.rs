//! Implementation of the request queue

use std::collections::VecDeque;

use allot_core::{AllocError, AllocationRequest, RequestId};

/// A request waiting in the queue, together with its id
#[derive(Clone, PartialEq, Debug)]
pub struct QueuedRequest {
    pub id: RequestId,
    pub request: AllocationRequest,
}

/// FIFO backlog of requests that have not been satisfied yet
///
/// There are no priorities. A request stuck at the head is not skipped by the
/// queue itself; that is up to the pass mode of the coordinator.
#[derive(Clone, Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<QueuedRequest>,
}

impl RequestQueue {
    /// Create a new empty [`RequestQueue`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, queued: QueuedRequest) {
        self.pending.push_back(queued);
    }

    pub fn dequeue(&mut self) -> Result<QueuedRequest, AllocError> {
        self.pending.pop_front().ok_or(AllocError::QueueEmpty)
    }

    /// Put a request back at the tail
    pub fn requeue(&mut self, queued: QueuedRequest) {
        self.pending.push_back(queued);
    }

    /// Take a request out of the queue without serving it
    pub fn remove(&mut self, id: RequestId) -> Result<QueuedRequest, AllocError> {
        let position = self
            .pending
            .iter()
            .position(|queued| queued.id == id)
            .ok_or(AllocError::UnknownRequest(id))?;
        self.pending
            .remove(position)
            .ok_or(AllocError::UnknownRequest(id))
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.pending.iter().any(|queued| queued.id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedRequest> {
        self.pending.iter()
    }
}
