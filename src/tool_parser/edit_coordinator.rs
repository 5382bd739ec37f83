//! Backpressure for edit-type tool calls.
//!
//! At most one edit payload may be *active* among all streams sharing an
//! [`EditCoordinator`]. A streaming parser only emits an edit tool call after
//! winning [`EditCoordinator::try_begin`]; every other edit block stays
//! deferred and is retried on later scans.
//!
//! Releasing the slot is the job of the external edit applier: it must call
//! [`EditCoordinator::dequeue`] and then [`EditCoordinator::clear_in_flight`].
//! There is no timeout. An applier that never does so stalls every later edit
//! call on this coordinator indefinitely, and a stream that is dropped while
//! its edit is in flight does not release the slot either.

use std::{collections::VecDeque, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

static GLOBAL_COORDINATOR: Lazy<Arc<EditCoordinator>> =
    Lazy::new(|| Arc::new(EditCoordinator::new()));

#[derive(Debug, Default)]
struct EditQueue {
    pending: VecDeque<String>,
    in_flight: bool,
}

impl EditQueue {
    fn is_free(&self) -> bool {
        !self.in_flight && self.pending.is_empty()
    }
}

/// Single-slot queue plus in-flight flag gating edit tool calls
#[derive(Debug, Default)]
pub struct EditCoordinator {
    state: Mutex<EditQueue>,
}

impl EditCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance for callers that do not inject their own
    pub fn global() -> Arc<EditCoordinator> {
        Arc::clone(&GLOBAL_COORDINATOR)
    }

    /// True when no edit is in flight and nothing is queued
    pub fn try_acquire(&self) -> bool {
        self.state.lock().is_free()
    }

    /// Atomically claim the slot: when free, queue `payload` and mark it in
    /// flight. Returns false and changes nothing otherwise.
    pub fn try_begin(&self, payload: String) -> bool {
        let mut state = self.state.lock();
        if !state.is_free() {
            return false;
        }
        state.pending.push_back(payload);
        state.in_flight = true;
        debug!("Edit payload queued, slot now in flight");
        true
    }

    pub fn enqueue(&self, payload: String) {
        self.state.lock().pending.push_back(payload);
    }

    pub fn dequeue(&self) -> Option<String> {
        self.state.lock().pending.pop_front()
    }

    pub fn clear_in_flight(&self) {
        self.state.lock().in_flight = false;
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }
}
