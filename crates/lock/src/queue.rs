//! Wait queue of requests that could not be granted on arrival.

use crate::continuation::RequesterContinuation;
use chrono::{DateTime, Utc};
use lockyard_events::{QueueReason, Uuid};
use lockyard_types::{ContextId, Requester, RequesterId, ResourceRequest};
use std::fmt;

/// A pending request and the requester suspended on it
pub(crate) struct QueueEntry {
    pub(crate) ticket: u64,
    pub(crate) requester: Requester,
    pub(crate) request: ResourceRequest,
    pub(crate) reason: QueueReason,
    pub(crate) admitted_at: DateTime<Utc>,
    /// Id of the `Queued` event, parent of the eventual wake-up
    pub(crate) admission_event: Uuid,
    pub(crate) continuation: Box<dyn RequesterContinuation>,
}

impl QueueEntry {
    pub(crate) fn snapshot(&self) -> QueuedRequest {
        QueuedRequest {
            ticket: self.ticket,
            requester: self.requester.clone(),
            request: self.request.clone(),
            reason: self.reason.clone(),
            admitted_at: self.admitted_at,
        }
    }
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("ticket", &self.ticket)
            .field("requester", &self.requester)
            .field("request", &self.request)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRequest {
    pub ticket: u64,
    pub requester: Requester,
    pub request: ResourceRequest,
    pub reason: QueueReason,
    pub admitted_at: DateTime<Utc>,
}

/// Entries in admission order; at most one per context
#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    entries: Vec<QueueEntry>,
}

impl WaitQueue {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub(crate) fn position_of(&self, context: &ContextId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.requester.context == context)
    }

    pub(crate) fn get(&self, position: usize) -> Option<&QueueEntry> {
        self.entries.get(position)
    }

    /// Append an entry; returns its position
    pub(crate) fn push(&mut self, entry: QueueEntry) -> usize {
        debug_assert!(self.position_of(&entry.requester.context).is_none());
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub(crate) fn remove(&mut self, position: usize) -> QueueEntry {
        self.entries.remove(position)
    }

    /// Remove every entry of an execution, in admission order
    pub(crate) fn drain_requester(&mut self, requester: &RequesterId) -> Vec<QueueEntry> {
        let mut drained = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if &entry.requester.id == requester {
                drained.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        drained
    }

    pub(crate) fn snapshot(&self) -> Vec<QueuedRequest> {
        self.entries.iter().map(QueueEntry::snapshot).collect()
    }
}
