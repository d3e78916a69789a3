//! Append-only records attached to a ticket.
//!
//! Neither collection exposes a way to edit, reorder, or remove an entry; the only mutation
//! is `append`, and it is crate-private so changes flow through the lifecycle service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Comment, StatusChange, TicketStatus};

/// Ordered history of every status a ticket has held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail(Vec<StatusChange>);

impl AuditTrail {
    pub(crate) fn opened_by(reporter_id: &str, at: DateTime<Utc>) -> Self {
        Self(vec![StatusChange {
            status: TicketStatus::Pending,
            timestamp: at,
            changed_by: reporter_id.to_string(),
            reason: None,
        }])
    }

    pub(crate) fn append(&mut self, change: StatusChange) {
        self.0.push(change);
    }

    /// Status of the most recent entry. An empty trail is treated as freshly opened.
    pub fn current_status(&self) -> TicketStatus {
        self.0
            .last()
            .map(|change| change.status)
            .unwrap_or(TicketStatus::Pending)
    }

    pub fn entries(&self) -> &[StatusChange] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty and opened with `Pending`.
    pub fn is_well_formed(&self) -> bool {
        matches!(self.0.first(), Some(first) if first.status == TicketStatus::Pending)
    }
}

/// Chronological comment thread; insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentThread(Vec<Comment>);

impl CommentThread {
    pub(crate) fn append(&mut self, comment: Comment) {
        self.0.push(comment);
    }

    pub fn entries(&self) -> &[Comment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Text of the comment mirrored into the thread when a status change carries a reason.
pub fn status_change_summary(status: TicketStatus, reason: &str) -> String {
    format!("Status changed to {status}. Reason: {reason}")
}
