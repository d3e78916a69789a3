use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{AuditTrail, CommentThread};

pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// Identifier wrapper for maintenance tickets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub String);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketCategory {
    Plumbing,
    Electrical,
    Structural,
    Appliance,
    HeatingCooling,
    PestControl,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

/// Lifecycle state of a ticket. Serialized names are read directly by dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TicketStatus {
    Pending,
    Approved,
    Assigned,
    InProgress,
    Completed,
    Rejected,
    Resolved,
}

impl TicketStatus {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Pending,
            Self::Approved,
            Self::Assigned,
            Self::InProgress,
            Self::Completed,
            Self::Rejected,
            Self::Resolved,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Assigned => "Assigned",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
            Self::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Kind of account an actor holds, as resolved by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    Resident,
    Staff,
}

impl ActorRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resident" => Some(Self::Resident),
            "staff" | "management" => Some(Self::Staff),
            _ => None,
        }
    }
}

/// Already-authenticated caller. The lifecycle never sees raw credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorIdentity {
    pub id: String,
    pub name: String,
    pub role: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
}

impl ActorIdentity {
    pub fn resident(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: ActorRole::Resident,
            flat_number: None,
            designation: None,
        }
    }

    pub fn staff(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: ActorRole::Staff,
            flat_number: None,
            designation: None,
        }
    }

    pub fn with_flat_number(mut self, flat_number: impl Into<String>) -> Self {
        self.flat_number = Some(flat_number.into());
        self
    }

    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = Some(designation.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorType {
    Resident,
    Staff,
}

impl From<ActorRole> for AuthorType {
    fn from(role: ActorRole) -> Self {
        match role {
            ActorRole::Resident => AuthorType::Resident,
            ActorRole::Staff => AuthorType::Staff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub text: String,
    pub author_name: String,
    pub author_type: AuthorType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: TicketStatus,
    pub timestamp: DateTime<Utc>,
    pub changed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Fields supplied by a resident when reporting an issue.
///
/// Every field defaults so that absent values surface as a single validation error listing
/// all of them rather than as a deserialization failure on the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub flat_number: String,
    pub society_id: String,
    pub reporter_id: String,
    pub images: Vec<String>,
}

/// Requested move of a ticket to another status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub status: TicketStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl StatusChangeRequest {
    pub fn to(status: TicketStatus) -> Self {
        Self {
            status,
            reason: None,
            assigned_to: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    /// Reason text, ignoring blank input.
    pub fn reason(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
    }
}

/// A reported facility issue and its full history.
///
/// `status` is only ever written together with a new audit entry, so it always mirrors the
/// last entry of `status_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    status: TicketStatus,
    #[serde(default)]
    pub images: Vec<String>,
    pub reporter_id: String,
    pub society_id: String,
    pub flat_number: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    comments: CommentThread,
    status_history: AuditTrail,
}

impl Ticket {
    pub(crate) fn open(id: TicketId, fields: NewTicket, category: TicketCategory) -> Self {
        let NewTicket {
            title,
            description,
            priority,
            flat_number,
            society_id,
            reporter_id,
            images,
            ..
        } = fields;

        let status_history = AuditTrail::opened_by(&reporter_id, Utc::now());
        Self {
            id,
            title,
            description,
            category,
            priority: priority.unwrap_or_default(),
            status: status_history.current_status(),
            images,
            reporter_id,
            society_id,
            flat_number,
            assigned_to: None,
            comments: CommentThread::default(),
            status_history,
        }
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn status_history(&self) -> &[StatusChange] {
        self.status_history.entries()
    }

    pub fn comments(&self) -> &[Comment] {
        self.comments.entries()
    }

    pub fn is_reported_by(&self, actor: &ActorIdentity) -> bool {
        actor.role == ActorRole::Resident && actor.id == self.reporter_id
    }

    /// Whether the stored document still satisfies the audit invariants.
    pub fn is_consistent(&self) -> bool {
        self.status_history.is_well_formed()
            && self.status_history.current_status() == self.status
    }

    pub(crate) fn record_status(&mut self, change: StatusChange) {
        self.status = change.status;
        self.status_history.append(change);
    }

    pub(crate) fn record_comment(&mut self, comment: Comment) {
        self.comments.append(comment);
    }
}
