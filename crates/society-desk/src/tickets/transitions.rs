//! Role-gated status transition table.
//!
//! Reporters may only reopen a ticket (back to `Pending`) or accept completed work
//! (`Completed -> Resolved`). Staff drive the operational workflow and keep a reopen path out
//! of both `Completed` and `Resolved`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{ActorIdentity, ActorRole, Ticket, TicketStatus};
use TicketStatus::*;

/// Capacity in which an actor moves a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionRole {
    Reporter,
    Staff,
}

impl TransitionRole {
    pub const fn ordered() -> [Self; 2] {
        [Self::Reporter, Self::Staff]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Reporter => "Reporter",
            Self::Staff => "Staff",
        }
    }

    /// Role the actor holds with respect to this ticket, if any.
    pub fn for_actor(actor: &ActorIdentity, ticket: &Ticket) -> Option<Self> {
        match actor.role {
            ActorRole::Staff => Some(Self::Staff),
            ActorRole::Resident if ticket.is_reported_by(actor) => Some(Self::Reporter),
            ActorRole::Resident => None,
        }
    }

    /// Whether `actor` may act in this role on `ticket`.
    pub fn permits(self, actor: &ActorIdentity, ticket: &Ticket) -> bool {
        Self::for_actor(actor, ticket) == Some(self)
    }

    pub const fn actor_role(self) -> ActorRole {
        match self {
            Self::Reporter => ActorRole::Resident,
            Self::Staff => ActorRole::Staff,
        }
    }
}

impl fmt::Display for TransitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

type Rule = (TicketStatus, &'static [TicketStatus]);

const REPORTER_RULES: [Rule; 7] = [
    (Pending, &[Pending]),
    (Approved, &[Pending]),
    (Assigned, &[Pending]),
    (InProgress, &[Pending]),
    (Completed, &[Pending, Resolved]),
    (Rejected, &[Pending]),
    (Resolved, &[]),
];

const STAFF_RULES: [Rule; 7] = [
    (Pending, &[Approved, Rejected, Assigned]),
    (Approved, &[Assigned, InProgress, Rejected]),
    (Assigned, &[InProgress, Completed, Rejected]),
    (InProgress, &[Completed, Assigned, Rejected]),
    (Completed, &[InProgress]),
    (Rejected, &[Pending, Approved]),
    (Resolved, &[InProgress]),
];

fn rules(role: TransitionRole) -> &'static [Rule; 7] {
    match role {
        TransitionRole::Reporter => &REPORTER_RULES,
        TransitionRole::Staff => &STAFF_RULES,
    }
}

/// Statuses `role` may move a ticket to from `current`.
pub fn allowed_targets(role: TransitionRole, current: TicketStatus) -> &'static [TicketStatus] {
    rules(role)
        .iter()
        .find(|(from, _)| *from == current)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

pub fn can_transition(role: TransitionRole, current: TicketStatus, requested: TicketStatus) -> bool {
    allowed_targets(role, current).contains(&requested)
}

/// One row of the table, in a shape suitable for listings and API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRow {
    pub role: TransitionRole,
    pub current: TicketStatus,
    pub allowed: Vec<TicketStatus>,
}

/// Full table, reporter rows first, statuses in lifecycle order.
pub fn transition_table() -> Vec<TransitionRow> {
    TransitionRole::ordered()
        .into_iter()
        .flat_map(|role| {
            rules(role).iter().map(move |(current, targets)| TransitionRow {
                role,
                current: *current,
                allowed: targets.to_vec(),
            })
        })
        .collect()
}
