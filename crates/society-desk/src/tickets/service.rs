use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::audit::status_change_summary;
use super::domain::{
    ActorIdentity, ActorRole, AuthorType, Comment, NewTicket, StatusChange, StatusChangeRequest,
    Ticket, TicketCategory, TicketId, TicketStatus, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN,
};
use super::repository::{RepositoryError, TicketQuery, TicketRepository, VersionedTicket};
use super::transitions::{can_transition, TransitionRole};

/// Service composing the transition table, audit trail, comment thread and repository.
///
/// Every mutating operation performs one fetch and at most one versioned write; a concurrent
/// writer on the same ticket surfaces as [`TicketServiceError::Conflict`] and is never retried
/// here.
pub struct TicketLifecycleService<R> {
    repository: Arc<R>,
}

static TICKET_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_ticket_id() -> TicketId {
    let id = TICKET_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TicketId(format!("tkt-{id:06}"))
}

impl<R> TicketLifecycleService<R>
where
    R: TicketRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Validate and store a newly reported issue.
    pub fn create(&self, fields: NewTicket) -> Result<Ticket, TicketServiceError> {
        let category = validate_new_ticket(&fields)?;
        let ticket = Ticket::open(next_ticket_id(), fields, category);

        let stored = self.repository.insert(ticket)?;
        info!(
            ticket_id = %stored.ticket.id,
            society_id = %stored.ticket.society_id,
            category = ?stored.ticket.category,
            priority = ?stored.ticket.priority,
            "maintenance ticket created"
        );
        Ok(stored.ticket)
    }

    /// Move a ticket to the requested status on behalf of `actor`.
    pub fn change_status(
        &self,
        ticket_id: &TicketId,
        role: TransitionRole,
        actor: &ActorIdentity,
        request: StatusChangeRequest,
    ) -> Result<Ticket, TicketServiceError> {
        let VersionedTicket {
            mut ticket,
            version,
        } = self.load(ticket_id)?;

        if !role.permits(actor, &ticket) {
            warn!(ticket_id = %ticket_id, actor = %actor.id, %role, "actor does not hold role");
            return Err(TicketServiceError::Forbidden {
                actor: actor.id.clone(),
                role,
            });
        }

        let current = ticket.status();
        let requested = request.status;
        if !can_transition(role, current, requested) {
            warn!(ticket_id = %ticket_id, %role, %current, %requested, "transition rejected");
            return Err(TicketServiceError::InvalidTransition {
                role,
                current,
                requested,
            });
        }

        let now = Utc::now();
        let reason = request.reason().map(str::to_string);
        ticket.record_status(StatusChange {
            status: requested,
            timestamp: now,
            changed_by: actor.id.clone(),
            reason: reason.clone(),
        });

        if role == TransitionRole::Staff && requested == TicketStatus::Assigned {
            if let Some(assignee) = request.assigned_to.filter(|a| !a.trim().is_empty()) {
                ticket.assigned_to = Some(assignee);
            }
        }

        if let Some(reason) = reason.as_deref() {
            let comment = comment_from(
                actor,
                role.actor_role(),
                &ticket,
                status_change_summary(requested, reason),
                Vec::new(),
            );
            ticket.record_comment(Comment {
                timestamp: now,
                ..comment
            });
        }

        let stored = self.save(ticket, version)?;
        info!(
            ticket_id = %ticket_id,
            actor = %actor.id,
            %role,
            from = %current,
            to = %requested,
            "ticket status changed"
        );
        Ok(stored.ticket)
    }

    /// Append a comment to the thread; status and audit trail are left untouched.
    pub fn add_comment(
        &self,
        ticket_id: &TicketId,
        actor: &ActorIdentity,
        text: &str,
        attachments: Vec<String>,
    ) -> Result<Ticket, TicketServiceError> {
        let VersionedTicket {
            mut ticket,
            version,
        } = self.load(ticket_id)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }

        let comment = comment_from(actor, actor.role, &ticket, text.to_string(), attachments);
        ticket.record_comment(comment);

        let stored = self.save(ticket, version)?;
        info!(
            ticket_id = %ticket_id,
            actor = %actor.id,
            comments = stored.ticket.comments().len(),
            "comment added"
        );
        Ok(stored.ticket)
    }

    /// Remove a ticket that has not yet left `Pending`.
    pub fn delete(&self, ticket_id: &TicketId) -> Result<(), TicketServiceError> {
        let VersionedTicket { ticket, version } = self.load(ticket_id)?;

        if ticket.status() != TicketStatus::Pending {
            warn!(ticket_id = %ticket_id, status = %ticket.status(), "deletion blocked");
            return Err(TicketServiceError::DeletionNotAllowed {
                ticket_id: ticket_id.clone(),
                status: ticket.status(),
            });
        }

        self.repository
            .delete(ticket_id, version)
            .map_err(|err| TicketServiceError::from_repository(err, ticket_id))?;
        info!(ticket_id = %ticket_id, "ticket deleted");
        Ok(())
    }

    pub fn get(&self, ticket_id: &TicketId) -> Result<Ticket, TicketServiceError> {
        debug!(ticket_id = %ticket_id, "fetching ticket");
        self.load(ticket_id).map(|stored| stored.ticket)
    }

    pub fn list(&self, query: &TicketQuery) -> Result<Vec<Ticket>, TicketServiceError> {
        debug!(?query, "listing tickets");
        Ok(self.repository.list(query)?)
    }

    fn load(&self, ticket_id: &TicketId) -> Result<VersionedTicket, TicketServiceError> {
        self.repository
            .fetch(ticket_id)?
            .ok_or_else(|| TicketServiceError::NotFound(ticket_id.clone()))
    }

    fn save(&self, ticket: Ticket, version: u64) -> Result<VersionedTicket, TicketServiceError> {
        let ticket_id = ticket.id.clone();
        self.repository
            .update(ticket, version)
            .map_err(|err| TicketServiceError::from_repository(err, &ticket_id))
    }
}

fn comment_from(
    actor: &ActorIdentity,
    role: ActorRole,
    ticket: &Ticket,
    text: String,
    attachments: Vec<String>,
) -> Comment {
    let author_type = AuthorType::from(role);
    let (flat_number, staff_role) = match author_type {
        AuthorType::Resident => {
            let flat = actor.flat_number.clone().or_else(|| {
                ticket
                    .is_reported_by(actor)
                    .then(|| ticket.flat_number.clone())
            });
            (flat, None)
        }
        AuthorType::Staff => {
            let designation = actor
                .designation
                .clone()
                .unwrap_or_else(|| "Staff".to_string());
            (None, Some(designation))
        }
    };

    Comment {
        text,
        author_name: actor.name.clone(),
        author_type,
        timestamp: Utc::now(),
        attachments,
        flat_number,
        role: staff_role,
    }
}

fn validate_new_ticket(fields: &NewTicket) -> Result<TicketCategory, ValidationError> {
    let mut missing = Vec::new();
    let required = [
        ("title", &fields.title),
        ("description", &fields.description),
        ("flatNumber", &fields.flat_number),
        ("societyId", &fields.society_id),
        ("reporterId", &fields.reporter_id),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            missing.push(name);
        }
    }
    if fields.category.is_none() {
        missing.push("category");
    }

    let category = match fields.category {
        Some(category) if missing.is_empty() => category,
        _ => return Err(ValidationError::MissingFields(missing)),
    };

    if fields.title.chars().count() > TITLE_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "title",
            limit: TITLE_MAX_LEN,
        });
    }
    if fields.description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "description",
            limit: DESCRIPTION_MAX_LEN,
        });
    }

    Ok(category)
}

/// Input rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{field} must be at most {limit} characters")]
    TooLong { field: &'static str, limit: usize },
    #[error("comment text must not be empty")]
    EmptyComment,
}

impl ValidationError {
    /// Offending field names, for structured error payloads.
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::MissingFields(fields) => fields.clone(),
            ValidationError::TooLong { field, .. } => vec![*field],
            ValidationError::EmptyComment => vec!["text"],
        }
    }
}

/// Error raised by the lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum TicketServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("ticket {0} not found")]
    NotFound(TicketId),
    #[error("{role} cannot move a ticket from {current} to {requested}")]
    InvalidTransition {
        role: TransitionRole,
        current: TicketStatus,
        requested: TicketStatus,
    },
    #[error("ticket {ticket_id} is {status}; only pending tickets can be deleted")]
    DeletionNotAllowed {
        ticket_id: TicketId,
        status: TicketStatus,
    },
    #[error("actor {actor} cannot act as {role} on this ticket")]
    Forbidden { actor: String, role: TransitionRole },
    #[error("ticket {0} was modified concurrently; retry the operation")]
    Conflict(TicketId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TicketServiceError {
    fn from_repository(err: RepositoryError, ticket_id: &TicketId) -> Self {
        match err {
            RepositoryError::Conflict => Self::Conflict(ticket_id.clone()),
            RepositoryError::NotFound => Self::NotFound(ticket_id.clone()),
            other => Self::Repository(other),
        }
    }
}
