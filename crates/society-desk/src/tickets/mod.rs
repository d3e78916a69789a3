//! Maintenance-ticket lifecycle: reporting, role-gated status transitions, the audit trail
//! and the comment thread.

pub mod audit;
pub mod domain;
pub mod identity;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use audit::{AuditTrail, CommentThread};
pub use domain::{
    ActorIdentity, ActorRole, AuthorType, Comment, NewTicket, StatusChange, StatusChangeRequest,
    Ticket, TicketCategory, TicketId, TicketPriority, TicketStatus,
};
pub use identity::{AuthenticationError, Credentials, IdentityResolver, TokenDirectory};
pub use memory::InMemoryTicketRepository;
pub use repository::{RepositoryError, TicketQuery, TicketRepository, VersionedTicket};
pub use router::{ticket_router, TicketApi, TicketApiError};
pub use service::{TicketLifecycleService, TicketServiceError, ValidationError};
pub use transitions::{
    allowed_targets, can_transition, transition_table, TransitionRole, TransitionRow,
};
