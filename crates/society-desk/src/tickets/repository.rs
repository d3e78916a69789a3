use serde::{Deserialize, Serialize};

use super::domain::{Ticket, TicketId, TicketStatus};

/// Stored ticket together with the version used for optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionedTicket {
    pub ticket: Ticket,
    pub version: u64,
}

/// Dashboard-style filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TicketQuery {
    pub society_id: Option<String>,
    pub reporter_id: Option<String>,
    pub status: Option<TicketStatus>,
}

impl TicketQuery {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.society_id
            .as_deref()
            .map_or(true, |society| ticket.society_id == society)
            && self
                .reporter_id
                .as_deref()
                .map_or(true, |reporter| ticket.reporter_id == reporter)
            && self.status.map_or(true, |status| ticket.status() == status)
    }
}

/// Storage abstraction so the lifecycle service can be exercised in isolation.
///
/// `update` and `delete` take the version observed by the preceding `fetch` and must fail
/// with [`RepositoryError::Conflict`] if the stored version moved on in between. That check
/// is what serializes read-modify-write cycles on a single ticket.
pub trait TicketRepository: Send + Sync {
    fn insert(&self, ticket: Ticket) -> Result<VersionedTicket, RepositoryError>;
    fn fetch(&self, id: &TicketId) -> Result<Option<VersionedTicket>, RepositoryError>;
    fn update(&self, ticket: Ticket, expected_version: u64)
        -> Result<VersionedTicket, RepositoryError>;
    fn delete(&self, id: &TicketId, expected_version: u64) -> Result<(), RepositoryError>;
    fn list(&self, query: &TicketQuery) -> Result<Vec<Ticket>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
