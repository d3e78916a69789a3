use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::tickets::domain::{
    ActorIdentity, NewTicket, StatusChangeRequest, Ticket, TicketCategory, TicketId, TicketStatus,
};
use crate::tickets::identity::TokenDirectory;
use crate::tickets::memory::InMemoryTicketRepository;
use crate::tickets::repository::{RepositoryError, TicketQuery, TicketRepository, VersionedTicket};
use crate::tickets::router::{ticket_router, TicketApi};
use crate::tickets::service::TicketLifecycleService;
use crate::tickets::transitions::TransitionRole;

pub(super) const RESIDENT_TOKEN: &str = "resident-r1";
pub(super) const NEIGHBOUR_TOKEN: &str = "resident-r2";
pub(super) const STAFF_TOKEN: &str = "staff-m1";

pub(super) fn reporter() -> ActorIdentity {
    ActorIdentity::resident("R1", "Asha Rao").with_flat_number("A-101")
}

pub(super) fn neighbour() -> ActorIdentity {
    ActorIdentity::resident("R2", "Vikram Shah").with_flat_number("B-204")
}

pub(super) fn manager() -> ActorIdentity {
    ActorIdentity::staff("M1", "Meera Iyer").with_designation("Facility Manager")
}

pub(super) fn leaking_tap() -> NewTicket {
    NewTicket {
        title: "Leaking tap".to_string(),
        description: "Kitchen tap has been dripping since Monday".to_string(),
        category: Some(TicketCategory::Plumbing),
        priority: None,
        flat_number: "A-101".to_string(),
        society_id: "S1".to_string(),
        reporter_id: "R1".to_string(),
        images: vec!["https://cdn.example/tickets/tap.jpg".to_string()],
    }
}

pub(super) fn build_service() -> (
    TicketLifecycleService<InMemoryTicketRepository>,
    Arc<InMemoryTicketRepository>,
) {
    let repository = Arc::new(InMemoryTicketRepository::default());
    let service = TicketLifecycleService::new(repository.clone());
    (service, repository)
}

/// Walk a fresh ticket through staff transitions until it reaches `target`.
pub(super) fn ticket_in_status(
    service: &TicketLifecycleService<InMemoryTicketRepository>,
    target: TicketStatus,
) -> Ticket {
    let ticket = service.create(leaking_tap()).expect("ticket created");
    let path: &[TicketStatus] = match target {
        TicketStatus::Pending => &[],
        TicketStatus::Approved => &[TicketStatus::Approved],
        TicketStatus::Assigned => &[TicketStatus::Assigned],
        TicketStatus::InProgress => &[TicketStatus::Approved, TicketStatus::InProgress],
        TicketStatus::Completed => &[TicketStatus::Assigned, TicketStatus::Completed],
        TicketStatus::Rejected => &[TicketStatus::Rejected],
        TicketStatus::Resolved => &[TicketStatus::Assigned, TicketStatus::Completed],
    };

    let mut current = ticket;
    for status in path {
        current = service
            .change_status(
                &current.id,
                TransitionRole::Staff,
                &manager(),
                StatusChangeRequest::to(*status),
            )
            .expect("staff transition along setup path");
    }
    if target == TicketStatus::Resolved {
        current = service
            .change_status(
                &current.id,
                TransitionRole::Reporter,
                &reporter(),
                StatusChangeRequest::to(TicketStatus::Resolved),
            )
            .expect("reporter closes completed ticket");
    }
    assert_eq!(current.status(), target);
    current
}

pub(super) fn token_directory() -> TokenDirectory {
    TokenDirectory::default()
        .with_actor(RESIDENT_TOKEN, reporter())
        .with_actor(NEIGHBOUR_TOKEN, neighbour())
        .with_actor(STAFF_TOKEN, manager())
}

pub(super) fn router_with_service(
    service: TicketLifecycleService<InMemoryTicketRepository>,
) -> axum::Router {
    ticket_router(TicketApi::new(
        Arc::new(service),
        Arc::new(token_directory()),
    ))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Repository whose stored version moves on between the service's read and write, as if a
/// second request had committed in the meantime.
#[derive(Default)]
pub(super) struct RacingRepository {
    pub(super) inner: InMemoryTicketRepository,
    pub(super) interfere: AtomicBool,
}

impl RacingRepository {
    fn bump(&self, id: &TicketId) -> Result<(), RepositoryError> {
        if let Some(stored) = self.inner.fetch(id)? {
            self.inner.update(stored.ticket, stored.version)?;
        }
        Ok(())
    }
}

impl TicketRepository for RacingRepository {
    fn insert(&self, ticket: Ticket) -> Result<VersionedTicket, RepositoryError> {
        self.inner.insert(ticket)
    }

    fn fetch(&self, id: &TicketId) -> Result<Option<VersionedTicket>, RepositoryError> {
        let stored = self.inner.fetch(id)?;
        if self.interfere.swap(false, Ordering::SeqCst) {
            self.bump(id)?;
        }
        Ok(stored)
    }

    fn update(
        &self,
        ticket: Ticket,
        expected_version: u64,
    ) -> Result<VersionedTicket, RepositoryError> {
        self.inner.update(ticket, expected_version)
    }

    fn delete(&self, id: &TicketId, expected_version: u64) -> Result<(), RepositoryError> {
        self.inner.delete(id, expected_version)
    }

    fn list(&self, query: &TicketQuery) -> Result<Vec<Ticket>, RepositoryError> {
        self.inner.list(query)
    }
}

pub(super) struct UnavailableRepository;

impl TicketRepository for UnavailableRepository {
    fn insert(&self, _ticket: Ticket) -> Result<VersionedTicket, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &TicketId) -> Result<Option<VersionedTicket>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _ticket: Ticket,
        _expected_version: u64,
    ) -> Result<VersionedTicket, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &TicketId, _expected_version: u64) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _query: &TicketQuery) -> Result<Vec<Ticket>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
