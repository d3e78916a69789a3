use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Ticket, TicketId};
use super::repository::{RepositoryError, TicketQuery, TicketRepository, VersionedTicket};

/// Process-local ticket store honouring the optimistic version contract.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTicketRepository {
    records: Arc<Mutex<BTreeMap<TicketId, VersionedTicket>>>,
}

impl InMemoryTicketRepository {
    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<TicketId, VersionedTicket>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ticket store lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.records().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TicketRepository for InMemoryTicketRepository {
    fn insert(&self, ticket: Ticket) -> Result<VersionedTicket, RepositoryError> {
        let mut records = self.records()?;
        if records.contains_key(&ticket.id) {
            return Err(RepositoryError::Conflict);
        }
        let stored = VersionedTicket { ticket, version: 1 };
        records.insert(stored.ticket.id.clone(), stored.clone());
        Ok(stored)
    }

    fn fetch(&self, id: &TicketId) -> Result<Option<VersionedTicket>, RepositoryError> {
        Ok(self.records()?.get(id).cloned())
    }

    fn update(
        &self,
        ticket: Ticket,
        expected_version: u64,
    ) -> Result<VersionedTicket, RepositoryError> {
        let mut records = self.records()?;
        let current = records
            .get_mut(&ticket.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        *current = VersionedTicket {
            ticket,
            version: expected_version + 1,
        };
        Ok(current.clone())
    }

    fn delete(&self, id: &TicketId, expected_version: u64) -> Result<(), RepositoryError> {
        let mut records = self.records()?;
        match records.get(id) {
            None => Err(RepositoryError::NotFound),
            Some(current) if current.version != expected_version => {
                Err(RepositoryError::Conflict)
            }
            Some(_) => {
                records.remove(id);
                Ok(())
            }
        }
    }

    fn list(&self, query: &TicketQuery) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self
            .records()?
            .values()
            .filter(|stored| query.matches(&stored.ticket))
            .map(|stored| stored.ticket.clone())
            .collect())
    }
}
