use metrics_exporter_prometheus::PrometheusHandle;
use society_desk::config::IdentityConfig;
use society_desk::tickets::{
    InMemoryTicketRepository, TicketApi, TicketLifecycleService, TokenDirectory,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type TicketState = TicketApi<InMemoryTicketRepository, TokenDirectory>;

/// Wire the lifecycle service to the in-memory store and the configured token directory.
pub(crate) fn ticket_api(identity: &IdentityConfig) -> TicketState {
    let directory = TokenDirectory::from_config(identity);
    if directory.is_empty() {
        warn!("APP_ACTOR_TOKENS is empty; every ticket request will be rejected as unauthenticated");
    }

    let repository = Arc::new(InMemoryTicketRepository::default());
    let service = Arc::new(TicketLifecycleService::new(repository));
    TicketApi::new(service, Arc::new(directory))
}
