use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ActorIdentity, ActorRole, NewTicket, StatusChangeRequest, TicketId};
use super::identity::{AuthenticationError, Credentials, IdentityResolver};
use super::repository::{RepositoryError, TicketQuery, TicketRepository};
use super::service::{TicketLifecycleService, TicketServiceError};
use super::transitions::{transition_table, TransitionRole};

/// Shared handler state: the lifecycle service plus the identity boundary.
pub struct TicketApi<R, I> {
    service: Arc<TicketLifecycleService<R>>,
    identities: Arc<I>,
}

impl<R, I> Clone for TicketApi<R, I> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            identities: self.identities.clone(),
        }
    }
}

impl<R, I> TicketApi<R, I>
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    pub fn new(service: Arc<TicketLifecycleService<R>>, identities: Arc<I>) -> Self {
        Self {
            service,
            identities,
        }
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<ActorIdentity, TicketApiError> {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let credentials = Credentials::from_authorization(authorization);
        Ok(self.identities.resolve(&credentials)?)
    }
}

/// Router builder exposing the ticket lifecycle over HTTP.
pub fn ticket_router<R, I>(api: TicketApi<R, I>) -> Router
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    Router::new()
        .route(
            "/api/v1/tickets",
            post(create_handler::<R, I>).get(list_handler::<R, I>),
        )
        .route(
            "/api/v1/tickets/:ticket_id",
            get(get_handler::<R, I>).delete(delete_handler::<R, I>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/status",
            post(status_handler::<R, I>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/comments",
            post(comment_handler::<R, I>),
        )
        .route("/api/v1/ticket-transitions", get(transitions_handler))
        .with_state(api)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentRequest {
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) attachments: Vec<String>,
}

pub(crate) async fn create_handler<R, I>(
    State(api): State<TicketApi<R, I>>,
    headers: HeaderMap,
    body: Result<Json<NewTicket>, JsonRejection>,
) -> Result<Response, TicketApiError>
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    let actor = api.authenticate(&headers)?;
    if actor.role != ActorRole::Resident {
        return Err(TicketApiError::Forbidden("only residents can report issues"));
    }
    let Json(mut fields) = body?;

    fields.reporter_id = actor.id;
    if fields.flat_number.trim().is_empty() {
        if let Some(flat) = actor.flat_number {
            fields.flat_number = flat;
        }
    }

    let ticket = api.service.create(fields)?;
    Ok((StatusCode::CREATED, Json(ticket)).into_response())
}

pub(crate) async fn list_handler<R, I>(
    State(api): State<TicketApi<R, I>>,
    headers: HeaderMap,
    Query(mut query): Query<TicketQuery>,
) -> Result<Response, TicketApiError>
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    let actor = api.authenticate(&headers)?;
    if actor.role == ActorRole::Resident {
        query.reporter_id = Some(actor.id);
    }

    let tickets = api.service.list(&query)?;
    Ok((StatusCode::OK, Json(tickets)).into_response())
}

pub(crate) async fn get_handler<R, I>(
    State(api): State<TicketApi<R, I>>,
    headers: HeaderMap,
    Path(ticket_id): Path<String>,
) -> Result<Response, TicketApiError>
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    let actor = api.authenticate(&headers)?;
    let ticket = api.service.get(&TicketId(ticket_id))?;
    if TransitionRole::for_actor(&actor, &ticket).is_none() {
        return Err(TicketApiError::Forbidden(
            "only the reporter or staff can view a ticket",
        ));
    }
    Ok((StatusCode::OK, Json(ticket)).into_response())
}

pub(crate) async fn status_handler<R, I>(
    State(api): State<TicketApi<R, I>>,
    headers: HeaderMap,
    Path(ticket_id): Path<String>,
    body: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Response, TicketApiError>
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    let actor = api.authenticate(&headers)?;
    let Json(request) = body?;
    let ticket_id = TicketId(ticket_id);
    let current = api.service.get(&ticket_id)?;
    let role = TransitionRole::for_actor(&actor, &current)
        .ok_or(TicketApiError::Forbidden("only the reporter or staff can change status"))?;

    let ticket = api
        .service
        .change_status(&ticket_id, role, &actor, request)?;
    Ok((StatusCode::OK, Json(ticket)).into_response())
}

pub(crate) async fn comment_handler<R, I>(
    State(api): State<TicketApi<R, I>>,
    headers: HeaderMap,
    Path(ticket_id): Path<String>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Response, TicketApiError>
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    let actor = api.authenticate(&headers)?;
    let Json(request) = body?;
    let ticket = api.service.add_comment(
        &TicketId(ticket_id),
        &actor,
        &request.text,
        request.attachments,
    )?;
    Ok((StatusCode::CREATED, Json(ticket)).into_response())
}

pub(crate) async fn delete_handler<R, I>(
    State(api): State<TicketApi<R, I>>,
    headers: HeaderMap,
    Path(ticket_id): Path<String>,
) -> Result<Response, TicketApiError>
where
    R: TicketRepository + 'static,
    I: IdentityResolver + 'static,
{
    let actor = api.authenticate(&headers)?;
    let ticket_id = TicketId(ticket_id);
    let current = api.service.get(&ticket_id)?;
    if TransitionRole::for_actor(&actor, &current).is_none() {
        return Err(TicketApiError::Forbidden(
            "only the reporter or staff can delete a ticket",
        ));
    }

    api.service.delete(&ticket_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn transitions_handler() -> Response {
    (StatusCode::OK, Json(transition_table())).into_response()
}

/// Rejection produced by the ticket handlers.
#[derive(Debug, thiserror::Error)]
pub enum TicketApiError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("malformed request body: {}", .0.body_text())]
    MalformedBody(#[from] JsonRejection),
    #[error(transparent)]
    Service(#[from] TicketServiceError),
}

impl TicketApiError {
    fn status(&self) -> StatusCode {
        match self {
            TicketApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            TicketApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            TicketApiError::MalformedBody(rejection) => rejection.status(),
            TicketApiError::Service(error) => match error {
                TicketServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TicketServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                TicketServiceError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                TicketServiceError::DeletionNotAllowed { .. } => StatusCode::CONFLICT,
                TicketServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
                TicketServiceError::Conflict(_) => StatusCode::CONFLICT,
                TicketServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
                TicketServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for TicketApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut payload = json!({ "error": self.to_string() });

        match &self {
            TicketApiError::Service(TicketServiceError::InvalidTransition {
                role,
                current,
                requested,
            }) => {
                payload["role"] = json!(role);
                payload["current"] = json!(current);
                payload["requested"] = json!(requested);
            }
            TicketApiError::Service(TicketServiceError::Validation(error)) => {
                payload["fields"] = json!(error.fields());
            }
            _ => {}
        }

        (status, Json(payload)).into_response()
    }
}
