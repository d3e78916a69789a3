use super::common::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::tickets::domain::TicketStatus;
use crate::tickets::identity::TokenDirectory;
use crate::tickets::router::{ticket_router, TicketApi};
use crate::tickets::service::TicketLifecycleService;

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

fn new_ticket_body() -> Value {
    json!({
        "title": "Leaking tap",
        "description": "Kitchen tap has been dripping since Monday",
        "category": "Plumbing",
        "flatNumber": "A-101",
        "societyId": "S1",
        "images": ["https://cdn.example/tickets/tap.jpg"]
    })
}

async fn create_via_api(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/tickets",
            Some(RESIDENT_TOKEN),
            Some(new_ticket_body()),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    body["id"].as_str().expect("ticket id").to_string()
}

#[tokio::test]
async fn create_route_uses_actor_as_reporter() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/tickets",
            Some(RESIDENT_TOKEN),
            Some(new_ticket_body()),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["priority"], "Medium");
    assert_eq!(body["reporterId"], "R1");
    assert_eq!(body["statusHistory"][0]["changedBy"], "R1");
    assert_eq!(body["comments"], json!([]));
}

#[tokio::test]
async fn create_route_reports_missing_fields() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/tickets",
            Some(RESIDENT_TOKEN),
            Some(json!({ "title": "Broken lift", "societyId": "S1" })),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["fields"], json!(["description", "category"]));
}

#[tokio::test]
async fn requests_without_known_credentials_are_unauthorized() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    for token in [None, Some("forged")] {
        let response = router
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/v1/tickets",
                token,
                Some(new_ticket_body()),
            ))
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn staff_cannot_report_issues() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/tickets",
            Some(STAFF_TOKEN),
            Some(new_ticket_body()),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn status_route_derives_role_from_actor() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let ticket_id = create_via_api(&router).await;
    let uri = format!("/api/v1/tickets/{ticket_id}/status");

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            &uri,
            Some(RESIDENT_TOKEN),
            Some(json!({ "status": "Approved" })),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["role"], "Reporter");
    assert_eq!(body["current"], "Pending");
    assert_eq!(body["requested"], "Approved");

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            &uri,
            Some(STAFF_TOKEN),
            Some(json!({ "status": "Assigned", "reason": "Plumber booked", "assignedTo": "P7" })),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "Assigned");
    assert_eq!(body["assignedTo"], "P7");
    assert_eq!(
        body["comments"][0]["text"],
        "Status changed to Assigned. Reason: Plumber booked"
    );

    let response = router
        .oneshot(request(
            Method::POST,
            &uri,
            Some(NEIGHBOUR_TOKEN),
            Some(json!({ "status": "Pending" })),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn comment_route_appends_to_thread() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let ticket_id = create_via_api(&router).await;
    let uri = format!("/api/v1/tickets/{ticket_id}/comments");

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            &uri,
            Some(STAFF_TOKEN),
            Some(json!({ "text": "Visiting tomorrow at 10" })),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["comments"][0]["authorType"], "Staff");
    assert_eq!(body["comments"][0]["role"], "Facility Manager");
    assert_eq!(body["status"], "Pending");

    let response = router
        .oneshot(request(
            Method::POST,
            &uri,
            Some(RESIDENT_TOKEN),
            Some(json!({ "text": "   " })),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_route_refuses_non_pending_tickets() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let ticket_id = create_via_api(&router).await;

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/tickets/{ticket_id}/status"),
            Some(STAFF_TOKEN),
            Some(json!({ "status": "Assigned" })),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);

    let ticket_uri = format!("/api/v1/tickets/{ticket_id}");
    let response = router
        .clone()
        .oneshot(request(Method::DELETE, &ticket_uri, Some(RESIDENT_TOKEN), None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .oneshot(request(Method::GET, &ticket_uri, Some(RESIDENT_TOKEN), None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "Assigned");
}

#[tokio::test]
async fn delete_route_removes_pending_ticket() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let ticket_id = create_via_api(&router).await;
    let ticket_uri = format!("/api/v1/tickets/{ticket_id}");

    let response = router
        .clone()
        .oneshot(request(Method::DELETE, &ticket_uri, Some(NEIGHBOUR_TOKEN), None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .clone()
        .oneshot(request(Method::DELETE, &ticket_uri, Some(RESIDENT_TOKEN), None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(request(Method::GET, &ticket_uri, Some(STAFF_TOKEN), None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_route_hides_tickets_from_other_residents() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let ticket_id = create_via_api(&router).await;
    let ticket_uri = format!("/api/v1/tickets/{ticket_id}");

    let response = router
        .clone()
        .oneshot(request(Method::GET, &ticket_uri, Some(NEIGHBOUR_TOKEN), None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request(Method::GET, &ticket_uri, Some(RESIDENT_TOKEN), None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["reporterId"], "R1");
}

#[tokio::test]
async fn malformed_body_is_rejected_as_json_error() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let mut body = new_ticket_body();
    body["category"] = json!("Garden");

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/tickets",
            Some(RESIDENT_TOKEN),
            Some(body.clone()),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let message = payload["error"].as_str().expect("error message");
    assert!(message.starts_with("malformed request body"), "{message}");

    let response = router
        .oneshot(request(Method::POST, "/api/v1/tickets", None, Some(body)))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_route_scopes_residents_to_their_own_tickets() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    create_via_api(&router).await;
    create_via_api(&router).await;

    let response = router
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/v1/tickets?societyId=S1&status=Pending",
            Some(STAFF_TOKEN),
            None,
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().expect("array").len(), 2);

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/tickets",
            Some(NEIGHBOUR_TOKEN),
            None,
        ))
        .await
        .expect("route responds");
    let body = read_json_body(response).await;
    assert!(body.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn transitions_route_publishes_table() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(request(Method::GET, "/api/v1/ticket-transitions", None, None))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let rows = body.as_array().expect("array");
    assert_eq!(rows.len(), 14);
    let resolved_for_reporter = rows
        .iter()
        .find(|row| row["role"] == "Reporter" && row["current"] == TicketStatus::Resolved.label())
        .expect("row present");
    assert_eq!(resolved_for_reporter["allowed"], json!([]));
}

#[tokio::test]
async fn repository_outage_maps_to_internal_error() {
    let service = TicketLifecycleService::new(Arc::new(UnavailableRepository));
    let router = ticket_router(TicketApi::new(
        Arc::new(service),
        Arc::new(TokenDirectory::default().with_actor(RESIDENT_TOKEN, reporter())),
    ));

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/tickets",
            Some(RESIDENT_TOKEN),
            Some(new_ticket_body()),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
