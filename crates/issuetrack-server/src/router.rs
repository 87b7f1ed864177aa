//! HTTP routes.
//!
//! Every API route answers with status 200 and a JSON body; logical failures
//! are signaled only by an `error` key in that body.
//!
//! | Verb   | Path                    | Operation       |
//! |--------|-------------------------|-----------------|
//! | GET    | `/api/issues/{project}` | list and filter |
//! | POST   | `/api/issues/{project}` | create          |
//! | PUT    | `/api/issues/{project}` | update by `_id` |
//! | DELETE | `/api/issues/{project}` | delete by `_id` |
//!
//! PUT and DELETE find their target by `_id` alone; the project segment does
//! not scope them.

use crate::payload::Payload;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use issuetrack::domain::Issue;
use issuetrack::service::{Ack, IssueService, Rejection, Reply};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Build the application router over `service`.
#[must_use]
pub fn router(service: IssueService) -> Router {
    Router::new()
        .route(
            "/api/issues/{project}",
            get(list_issues)
                .post(create_issue)
                .put(update_issue)
                .delete(delete_issue),
        )
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn list_issues(
    State(service): State<IssueService>,
    Path(project): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<Reply<Vec<Issue>>> {
    let filters: Vec<(String, String)> =
        match serde_urlencoded::from_str(query.as_deref().unwrap_or_default()) {
            Ok(filters) => filters,
            Err(e) => {
                debug!(project, error = %e, "Rejected query string");
                return Json(Reply::rejected(Rejection::CouldNotList, None));
            }
        };

    Json(service.list_issues(&project, &filters).await)
}

async fn create_issue(
    State(service): State<IssueService>,
    Path(project): Path<String>,
    Payload(fields): Payload,
) -> Json<Reply<Issue>> {
    Json(service.create_issue(&project, &fields).await)
}

async fn update_issue(
    State(service): State<IssueService>,
    Payload(fields): Payload,
) -> Json<Reply<Ack>> {
    Json(service.update_issue(&fields).await)
}

async fn delete_issue(
    State(service): State<IssueService>,
    Payload(fields): Payload,
) -> Json<Reply<Ack>> {
    Json(service.delete_issue(&fields).await)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
