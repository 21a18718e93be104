//! HTTP routes over the daemon.
//!
//! `GET` lists a collection or, with `?id=`, returns one entity and records
//! the view. `POST` creates when the body has no id and updates otherwise.
//! `DELETE` removes one entity with `?id=` or clears the collection.

use crate::daemon::DaemonHandle;
use crate::protocol::{self, Request};
use crate::types::{Epic, Kind, Subtask, Task};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

/// Query string accepted by the collection routes.
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Build the application router.
pub fn router(handle: DaemonHandle) -> Router {
    Router::new()
        .route("/tasks", get(get_tasks).post(post_task).delete(delete_tasks))
        .route("/subtasks", get(get_subtasks).post(post_subtask).delete(delete_subtasks))
        .route("/epics", get(get_epics).post(post_epic).delete(delete_epics))
        .route("/epics/:id/subtasks", get(get_epic_subtasks))
        .route("/history", get(get_history))
        .route("/prioritized", get(get_prioritized))
        .with_state(handle)
}

pub async fn get_tasks(State(handle): State<DaemonHandle>, Query(query): Query<IdQuery>) -> Response {
    read(&handle, Kind::Task, query).await
}

pub async fn get_epics(State(handle): State<DaemonHandle>, Query(query): Query<IdQuery>) -> Response {
    read(&handle, Kind::Epic, query).await
}

pub async fn get_subtasks(State(handle): State<DaemonHandle>, Query(query): Query<IdQuery>) -> Response {
    read(&handle, Kind::Subtask, query).await
}

pub async fn post_task(State(handle): State<DaemonHandle>, body: Result<Json<Task>, JsonRejection>) -> Response {
    let Json(task) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    let request = if task.id == 0 {
        Request::CreateTask { task }
    } else {
        Request::UpdateTask { task }
    };
    dispatch(&handle, request).await
}

pub async fn post_epic(State(handle): State<DaemonHandle>, body: Result<Json<Epic>, JsonRejection>) -> Response {
    let Json(epic) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    let request = if epic.id == 0 {
        Request::CreateEpic { epic }
    } else {
        Request::UpdateEpic { epic }
    };
    dispatch(&handle, request).await
}

pub async fn post_subtask(State(handle): State<DaemonHandle>, body: Result<Json<Subtask>, JsonRejection>) -> Response {
    let Json(subtask) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    let request = if subtask.id == 0 {
        Request::CreateSubtask { subtask }
    } else {
        Request::UpdateSubtask { subtask }
    };
    dispatch(&handle, request).await
}

pub async fn delete_tasks(State(handle): State<DaemonHandle>, Query(query): Query<IdQuery>) -> Response {
    remove(&handle, Kind::Task, query).await
}

pub async fn delete_epics(State(handle): State<DaemonHandle>, Query(query): Query<IdQuery>) -> Response {
    remove(&handle, Kind::Epic, query).await
}

pub async fn delete_subtasks(State(handle): State<DaemonHandle>, Query(query): Query<IdQuery>) -> Response {
    remove(&handle, Kind::Subtask, query).await
}

pub async fn get_epic_subtasks(State(handle): State<DaemonHandle>, Path(id): Path<String>) -> Response {
    match parse_id(&id) {
        Ok(id) => dispatch(&handle, Request::EpicSubtasks { id }).await,
        Err(response) => response,
    }
}

pub async fn get_history(State(handle): State<DaemonHandle>) -> Response {
    dispatch(&handle, Request::History).await
}

pub async fn get_prioritized(State(handle): State<DaemonHandle>) -> Response {
    dispatch(&handle, Request::Prioritized).await
}

async fn read(handle: &DaemonHandle, kind: Kind, query: IdQuery) -> Response {
    let request = match query.id.as_deref().map(parse_id) {
        Some(Ok(id)) => Request::Get { kind, id },
        Some(Err(response)) => return response,
        None => Request::List { kind },
    };
    dispatch(handle, request).await
}

async fn remove(handle: &DaemonHandle, kind: Kind, query: IdQuery) -> Response {
    let request = match query.id.as_deref().map(parse_id) {
        Some(Ok(id)) => Request::Delete { kind, id },
        Some(Err(response)) => return response,
        None => Request::Clear { kind },
    };
    dispatch(handle, request).await
}

fn parse_id(raw: &str) -> Result<u64, Response> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("invalid id: {}", raw)).into_response())
}

fn bad_body(rejection: JsonRejection) -> Response {
    log::warn!("Rejected request body: {}", rejection.body_text());
    (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
}

async fn dispatch(handle: &DaemonHandle, request: Request) -> Response {
    match handle.call(request).await {
        Ok(response) => into_http(response),
        Err(e) => {
            log::error!("Request failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn into_http(response: protocol::Response) -> Response {
    use protocol::Response as R;

    match response {
        R::Entity { entity } => (StatusCode::OK, Json(entity)).into_response(),
        R::Entities { entities } => (StatusCode::OK, Json(entities)).into_response(),
        R::Created { entity } | R::Updated { entity } => (StatusCode::CREATED, Json(entity)).into_response(),
        R::NotFound { message } => (StatusCode::NOT_FOUND, message).into_response(),
        R::Conflict { message } => (StatusCode::NOT_ACCEPTABLE, message).into_response(),
        R::Invalid { message } => (StatusCode::BAD_REQUEST, message).into_response(),
        R::Ok => (StatusCode::OK, "OK").into_response(),
        R::Error { message } => {
            log::error!("Store error: {}", message);
            (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
        }
    }
}
