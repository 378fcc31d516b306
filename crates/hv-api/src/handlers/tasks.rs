use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use hv_common::api::recommendation::RecommendedTask;
use hv_common::db::{
    fetch_profile, fetch_task, find_task_application, insert_task_application,
    list_open_upcoming_tasks, list_tasks,
};
use hv_common::{AvailabilityStatus, TaskStatus};

use crate::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;

pub async fn list_all(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let tasks = list_tasks(&state.pool).await?;
    Ok(Json(json!({ "tasks": tasks })))
}

pub async fn list_active(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let tasks = list_open_upcoming_tasks(&state.pool).await?;
    Ok(Json(json!({ "tasks": tasks })))
}

pub async fn get_one(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let task = fetch_task(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".into()))?;
    Ok(Json(json!({ "task": task })))
}

/// Task applications mirror the project flow minus the capacity gate; tasks
/// have no headcount.
pub async fn apply(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let task = fetch_task(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".into()))?;

    if task.status == TaskStatus::Closed {
        return Err(ApiError::Conflict(
            "This task is no longer accepting applications".into(),
        ));
    }

    if find_task_application(&state.pool, auth.id, id).await?.is_some() {
        return Err(ApiError::Conflict(
            "You have already applied for this task".into(),
        ));
    }

    let profile = fetch_profile(&state.pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;
    if profile.status_volunteer == AvailabilityStatus::Closed {
        return Err(ApiError::Conflict(
            "Your volunteer status is currently closed for new tasks".into(),
        ));
    }

    let outcome = state
        .engine
        .score(&profile.as_volunteer(), &task.as_opportunity());
    let score = i32::try_from(outcome.score).unwrap_or(i32::MAX);
    let reason = (!outcome.reasons.is_empty()).then(|| outcome.reasons.join("; "));

    let application =
        insert_task_application(&state.pool, auth.id, id, score, reason.as_deref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Application successful",
            "application": application,
        })),
    ))
}

/// Open tasks with a future event date, ranked for the caller.
pub async fn recommended_for_me(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let profile = fetch_profile(&state.pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;
    if profile.status_volunteer == AvailabilityStatus::Closed {
        return Err(ApiError::BadRequest(
            "Your volunteer status is currently closed for new recommendations".into(),
        ));
    }

    let tasks = list_open_upcoming_tasks(&state.pool).await?;
    let volunteer = profile.as_volunteer();
    let opportunities: Vec<_> = tasks.iter().map(|t| t.as_opportunity()).collect();
    let ranked = state.engine.rank_opportunities(&volunteer, &opportunities);

    let recommended: Vec<RecommendedTask> = ranked
        .into_iter()
        .filter_map(|entry| {
            tasks
                .iter()
                .find(|task| task.id == entry.opportunity_id)
                .map(|task| RecommendedTask {
                    task: task.clone(),
                    match_score: entry.score,
                    match_reasons: entry.reasons,
                })
        })
        .collect();

    Ok(Json(json!({ "recommended_tasks": recommended })))
}
