use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use hv_common::Volunteer;
use hv_common::api::assignment::{AdminApplicationPage, AssignRequest, StatusUpdate};
use hv_common::api::opportunity::{ProjectStatusUpdate, TaskInput, TaskPatch};
use hv_common::api::profile::{Profile, RoleUpdate, VolunteerStatusUpdate};
use hv_common::api::recommendation::RecommendedVolunteer;
use hv_common::db;

use crate::SharedState;
use crate::auth::AdminUser;
use crate::error::ApiError;

const MAX_LIMIT: i64 = 200;
const MAX_OFFSET: i64 = 10_000;

pub async fn list_users(
    State(state): State<SharedState>,
    _admin: AdminUser,
) -> Result<Json<Value>, ApiError> {
    let users = db::list_profiles(&state.pool).await?;
    Ok(Json(json!({ "users": users })))
}

pub async fn update_role(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<Value>, ApiError> {
    let (user_id, role) = update.validate().map_err(ApiError::BadRequest)?;

    let user = db::set_role(&state.pool, user_id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    // The admin gate memoizes roles; drop the stale entry right away.
    state.role_cache.remove(&user_id);

    Ok(Json(json!({ "user": user })))
}

pub async fn update_volunteer_status(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(update): Json<VolunteerStatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    let status = update.validate().map_err(ApiError::BadRequest)?;

    let user = db::set_availability(&state.pool, user_id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    state.role_cache.remove(&user_id);

    Ok(Json(json!({
        "message": format!("Volunteer status updated to {}", status.as_str()),
        "user": user,
    })))
}

pub async fn list_tasks(
    State(state): State<SharedState>,
    _admin: AdminUser,
) -> Result<Json<Value>, ApiError> {
    let tasks = db::list_tasks_recent_first(&state.pool).await?;
    Ok(Json(json!({ "tasks": tasks })))
}

pub async fn create_task(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let new_task = input.validate().map_err(ApiError::BadRequest)?;
    let task = db::insert_task(&state.pool, &new_task).await?;

    Ok((StatusCode::CREATED, Json(json!({ "task": task }))))
}

pub async fn update_task(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Value>, ApiError> {
    let changes = patch.validate().map_err(ApiError::BadRequest)?;

    let task = db::update_task(&state.pool, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".into()))?;
    Ok(Json(json!({ "task": task })))
}

pub async fn delete_task(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !db::delete_task(&state.pool, id).await? {
        return Err(ApiError::NotFound("Task not found".into()));
    }
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

const fn default_limit() -> i64 {
    50
}

fn validate_pagination(limit: i64, offset: i64) -> Result<(i64, i64), ApiError> {
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    if !(0..=MAX_OFFSET).contains(&offset) {
        return Err(ApiError::BadRequest(format!(
            "offset must be between 0 and {MAX_OFFSET}"
        )));
    }

    Ok((limit, offset))
}

pub async fn list_applications(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<AdminApplicationPage>, ApiError> {
    let (limit, offset) = validate_pagination(query.limit, query.offset)?;
    let page = db::list_admin_applications(&state.pool, limit, offset).await?;
    Ok(Json(page))
}

pub async fn update_application_status(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    let next = update.validate().map_err(ApiError::BadRequest)?;
    let application = db::update_status(&state.pool, id, next).await?;

    Ok(Json(json!({
        "message": format!(
            "Status aplikasi berhasil diubah menjadi \"{}\"",
            next.as_str()
        ),
        "application": application,
    })))
}

/// Rank every open volunteer for the project and persist the positive
/// scores as `recommended` rows; existing applications are left alone.
pub async fn run_matchmaking(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(project_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let project = db::fetch_project(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proyek tidak ditemukan".into()))?;

    let profiles = db::list_open_volunteers(&state.pool).await?;
    let volunteers: Vec<Volunteer> = profiles.iter().map(Profile::as_volunteer).collect();
    let ranked = state
        .engine
        .rank_volunteers(&project.as_opportunity(), &volunteers);

    if ranked.is_empty() {
        return Ok(Json(json!({
            "message": "Tidak ada rekomendasi volunteer yang cocok untuk proyek ini",
            "matches": [],
        })));
    }

    let written = db::upsert_recommendations(&state.pool, project_id, &ranked).await?;

    Ok(Json(json!({
        "message": format!("{written} rekomendasi volunteer berhasil dibuat"),
        "matches": ranked,
    })))
}

pub async fn assign_volunteers(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(project_id): Path<i64>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Value>, ApiError> {
    let volunteer_ids = request.validate().map_err(ApiError::BadRequest)?;

    let result = db::assign_confirmed(&state.pool, project_id, volunteer_ids).await?;

    Ok(Json(json!({
        "message": format!(
            "{} volunteer berhasil ditugaskan ke proyek",
            result.newly_confirmed
        ),
        "newly_confirmed": result.newly_confirmed,
        "already_confirmed": result.already_confirmed,
    })))
}

pub async fn update_project_status(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(project_id): Path<i64>,
    Json(update): Json<ProjectStatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    let status = update.validate().map_err(ApiError::BadRequest)?;

    let project = db::set_project_status(&state.pool, project_id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    Ok(Json(json!({
        "message": format!("Project status updated to {}", status.as_str()),
        "project": project,
    })))
}

/// Ranked candidate view for one project, annotated with each volunteer's
/// existing application status so the admin can tell who already applied.
pub async fn recommended_volunteers(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(project_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let project = db::fetch_project(&state.pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proyek tidak ditemukan".into()))?;

    let profiles = db::list_open_volunteers(&state.pool).await?;
    let statuses = db::application_statuses_for_project(&state.pool, project_id).await?;

    let volunteers: Vec<Volunteer> = profiles.iter().map(Profile::as_volunteer).collect();
    let ranked = state
        .engine
        .rank_volunteers(&project.as_opportunity(), &volunteers);

    let recommended: Vec<RecommendedVolunteer> = ranked
        .into_iter()
        .filter_map(|entry| {
            profiles
                .iter()
                .find(|profile| profile.id == entry.volunteer_id)
                .map(|profile| RecommendedVolunteer {
                    id: profile.id,
                    name: profile.name.clone(),
                    email: profile.email.clone(),
                    phone: profile.phone.clone(),
                    languages: profile.languages.clone(),
                    experience: profile.years_experience,
                    match_score: entry.score,
                    match_reasons: entry.reasons,
                    application_status: statuses
                        .get(&profile.id)
                        .map(|status| status.as_str().to_string()),
                })
        })
        .collect();

    Ok(Json(json!({
        "project": {
            "id": project.id,
            "title": project.title,
            "project_type": project.project_type,
        },
        "recommended_volunteers": recommended,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_bounds_are_enforced() {
        assert!(validate_pagination(0, 0).is_err());
        assert!(validate_pagination(MAX_LIMIT + 1, 0).is_err());
        assert!(validate_pagination(50, -1).is_err());
        assert!(validate_pagination(50, MAX_OFFSET + 1).is_err());
        assert_eq!(validate_pagination(50, 100).unwrap(), (50, 100));
    }
}
