use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use hv_common::api::opportunity::{ProjectInput, ProjectPatch};
use hv_common::api::recommendation::RecommendedProject;
use hv_common::db::{
    delete_project, fetch_profile, fetch_project, find_application, insert_application,
    insert_project, list_active_projects, list_for_volunteer, list_projects,
    list_projects_starting_soon, update_project,
};
use hv_common::{AvailabilityStatus, ProjectStatus};

use crate::SharedState;
use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;

pub async fn list_all(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let projects = list_projects(&state.pool).await?;
    Ok(Json(json!({ "projects": projects })))
}

pub async fn list_active(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let projects = list_active_projects(&state.pool).await?;
    Ok(Json(json!({ "projects": projects })))
}

pub async fn get_one(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let project = fetch_project(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proyek tidak ditemukan".into()))?;
    Ok(Json(json!({ "project": project })))
}

pub async fn create(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let new_project = input.validate().map_err(ApiError::BadRequest)?;
    let project = insert_project(&state.pool, &new_project).await?;

    Ok((StatusCode::CREATED, Json(json!({ "project": project }))))
}

pub async fn update(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<Value>, ApiError> {
    let changes = patch.validate().map_err(ApiError::BadRequest)?;

    let project = update_project(&state.pool, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proyek tidak ditemukan".into()))?;
    Ok(Json(json!({ "project": project })))
}

pub async fn remove(
    State(state): State<SharedState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !delete_project(&state.pool, id).await? {
        return Err(ApiError::NotFound("Proyek tidak ditemukan".into()));
    }
    Ok(Json(json!({ "message": "Proyek berhasil dihapus" })))
}

/// Volunteer applies to a project. Eligibility gates run in a fixed order so
/// every caller sees the same failure for the same situation; the score is
/// computed only after the last gate passes.
pub async fn apply(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let project = fetch_project(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proyek tidak ditemukan".into()))?;

    if project.status_project == ProjectStatus::Done {
        return Err(ApiError::Conflict(
            "Proyek sudah selesai, tidak dapat menerima pendaftaran baru".into(),
        ));
    }
    if project.available_slots() == 0 {
        return Err(ApiError::Conflict("Proyek sudah penuh".into()));
    }

    if let Some(existing) = find_application(&state.pool, auth.id, id).await? {
        return Err(ApiError::Conflict(format!(
            "Anda sudah mendaftar untuk proyek ini (status: {})",
            existing.status.as_str()
        )));
    }

    let profile = fetch_profile(&state.pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profil tidak ditemukan".into()))?;
    if profile.status_volunteer == AvailabilityStatus::Closed {
        return Err(ApiError::Conflict(
            "Status volunteer Anda saat ini tidak menerima tugas baru".into(),
        ));
    }

    let outcome = state
        .engine
        .score(&profile.as_volunteer(), &project.as_opportunity());
    let score = i32::try_from(outcome.score).unwrap_or(i32::MAX);
    let reason = (!outcome.reasons.is_empty()).then(|| outcome.reasons.join("; "));

    let application =
        insert_application(&state.pool, auth.id, id, score, reason.as_deref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Pendaftaran berhasil",
            "application": application,
        })),
    ))
}

/// Active projects inside the scheduling window, ranked for the caller.
pub async fn recommended_for_me(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let profile = fetch_profile(&state.pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profil tidak ditemukan".into()))?;
    if profile.status_volunteer == AvailabilityStatus::Closed {
        return Err(ApiError::BadRequest(
            "Status volunteer Anda saat ini tidak menerima rekomendasi baru".into(),
        ));
    }

    let projects = list_projects_starting_soon(&state.pool).await?;
    let volunteer = profile.as_volunteer();
    let opportunities: Vec<_> = projects.iter().map(|p| p.as_opportunity()).collect();
    let ranked = state.engine.rank_opportunities(&volunteer, &opportunities);

    let recommended: Vec<RecommendedProject> = ranked
        .into_iter()
        .filter_map(|entry| {
            projects
                .iter()
                .find(|project| project.id == entry.opportunity_id)
                .map(|project| RecommendedProject {
                    project: project.clone(),
                    match_score: entry.score,
                    match_reasons: entry.reasons,
                })
        })
        .collect();

    Ok(Json(json!({ "recommended_projects": recommended })))
}

pub async fn my_applications(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let applications = list_for_volunteer(&state.pool, auth.id, None).await?;
    Ok(Json(json!({ "applications": applications })))
}
