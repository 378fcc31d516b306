use axum::{Json, extract::State};
use serde_json::{Value, json};

use hv_common::api::profile::ProfileUpdate;
use hv_common::db::{fetch_profile, list_for_volunteer, toggle_availability, update_profile};

use crate::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// How many recent applications ride along with the profile view.
const PROFILE_APPLICATIONS_SHOWN: i64 = 10;

pub async fn get_profile(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let profile = fetch_profile(&state.pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;
    let assignments =
        list_for_volunteer(&state.pool, auth.id, Some(PROFILE_APPLICATIONS_SHOWN)).await?;

    Ok(Json(json!({
        "profile": profile,
        "assignments": assignments,
    })))
}

pub async fn patch_profile(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>, ApiError> {
    let changes = update.validate().map_err(ApiError::BadRequest)?;

    let profile = update_profile(&state.pool, auth.id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "profile": profile,
    })))
}

pub async fn toggle_status(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let profile = toggle_availability(&state.pool, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    Ok(Json(json!({
        "message": format!(
            "Volunteer status toggled to {}",
            profile.status_volunteer.as_str()
        ),
        "profile": profile,
    })))
}
