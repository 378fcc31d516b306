use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use hv_common::db::ensure_profile;

use crate::SharedState;
use crate::auth::{AuthUser, bearer_token};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Credentials {
    fn validate(&self) -> Result<(&str, &str), ApiError> {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty());
        let password = self.password.as_deref().filter(|pw| !pw.is_empty());

        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(ApiError::BadRequest(
                "Email and password are required".into(),
            )),
        }
    }
}

/// Create the identity account, then the matching `hv.profiles` row. The
/// profile insert is idempotent, so a retried registration only re-reports
/// the provider's view of the account.
pub async fn register(
    State(state): State<SharedState>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (email, password) = body.validate()?;

    let user = state
        .identity
        .sign_up(email, password, body.name.as_deref())
        .await?;

    let created = ensure_profile(&state.pool, user.id, email, body.name.as_deref()).await?;
    if created {
        tracing::info!(user_id = %user.id, "created profile for new account");
    }

    Ok((StatusCode::CREATED, Json(json!({ "user": user.raw }))))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(body): Json<Credentials>,
) -> Result<Json<Value>, ApiError> {
    let (email, password) = body.validate()?;
    let signed_in = state.identity.sign_in(email, password).await?;

    Ok(Json(json!({
        "user": signed_in.user.raw,
        "session": signed_in.session,
    })))
}

/// Revoke the token at the provider (best effort) and drop it from the
/// verification cache so a replay cannot ride out the TTL.
pub async fn logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
    _auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers)?;

    if let Err(err) = state.identity.sign_out(token).await {
        tracing::warn!(error = %err, "identity sign-out failed");
    }
    state.token_cache.remove(&token.to_string());

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_email_and_password() {
        let err = Credentials::default().validate().unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let blank_email = Credentials {
            email: Some("   ".into()),
            password: Some("secret".into()),
            name: None,
        };
        assert!(blank_email.validate().is_err());

        let ok = Credentials {
            email: Some("sari@example.org".into()),
            password: Some("secret".into()),
            name: Some("Sari".into()),
        };
        let (email, password) = ok.validate().unwrap();
        assert_eq!(email, "sari@example.org");
        assert_eq!(password, "secret");
    }
}
