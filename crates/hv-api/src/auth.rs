use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use clap::ValueEnum;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use uuid::Uuid;

use hv_common::Role;
use hv_common::db::fetch_role;

use crate::SharedState;
use crate::error::ApiError;
use crate::identity::IdentityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum AuthMode {
    /// Verify tokens locally against the provider's HS256 signing secret.
    Jwt,
    /// Ask the identity provider, memoized through the token cache.
    Remote,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub jwt_secret: Option<String>,
}

/// Authenticated caller. The id is the identity-provider subject and doubles
/// as the `hv.profiles` primary key.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Authenticated caller whose profile role resolved to admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[allow(dead_code)]
    exp: Option<usize>,
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("Access denied. No authentication token found.".into())
        })
}

fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    // exp is enforced when present; the claim itself is optional.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

fn verify_local(state: &SharedState, token: &str) -> Result<AuthUser, ApiError> {
    let secret = state
        .config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| ApiError::Internal("HV_JWT_SECRET is not configured".into()))?;

    let claims = decode_claims(token, secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token.".into()))?;

    Ok(AuthUser {
        id: claims.sub,
        email: claims.email,
    })
}

async fn verify_remote(state: &SharedState, token: &str) -> Result<AuthUser, ApiError> {
    if let Some(user) = state.token_cache.get(&token.to_string()) {
        return Ok(user);
    }

    let user = match state.identity.fetch_user(token).await {
        Ok(user) => AuthUser {
            id: user.id,
            email: user.email,
        },
        Err(IdentityError::Transport(err)) => {
            return Err(ApiError::Internal(format!(
                "identity verification failed: {err}"
            )));
        }
        Err(_) => {
            state.token_cache.remove(&token.to_string());
            return Err(ApiError::Unauthorized("Invalid or expired token.".into()));
        }
    };

    state.token_cache.insert(token.to_string(), user.clone());
    Ok(user)
}

async fn authenticate(state: &SharedState, token: &str) -> Result<AuthUser, ApiError> {
    match state.config.auth.mode {
        AuthMode::Jwt => verify_local(state, token),
        AuthMode::Remote => verify_remote(state, token).await,
    }
}

async fn resolve_role(state: &SharedState, id: Uuid) -> Result<Role, ApiError> {
    if let Some(role) = state.role_cache.get(&id) {
        return Ok(role);
    }

    let role = fetch_role(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User profile not found.".into()))?;
    state.role_cache.insert(id, role);
    Ok(role)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    SharedState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = SharedState::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        authenticate(&state, token).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    SharedState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared = SharedState::from_ref(state);
        let user = AuthUser::from_request_parts(parts, state).await?;

        if resolve_role(&shared, user.id).await? != Role::Admin {
            return Err(ApiError::Forbidden("Access denied. Admin only.".into()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn bearer_extraction_requires_the_scheme() {
        assert!(bearer_token(&headers_with(None)).is_err());
        assert!(bearer_token(&headers_with(Some("Basic abc"))).is_err());
        assert!(bearer_token(&headers_with(Some("Bearer "))).is_err());
        assert_eq!(
            bearer_token(&headers_with(Some("Bearer tok-1"))).unwrap(),
            "tok-1"
        );
    }

    #[test]
    fn local_verification_round_trips_hs256_claims() {
        let sub = Uuid::new_v4();
        let token = encode(
            &Header::default(),
            &json!({ "sub": sub, "email": "sari@example.org" }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let claims = decode_claims(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.email.as_deref(), Some("sari@example.org"));

        assert!(decode_claims(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = encode(
            &Header::default(),
            &json!({ "sub": Uuid::new_v4(), "exp": 1_000_000 }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(decode_claims(&token, "test-secret").is_err());
    }
}
