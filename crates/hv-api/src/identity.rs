use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("unexpected identity response: {0}")]
    Decode(String),
}

/// The slice of the provider's user object this service acts on. The full
/// payload is kept verbatim so auth responses can echo the provider shape.
#[derive(Debug, Clone)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub raw: Value,
}

/// Successful password sign-in: the user plus the whole session body
/// (access/refresh tokens, expiry) as the provider returned it.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: IdentityUser,
    pub session: Value,
}

fn user_from_value(value: &Value) -> Result<IdentityUser, IdentityError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| IdentityError::Decode("user payload is missing a uuid id".into()))?;
    let email = value
        .get("email")
        .and_then(Value::as_str)
        .filter(|email| !email.is_empty())
        .map(str::to_string);

    Ok(IdentityUser {
        id,
        email,
        raw: value.clone(),
    })
}

/// Some deployments wrap the user in an envelope, some return it bare.
fn extract_user(body: &Value) -> Result<IdentityUser, IdentityError> {
    let candidate = match body.get("user") {
        Some(user) if user.is_object() => user,
        _ => body,
    };
    user_from_value(candidate)
}

fn provider_message(status: StatusCode, body: &Value) -> String {
    ["error_description", "msg", "error", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("identity provider returned {status}"))
}

/// HTTP client for the GoTrue-style identity provider. The anon key goes on
/// every call as `apikey`; user-scoped calls add the bearer token.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, IdentityError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, IdentityError> {
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(IdentityError::Rejected {
                status,
                message: provider_message(status, &body),
            });
        }
        Ok(body)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<IdentityUser, IdentityError> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(name) = name {
            body["data"] = json!({ "name": name });
        }

        let response = self
            .http
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        extract_user(&body)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let response = self
            .http
            .post(format!(
                "{}/auth/v1/token?grant_type=password",
                self.base_url
            ))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        let user = extract_user(&body)?;

        Ok(SignIn {
            user,
            session: body,
        })
    }

    /// Remote token verification; the provider answers with the user the
    /// token belongs to, or a 401.
    pub async fn fetch_user(&self, token: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        extract_user(&body)
    }

    pub async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(IdentityError::Rejected {
                status,
                message: provider_message(status, &body),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_bare_user_payload() {
        let body = json!({
            "id": "7a9f2b9e-8f7d-4e6a-9c1d-2b3a4c5d6e7f",
            "email": "sari@example.org",
            "user_metadata": { "name": "Sari" },
        });

        let user = extract_user(&body).unwrap();
        assert_eq!(
            user.id,
            Uuid::parse_str("7a9f2b9e-8f7d-4e6a-9c1d-2b3a4c5d6e7f").unwrap()
        );
        assert_eq!(user.email.as_deref(), Some("sari@example.org"));
        assert_eq!(user.raw["user_metadata"]["name"], "Sari");
    }

    #[test]
    fn extracts_a_wrapped_user_payload() {
        let body = json!({
            "access_token": "abc",
            "user": { "id": "7a9f2b9e-8f7d-4e6a-9c1d-2b3a4c5d6e7f", "email": null },
        });

        let user = extract_user(&body).unwrap();
        assert!(user.email.is_none());
    }

    #[test]
    fn rejects_a_payload_without_an_id() {
        let body = json!({ "email": "sari@example.org" });
        assert!(matches!(
            extract_user(&body),
            Err(IdentityError::Decode(_))
        ));
    }

    #[test]
    fn provider_message_prefers_error_description() {
        let body = json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials",
        });
        assert_eq!(
            provider_message(StatusCode::BAD_REQUEST, &body),
            "Invalid login credentials"
        );

        let body = json!({ "msg": "User already registered" });
        assert_eq!(
            provider_message(StatusCode::UNPROCESSABLE_ENTITY, &body),
            "User already registered"
        );

        assert_eq!(
            provider_message(StatusCode::BAD_GATEWAY, &Value::Null),
            "identity provider returned 502 Bad Gateway"
        );
    }
}
