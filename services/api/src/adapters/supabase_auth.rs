//! services/api/src/adapters/supabase_auth.rs
//!
//! Implements the `AuthProvider` port on top of the Supabase Auth (GoTrue) REST API.
//! Passwords never touch this service's database.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use study_assistant_core::domain::{AuthSession, AuthUser};
use study_assistant_core::ports::{AuthProvider, PortError, PortResult};
use uuid::Uuid;

#[derive(Clone)]
pub struct SupabaseAuthAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseAuthAdapter {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn read_error(response: reqwest::Response) -> PortError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoTrueError>(&body)
            .ok()
            .and_then(GoTrueError::message)
            .unwrap_or(body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
            s if s.is_client_error() => PortError::Invalid(message),
            _ => PortError::Unexpected(format!("Auth provider returned {}: {}", status, message)),
        }
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Serialize)]
struct SignUpMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

#[derive(Deserialize)]
struct SessionResponse {
    access_token: Option<String>,
    user: Option<UserResponse>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl UserResponse {
    fn to_domain(self) -> AuthUser {
        let full_name = self
            .user_metadata
            .get("full_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        AuthUser {
            id: self.id,
            email: self.email.unwrap_or_default(),
            full_name,
        }
    }
}

#[derive(Deserialize)]
struct GoTrueError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl GoTrueError {
    fn message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message)
    }
}

fn network(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("Auth provider request failed: {}", e))
}

/// Turns a GoTrue session payload into a domain session.
///
/// Sign-up without a token means the project requires email confirmation first.
fn into_session(response: SessionResponse) -> PortResult<AuthSession> {
    match (response.access_token, response.user) {
        (Some(access_token), Some(user)) => Ok(AuthSession {
            access_token,
            user: user.to_domain(),
        }),
        (None, Some(_)) => Err(PortError::Invalid(
            "Account created. Confirm your email address, then sign in.".to_string(),
        )),
        _ => Err(PortError::Unexpected(
            "Auth provider returned no session".to_string(),
        )),
    }
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for SupabaseAuthAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> PortResult<AuthSession> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.api_key)
            .json(&SignUpBody {
                email,
                password,
                data: SignUpMetadata { full_name },
            })
            .send()
            .await
            .map_err(network)?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        // Without email confirmation GoTrue answers with a session; with it, with the bare user.
        let body: Value = response.json().await.map_err(network)?;
        let parsed = if body.get("access_token").is_some() {
            serde_json::from_value::<SessionResponse>(body)
        } else {
            serde_json::from_value::<UserResponse>(body).map(|user| SessionResponse {
                access_token: None,
                user: Some(user),
            })
        };
        let session = parsed.map_err(|e| PortError::Unexpected(e.to_string()))?;
        into_session(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let response = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.api_key)
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(network)?;
        match response.status() {
            // GoTrue reports wrong credentials as 400 invalid_grant.
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(PortError::Unauthorized),
            s if !s.is_success() => Err(Self::read_error(response).await),
            _ => into_session(response.json().await.map_err(network)?),
        }
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(network)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(response).await)
        }
    }

    async fn current_user(&self, access_token: &str) -> PortResult<AuthUser> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(network)?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        let user: UserResponse = response.json().await.map_err(network)?;
        Ok(user.to_domain())
    }

    fn oauth_url(&self, provider: &str, redirect_to: &str) -> String {
        let base = self.endpoint("authorize");
        match Url::parse_with_params(&base, &[("provider", provider), ("redirect_to", redirect_to)]) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}?provider={}", base, provider),
        }
    }
}
