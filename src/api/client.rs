//! API client for the chat server.
//!
//! [`ApiClient`] owns the `reqwest` client, attaches the bearer token from the
//! shared [`AuthSession`], and unwraps response envelopes.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};

use super::error::ApiError;
use super::types::{
    CreateRoomRequest, Envelope, HistoryPage, LoginRequest, LoginResponse, RoomPage, RoomSummary,
};
use crate::auth::{AuthSession, UserProfile};
use crate::constants;
use crate::events::AuthListener;
use crate::protocol::RoomId;

/// Room operations used by the room controller.
#[async_trait]
pub trait RoomApi: Send + Sync {
    /// `GET /api/chatroom/list`
    async fn list_rooms(&self, page: u32, size: u32) -> Result<RoomPage, ApiError>;

    /// `POST /api/chatroom/create`
    async fn create_room(&self, request: &CreateRoomRequest) -> Result<RoomSummary, ApiError>;

    /// `POST /api/chatroom/join/{id}`
    async fn join_room(&self, room: RoomId) -> Result<(), ApiError>;

    /// `POST /api/chatroom/leave/{id}`
    async fn leave_room(&self, room: RoomId) -> Result<(), ApiError>;

    /// `POST /api/chatroom/delete/{id}`
    async fn delete_room(&self, room: RoomId) -> Result<(), ApiError>;

    /// `GET /api/chat/history/{id}`, newest message first.
    async fn chat_history(&self, room: RoomId, page: u32, size: u32)
        -> Result<HistoryPage, ApiError>;
}

/// HTTP client for the chat server API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    server_url: String,
    auth: Arc<AuthSession>,
    listener: Arc<dyn AuthListener>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("server_url", &self.server_url)
            .field("authenticated", &self.auth.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a new API client.
    ///
    /// # Arguments
    ///
    /// * `server_url` - Base URL of the chat server
    /// * `auth` - Session whose token is attached to requests
    /// * `listener` - Notified when the server rejects the token
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        server_url: &str,
        auth: Arc<AuthSession>,
        listener: Arc<dyn AuthListener>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(constants::HTTP_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self::with_client(client, server_url, auth, listener))
    }

    /// Creates an API client with a pre-configured HTTP client.
    pub fn with_client(
        client: Client,
        server_url: &str,
        auth: Arc<AuthSession>,
        listener: Arc<dyn AuthListener>,
    ) -> Self {
        Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            auth,
            listener,
        }
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Log in and store the returned token and profile in the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        let request = self
            .client
            .post(self.url("/api/user/login"))
            .json(&LoginRequest { username, password });
        let response: LoginResponse = self.call_data(request, "login").await?;

        let (token, profile) = response.into_parts();
        if let Err(e) = self.auth.store(token, profile.clone()) {
            log::warn!("[Api] Logged in but failed to persist credentials: {:#}", e);
        }
        log::info!("[Api] Logged in as {}", profile.username);
        Ok(profile)
    }

    /// Profile of the user the token belongs to.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        let request = self.client.get(self.url("/api/user/profile"));
        self.call_data(request, "profile").await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    /// Send `request` and unwrap its envelope, requiring `data`.
    async fn call_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        self.call(request, what).await?.ok_or(ApiError::MissingData)
    }

    /// Send `request` and unwrap its envelope.
    ///
    /// HTTP 401 and envelope code 401 clear the session and notify the
    /// listener before returning [`ApiError::Unauthorized`].
    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Option<T>, ApiError> {
        let request = match self.auth.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.unauthorized(what));
        }

        let body = response.text().await?;
        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Decode(format!("{what}: HTTP {status}")));
            }
            Err(e) => return Err(ApiError::Decode(format!("{what}: {e}"))),
        };

        match envelope.code {
            constants::CODE_OK => Ok(envelope.data),
            constants::CODE_UNAUTHORIZED => Err(self.unauthorized(what)),
            code => {
                log::warn!("[Api] {} failed with code {}: {}", what, code, envelope.message);
                Err(ApiError::Application {
                    code,
                    message: envelope.message,
                })
            }
        }
    }

    fn unauthorized(&self, what: &str) -> ApiError {
        log::warn!("[Api] {} rejected as unauthorized, clearing session", what);
        if let Err(e) = self.auth.clear() {
            log::warn!("[Api] Failed to clear credentials: {:#}", e);
        }
        self.listener.on_unauthorized();
        ApiError::Unauthorized
    }
}

#[async_trait]
impl RoomApi for ApiClient {
    async fn list_rooms(&self, page: u32, size: u32) -> Result<RoomPage, ApiError> {
        let request = self
            .client
            .get(self.url("/api/chatroom/list"))
            .query(&[("page", page), ("size", size)]);
        self.call_data(request, "list rooms").await
    }

    async fn create_room(&self, request: &CreateRoomRequest) -> Result<RoomSummary, ApiError> {
        let request = self
            .client
            .post(self.url("/api/chatroom/create"))
            .json(request);
        self.call_data(request, "create room").await
    }

    async fn join_room(&self, room: RoomId) -> Result<(), ApiError> {
        let request = self.client.post(self.url(&format!("/api/chatroom/join/{room}")));
        self.call::<IgnoredAny>(request, "join room").await?;
        Ok(())
    }

    async fn leave_room(&self, room: RoomId) -> Result<(), ApiError> {
        let request = self.client.post(self.url(&format!("/api/chatroom/leave/{room}")));
        self.call::<IgnoredAny>(request, "leave room").await?;
        Ok(())
    }

    async fn delete_room(&self, room: RoomId) -> Result<(), ApiError> {
        let request = self.client.post(self.url(&format!("/api/chatroom/delete/{room}")));
        self.call::<IgnoredAny>(request, "delete room").await?;
        Ok(())
    }

    async fn chat_history(
        &self,
        room: RoomId,
        page: u32,
        size: u32,
    ) -> Result<HistoryPage, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/api/chat/history/{room}")))
            .query(&[("page", page), ("size", size)]);
        self.call_data(request, "chat history").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::events::NoopListener;

    #[test]
    fn test_server_url_trailing_slash_trimmed() {
        let auth = Arc::new(AuthSession::in_memory(Credentials::default()));
        let client = ApiClient::new("http://localhost:8000/", auth, Arc::new(NoopListener)).unwrap();
        assert_eq!(client.server_url(), "http://localhost:8000");
        assert_eq!(
            client.url("/api/chatroom/join/4"),
            "http://localhost:8000/api/chatroom/join/4"
        );
    }
}
