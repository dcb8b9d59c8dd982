//! Authentication session: the in-memory access token and its durable mirror.
//!
//! A [`SessionManager`] is constructed explicitly and handed to whatever
//! issues requests; there is no process-wide session. Every mutating method
//! takes `&mut self`, so a single manager cannot run `login`, `logout` or
//! `refresh` concurrently. Sharing one across tasks means wrapping it in a
//! lock of the caller's choosing.
//!
//! Mutators of the session are `login`, `register`, `refresh` and `logout`.
//! Durable writes happen strictly after the network exchange succeeds and are
//! not atomic as a group.

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::ApiError,
    executor::{ApiCall, RequestExecutor, decode, endpoint},
    model::{AuthCredentials, AuthResponse, RefreshRequest, RefreshResponse, RegisterData, User},
    storage::{AUTH_TOKEN_KEY, KeyValueStore, REFRESH_TOKEN_KEY, USER_DATA_KEY},
    transport::HttpRequest,
};

#[derive(Debug)]
pub struct SessionManager {
    executor: RequestExecutor,
    storage: Arc<dyn KeyValueStore>,
    token: Option<String>,
}

impl SessionManager {
    /// A fresh manager holds no token until [`initialize`](Self::initialize)
    /// or a login populates it.
    pub fn new(executor: RequestExecutor, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            executor,
            storage,
            token: None,
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// In-memory access token, without consulting storage.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Loads the access token from storage if memory has none. A missing
    /// stored token leaves the session unauthenticated without error.
    pub async fn initialize(&mut self) -> Result<(), ApiError> {
        if self.token.is_some() {
            return Ok(());
        }

        self.token = self
            .storage
            .get(AUTH_TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty());

        debug!(loaded = self.token.is_some(), "session initialized from storage");
        Ok(())
    }

    /// True iff a token is held, loading it from storage first when memory is empty.
    pub async fn is_authenticated(&mut self) -> Result<bool, ApiError> {
        if self.token.is_none() {
            self.initialize().await?;
        }
        Ok(self.token.is_some())
    }

    /// Adds `Authorization: Bearer <token>` when the call requires auth and a
    /// token is held. Without a token the request goes out bare and the
    /// server decides.
    pub fn attach_credentials(
        &self,
        request: &mut HttpRequest,
        requires_auth: bool,
    ) -> Result<(), ApiError> {
        if !requires_auth {
            return Ok(());
        }

        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::InvalidCredential)?;
            request.headers.insert(AUTHORIZATION, value);
        }
        Ok(())
    }

    /// Builds, authenticates and dispatches one call.
    pub async fn send(&self, call: ApiCall) -> Result<Value, ApiError> {
        let mut request = self.executor.build(&call)?;
        self.attach_credentials(&mut request, call.requires_auth)?;
        self.executor.dispatch(request).await
    }

    pub async fn login(&mut self, credentials: &AuthCredentials) -> Result<AuthResponse, ApiError> {
        let call = ApiCall::post(endpoint::LOGIN)
            .without_auth()
            .json(credentials)?;

        let response: AuthResponse = decode(self.send(call).await?)?;
        self.establish(&response).await?;

        info!(user_id = %response.user.id, "logged in");
        Ok(response)
    }

    pub async fn register(&mut self, profile: &RegisterData) -> Result<AuthResponse, ApiError> {
        let call = ApiCall::post(endpoint::REGISTER)
            .without_auth()
            .json(profile)?;

        let response: AuthResponse = decode(self.send(call).await?)?;
        self.establish(&response).await?;

        info!(user_id = %response.user.id, "registered");
        Ok(response)
    }

    /// Records a successful login/registration: the access token goes to
    /// storage and then to memory, followed by the refresh token (if any)
    /// and the user record. If the access token cannot be stored, memory is
    /// left as it was. A reply without a token changes nothing.
    async fn establish(&mut self, response: &AuthResponse) -> Result<(), ApiError> {
        let Some(token) = response.token.as_deref().filter(|t| !t.is_empty()) else {
            warn!("auth response carried no token; session left unchanged");
            return Ok(());
        };

        self.storage.set(AUTH_TOKEN_KEY, token).await?;
        self.token = Some(token.to_string());

        if let Some(refresh) = response.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            self.storage.set(REFRESH_TOKEN_KEY, refresh).await?;
        }

        let user = serde_json::to_string(&response.user)?;
        self.storage.set(USER_DATA_KEY, &user).await?;
        Ok(())
    }

    /// Invalidates the session server-side when there is one, then tears it
    /// down locally regardless of how the remote call went.
    pub async fn logout(&mut self) -> Result<(), ApiError> {
        let had_session = match self.is_authenticated().await {
            Ok(authenticated) => authenticated,
            Err(err) => {
                warn!(error = %err, "could not read stored session before logout");
                true
            }
        };

        if had_session {
            if let Err(err) = self.send(ApiCall::post(endpoint::LOGOUT)).await {
                warn!(
                    error = %err,
                    status = ?err.status(),
                    "remote logout failed; clearing local session anyway"
                );
            }
        }

        self.token = None;
        self.storage
            .remove_many(&[AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY])
            .await?;

        if had_session {
            info!("logged out");
        }
        Ok(())
    }

    /// Trades the stored refresh token for a new access token. The refresh
    /// token itself is left as is. On failure, including a failed write of
    /// the new token, nothing changes; whether to force a logout is the
    /// caller's call.
    pub async fn refresh(&mut self) -> Result<String, ApiError> {
        let refresh_token = self
            .storage
            .get(REFRESH_TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::RefreshTokenUnavailable)?;

        let call = ApiCall::post(endpoint::REFRESH)
            .without_auth()
            .json(&RefreshRequest { refresh_token })?;

        let response: RefreshResponse = decode(self.send(call).await?)?;

        self.storage.set(AUTH_TOKEN_KEY, &response.token).await?;
        self.token = Some(response.token.clone());

        info!("access token refreshed");
        Ok(response.token)
    }

    /// Last user record written by login/registration, for optimistic display.
    /// Unreadable or malformed data counts as absent.
    pub async fn stored_user(&self) -> Option<User> {
        let raw = match self.storage.get(USER_DATA_KEY).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "failed to read stored user");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "stored user record is malformed");
                None
            }
        }
    }
}
