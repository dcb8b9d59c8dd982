use serde::{Deserialize, Serialize};

use super::Slice;
use crate::model::{AuthResponse, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    Requested,
    SignedIn {
        user: User,
        token: Option<String>,
        refresh_token: Option<String>,
    },
    Failed(String),
    TokenRefreshed(String),
    ProfileUpdated(User),
    SignedOut,
}

impl From<AuthResponse> for AuthAction {
    fn from(response: AuthResponse) -> Self {
        AuthAction::SignedIn {
            user: response.user,
            token: response.token,
            refresh_token: response.refresh_token,
        }
    }
}

impl Slice for AuthState {
    type Action = AuthAction;

    fn reduce(&self, action: &AuthAction) -> Self {
        let mut next = self.clone();
        match action {
            AuthAction::Requested => {
                next.loading = true;
                next.error = None;
            }
            AuthAction::SignedIn {
                user,
                token,
                refresh_token,
            } => {
                next.loading = false;
                next.error = None;
                next.user = Some(user.clone());
                next.token = token.clone();
                next.refresh_token = refresh_token.clone();
                next.is_authenticated = token.is_some();
            }
            AuthAction::Failed(message) => {
                next.loading = false;
                next.error = Some(message.clone());
            }
            AuthAction::TokenRefreshed(token) => next.token = Some(token.clone()),
            AuthAction::ProfileUpdated(user) => next.user = Some(user.clone()),
            AuthAction::SignedOut => next = AuthState::default(),
        }
        next
    }
}
