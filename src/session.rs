use crate::errors::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Caller identity as forwarded by the authentication proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated { user_id: String, email: String },
    Anonymous,
}

impl Session {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match header_value(headers, USER_ID_HEADER) {
            Some(user_id) => Self::Authenticated {
                user_id,
                email: header_value(headers, USER_EMAIL_HEADER).unwrap_or_default(),
            },
            None => Self::Anonymous,
        }
    }

    pub fn user_id(&self) -> Result<&str, AppError> {
        match self {
            Self::Authenticated { user_id, .. } => Ok(user_id),
            Self::Anonymous => Err(AppError::unauthorized("sign in to track your progress")),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}
