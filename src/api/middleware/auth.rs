use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use super::state::AppState;
use crate::error::AppError;
use crate::services::token::{Claims, Role};

/// Reads the bearer token from the `Authorization` header, if any
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;

    state.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::Unauthorized
    })
}

/// Authenticated end user. Admin tokens are rejected.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state)?;
        if claims.role != Role::User {
            return Err(AppError::Forbidden);
        }

        Ok(Self {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// Authenticated administrator
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state)?;
        if claims.role != Role::Admin {
            return Err(AppError::Forbidden);
        }

        Ok(Self {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// Identity for routes that serve both anonymous and signed-in callers.
///
/// A missing header yields `None`; a present but invalid token is still a 401.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<Claims>);

impl OptionalAuth {
    pub fn is_admin(&self) -> bool {
        matches!(&self.0, Some(claims) if claims.role == Role::Admin)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match &self.0 {
            Some(claims) if claims.role == Role::User => Some(claims.sub),
            _ => None,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if parts.headers.get(AUTHORIZATION).is_none() {
            return Ok(Self(None));
        }

        claims_from_parts(parts, state).map(|claims| Self(Some(claims)))
    }
}

/// Either kind of signed-in caller
#[derive(Debug, Clone)]
pub struct AnyAuth(pub Claims);

impl AnyAuth {
    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AnyAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        claims_from_parts(parts, state).map(Self)
    }
}
