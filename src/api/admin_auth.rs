use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    auth::{AdminUser, OptionalAuth},
    rate_limit::limit_auth_requests,
    state::AppState,
};
use crate::error::{AppError, Result};
use crate::models::admin::{Admin, CreateAdminData};
use crate::services::{password, token::Role};
use crate::validation::{normalize_email, Validator};

#[derive(Debug, Deserialize)]
pub struct RegisterAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminAuthResponse {
    pub token: String,
    pub expires_in: i64,
    pub admin: Admin,
}

/// Register an admin.
///
/// Open while no admin exists; after that only admins may add admins.
async fn register(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Json(req): Json<RegisterAdminRequest>,
) -> Result<(StatusCode, Json<AdminAuthResponse>)> {
    let mut v = Validator::new();
    v.required("name", &req.name)
        .email("email", &req.email)
        .min_len("password", &req.password, 8);
    v.finish()?;

    if Admin::count(&state.pool).await? > 0 && !auth.is_admin() {
        return Err(AppError::Forbidden);
    }

    let email = normalize_email(&req.email);
    if Admin::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict("Admin already exists".to_string()));
    }

    let admin = Admin::create(
        &state.pool,
        CreateAdminData {
            email,
            name: req.name.trim().to_string(),
            password_hash: password::hash_password(&req.password)?,
        },
    )
    .await?;

    let token = state.tokens.issue(admin.id, &admin.email, Role::Admin)?;

    tracing::info!(admin_id = %admin.id, "Admin registered");

    Ok((
        StatusCode::CREATED,
        Json(AdminAuthResponse {
            token,
            expires_in: state.tokens.ttl_seconds(),
            admin,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AdminAuthResponse>> {
    let email = normalize_email(&req.email);

    let admin = Admin::find_by_email(&state.pool, &email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !password::verify_password(&req.password, &admin.password_hash)? {
        tracing::warn!(email = %email, "Admin login failed");
        return Err(AppError::Unauthorized);
    }

    let token = state.tokens.issue(admin.id, &admin.email, Role::Admin)?;

    tracing::info!(admin_id = %admin.id, "Admin logged in");

    Ok(Json(AdminAuthResponse {
        token,
        expires_in: state.tokens.ttl_seconds(),
        admin,
    }))
}

async fn me(State(state): State<AppState>, admin: AdminUser) -> Result<Json<Admin>> {
    let admin = Admin::find_by_id(&state.pool, admin.id)
        .await?
        .ok_or_else(|| AppError::not_found("Admin"))?;

    Ok(Json(admin))
}

pub fn router(state: AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/api/v1/admin/register", post(register))
        .route("/api/v1/admin/login", post(login))
        .route_layer(middleware::from_fn_with_state(state, limit_auth_requests));

    Router::new()
        .merge(limited)
        .route("/api/v1/admin/me", get(me))
}
