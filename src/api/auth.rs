use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::middleware::{
    auth::AuthUser, rate_limit::limit_auth_requests, state::AppState,
};
use crate::error::{AppError, Result};
use crate::models::{
    email_verification::{EmailVerification, OtpPurpose},
    user::{CreateUserData, UpdateUserData, User},
};
use crate::services::{mailer, otp, password, token::Role};
use crate::validation::{normalize_email, Validator};

/// How long a verified email may be used to register
const VERIFIED_EMAIL_WINDOW_HOURS: i64 = 1;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserAuthResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

/// Issues a fresh code for `purpose` and returns it for delivery
async fn issue_otp(state: &AppState, email: &str, purpose: OtpPurpose) -> Result<String> {
    let code = otp::generate_code();
    let hash = state.otp.hash(email, purpose, &code);

    EmailVerification::issue(
        &state.pool,
        email,
        purpose,
        &hash,
        otp::expiry_from(Utc::now()),
    )
    .await?;

    Ok(code)
}

async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>> {
    let mut v = Validator::new();
    v.email("email", &req.email);
    v.finish()?;

    let email = normalize_email(&req.email);

    if let Some(user) = User::find_by_email(&state.pool, &email).await? {
        if user.email_verified {
            return Err(AppError::Conflict("User already exists".to_string()));
        }
    }

    let code = issue_otp(&state, &email, OtpPurpose::EmailVerification).await?;

    // Delivery failure fails the request
    state.mailer.send(mailer::otp_email(&email, &code)?).await?;

    tracing::info!(email = %email, "Verification code sent");

    Ok(Json(json!({
        "message": "Verification code sent",
        "expires_in_minutes": otp::OTP_TTL_MINUTES,
    })))
}

async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<Value>> {
    let mut v = Validator::new();
    v.email("email", &req.email).required("otp", &req.otp);
    v.finish()?;

    let email = normalize_email(&req.email);

    let mut tx = state.pool.begin().await?;
    let outcome = otp::verify_and_consume(
        &mut tx,
        &state.otp,
        &email,
        OtpPurpose::EmailVerification,
        &req.otp,
    )
    .await?;
    tx.commit().await?;
    outcome?;

    tracing::info!(email = %email, "Email verified");

    Ok(Json(json!({ "message": "Email verified", "verified": true })))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserAuthResponse>)> {
    let mut v = Validator::new();
    v.required("name", &req.name)
        .max_len("name", &req.name, 120)
        .email("email", &req.email)
        .min_len("password", &req.password, MIN_PASSWORD_LEN);
    v.finish()?;

    let email = normalize_email(&req.email);

    let verified = EmailVerification::recently_verified(
        &state.pool,
        &email,
        Duration::hours(VERIFIED_EMAIL_WINDOW_HOURS),
    )
    .await?;
    if !verified {
        return Err(AppError::BadRequest(
            "Email must be verified before registering".to_string(),
        ));
    }

    if User::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let user = User::create(
        &state.pool,
        CreateUserData {
            email,
            name: req.name.trim().to_string(),
            phone: req.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            password_hash: password::hash_password(&req.password)?,
            email_verified: true,
        },
    )
    .await?;

    let token = state.tokens.issue(user.id, &user.email, Role::User)?;

    tracing::info!(user_id = %user.id, "User registered");

    state
        .mailer
        .send_best_effort(mailer::welcome_email(&user.email, &user.name))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(UserAuthResponse {
            token,
            expires_in: state.tokens.ttl_seconds(),
            user,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserAuthResponse>> {
    let email = normalize_email(&req.email);

    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(email = %email, "User login failed");
        return Err(AppError::Unauthorized);
    }

    let token = state.tokens.issue(user.id, &user.email, Role::User)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(UserAuthResponse {
        token,
        expires_in: state.tokens.ttl_seconds(),
        user,
    }))
}

async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<User>> {
    let user = User::find_by_id(&state.pool, auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(user))
}

async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let mut v = Validator::new();
    v.not_blank("name", req.name.as_deref());
    if let Some(name) = &req.name {
        v.max_len("name", name, 120);
    }
    v.finish()?;

    let user = User::update_profile(
        &state.pool,
        auth.id,
        UpdateUserData {
            name: req.name.map(|n| n.trim().to_string()),
            phone: req.phone,
            avatar_url: req.avatar_url,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(user))
}

/// Always answers 200 so the endpoint cannot be used to discover accounts.
async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>> {
    let mut v = Validator::new();
    v.email("email", &req.email);
    v.finish()?;

    let email = normalize_email(&req.email);

    if User::find_by_email(&state.pool, &email).await?.is_some() {
        let code = issue_otp(&state, &email, OtpPurpose::PasswordReset).await?;
        state
            .mailer
            .send_best_effort(mailer::password_reset_email(&email, &code))
            .await;
        tracing::info!(email = %email, "Password reset code sent");
    } else {
        tracing::debug!(email = %email, "Password reset requested for unknown email");
    }

    Ok(Json(json!({
        "message": "If an account exists for this email, a reset code has been sent",
    })))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    let mut v = Validator::new();
    v.email("email", &req.email)
        .required("otp", &req.otp)
        .min_len("new_password", &req.new_password, MIN_PASSWORD_LEN);
    v.finish()?;

    let email = normalize_email(&req.email);
    let password_hash = password::hash_password(&req.new_password)?;

    let mut tx = state.pool.begin().await?;

    let outcome = otp::verify_and_consume(
        &mut tx,
        &state.otp,
        &email,
        OtpPurpose::PasswordReset,
        &req.otp,
    )
    .await?;
    if let Err(e) = outcome {
        // Keep the recorded attempt
        tx.commit().await?;
        return Err(e.into());
    }

    let updated = User::set_password_by_email(&mut *tx, &email, &password_hash).await?;
    if updated == 0 {
        return Err(otp::OtpError::NotFound.into());
    }

    tx.commit().await?;

    tracing::info!(email = %email, "Password reset");

    Ok(Json(json!({ "message": "Password has been reset" })))
}

pub fn router(state: AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/api/v1/auth/send-otp", post(send_otp))
        .route("/api/v1/auth/verify-otp", post(verify_otp))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/forgot-password", post(forgot_password))
        .route("/api/v1/auth/reset-password", post(reset_password))
        .route_layer(middleware::from_fn_with_state(state, limit_auth_requests));

    Router::new()
        .merge(limited)
        .route("/api/v1/auth/me", get(me).put(update_me))
}
