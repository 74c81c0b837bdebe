use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, AuthUser},
    state::AppState,
};
use crate::error::{AppError, FieldError, Result};
use crate::models::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::services::withdrawals;
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct CreateWithdrawalRequest {
    pub amount: i64,
    pub method: String,
    pub account_details: String,
}

#[derive(Debug, Deserialize)]
pub struct ListAllQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    pub admin_note: Option<String>,
}

fn parse_status(raw: &str) -> Result<WithdrawalStatus> {
    raw.parse::<WithdrawalStatus>().map_err(|_| {
        AppError::Validation(vec![FieldError::new(
            "status",
            "must be one of pending, approved, completed, rejected",
        )])
    })
}

async fn create_withdrawal(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateWithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>)> {
    let mut v = Validator::new();
    v.positive("amount", req.amount)
        .required("method", &req.method)
        .required("account_details", &req.account_details);
    v.finish()?;

    let withdrawal = withdrawals::request_withdrawal(
        &state.pool,
        auth.id,
        req.amount,
        req.method.trim().to_string(),
        req.account_details,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

async fn my_withdrawals(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Withdrawal>>> {
    Ok(Json(Withdrawal::list_by_user(&state.pool, auth.id).await?))
}

async fn all_withdrawals(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListAllQuery>,
) -> Result<Json<Vec<Withdrawal>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    Ok(Json(Withdrawal::list_all(&state.pool, status).await?))
}

async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Withdrawal>> {
    let status = parse_status(&req.status)?;
    let withdrawal = withdrawals::update_status(&state.pool, id, status, req.admin_note).await?;

    Ok(Json(withdrawal))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/withdrawals",
            get(my_withdrawals).post(create_withdrawal),
        )
        .route("/api/v1/withdrawals/all", get(all_withdrawals))
        .route("/api/v1/withdrawals/:id/status", patch(update_status))
}
