use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, OptionalAuth},
    state::AppState,
};
use crate::error::{AppError, Result};
use crate::models::plan::{CreatePlanData, Plan, PlanFlag, UpdatePlanData};
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_hours: i32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub is_popular: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_hours: Option<i32>,
    pub features: Option<Vec<String>>,
}

fn clean_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

async fn list_plans(
    State(state): State<AppState>,
    auth: OptionalAuth,
) -> Result<Json<Vec<Plan>>> {
    let plans = Plan::list(&state.pool, !auth.is_admin()).await?;
    Ok(Json(plans))
}

async fn get_plan(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>> {
    let plan = Plan::find_by_id(&state.pool, id)
        .await?
        .filter(|p| p.is_active || auth.is_admin())
        .ok_or_else(|| AppError::not_found("Plan"))?;

    Ok(Json(plan))
}

async fn create_plan(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<Plan>)> {
    let mut v = Validator::new();
    v.required("name", &req.name)
        .required("description", &req.description)
        .non_negative("price", req.price)
        .positive("duration_hours", i64::from(req.duration_hours));
    v.finish()?;

    let plan = Plan::create(
        &state.pool,
        CreatePlanData {
            name: req.name.trim().to_string(),
            description: req.description,
            price: req.price,
            duration_hours: req.duration_hours,
            features: clean_features(req.features),
            is_popular: req.is_popular,
        },
    )
    .await?;

    tracing::info!(plan_id = %plan.id, "Plan created");

    Ok((StatusCode::CREATED, Json(plan)))
}

async fn update_plan(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<Json<Plan>> {
    let mut v = Validator::new();
    v.not_blank("name", req.name.as_deref())
        .not_blank("description", req.description.as_deref());
    if let Some(price) = req.price {
        v.non_negative("price", price);
    }
    if let Some(hours) = req.duration_hours {
        v.positive("duration_hours", i64::from(hours));
    }
    v.finish()?;

    let plan = Plan::update(
        &state.pool,
        id,
        UpdatePlanData {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            price: req.price,
            duration_hours: req.duration_hours,
            features: req.features.map(clean_features),
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Plan"))?;

    tracing::info!(plan_id = %plan.id, "Plan updated");

    Ok(Json(plan))
}

async fn toggle(state: &AppState, id: Uuid, flag: PlanFlag) -> Result<Json<Plan>> {
    let plan = Plan::toggle(&state.pool, id, flag)
        .await?
        .ok_or_else(|| AppError::not_found("Plan"))?;

    tracing::info!(
        plan_id = %plan.id,
        is_active = plan.is_active,
        is_popular = plan.is_popular,
        "Plan flag toggled"
    );

    Ok(Json(plan))
}

async fn toggle_active(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>> {
    toggle(&state, id, PlanFlag::Active).await
}

async fn toggle_popular(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>> {
    toggle(&state, id, PlanFlag::Popular).await
}

async fn delete_plan(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !Plan::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Plan"));
    }

    tracing::info!(plan_id = %id, "Plan deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/plans", get(list_plans).post(create_plan))
        .route(
            "/api/v1/plans/:id",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .route("/api/v1/plans/:id/toggle-active", patch(toggle_active))
        .route("/api/v1/plans/:id/toggle-popular", patch(toggle_popular))
}
