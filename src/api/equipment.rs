use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{auth::AdminUser, state::AppState};
use crate::error::{AppError, FieldError, Result};
use crate::models::equipment::{
    CreateEquipmentData, Equipment, EquipmentStatus, UpdateEquipmentData,
};
use crate::services::event_planner;
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct ListEquipmentQuery {
    pub status: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEquipmentRequest {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub daily_rate: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEquipmentRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub daily_rate: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<EquipmentStatus> {
    raw.parse::<EquipmentStatus>().map_err(|_| {
        AppError::Validation(vec![FieldError::new(
            "status",
            "must be one of available, rented, maintenance",
        )])
    })
}

async fn list_equipment(
    State(state): State<AppState>,
    Query(query): Query<ListEquipmentQuery>,
) -> Result<Json<Vec<Equipment>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let items = Equipment::list(&state.pool, status, query.category.as_deref()).await?;

    Ok(Json(items))
}

async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Equipment>> {
    let item = Equipment::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Equipment"))?;

    Ok(Json(item))
}

async fn create_equipment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateEquipmentRequest>,
) -> Result<(StatusCode, Json<Equipment>)> {
    let mut v = Validator::new();
    v.required("name", &req.name)
        .required("category", &req.category)
        .non_negative("daily_rate", req.daily_rate);
    v.finish()?;

    let item = Equipment::create(
        &state.pool,
        CreateEquipmentData {
            name: req.name.trim().to_string(),
            category: req.category.trim().to_lowercase(),
            description: req.description,
            daily_rate: req.daily_rate,
        },
    )
    .await?;

    tracing::info!(equipment_id = %item.id, "Equipment created");

    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_equipment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEquipmentRequest>,
) -> Result<Json<Equipment>> {
    let mut v = Validator::new();
    v.not_blank("name", req.name.as_deref())
        .not_blank("category", req.category.as_deref());
    if let Some(rate) = req.daily_rate {
        v.non_negative("daily_rate", rate);
    }
    v.finish()?;

    let item = Equipment::update(
        &state.pool,
        id,
        UpdateEquipmentData {
            name: req.name.map(|n| n.trim().to_string()),
            category: req.category.map(|c| c.trim().to_lowercase()),
            description: req.description,
            daily_rate: req.daily_rate,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Equipment"))?;

    Ok(Json(item))
}

async fn set_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Equipment>> {
    let status = parse_status(&req.status)?;

    let item = event_planner::set_equipment_status(&state.pool, id, status).await?;

    tracing::info!(equipment_id = %item.id, status = %item.status, "Equipment status changed");

    Ok(Json(item))
}

async fn delete_equipment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !Equipment::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Equipment"));
    }

    tracing::info!(equipment_id = %id, "Equipment deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/equipment", get(list_equipment).post(create_equipment))
        .route(
            "/api/v1/equipment/:id",
            get(get_equipment).put(update_equipment).delete(delete_equipment),
        )
        .route("/api/v1/equipment/:id/status", patch(set_status))
}
