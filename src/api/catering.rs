use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, OptionalAuth},
    state::AppState,
};
use crate::error::{AppError, Result};
use crate::models::catering_service::{CateringService, CreateCateringData, UpdateCateringData};
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct CreateCateringRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_per_person: i64,
    #[serde(default = "default_min_guests")]
    pub min_guests: i32,
}

fn default_min_guests() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateCateringRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_per_person: Option<i64>,
    pub min_guests: Option<i32>,
    pub is_active: Option<bool>,
}

async fn list_catering(
    State(state): State<AppState>,
    auth: OptionalAuth,
) -> Result<Json<Vec<CateringService>>> {
    Ok(Json(CateringService::list(&state.pool, !auth.is_admin()).await?))
}

async fn get_catering(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CateringService>> {
    let service = CateringService::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Catering service"))?;

    Ok(Json(service))
}

async fn create_catering(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateCateringRequest>,
) -> Result<(StatusCode, Json<CateringService>)> {
    let mut v = Validator::new();
    v.required("name", &req.name)
        .non_negative("price_per_person", req.price_per_person)
        .positive("min_guests", i64::from(req.min_guests));
    v.finish()?;

    let service = CateringService::create(
        &state.pool,
        CreateCateringData {
            name: req.name.trim().to_string(),
            description: req.description,
            price_per_person: req.price_per_person,
            min_guests: req.min_guests,
        },
    )
    .await?;

    tracing::info!(catering_service_id = %service.id, "Catering service created");

    Ok((StatusCode::CREATED, Json(service)))
}

async fn update_catering(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCateringRequest>,
) -> Result<Json<CateringService>> {
    let mut v = Validator::new();
    v.not_blank("name", req.name.as_deref());
    if let Some(price) = req.price_per_person {
        v.non_negative("price_per_person", price);
    }
    if let Some(min) = req.min_guests {
        v.positive("min_guests", i64::from(min));
    }
    v.finish()?;

    let service = CateringService::update(
        &state.pool,
        id,
        UpdateCateringData {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            price_per_person: req.price_per_person,
            min_guests: req.min_guests,
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Catering service"))?;

    Ok(Json(service))
}

async fn delete_catering(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !CateringService::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Catering service"));
    }

    tracing::info!(catering_service_id = %id, "Catering service deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/catering", get(list_catering).post(create_catering))
        .route(
            "/api/v1/catering/:id",
            get(get_catering).put(update_catering).delete(delete_catering),
        )
}
