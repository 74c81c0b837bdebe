use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AnyAuth, AuthUser},
    state::AppState,
};
use crate::error::{AppError, FieldError, Result};
use crate::models::{
    media::{CreateMediaData, Media, MediaType, UpdateMediaData},
    pagination::Page,
};
use crate::services::media_market::{self, LikeOutcome, PurchaseOutcome};
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct ListMediaQuery {
    pub owner_id: Option<Uuid>,
    pub media_type: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMediaRequest {
    pub title: String,
    pub description: Option<String>,
    pub media_type: String,
    pub url: String,
    #[serde(default)]
    pub price: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMediaRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

fn parse_media_type(raw: &str) -> Result<MediaType> {
    raw.parse::<MediaType>().map_err(|_| {
        AppError::Validation(vec![FieldError::new(
            "media_type",
            "must be one of photo, video",
        )])
    })
}

async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<ListMediaQuery>,
) -> Result<Json<Vec<Media>>> {
    let media_type = query.media_type.as_deref().map(parse_media_type).transpose()?;
    let media = Media::list(
        &state.pool,
        query.owner_id,
        media_type,
        Page::new(query.page, query.limit),
    )
    .await?;

    Ok(Json(media))
}

async fn get_media(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Media>> {
    let media = Media::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Media"))?;

    Ok(Json(media))
}

async fn create_media(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateMediaRequest>,
) -> Result<(StatusCode, Json<Media>)> {
    let mut v = Validator::new();
    v.required("title", &req.title)
        .max_len("title", &req.title, 200)
        .required("url", &req.url)
        .non_negative("price", req.price);
    v.finish()?;
    let media_type = parse_media_type(&req.media_type)?;

    let media = Media::create(
        &state.pool,
        CreateMediaData {
            owner_id: auth.id,
            title: req.title.trim().to_string(),
            description: req.description,
            media_type,
            url: req.url,
            price: req.price,
        },
    )
    .await?;

    tracing::info!(media_id = %media.id, owner_id = %auth.id, "Media uploaded");

    Ok((StatusCode::CREATED, Json(media)))
}

async fn update_media(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMediaRequest>,
) -> Result<Json<Media>> {
    let mut v = Validator::new();
    v.not_blank("title", req.title.as_deref());
    if let Some(price) = req.price {
        v.non_negative("price", price);
    }
    v.finish()?;

    let existing = Media::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Media"))?;
    if existing.owner_id != auth.id {
        return Err(AppError::Forbidden);
    }

    let media = Media::update(
        &state.pool,
        id,
        UpdateMediaData {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            price: req.price,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Media"))?;

    Ok(Json(media))
}

/// Owners may delete their media; admins may delete anything.
async fn delete_media(
    State(state): State<AppState>,
    auth: AnyAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let existing = Media::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Media"))?;
    if !auth.is_admin() && existing.owner_id != auth.0.sub {
        return Err(AppError::Forbidden);
    }

    if !Media::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Media"));
    }

    tracing::info!(media_id = %id, deleted_by = %auth.0.sub, "Media deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeOutcome>> {
    Ok(Json(media_market::toggle_like(&state.pool, id, auth.id).await?))
}

async fn purchase(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<PurchaseOutcome>)> {
    let outcome = media_market::purchase(&state.pool, id, auth.id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/media", get(list_media).post(create_media))
        .route(
            "/api/v1/media/:id",
            get(get_media).put(update_media).delete(delete_media),
        )
        .route("/api/v1/media/:id/like", post(toggle_like))
        .route("/api/v1/media/:id/purchase", post(purchase))
}
