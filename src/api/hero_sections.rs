use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{auth::AdminUser, state::AppState};
use crate::error::{AppError, Result};
use crate::models::hero_section::{CreateHeroData, HeroSection, UpdateHeroData};
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHeroRequest {
    pub page: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHeroRequest {
    pub page: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub sort_order: Option<i32>,
}

async fn list_all(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<HeroSection>>> {
    Ok(Json(HeroSection::list_all(&state.pool).await?))
}

/// Public: active slides for one page, `home` by default
async fn list_active(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<HeroSection>>> {
    let page = query
        .page
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "home".to_string());

    Ok(Json(HeroSection::list_active(&state.pool, &page).await?))
}

async fn get_hero(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<HeroSection>> {
    let hero = HeroSection::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Hero section"))?;

    Ok(Json(hero))
}

async fn create_hero(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateHeroRequest>,
) -> Result<(StatusCode, Json<HeroSection>)> {
    let mut v = Validator::new();
    v.required("page", &req.page)
        .required("title", &req.title)
        .required("image_url", &req.image_url);
    v.finish()?;

    let hero = HeroSection::create(
        &state.pool,
        CreateHeroData {
            page: req.page.trim().to_lowercase(),
            title: req.title.trim().to_string(),
            subtitle: req.subtitle,
            image_url: req.image_url,
            cta_text: req.cta_text,
            cta_link: req.cta_link,
            sort_order: req.sort_order,
        },
    )
    .await?;

    tracing::info!(hero_id = %hero.id, page = %hero.page, "Hero section created");

    Ok((StatusCode::CREATED, Json(hero)))
}

async fn update_hero(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateHeroRequest>,
) -> Result<Json<HeroSection>> {
    let mut v = Validator::new();
    v.not_blank("page", req.page.as_deref())
        .not_blank("title", req.title.as_deref())
        .not_blank("image_url", req.image_url.as_deref());
    v.finish()?;

    let hero = HeroSection::update(
        &state.pool,
        id,
        UpdateHeroData {
            page: req.page.map(|p| p.trim().to_lowercase()),
            title: req.title.map(|t| t.trim().to_string()),
            subtitle: req.subtitle,
            image_url: req.image_url,
            cta_text: req.cta_text,
            cta_link: req.cta_link,
            sort_order: req.sort_order,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Hero section"))?;

    Ok(Json(hero))
}

async fn toggle_active(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<HeroSection>> {
    let hero = HeroSection::toggle_active(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Hero section"))?;

    tracing::info!(hero_id = %hero.id, is_active = hero.is_active, "Hero section toggled");

    Ok(Json(hero))
}

async fn delete_hero(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !HeroSection::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Hero section"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/hero-sections", get(list_all).post(create_hero))
        .route("/api/v1/hero-sections/active", get(list_active))
        .route(
            "/api/v1/hero-sections/:id",
            get(get_hero).put(update_hero).delete(delete_hero),
        )
        .route("/api/v1/hero-sections/:id/toggle-active", patch(toggle_active))
}
