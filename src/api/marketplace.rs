use axum::{
    extract::{Path, Query, State},
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
use crate::models::{
    marketplace_item::{
        CreateItemData, ItemFilter, ItemFlag, Location, MarketplaceItem, Seller, UpdateItemData,
    },
    pagination::Page,
};
use crate::validation::Validator;

const CONDITIONS: [&str; 4] = ["new", "like_new", "good", "fair"];

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub category: Option<String>,
    pub condition: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub condition: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub seller: Seller,
    pub location: Location,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub images: Option<Vec<String>>,
    pub seller: Option<Seller>,
    pub location: Option<Location>,
}

fn validate_condition(v: &mut Validator, condition: &str) {
    if !CONDITIONS.contains(&condition) {
        v.add("condition", "must be one of new, like_new, good, fair");
    }
}

fn validate_seller(v: &mut Validator, seller: &Seller) {
    v.required("seller.name", &seller.name)
        .email("seller.email", &seller.email);
}

fn validate_location(v: &mut Validator, location: &Location) {
    v.required("location.city", &location.city)
        .required("location.country", &location.country);
}

/// Inactive items are hidden from everyone but admins.
async fn list_items(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<MarketplaceItem>>> {
    let filter = ItemFilter {
        category: query.category,
        condition: query.condition,
        featured: query.featured,
        search: query.search.filter(|s| !s.trim().is_empty()),
        active_only: !auth.is_admin(),
    };
    let items =
        MarketplaceItem::list(&state.pool, &filter, Page::new(query.page, query.limit)).await?;

    Ok(Json(items))
}

async fn get_item(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<MarketplaceItem>> {
    let item = MarketplaceItem::find_by_id(&state.pool, id)
        .await?
        .filter(|i| i.is_active || auth.is_admin())
        .ok_or_else(|| AppError::not_found("Marketplace item"))?;

    Ok(Json(item))
}

async fn create_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<MarketplaceItem>)> {
    let mut v = Validator::new();
    v.required("title", &req.title)
        .max_len("title", &req.title, 200)
        .required("description", &req.description)
        .required("category", &req.category)
        .non_negative("price", req.price);
    validate_condition(&mut v, &req.condition);
    validate_seller(&mut v, &req.seller);
    validate_location(&mut v, &req.location);
    v.finish()?;

    let item = MarketplaceItem::create(
        &state.pool,
        CreateItemData {
            title: req.title.trim().to_string(),
            description: req.description,
            price: req.price,
            category: req.category.trim().to_string(),
            condition: req.condition,
            images: req.images,
            seller: req.seller,
            location: req.location,
            is_featured: req.is_featured,
        },
    )
    .await?;

    tracing::info!(item_id = %item.id, "Marketplace item created");

    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<MarketplaceItem>> {
    let mut v = Validator::new();
    v.not_blank("title", req.title.as_deref())
        .not_blank("description", req.description.as_deref())
        .not_blank("category", req.category.as_deref());
    if let Some(price) = req.price {
        v.non_negative("price", price);
    }
    if let Some(condition) = &req.condition {
        validate_condition(&mut v, condition);
    }
    if let Some(seller) = &req.seller {
        validate_seller(&mut v, seller);
    }
    if let Some(location) = &req.location {
        validate_location(&mut v, location);
    }
    v.finish()?;

    let item = MarketplaceItem::update(
        &state.pool,
        id,
        UpdateItemData {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            price: req.price,
            category: req.category,
            condition: req.condition,
            images: req.images,
            seller: req.seller,
            location: req.location,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Marketplace item"))?;

    tracing::info!(item_id = %item.id, "Marketplace item updated");

    Ok(Json(item))
}

async fn toggle(state: &AppState, id: Uuid, flag: ItemFlag) -> Result<Json<MarketplaceItem>> {
    let item = MarketplaceItem::toggle(&state.pool, id, flag)
        .await?
        .ok_or_else(|| AppError::not_found("Marketplace item"))?;

    tracing::info!(
        item_id = %item.id,
        is_featured = item.is_featured,
        is_active = item.is_active,
        "Marketplace item flag toggled"
    );

    Ok(Json(item))
}

async fn toggle_featured(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MarketplaceItem>> {
    toggle(&state, id, ItemFlag::Featured).await
}

async fn toggle_active(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MarketplaceItem>> {
    toggle(&state, id, ItemFlag::Active).await
}

async fn delete_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !MarketplaceItem::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Marketplace item"));
    }

    tracing::info!(item_id = %id, "Marketplace item deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/marketplace", get(list_items).post(create_item))
        .route(
            "/api/v1/marketplace/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/api/v1/marketplace/:id/toggle-featured", patch(toggle_featured))
        .route("/api/v1/marketplace/:id/toggle-active", patch(toggle_active))
}
