use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, AuthUser},
    state::AppState,
};
use crate::error::Result;
use crate::models::{
    analytics::{DashboardStats, EarningsSummary},
    media::Media,
};

/// Per-media performance row
#[derive(Debug, Serialize)]
pub struct MediaStats {
    pub id: Uuid,
    pub title: String,
    pub media_type: String,
    pub price: i64,
    pub likes: i64,
    pub sales: i64,
    pub total_earnings: i64,
}

impl From<Media> for MediaStats {
    fn from(m: Media) -> Self {
        Self {
            id: m.id,
            title: m.title,
            media_type: m.media_type,
            price: m.price,
            likes: m.likes,
            sales: m.sales,
            total_earnings: m.total_earnings,
        }
    }
}

async fn earnings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<EarningsSummary>> {
    Ok(Json(EarningsSummary::for_user(&state.pool, auth.id).await?))
}

async fn media_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<MediaStats>>> {
    let media = Media::list_by_owner_ranked(&state.pool, auth.id).await?;
    Ok(Json(media.into_iter().map(MediaStats::from).collect()))
}

async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<DashboardStats>> {
    Ok(Json(DashboardStats::load(&state.pool).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/analytics/earnings", get(earnings))
        .route("/api/v1/analytics/media", get(media_stats))
        .route("/api/v1/analytics/dashboard", get(dashboard))
}
