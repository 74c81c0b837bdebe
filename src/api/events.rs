use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, OptionalAuth},
    state::AppState,
};
use crate::error::{AppError, Result};
use crate::models::{
    catering_service::EventCatering,
    equipment::EquipmentRental,
    event::{CreateEventData, Event, EventStatus, UpdateEventData},
    pagination::Page,
};
use crate::services::event_planner::{self, CateringRequest, EventDetails, RentalRequest};
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub base_price: i64,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub catering: Vec<CateringRequest>,
    #[serde(default)]
    pub equipment: Vec<RentalRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<EventStatus> {
    raw.parse::<EventStatus>().map_err(|_| {
        AppError::Validation(vec![crate::error::FieldError::new(
            "status",
            "must be one of draft, published, cancelled, completed",
        )])
    })
}

fn validate_line_items(v: &mut Validator, catering: &[CateringRequest], rentals: &[RentalRequest]) {
    for (i, c) in catering.iter().enumerate() {
        if c.guest_count <= 0 {
            v.add(&format!("catering[{}].guest_count", i), "must be greater than zero");
        }
    }
    for (i, r) in rentals.iter().enumerate() {
        if r.end_at <= r.start_at {
            v.add(&format!("equipment[{}].end_at", i), "must be after start_at");
        }
    }
}

/// Anonymous callers only see published events.
async fn list_events(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<Event>>> {
    let requested = query.status.as_deref().map(parse_status).transpose()?;
    let status = if auth.is_admin() {
        requested
    } else {
        Some(EventStatus::Published)
    };

    let events = Event::list(&state.pool, status, Page::new(query.page, query.limit)).await?;
    Ok(Json(events))
}

async fn get_event(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<EventDetails>> {
    let details = event_planner::load_details(&state.pool, id).await?;

    if !auth.is_admin() && details.event.status != EventStatus::Published.as_str() {
        return Err(AppError::not_found("Event"));
    }

    Ok(Json(details))
}

async fn create_event(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventDetails>)> {
    let mut v = Validator::new();
    v.required("title", &req.title)
        .max_len("title", &req.title, 200)
        .required("event_type", &req.event_type)
        .required("location", &req.location)
        .non_negative("base_price", req.base_price);
    if let Some(capacity) = req.capacity {
        v.positive("capacity", i64::from(capacity));
    }
    validate_line_items(&mut v, &req.catering, &req.equipment);
    v.finish()?;

    let details = event_planner::create_event(
        &state.pool,
        CreateEventData {
            title: req.title.trim().to_string(),
            description: req.description,
            event_type: req.event_type.trim().to_string(),
            location: req.location.trim().to_string(),
            event_date: req.event_date,
            base_price: req.base_price,
            capacity: req.capacity,
        },
        &req.catering,
        &req.equipment,
    )
    .await?;

    tracing::info!(event_id = %details.event.id, admin_id = %admin.id, "Event created by admin");

    Ok((StatusCode::CREATED, Json(details)))
}

async fn update_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventData>,
) -> Result<Json<Event>> {
    let mut v = Validator::new();
    v.not_blank("title", req.title.as_deref())
        .not_blank("event_type", req.event_type.as_deref())
        .not_blank("location", req.location.as_deref());
    if let Some(price) = req.base_price {
        v.non_negative("base_price", price);
    }
    if let Some(capacity) = req.capacity {
        v.positive("capacity", i64::from(capacity));
    }
    v.finish()?;

    let event = Event::update(&state.pool, id, req)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;

    tracing::info!(event_id = %event.id, "Event updated");

    Ok(Json(event))
}

async fn set_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Event>> {
    let status = parse_status(&req.status)?;

    let event = Event::set_status(&state.pool, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;

    tracing::info!(event_id = %event.id, status = %event.status, "Event status changed");

    Ok(Json(event))
}

async fn delete_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    event_planner::delete_event(&state.pool, id).await?;

    tracing::info!(event_id = %id, "Event deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn attach_catering(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CateringRequest>,
) -> Result<(StatusCode, Json<EventCatering>)> {
    let mut v = Validator::new();
    validate_line_items(&mut v, std::slice::from_ref(&req), &[]);
    v.finish()?;

    let row = event_planner::attach_catering(&state.pool, id, &req).await?;

    tracing::info!(
        event_id = %id,
        catering_service_id = %row.catering_service_id,
        total = row.total_price,
        "Catering attached"
    );

    Ok((StatusCode::CREATED, Json(row)))
}

async fn rent_equipment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RentalRequest>,
) -> Result<(StatusCode, Json<EquipmentRental>)> {
    let mut v = Validator::new();
    validate_line_items(&mut v, &[], std::slice::from_ref(&req));
    v.finish()?;

    let rental = event_planner::rent_equipment(&state.pool, id, &req).await?;

    Ok((StatusCode::CREATED, Json(rental)))
}

async fn return_equipment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((id, rental_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let rental = event_planner::return_equipment(&state.pool, id, rental_id).await?;

    tracing::info!(
        event_id = %id,
        equipment_id = %rental.equipment_id,
        "Equipment returned"
    );

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/events", get(list_events).post(create_event))
        .route(
            "/api/v1/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/api/v1/events/:id/status", patch(set_status))
        .route("/api/v1/events/:id/catering", post(attach_catering))
        .route("/api/v1/events/:id/equipment", post(rent_equipment))
        .route(
            "/api/v1/events/:id/equipment/:rental_id",
            delete(return_equipment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_line_item_validation() {
        let now = Utc::now();
        let catering = vec![CateringRequest {
            catering_service_id: Uuid::new_v4(),
            guest_count: 0,
        }];
        let rentals = vec![RentalRequest {
            equipment_id: Uuid::new_v4(),
            start_at: now,
            end_at: now - Duration::hours(1),
        }];

        let mut v = Validator::new();
        validate_line_items(&mut v, &catering, &rentals);
        match v.finish() {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].field, "catering[0].guest_count");
                assert_eq!(fields[1].field, "equipment[0].end_at");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("published").unwrap(), EventStatus::Published);
        assert!(parse_status("archived").is_err());
    }
}
