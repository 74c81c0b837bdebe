use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{AdminUser, AnyAuth, AuthUser, OptionalAuth},
    state::AppState,
};
use crate::error::{AppError, FieldError, Result};
use crate::models::{
    booking::{Booking, BookingStatus, CreateBookingData, UpdateBookingData},
    event::Event,
    pagination::Page,
    plan::Plan,
};
use crate::services::{mailer, pricing};
use crate::validation::{normalize_email, Validator};

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub plan_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_date: NaiveDate,
    pub base_price: Option<i64>,
    #[serde(default)]
    pub discount_amount: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub base_price: Option<i64>,
    pub discount_amount: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<BookingStatus> {
    raw.parse::<BookingStatus>().map_err(|_| {
        AppError::Validation(vec![FieldError::new(
            "status",
            "must be one of pending, confirmed, completed, cancelled",
        )])
    })
}

/// Create a booking.
///
/// Anonymous bookings are allowed; a user token links the booking to the account.
async fn create_booking(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>)> {
    let mut v = Validator::new();
    v.required("customer_name", &req.customer_name)
        .email("customer_email", &req.customer_email)
        .non_negative("discount_amount", req.discount_amount);
    if let Some(base) = req.base_price {
        v.non_negative("base_price", base);
    }
    if req.plan_id.is_none() && req.base_price.is_none() {
        v.add("base_price", "is required when no plan is selected");
    }
    v.finish()?;

    let mut service = "Custom booking".to_string();
    let mut plan_price = None;

    if let Some(plan_id) = req.plan_id {
        let plan = Plan::find_by_id(&state.pool, plan_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::not_found("Plan"))?;
        plan_price = Some(plan.price);
        service = plan.name;
    }
    if let Some(event_id) = req.event_id {
        let event = Event::find_by_id(&state.pool, event_id)
            .await?
            .ok_or_else(|| AppError::not_found("Event"))?;
        if req.plan_id.is_none() {
            service = event.title;
        }
    }

    let base_price = req.base_price.or(plan_price).unwrap_or_default();
    let final_price = pricing::final_price(base_price, req.discount_amount)?;

    let booking = Booking::create(
        &state.pool,
        CreateBookingData {
            user_id: auth.user_id(),
            plan_id: req.plan_id,
            event_id: req.event_id,
            customer_name: req.customer_name.trim().to_string(),
            customer_email: normalize_email(&req.customer_email),
            customer_phone: req.customer_phone,
            booking_date: req.booking_date,
            base_price,
            discount_amount: req.discount_amount,
            final_price,
            notes: req.notes,
        },
    )
    .await?;

    tracing::info!(
        booking_id = %booking.id,
        user_id = ?booking.user_id,
        final_price = booking.final_price,
        "Booking created"
    );

    let summary = mailer::BookingSummary {
        customer_name: booking.customer_name.clone(),
        reference: booking.reference(),
        service,
        booking_date: booking.booking_date.to_string(),
        final_price: booking.final_price,
        status: booking.status.clone(),
    };
    state
        .mailer
        .send_best_effort(mailer::booking_confirmation_email(
            &booking.customer_email,
            &summary,
        ))
        .await;

    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let bookings = Booking::list(&state.pool, status, Page::new(query.page, query.limit)).await?;

    Ok(Json(bookings))
}

async fn my_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Booking>>> {
    Ok(Json(Booking::list_by_user(&state.pool, auth.id).await?))
}

/// Admins see any booking; users only their own.
async fn get_booking(
    State(state): State<AppState>,
    auth: AnyAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>> {
    let booking = Booking::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;

    if !auth.is_admin() && booking.user_id != Some(auth.0.sub) {
        return Err(AppError::not_found("Booking"));
    }

    Ok(Json(booking))
}

async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Booking>> {
    let status = parse_status(&req.status)?;

    let booking = Booking::set_status(&state.pool, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;

    tracing::info!(booking_id = %booking.id, status = %booking.status, "Booking status changed");

    Ok(Json(booking))
}

/// Admin edit. Price changes recompute the final price from the stored values.
async fn update_booking(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>> {
    let mut v = Validator::new();
    v.not_blank("customer_name", req.customer_name.as_deref());
    if let Some(base) = req.base_price {
        v.non_negative("base_price", base);
    }
    if let Some(discount) = req.discount_amount {
        v.non_negative("discount_amount", discount);
    }
    v.finish()?;

    let booking = apply_edit(&state.pool, id, req).await?;

    tracing::info!(booking_id = %booking.id, final_price = booking.final_price, "Booking updated");

    Ok(Json(booking))
}

/// Field and price edits run in one transaction against the locked row, so the
/// final price is always derived from the stored price inputs.
async fn apply_edit(pool: &PgPool, id: Uuid, req: UpdateBookingRequest) -> Result<Booking> {
    let mut tx = pool.begin().await?;

    let current = Booking::find_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;

    let pricing_change = if req.base_price.is_some() || req.discount_amount.is_some() {
        let base = req.base_price.unwrap_or(current.base_price);
        let discount = req.discount_amount.unwrap_or(current.discount_amount);
        Some((base, discount, pricing::final_price(base, discount)?))
    } else {
        None
    };

    let mut booking = Booking::update(
        &mut *tx,
        id,
        UpdateBookingData {
            customer_name: req.customer_name.map(|n| n.trim().to_string()),
            customer_phone: req.customer_phone,
            booking_date: req.booking_date,
            notes: req.notes,
        },
    )
    .await?
    .ok_or_else(|| AppError::not_found("Booking"))?;

    if let Some((base, discount, final_price)) = pricing_change {
        booking = Booking::set_pricing(&mut *tx, id, base, discount, final_price)
            .await?
            .ok_or_else(|| AppError::not_found("Booking"))?;
    }

    tx.commit().await?;

    Ok(booking)
}

async fn delete_booking(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !Booking::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Booking"));
    }

    tracing::info!(booking_id = %id, "Booking deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/bookings", get(list_bookings).post(create_booking))
        .route("/api/v1/bookings/mine", get(my_bookings))
        .route(
            "/api/v1/bookings/:id",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/api/v1/bookings/:id/status", patch(update_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::Utc;

    fn price_edit(base_price: Option<i64>, discount_amount: Option<i64>) -> UpdateBookingRequest {
        UpdateBookingRequest {
            customer_name: None,
            customer_phone: None,
            booking_date: None,
            base_price,
            discount_amount,
            notes: None,
        }
    }

    async fn seed_booking(pool: &PgPool) -> Booking {
        Booking::create(
            pool,
            CreateBookingData {
                user_id: None,
                plan_id: None,
                event_id: None,
                customer_name: "Jane".to_string(),
                customer_email: "jane@example.com".to_string(),
                customer_phone: None,
                booking_date: Utc::now().date_naive(),
                base_price: 10_000,
                discount_amount: 0,
                final_price: 10_000,
                notes: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_edit_applies_fields_and_price_together() {
        let pool = test_pool().await;
        let booking = seed_booking(&pool).await;

        let mut req = price_edit(None, Some(2_500));
        req.customer_name = Some("  Jane Doe ".to_string());
        let updated = apply_edit(&pool, booking.id, req).await.unwrap();

        assert_eq!(updated.customer_name, "Jane Doe");
        assert_eq!(updated.base_price, 10_000);
        assert_eq!(updated.discount_amount, 2_500);
        assert_eq!(updated.final_price, 7_500);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_concurrent_price_edits_keep_final_price_consistent() {
        let pool = test_pool().await;
        let booking = seed_booking(&pool).await;

        let mut handles = Vec::new();
        for i in 0..8_i64 {
            let pool = pool.clone();
            let req = if i % 2 == 0 {
                price_edit(Some(10_000 + i * 1_000), None)
            } else {
                price_edit(None, Some(i * 500))
            };
            handles.push(tokio::spawn(async move {
                apply_edit(&pool, booking.id, req).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = Booking::find_by_id(&pool, booking.id).await.unwrap().unwrap();
        assert_eq!(
            stored.final_price,
            (stored.base_price - stored.discount_amount).max(0)
        );
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_edit_of_missing_booking_is_not_found() {
        let pool = test_pool().await;

        let err = apply_edit(&pool, Uuid::new_v4(), price_edit(Some(1), None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
