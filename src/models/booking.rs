use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::pagination::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_date: NaiveDate,
    pub base_price: i64,
    pub discount_amount: i64,
    pub final_price: i64,
    pub status: String, // 'pending', 'confirmed', 'completed', 'cancelled'
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBookingData {
    pub user_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_date: NaiveDate,
    pub base_price: i64,
    pub discount_amount: i64,
    pub final_price: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBookingData {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Booking {
    /// Short human-facing reference derived from the id
    pub fn reference(&self) -> String {
        self.id.simple().to_string()[..8].to_uppercase()
    }

    pub async fn create(pool: &PgPool, data: CreateBookingData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO bookings (
                user_id, plan_id, event_id, customer_name, customer_email, customer_phone,
                booking_date, base_price, discount_amount, final_price, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.plan_id)
        .bind(data.event_id)
        .bind(data.customer_name)
        .bind(data.customer_email)
        .bind(data.customer_phone)
        .bind(data.booking_date)
        .bind(data.base_price)
        .bind(data.discount_amount)
        .bind(data.final_price)
        .bind(data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Row lock for read-modify-write edits; call inside a transaction.
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        status: Option<BookingStatus>,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY booking_date DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        data: UpdateBookingData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE bookings
            SET
                customer_name = COALESCE($2, customer_name),
                customer_phone = COALESCE($3, customer_phone),
                booking_date = COALESCE($4, booking_date),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.customer_name)
        .bind(data.customer_phone)
        .bind(data.booking_date)
        .bind(data.notes)
        .fetch_optional(executor)
        .await
    }

    /// Stores new price inputs together with the recomputed final price
    pub async fn set_pricing<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        base_price: i64,
        discount_amount: i64,
        final_price: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE bookings
            SET base_price = $2, discount_amount = $3, final_price = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(base_price)
        .bind(discount_amount)
        .bind(final_price)
        .fetch_optional(executor)
        .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
