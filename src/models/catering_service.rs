use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CateringService {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_per_person: i64,
    pub min_guests: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCateringData {
    pub name: String,
    pub description: Option<String>,
    pub price_per_person: i64,
    pub min_guests: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCateringData {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_per_person: Option<i64>,
    pub min_guests: Option<i32>,
    pub is_active: Option<bool>,
}

/// Catering attached to an event, priced at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventCatering {
    pub id: Uuid,
    pub event_id: Uuid,
    pub catering_service_id: Uuid,
    pub guest_count: i32,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

impl CateringService {
    pub async fn create(pool: &PgPool, data: CreateCateringData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO catering_services (name, description, price_per_person, min_guests)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.price_per_person)
        .bind(data.min_guests)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM catering_services WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list(pool: &PgPool, active_only: bool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM catering_services
            WHERE (NOT $1 OR is_active = TRUE)
            ORDER BY name
            "#,
        )
        .bind(active_only)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCateringData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE catering_services
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_per_person = COALESCE($4, price_per_person),
                min_guests = COALESCE($5, min_guests),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.price_per_person)
        .bind(data.min_guests)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM catering_services WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl EventCatering {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: Uuid,
        catering_service_id: Uuid,
        guest_count: i32,
        total_price: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO event_catering (event_id, catering_service_id, guest_count, total_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(catering_service_id)
        .bind(guest_count)
        .bind(total_price)
        .fetch_one(executor)
        .await
    }

    pub async fn list_by_event(pool: &PgPool, event_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM event_catering WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }
}
