use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

/// A priced photography/videography package.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_hours: i32,
    pub features: Json<Vec<String>>,
    pub is_popular: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePlanData {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_hours: i32,
    pub features: Vec<String>,
    pub is_popular: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePlanData {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_hours: Option<i32>,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy)]
pub enum PlanFlag {
    Active,
    Popular,
}

impl Plan {
    pub async fn create(pool: &PgPool, data: CreatePlanData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO plans (name, description, price, duration_hours, features, is_popular)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.price)
        .bind(data.duration_hours)
        .bind(Json(data.features))
        .bind(data.is_popular)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, active_only: bool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM plans
            WHERE (NOT $1 OR is_active = TRUE)
            ORDER BY price ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePlanData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE plans
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                duration_hours = COALESCE($5, duration_hours),
                features = COALESCE($6, features),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.price)
        .bind(data.duration_hours)
        .bind(data.features.map(Json))
        .fetch_optional(pool)
        .await
    }

    pub async fn toggle(pool: &PgPool, id: Uuid, flag: PlanFlag) -> Result<Option<Self>, sqlx::Error> {
        let query = match flag {
            PlanFlag::Active => {
                "UPDATE plans SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
            PlanFlag::Popular => {
                "UPDATE plans SET is_popular = NOT is_popular, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
        };

        sqlx::query_as::<_, Self>(query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
