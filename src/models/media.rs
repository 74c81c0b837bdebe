use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::pagination::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Photo => "photo",
            MediaType::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(MediaType::Photo),
            "video" => Ok(MediaType::Video),
            other => Err(format!("unknown media type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Media {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub media_type: String, // 'photo', 'video'
    pub url: String,
    pub price: i64,
    pub likes: i64,
    pub sales: i64,
    pub total_earnings: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMediaData {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub media_type: MediaType,
    pub url: String,
    pub price: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMediaData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MediaSale {
    pub id: Uuid,
    pub media_id: Uuid,
    pub buyer_id: Uuid,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Media {
    pub async fn create(pool: &PgPool, data: CreateMediaData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO media (owner_id, title, description, media_type, url, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.media_type.as_str())
        .bind(data.url)
        .bind(data.price)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM media WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM media WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        owner_id: Option<Uuid>,
        media_type: Option<MediaType>,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM media
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::text IS NULL OR media_type = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner_id)
        .bind(media_type.map(|t| t.as_str()))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await
    }

    /// Owner's media ordered by earnings, for analytics
    pub async fn list_by_owner_ranked(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM media
            WHERE owner_id = $1
            ORDER BY total_earnings DESC, likes DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateMediaData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE media
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.price)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds (`delta = 1`) or removes (`delta = -1`) a like from the counter, never below zero
    pub async fn adjust_likes<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        delta: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE media
            SET likes = GREATEST(likes + $2, 0), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_one(executor)
        .await
    }

    pub async fn record_sale_totals<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        amount: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE media
            SET sales = sales + 1, total_earnings = total_earnings + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_one(executor)
        .await
    }
}

/// Like rows; one per (media, user)
pub struct MediaLike;

impl MediaLike {
    /// Inserts a like; returns false if the user already liked the media
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        media_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO media_likes (media_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (media_id, user_id) DO NOTHING
            "#,
        )
        .bind(media_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn remove<'e, E: PgExecutor<'e>>(
        executor: E,
        media_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_likes WHERE media_id = $1 AND user_id = $2")
            .bind(media_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

impl MediaSale {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        media_id: Uuid,
        buyer_id: Uuid,
        amount: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO media_sales (media_id, buyer_id, amount)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(media_id)
        .bind(buyer_id)
        .bind(amount)
        .fetch_one(executor)
        .await
    }
}
