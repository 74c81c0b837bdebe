use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HeroSection {
    pub id: Uuid,
    pub page: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateHeroData {
    pub page: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateHeroData {
    pub page: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub sort_order: Option<i32>,
}

impl HeroSection {
    pub async fn create(pool: &PgPool, data: CreateHeroData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO hero_sections (page, title, subtitle, image_url, cta_text, cta_link, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.page)
        .bind(data.title)
        .bind(data.subtitle)
        .bind(data.image_url)
        .bind(data.cta_text)
        .bind(data.cta_link)
        .bind(data.sort_order)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM hero_sections WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM hero_sections ORDER BY page, sort_order")
            .fetch_all(pool)
            .await
    }

    /// Active slides for a page in display order
    pub async fn list_active(pool: &PgPool, page: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM hero_sections
            WHERE page = $1 AND is_active = TRUE
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(page)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateHeroData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE hero_sections
            SET
                page = COALESCE($2, page),
                title = COALESCE($3, title),
                subtitle = COALESCE($4, subtitle),
                image_url = COALESCE($5, image_url),
                cta_text = COALESCE($6, cta_text),
                cta_link = COALESCE($7, cta_link),
                sort_order = COALESCE($8, sort_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.page)
        .bind(data.title)
        .bind(data.subtitle)
        .bind(data.image_url)
        .bind(data.cta_text)
        .bind(data.cta_link)
        .bind(data.sort_order)
        .fetch_optional(pool)
        .await
    }

    pub async fn toggle_active(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE hero_sections
            SET is_active = NOT is_active, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM hero_sections WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
