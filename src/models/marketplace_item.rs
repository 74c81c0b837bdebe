use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::models::pagination::Page;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seller {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MarketplaceItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub condition: String, // 'new', 'like_new', 'good', 'fair'
    pub images: Json<Vec<String>>,
    pub seller: Json<Seller>,
    pub location: Json<Location>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateItemData {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub condition: String,
    pub images: Vec<String>,
    pub seller: Seller,
    pub location: Location,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateItemData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub images: Option<Vec<String>>,
    pub seller: Option<Seller>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub condition: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub active_only: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum ItemFlag {
    Featured,
    Active,
}

impl MarketplaceItem {
    pub async fn create(pool: &PgPool, data: CreateItemData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO marketplace_items (
                title, description, price, category, condition,
                images, seller, location, is_featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.price)
        .bind(data.category)
        .bind(data.condition)
        .bind(Json(data.images))
        .bind(Json(data.seller))
        .bind(Json(data.location))
        .bind(data.is_featured)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM marketplace_items WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Featured items first, then newest
    pub async fn list(
        pool: &PgPool,
        filter: &ItemFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let search = filter
            .search
            .as_ref()
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));

        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM marketplace_items
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR condition = $2)
              AND ($3::bool IS NULL OR is_featured = $3)
              AND ($4::text IS NULL OR title ILIKE $4 OR description ILIKE $4)
              AND (NOT $5 OR is_active = TRUE)
            ORDER BY is_featured DESC, created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(&filter.category)
        .bind(&filter.condition)
        .bind(filter.featured)
        .bind(search)
        .bind(filter.active_only)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateItemData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE marketplace_items
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                condition = COALESCE($6, condition),
                images = COALESCE($7, images),
                seller = COALESCE($8, seller),
                location = COALESCE($9, location),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.price)
        .bind(data.category)
        .bind(data.condition)
        .bind(data.images.map(Json))
        .bind(data.seller.map(Json))
        .bind(data.location.map(Json))
        .fetch_optional(pool)
        .await
    }

    /// Flips a boolean flag in place, so two toggles restore the original value
    pub async fn toggle(pool: &PgPool, id: Uuid, flag: ItemFlag) -> Result<Option<Self>, sqlx::Error> {
        let query = match flag {
            ItemFlag::Featured => {
                "UPDATE marketplace_items SET is_featured = NOT is_featured, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
            ItemFlag::Active => {
                "UPDATE marketplace_items SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
        };

        sqlx::query_as::<_, Self>(query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM marketplace_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn create_item(pool: &PgPool) -> MarketplaceItem {
        MarketplaceItem::create(
            pool,
            CreateItemData {
                title: "Used 50mm lens".to_string(),
                description: "Light scratches on the hood".to_string(),
                price: 12_000,
                category: "lenses".to_string(),
                condition: "good".to_string(),
                images: vec![],
                seller: Seller {
                    name: "Sam".to_string(),
                    email: "sam@example.com".to_string(),
                    phone: None,
                },
                location: Location {
                    city: "Utrecht".to_string(),
                    state: None,
                    country: "NL".to_string(),
                },
                is_featured: false,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_double_toggle_restores_flags() {
        let pool = test_pool().await;
        let item = create_item(&pool).await;

        for flag in [ItemFlag::Featured, ItemFlag::Active] {
            MarketplaceItem::toggle(&pool, item.id, flag).await.unwrap().unwrap();
            let back = MarketplaceItem::toggle(&pool, item.id, flag).await.unwrap().unwrap();
            assert_eq!(back.is_featured, item.is_featured);
            assert_eq!(back.is_active, item.is_active);
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_delete_missing_item() {
        let pool = test_pool().await;
        assert!(!MarketplaceItem::delete(&pool, Uuid::new_v4()).await.unwrap());
    }
}
