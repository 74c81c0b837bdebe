use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::models::pagination::Page;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lesson {
    pub title: String,
    #[serde(default)]
    pub duration_minutes: i32,
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurriculumModule {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub instructor: String,
    pub price: i64,
    pub level: String, // 'beginner', 'intermediate', 'advanced'
    pub category: String,
    pub thumbnail_url: Option<String>,
    pub curriculum: Json<Vec<CurriculumModule>>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCourseData {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub instructor: String,
    pub price: i64,
    pub level: String,
    pub category: String,
    pub thumbnail_url: Option<String>,
    pub curriculum: Vec<CurriculumModule>,
    pub is_published: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCourseData {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub price: Option<i64>,
    pub level: Option<String>,
    pub category: Option<String>,
    pub thumbnail_url: Option<String>,
    pub curriculum: Option<Vec<CurriculumModule>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub category: Option<String>,
    pub level: Option<String>,
    pub published_only: bool,
}

impl Course {
    pub async fn create(pool: &PgPool, data: CreateCourseData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO courses (
                title, slug, description, instructor, price, level, category,
                thumbnail_url, curriculum, is_published
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(data.title)
        .bind(data.slug)
        .bind(data.description)
        .bind(data.instructor)
        .bind(data.price)
        .bind(data.level)
        .bind(data.category)
        .bind(data.thumbnail_url)
        .bind(Json(data.curriculum))
        .bind(data.is_published)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists courses, newest first
    pub async fn list(
        pool: &PgPool,
        filter: &CourseFilter,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM courses
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR level = $2)
              AND (NOT $3 OR is_published = TRUE)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&filter.category)
        .bind(&filter.level)
        .bind(filter.published_only)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCourseData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE courses
            SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                instructor = COALESCE($5, instructor),
                price = COALESCE($6, price),
                level = COALESCE($7, level),
                category = COALESCE($8, category),
                thumbnail_url = COALESCE($9, thumbnail_url),
                curriculum = COALESCE($10, curriculum),
                is_published = COALESCE($11, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.slug)
        .bind(data.description)
        .bind(data.instructor)
        .bind(data.price)
        .bind(data.level)
        .bind(data.category)
        .bind(data.thumbnail_url)
        .bind(data.curriculum.map(Json))
        .bind(data.is_published)
        .fetch_optional(pool)
        .await
    }

    /// Flips `is_published`; `None` if the course does not exist
    pub async fn toggle_published(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE courses
            SET is_published = NOT is_published, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Hard delete; returns whether a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_course() -> CreateCourseData {
        CreateCourseData {
            title: "Portrait Lighting".to_string(),
            slug: format!("portrait-lighting-{}", Uuid::new_v4().simple()),
            description: "Working with one light".to_string(),
            instructor: "Ana".to_string(),
            price: 4_900,
            level: "beginner".to_string(),
            category: "portrait".to_string(),
            thumbnail_url: None,
            curriculum: vec![CurriculumModule {
                title: "Basics".to_string(),
                lessons: vec![Lesson {
                    title: "Key light".to_string(),
                    duration_minutes: 12,
                    video_url: None,
                }],
            }],
            is_published: false,
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_create_then_fetch() {
        let pool = test_pool().await;
        let created = Course::create(&pool, new_course()).await.unwrap();

        let fetched = Course::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.slug, created.slug);
        assert_eq!(fetched.price, 4_900);
        assert_eq!(fetched.curriculum.0[0].lessons[0].duration_minutes, 12);
        assert!(!fetched.is_published);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_double_toggle_restores_flag() {
        let pool = test_pool().await;
        let created = Course::create(&pool, new_course()).await.unwrap();

        let once = Course::toggle_published(&pool, created.id).await.unwrap().unwrap();
        let twice = Course::toggle_published(&pool, created.id).await.unwrap().unwrap();

        assert!(once.is_published);
        assert_eq!(twice.is_published, created.is_published);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_missing_course() {
        let pool = test_pool().await;
        let id = Uuid::new_v4();

        assert!(Course::find_by_id(&pool, id).await.unwrap().is_none());
        assert!(Course::toggle_published(&pool, id).await.unwrap().is_none());
        assert!(!Course::delete(&pool, id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_duplicate_slug_is_unique_violation() {
        let pool = test_pool().await;
        let data = new_course();
        let slug = data.slug.clone();
        Course::create(&pool, data).await.unwrap();

        let mut again = new_course();
        again.slug = slug;
        let err = Course::create(&pool, again).await.unwrap_err();
        match err {
            sqlx::Error::Database(db) => assert_eq!(db.code().as_deref(), Some("23505")),
            other => panic!("expected unique violation, got {:?}", other),
        }
    }
}
