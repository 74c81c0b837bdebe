use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::pagination::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "cancelled" => Ok(EventStatus::Cancelled),
            "completed" => Ok(EventStatus::Completed),
            other => Err(format!("unknown event status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub base_price: i64,
    pub capacity: Option<i32>,
    pub status: String, // 'draft', 'published', 'cancelled', 'completed'
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventData {
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub base_price: i64,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub base_price: Option<i64>,
    pub capacity: Option<i32>,
}

impl Event {
    /// Create a new event in `draft` status
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateEventData,
    ) -> Result<Self, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (title, description, event_type, location, event_date, base_price, capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.event_type)
        .bind(data.location)
        .bind(data.event_date)
        .bind(data.base_price)
        .bind(data.capacity)
        .fetch_one(executor)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(event)
    }

    /// List events, optionally by status, upcoming first
    pub async fn list(
        pool: &PgPool,
        status: Option<EventStatus>,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY event_date ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    /// Update an event
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateEventData,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are provided
        let mut query = String::from("UPDATE events SET ");
        let mut updates = Vec::new();
        let mut bind_count = 1;

        if data.title.is_some() {
            updates.push(format!("title = ${}", bind_count));
            bind_count += 1;
        }
        if data.description.is_some() {
            updates.push(format!("description = ${}", bind_count));
            bind_count += 1;
        }
        if data.event_type.is_some() {
            updates.push(format!("event_type = ${}", bind_count));
            bind_count += 1;
        }
        if data.location.is_some() {
            updates.push(format!("location = ${}", bind_count));
            bind_count += 1;
        }
        if data.event_date.is_some() {
            updates.push(format!("event_date = ${}", bind_count));
            bind_count += 1;
        }
        if data.base_price.is_some() {
            updates.push(format!("base_price = ${}", bind_count));
            bind_count += 1;
        }
        if data.capacity.is_some() {
            updates.push(format!("capacity = ${}", bind_count));
            bind_count += 1;
        }

        if updates.is_empty() {
            // No fields to update, just return existing event
            return Self::find_by_id(pool, id).await;
        }

        updates.push("updated_at = NOW()".to_string());
        query.push_str(&updates.join(", "));
        query.push_str(&format!(" WHERE id = ${} RETURNING *", bind_count));

        let mut query_builder = sqlx::query_as::<_, Event>(&query);

        if let Some(title) = data.title {
            query_builder = query_builder.bind(title);
        }
        if let Some(desc) = data.description {
            query_builder = query_builder.bind(desc);
        }
        if let Some(event_type) = data.event_type {
            query_builder = query_builder.bind(event_type);
        }
        if let Some(location) = data.location {
            query_builder = query_builder.bind(location);
        }
        if let Some(date) = data.event_date {
            query_builder = query_builder.bind(date);
        }
        if let Some(price) = data.base_price {
            query_builder = query_builder.bind(price);
        }
        if let Some(capacity) = data.capacity {
            query_builder = query_builder.bind(capacity);
        }

        query_builder = query_builder.bind(id);

        query_builder.fetch_optional(pool).await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: EventStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
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

    /// Deletes an event; its catering and rental rows cascade
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            EventStatus::Draft,
            EventStatus::Published,
            EventStatus::Cancelled,
            EventStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>(), Ok(status));
        }
        assert!("archived".parse::<EventStatus>().is_err());
    }
}
