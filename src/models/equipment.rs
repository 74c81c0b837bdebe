use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    Rented,
    Maintenance,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::Rented => "rented",
            EquipmentStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(EquipmentStatus::Available),
            "rented" => Ok(EquipmentStatus::Rented),
            "maintenance" => Ok(EquipmentStatus::Maintenance),
            other => Err(format!("unknown equipment status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub daily_rate: i64,
    pub status: String, // 'available', 'rented', 'maintenance'
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEquipmentData {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub daily_rate: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEquipmentData {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub daily_rate: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EquipmentRental {
    pub id: Uuid,
    pub event_id: Uuid,
    pub equipment_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub days: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

impl Equipment {
    pub fn status(&self) -> Option<EquipmentStatus> {
        self.status.parse().ok()
    }

    pub async fn create(pool: &PgPool, data: CreateEquipmentData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO equipment (name, category, description, daily_rate)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.name)
        .bind(data.category)
        .bind(data.description)
        .bind(data.daily_rate)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Loads and locks an equipment row inside a transaction
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        status: Option<EquipmentStatus>,
        category: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM equipment
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY category, name
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(category)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateEquipmentData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE equipment
            SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                description = COALESCE($4, description),
                daily_rate = COALESCE($5, daily_rate),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.category)
        .bind(data.description)
        .bind(data.daily_rate)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_status<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        status: EquipmentStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE equipment
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(executor)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl EquipmentRental {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: Uuid,
        equipment_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        days: i64,
        total_price: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO equipment_rentals (event_id, equipment_id, start_at, end_at, days, total_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(equipment_id)
        .bind(start_at)
        .bind(end_at)
        .bind(days)
        .bind(total_price)
        .fetch_one(executor)
        .await
    }

    pub async fn list_by_event(pool: &PgPool, event_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM equipment_rentals WHERE event_id = $1 ORDER BY start_at",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    /// Removes a rental of the given event, returning it if it existed
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: Uuid,
        rental_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            DELETE FROM equipment_rentals
            WHERE id = $1 AND event_id = $2
            RETURNING *
            "#,
        )
        .bind(rental_id)
        .bind(event_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn exists_for_equipment<'e, E: PgExecutor<'e>>(
        executor: E,
        equipment_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM equipment_rentals WHERE equipment_id = $1)",
        )
        .bind(equipment_id)
        .fetch_one(executor)
        .await
    }

    /// Equipment ids still rented by an event
    pub async fn equipment_ids_for_event<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT equipment_id FROM equipment_rentals WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("rented".parse::<EquipmentStatus>(), Ok(EquipmentStatus::Rented));
        assert!("broken".parse::<EquipmentStatus>().is_err());
    }
}
