use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{
    catering_service::{CateringService, EventCatering},
    equipment::{Equipment, EquipmentRental, EquipmentStatus},
    event::{CreateEventData, Event},
};
use crate::services::pricing::{self, PricingError};

#[derive(thiserror::Error, Debug)]
pub enum EventPlanningError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Event not found")]
    EventNotFound,

    #[error("Catering service {0} not found")]
    CateringNotFound(Uuid),

    #[error("Catering service {0} is not active")]
    CateringInactive(Uuid),

    #[error("Equipment {0} not found")]
    EquipmentNotFound(Uuid),

    #[error("Equipment {0} is not available")]
    EquipmentUnavailable(Uuid),

    #[error("Equipment {0} is held by an event rental; return it from the event instead")]
    EquipmentOnRental(Uuid),

    #[error("Rental not found")]
    RentalNotFound,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CateringRequest {
    pub catering_service_id: Uuid,
    pub guest_count: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RentalRequest {
    pub equipment_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// An event with everything booked for it.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub catering: Vec<EventCatering>,
    pub equipment_rentals: Vec<EquipmentRental>,
    pub extras_total: i64,
    pub grand_total: i64,
}

impl EventDetails {
    pub fn new(event: Event, catering: Vec<EventCatering>, rentals: Vec<EquipmentRental>) -> Self {
        let extras_total = catering.iter().map(|c| c.total_price).sum::<i64>()
            + rentals.iter().map(|r| r.total_price).sum::<i64>();
        let grand_total = event.base_price + extras_total;

        Self {
            event,
            catering,
            equipment_rentals: rentals,
            extras_total,
            grand_total,
        }
    }
}

async fn attach_catering_in(
    conn: &mut PgConnection,
    event_id: Uuid,
    request: &CateringRequest,
) -> Result<EventCatering, EventPlanningError> {
    let service = CateringService::find_by_id(&mut *conn, request.catering_service_id)
        .await?
        .ok_or(EventPlanningError::CateringNotFound(request.catering_service_id))?;

    if !service.is_active {
        return Err(EventPlanningError::CateringInactive(service.id));
    }

    let total = pricing::catering_total(
        service.price_per_person,
        request.guest_count,
        service.min_guests,
    )?;

    let row = EventCatering::create(
        &mut *conn,
        event_id,
        service.id,
        request.guest_count,
        total,
    )
    .await?;

    Ok(row)
}

async fn rent_equipment_in(
    conn: &mut PgConnection,
    event_id: Uuid,
    request: &RentalRequest,
) -> Result<EquipmentRental, EventPlanningError> {
    // Lock the row so two events cannot rent the same item concurrently
    let equipment = Equipment::find_for_update(&mut *conn, request.equipment_id)
        .await?
        .ok_or(EventPlanningError::EquipmentNotFound(request.equipment_id))?;

    if equipment.status() != Some(EquipmentStatus::Available) {
        return Err(EventPlanningError::EquipmentUnavailable(equipment.id));
    }

    let quote = pricing::rental_quote(equipment.daily_rate, request.start_at, request.end_at)?;

    let rental = EquipmentRental::create(
        &mut *conn,
        event_id,
        equipment.id,
        request.start_at,
        request.end_at,
        quote.days,
        quote.total_price,
    )
    .await?;

    Equipment::set_status(&mut *conn, equipment.id, EquipmentStatus::Rented).await?;

    Ok(rental)
}

/// Creates an event together with its catering and equipment in one transaction.
///
/// Any failing line item rolls back the whole event.
#[tracing::instrument(skip(pool, data, catering, rentals), fields(title = %data.title))]
pub async fn create_event(
    pool: &PgPool,
    data: CreateEventData,
    catering: &[CateringRequest],
    rentals: &[RentalRequest],
) -> Result<EventDetails, EventPlanningError> {
    let mut tx = pool.begin().await?;

    let event = Event::create(&mut *tx, data).await?;

    let mut catering_rows = Vec::with_capacity(catering.len());
    for request in catering {
        catering_rows.push(attach_catering_in(&mut tx, event.id, request).await?);
    }

    let mut rental_rows = Vec::with_capacity(rentals.len());
    for request in rentals {
        rental_rows.push(rent_equipment_in(&mut tx, event.id, request).await?);
    }

    tx.commit().await?;

    tracing::info!(
        event_id = %event.id,
        catering = catering_rows.len(),
        rentals = rental_rows.len(),
        "Event created"
    );

    Ok(EventDetails::new(event, catering_rows, rental_rows))
}

pub async fn load_details(pool: &PgPool, event_id: Uuid) -> Result<EventDetails, EventPlanningError> {
    let event = Event::find_by_id(pool, event_id)
        .await?
        .ok_or(EventPlanningError::EventNotFound)?;
    let catering = EventCatering::list_by_event(pool, event_id).await?;
    let rentals = EquipmentRental::list_by_event(pool, event_id).await?;

    Ok(EventDetails::new(event, catering, rentals))
}

pub async fn attach_catering(
    pool: &PgPool,
    event_id: Uuid,
    request: &CateringRequest,
) -> Result<EventCatering, EventPlanningError> {
    let mut tx = pool.begin().await?;

    Event::find_by_id(&mut *tx, event_id)
        .await?
        .ok_or(EventPlanningError::EventNotFound)?;

    let row = attach_catering_in(&mut tx, event_id, request).await?;
    tx.commit().await?;

    Ok(row)
}

pub async fn rent_equipment(
    pool: &PgPool,
    event_id: Uuid,
    request: &RentalRequest,
) -> Result<EquipmentRental, EventPlanningError> {
    let mut tx = pool.begin().await?;

    Event::find_by_id(&mut *tx, event_id)
        .await?
        .ok_or(EventPlanningError::EventNotFound)?;

    let rental = rent_equipment_in(&mut tx, event_id, request).await?;
    tx.commit().await?;

    tracing::info!(
        event_id = %event_id,
        equipment_id = %rental.equipment_id,
        days = rental.days,
        total = rental.total_price,
        "Equipment rented"
    );

    Ok(rental)
}

/// Cancels a rental and makes the equipment available again.
pub async fn return_equipment(
    pool: &PgPool,
    event_id: Uuid,
    rental_id: Uuid,
) -> Result<EquipmentRental, EventPlanningError> {
    let mut tx = pool.begin().await?;

    let rental = EquipmentRental::delete(&mut *tx, event_id, rental_id)
        .await?
        .ok_or(EventPlanningError::RentalNotFound)?;

    Equipment::set_status(&mut *tx, rental.equipment_id, EquipmentStatus::Available).await?;

    tx.commit().await?;

    Ok(rental)
}

/// Admin status change. An item held by a rental only becomes available
/// through `return_equipment` or deleting its event.
pub async fn set_equipment_status(
    pool: &PgPool,
    equipment_id: Uuid,
    status: EquipmentStatus,
) -> Result<Equipment, EventPlanningError> {
    let mut tx = pool.begin().await?;

    Equipment::find_for_update(&mut *tx, equipment_id)
        .await?
        .ok_or(EventPlanningError::EquipmentNotFound(equipment_id))?;

    if status == EquipmentStatus::Available
        && EquipmentRental::exists_for_equipment(&mut *tx, equipment_id).await?
    {
        return Err(EventPlanningError::EquipmentOnRental(equipment_id));
    }

    let equipment = Equipment::set_status(&mut *tx, equipment_id, status)
        .await?
        .ok_or(EventPlanningError::EquipmentNotFound(equipment_id))?;

    tx.commit().await?;

    Ok(equipment)
}

/// Deletes an event and releases any equipment it still holds.
pub async fn delete_event(pool: &PgPool, event_id: Uuid) -> Result<(), EventPlanningError> {
    let mut tx = pool.begin().await?;

    let equipment_ids = EquipmentRental::equipment_ids_for_event(&mut *tx, event_id).await?;

    if !Event::delete(&mut *tx, event_id).await? {
        return Err(EventPlanningError::EventNotFound);
    }

    for equipment_id in equipment_ids {
        Equipment::set_status(&mut *tx, equipment_id, EquipmentStatus::Available).await?;
    }

    tx.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{
        catering_service::{CreateCateringData, UpdateCateringData},
        equipment::CreateEquipmentData,
    };
    use chrono::Duration;

    fn event(base_price: i64) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Summer wedding".to_string(),
            description: None,
            event_type: "wedding".to_string(),
            location: "Lakeside".to_string(),
            event_date: now,
            base_price,
            capacity: Some(120),
            status: "draft".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_details_totals() {
        let ev = event(100_000);
        let now = Utc::now();
        let catering = vec![EventCatering {
            id: Uuid::new_v4(),
            event_id: ev.id,
            catering_service_id: Uuid::new_v4(),
            guest_count: 50,
            total_price: 125_000,
            created_at: now,
        }];
        let rentals = vec![EquipmentRental {
            id: Uuid::new_v4(),
            event_id: ev.id,
            equipment_id: Uuid::new_v4(),
            start_at: now,
            end_at: now,
            days: 2,
            total_price: 10_000,
            created_at: now,
        }];

        let details = EventDetails::new(ev, catering, rentals);
        assert_eq!(details.extras_total, 135_000);
        assert_eq!(details.grand_total, 235_000);
    }

    #[test]
    fn test_details_without_extras() {
        let details = EventDetails::new(event(5_000), vec![], vec![]);
        assert_eq!(details.extras_total, 0);
        assert_eq!(details.grand_total, 5_000);
    }

    fn event_data(title: &str) -> CreateEventData {
        CreateEventData {
            title: title.to_string(),
            description: None,
            event_type: "wedding".to_string(),
            location: "Lakeside".to_string(),
            event_date: Utc::now() + Duration::days(30),
            base_price: 100_000,
            capacity: Some(80),
        }
    }

    async fn seed_catering(pool: &PgPool, active: bool) -> CateringService {
        let service = CateringService::create(
            pool,
            CreateCateringData {
                name: "Garden buffet".to_string(),
                description: None,
                price_per_person: 2_500,
                min_guests: 10,
            },
        )
        .await
        .unwrap();

        if active {
            return service;
        }
        CateringService::update(
            pool,
            service.id,
            UpdateCateringData {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap()
    }

    async fn seed_equipment(pool: &PgPool) -> Equipment {
        Equipment::create(
            pool,
            CreateEquipmentData {
                name: "Softbox kit".to_string(),
                category: "lighting".to_string(),
                description: None,
                daily_rate: 4_000,
            },
        )
        .await
        .unwrap()
    }

    fn rental(equipment_id: Uuid) -> RentalRequest {
        let start_at = Utc::now() + Duration::days(30);
        RentalRequest {
            equipment_id,
            start_at,
            end_at: start_at + Duration::hours(30),
        }
    }

    async fn status_of(pool: &PgPool, equipment_id: Uuid) -> Option<EquipmentStatus> {
        Equipment::find_by_id(pool, equipment_id)
            .await
            .unwrap()
            .unwrap()
            .status()
    }

    async fn events_titled(pool: &PgPool, title: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE title = $1")
            .bind(title)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_inactive_catering_rolls_back_event() {
        let pool = test_pool().await;
        let title = format!("Rollback {}", Uuid::new_v4());
        let inactive = seed_catering(&pool, false).await;
        let equipment = seed_equipment(&pool).await;

        let err = create_event(
            &pool,
            event_data(&title),
            &[CateringRequest {
                catering_service_id: inactive.id,
                guest_count: 40,
            }],
            &[rental(equipment.id)],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EventPlanningError::CateringInactive(id) if id == inactive.id));
        assert_eq!(events_titled(&pool, &title).await, 0);
        assert_eq!(status_of(&pool, equipment.id).await, Some(EquipmentStatus::Available));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_unavailable_equipment_rolls_back_event() {
        let pool = test_pool().await;
        let title = format!("Rollback {}", Uuid::new_v4());
        let catering = seed_catering(&pool, true).await;
        let free = seed_equipment(&pool).await;
        let busy = seed_equipment(&pool).await;
        Equipment::set_status(&pool, busy.id, EquipmentStatus::Maintenance)
            .await
            .unwrap();

        let err = create_event(
            &pool,
            event_data(&title),
            &[CateringRequest {
                catering_service_id: catering.id,
                guest_count: 40,
            }],
            &[rental(free.id), rental(busy.id)],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EventPlanningError::EquipmentUnavailable(id) if id == busy.id));
        assert_eq!(events_titled(&pool, &title).await, 0);
        // The first rental was undone with the rest of the transaction
        assert_eq!(status_of(&pool, free.id).await, Some(EquipmentStatus::Available));
        assert!(!EquipmentRental::exists_for_equipment(&pool, free.id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_rent_then_return_restores_availability() {
        let pool = test_pool().await;
        let equipment = seed_equipment(&pool).await;
        let details = create_event(&pool, event_data("Studio day"), &[], &[])
            .await
            .unwrap();

        let rented = rent_equipment(&pool, details.event.id, &rental(equipment.id))
            .await
            .unwrap();
        assert_eq!(rented.days, 2);
        assert_eq!(rented.total_price, 8_000);
        assert_eq!(status_of(&pool, equipment.id).await, Some(EquipmentStatus::Rented));

        let again = rent_equipment(&pool, details.event.id, &rental(equipment.id))
            .await
            .unwrap_err();
        assert!(matches!(again, EventPlanningError::EquipmentUnavailable(_)));

        return_equipment(&pool, details.event.id, rented.id).await.unwrap();
        assert_eq!(status_of(&pool, equipment.id).await, Some(EquipmentStatus::Available));

        let missing = return_equipment(&pool, details.event.id, rented.id)
            .await
            .unwrap_err();
        assert!(matches!(missing, EventPlanningError::RentalNotFound));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_deleting_event_releases_equipment() {
        let pool = test_pool().await;
        let equipment = seed_equipment(&pool).await;
        let details = create_event(&pool, event_data("Gala"), &[], &[rental(equipment.id)])
            .await
            .unwrap();
        assert_eq!(details.equipment_rentals.len(), 1);
        assert_eq!(status_of(&pool, equipment.id).await, Some(EquipmentStatus::Rented));

        delete_event(&pool, details.event.id).await.unwrap();

        assert_eq!(status_of(&pool, equipment.id).await, Some(EquipmentStatus::Available));
        assert!(!EquipmentRental::exists_for_equipment(&pool, equipment.id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_rented_equipment_cannot_be_marked_available() {
        let pool = test_pool().await;
        let equipment = seed_equipment(&pool).await;
        let details = create_event(&pool, event_data("Shoot"), &[], &[rental(equipment.id)])
            .await
            .unwrap();

        let err = set_equipment_status(&pool, equipment.id, EquipmentStatus::Available)
            .await
            .unwrap_err();
        assert!(matches!(err, EventPlanningError::EquipmentOnRental(id) if id == equipment.id));
        assert_eq!(status_of(&pool, equipment.id).await, Some(EquipmentStatus::Rented));

        let rental_id = details.equipment_rentals[0].id;
        return_equipment(&pool, details.event.id, rental_id).await.unwrap();

        let maintained = set_equipment_status(&pool, equipment.id, EquipmentStatus::Maintenance)
            .await
            .unwrap();
        assert_eq!(maintained.status(), Some(EquipmentStatus::Maintenance));
        let restored = set_equipment_status(&pool, equipment.id, EquipmentStatus::Available)
            .await
            .unwrap();
        assert_eq!(restored.status(), Some(EquipmentStatus::Available));
    }
}
