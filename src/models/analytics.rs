use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::services::earnings::Balance;

/// Earnings overview for one user.
#[derive(Debug, Clone, Serialize)]
pub struct EarningsSummary {
    pub total_media: i64,
    pub total_likes: i64,
    pub total_sales: i64,
    pub total_earnings: i64,
    pub total_withdrawn: i64,
    pub pending_withdrawals: i64,
    pub available_balance: i64,
}

#[derive(Debug, Clone, FromRow)]
struct MediaTotals {
    total_media: i64,
    total_likes: i64,
    total_sales: i64,
}

impl EarningsSummary {
    pub fn new(total_media: i64, total_likes: i64, total_sales: i64, balance: Balance) -> Self {
        Self {
            total_media,
            total_likes,
            total_sales,
            total_earnings: balance.total_earnings,
            total_withdrawn: balance.total_withdrawn,
            pending_withdrawals: balance.pending_withdrawals,
            available_balance: balance.available_balance,
        }
    }

    pub async fn for_user(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let totals = sqlx::query_as::<_, MediaTotals>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total_media,
                COALESCE(SUM(likes), 0)::BIGINT AS total_likes,
                COALESCE(SUM(sales), 0)::BIGINT AS total_sales
            FROM media
            WHERE owner_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let balance = crate::models::withdrawal::Withdrawal::balance_for_user(pool, user_id).await?;

        Ok(Self::new(
            totals.total_media,
            totals.total_likes,
            totals.total_sales,
            balance,
        ))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Site-wide numbers for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_courses: i64,
    pub published_courses: i64,
    pub total_bookings: i64,
    pub bookings_by_status: Vec<StatusCount>,
    pub booking_revenue: i64,
    pub media_sales_total: i64,
    pub pending_withdrawals: i64,
}

#[derive(Debug, Clone, FromRow)]
struct DashboardCounts {
    total_users: i64,
    total_courses: i64,
    published_courses: i64,
    total_bookings: i64,
    booking_revenue: i64,
    media_sales_total: i64,
    pending_withdrawals: i64,
}

impl DashboardStats {
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users)::BIGINT AS total_users,
                (SELECT COUNT(*) FROM courses)::BIGINT AS total_courses,
                (SELECT COUNT(*) FROM courses WHERE is_published)::BIGINT AS published_courses,
                (SELECT COUNT(*) FROM bookings)::BIGINT AS total_bookings,
                COALESCE((SELECT SUM(final_price) FROM bookings
                          WHERE status IN ('confirmed', 'completed')), 0)::BIGINT AS booking_revenue,
                COALESCE((SELECT SUM(amount) FROM media_sales), 0)::BIGINT AS media_sales_total,
                (SELECT COUNT(*) FROM withdrawals WHERE status = 'pending')::BIGINT AS pending_withdrawals
            "#,
        )
        .fetch_one(pool)
        .await?;

        let bookings_by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*)::BIGINT AS count
            FROM bookings
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(Self {
            total_users: counts.total_users,
            total_courses: counts.total_courses,
            published_courses: counts.published_courses,
            total_bookings: counts.total_bookings,
            bookings_by_status,
            booking_revenue: counts.booking_revenue,
            media_sales_total: counts.media_sales_total,
            pending_withdrawals: counts.pending_withdrawals,
        })
    }
}
