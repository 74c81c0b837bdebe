use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::media::{Media, MediaLike, MediaSale};

#[derive(thiserror::Error, Debug)]
pub enum MediaMarketError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Media not found")]
    NotFound,

    #[error("You cannot purchase your own media")]
    OwnMedia,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOutcome {
    pub sale: MediaSale,
    pub media: Media,
}

/// Likes the media for `user_id`, or removes the like if it already exists.
///
/// The counter and the like rows change in the same transaction.
pub async fn toggle_like(
    pool: &PgPool,
    media_id: Uuid,
    user_id: Uuid,
) -> Result<LikeOutcome, MediaMarketError> {
    let mut tx = pool.begin().await?;

    Media::find_for_update(&mut *tx, media_id)
        .await?
        .ok_or(MediaMarketError::NotFound)?;

    let liked = MediaLike::insert(&mut *tx, media_id, user_id).await?;
    let delta = if liked {
        1
    } else {
        MediaLike::remove(&mut *tx, media_id, user_id).await?;
        -1
    };

    let media = Media::adjust_likes(&mut *tx, media_id, delta).await?;
    tx.commit().await?;

    tracing::debug!(media_id = %media_id, user_id = %user_id, liked, "Like toggled");

    Ok(LikeOutcome {
        liked,
        likes: media.likes,
    })
}

/// Records a sale at the media's current price.
pub async fn purchase(
    pool: &PgPool,
    media_id: Uuid,
    buyer_id: Uuid,
) -> Result<PurchaseOutcome, MediaMarketError> {
    let mut tx = pool.begin().await?;

    let media = Media::find_for_update(&mut *tx, media_id)
        .await?
        .ok_or(MediaMarketError::NotFound)?;

    if media.owner_id == buyer_id {
        return Err(MediaMarketError::OwnMedia);
    }

    let sale = MediaSale::create(&mut *tx, media.id, buyer_id, media.price).await?;
    let media = Media::record_sale_totals(&mut *tx, media.id, sale.amount).await?;

    tx.commit().await?;

    tracing::info!(
        media_id = %media.id,
        buyer_id = %buyer_id,
        amount = sale.amount,
        "Media purchased"
    );

    Ok(PurchaseOutcome { sale, media })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_user, test_pool};
    use crate::models::media::{CreateMediaData, MediaType};

    async fn seed_media(pool: &PgPool, owner_id: Uuid, price: i64) -> Media {
        Media::create(
            pool,
            CreateMediaData {
                owner_id,
                title: "Harbour at dawn".to_string(),
                description: None,
                media_type: MediaType::Photo,
                url: "/uploads/media/harbour.jpg".to_string(),
                price,
            },
        )
        .await
        .unwrap()
    }

    async fn like_rows(pool: &PgPool, media_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM media_likes WHERE media_id = $1")
            .bind(media_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_like_counter_tracks_like_rows() {
        let pool = test_pool().await;
        let owner = create_test_user(&pool).await;
        let fan = create_test_user(&pool).await;
        let other = create_test_user(&pool).await;
        let media = seed_media(&pool, owner.id, 0).await;

        let first = toggle_like(&pool, media.id, fan.id).await.unwrap();
        assert!(first.liked);
        assert_eq!(first.likes, 1);
        assert_eq!(like_rows(&pool, media.id).await, 1);

        let second = toggle_like(&pool, media.id, other.id).await.unwrap();
        assert_eq!(second.likes, 2);

        let undone = toggle_like(&pool, media.id, fan.id).await.unwrap();
        assert!(!undone.liked);
        assert_eq!(undone.likes, 1);
        assert_eq!(like_rows(&pool, media.id).await, 1);

        let stored = Media::find_by_id(&pool, media.id).await.unwrap().unwrap();
        assert_eq!(stored.likes, like_rows(&pool, media.id).await);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_like_on_missing_media() {
        let pool = test_pool().await;
        let fan = create_test_user(&pool).await;

        let err = toggle_like(&pool, Uuid::new_v4(), fan.id).await.unwrap_err();
        assert!(matches!(err, MediaMarketError::NotFound));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_purchase_updates_sales_and_earnings() {
        let pool = test_pool().await;
        let owner = create_test_user(&pool).await;
        let buyer = create_test_user(&pool).await;
        let media = seed_media(&pool, owner.id, 1_500).await;

        let first = purchase(&pool, media.id, buyer.id).await.unwrap();
        assert_eq!(first.sale.amount, 1_500);
        assert_eq!(first.sale.buyer_id, buyer.id);
        assert_eq!(first.media.sales, 1);
        assert_eq!(first.media.total_earnings, 1_500);

        let second = purchase(&pool, media.id, buyer.id).await.unwrap();
        assert_eq!(second.media.sales, 2);
        assert_eq!(second.media.total_earnings, 3_000);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_owner_cannot_buy_own_media() {
        let pool = test_pool().await;
        let owner = create_test_user(&pool).await;
        let media = seed_media(&pool, owner.id, 1_500).await;

        let err = purchase(&pool, media.id, owner.id).await.unwrap_err();
        assert!(matches!(err, MediaMarketError::OwnMedia));

        let stored = Media::find_by_id(&pool, media.id).await.unwrap().unwrap();
        assert_eq!(stored.sales, 0);
        assert_eq!(stored.total_earnings, 0);
    }
}
