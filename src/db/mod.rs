use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Migrated pool for database-backed tests (`TEST_DATABASE_URL`)
#[cfg(test)]
pub(crate) async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for database tests");
    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
pub(crate) async fn create_test_user(pool: &PgPool) -> crate::models::user::User {
    use crate::models::user::{CreateUserData, User};

    User::create(
        pool,
        CreateUserData {
            email: format!("{}@example.com", uuid::Uuid::new_v4()),
            name: "Test User".to_string(),
            phone: None,
            password_hash: "not-a-real-hash".to_string(),
            email_verified: true,
        },
    )
    .await
    .unwrap()
}
