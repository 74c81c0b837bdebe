use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use std::path::Path;
use std::time::Instant;

use crate::api::middleware::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: Health,
    pub timestamp: String,
    pub version: String,
    pub database: DependencyCheck,
    pub uploads: DependencyCheck,
    pub mail_transport: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub status: Health,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencyCheck {
    fn from_result(result: Result<(), String>, started: Instant) -> Self {
        let response_time_ms = started.elapsed().as_millis();
        match result {
            Ok(()) => Self {
                status: Health::Healthy,
                response_time_ms,
                error: None,
            },
            Err(error) => Self {
                status: Health::Unhealthy,
                response_time_ms,
                error: Some(error),
            },
        }
    }
}

/// Overall status: a dead database is fatal, missing upload storage only degrades.
fn overall(database: &DependencyCheck, uploads: &DependencyCheck) -> Health {
    match (database.status, uploads.status) {
        (Health::Healthy, Health::Healthy) => Health::Healthy,
        (Health::Healthy, _) => Health::Degraded,
        _ => Health::Unhealthy,
    }
}

async fn check_database(pool: &PgPool) -> DependencyCheck {
    let started = Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|e| format!("Database error: {}", e));

    DependencyCheck::from_result(result, started)
}

/// Directory that must be writable: the root itself, or the parent it will be created in.
fn storage_dir(root: &Path, exists: bool) -> &Path {
    if exists {
        return root;
    }
    match root.parent() {
        // `Path::new("uploads").parent()` is `Some("")`
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// The upload root is created lazily, so a missing directory is fine as long as its parent exists.
async fn check_uploads(root: &Path) -> DependencyCheck {
    let started = Instant::now();
    let exists = tokio::fs::try_exists(root).await.unwrap_or(false);
    let target = storage_dir(root, exists);

    let result = match tokio::fs::metadata(target).await {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Ok(()),
        Ok(_) => Err(format!("{} is not a writable directory", target.display())),
        Err(e) => Err(format!("Upload storage error: {}", e)),
    };

    DependencyCheck::from_result(result, started)
}

/// 200 while the database answers, 503 otherwise
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = check_database(&state.pool).await;
    let uploads = check_uploads(state.uploads.root()).await;
    let status = overall(&database, &uploads);

    let code = if status == Health::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    tracing::debug!(status = ?status, db_ms = database.response_time_ms, "Health check completed");

    (
        code,
        Json(HealthReport {
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            uploads,
            mail_transport: state.mailer.transport(),
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: Health) -> DependencyCheck {
        DependencyCheck {
            status,
            response_time_ms: 0,
            error: None,
        }
    }

    #[test]
    fn test_overall_status() {
        assert_eq!(overall(&check(Health::Healthy), &check(Health::Healthy)), Health::Healthy);
        assert_eq!(overall(&check(Health::Healthy), &check(Health::Unhealthy)), Health::Degraded);
        assert_eq!(overall(&check(Health::Unhealthy), &check(Health::Healthy)), Health::Unhealthy);
    }

    #[tokio::test]
    async fn test_upload_check_on_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_uploads(dir.path()).await.status, Health::Healthy);

        let missing_child = dir.path().join("not-created-yet");
        assert_eq!(check_uploads(&missing_child).await.status, Health::Healthy);
    }

    #[test]
    fn test_relative_root_falls_back_to_current_dir() {
        assert_eq!(storage_dir(Path::new("uploads"), false), Path::new("."));
        assert_eq!(storage_dir(Path::new("uploads"), true), Path::new("uploads"));
        assert_eq!(storage_dir(Path::new("data/uploads"), false), Path::new("data"));
        assert_eq!(storage_dir(Path::new("/"), false), Path::new("."));
    }

    #[tokio::test]
    async fn test_upload_check_on_missing_relative_dir() {
        let root = format!("shutterbook-uploads-{}", uuid::Uuid::new_v4());
        let report = check_uploads(Path::new(&root)).await;
        assert_eq!(report.status, Health::Healthy, "{:?}", report.error);
    }
}
