use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

use super::rate_limit::IpRateLimiter;
use crate::config::Config;
use crate::services::{mailer::Mailer, otp::OtpHasher, storage::UploadStore, token::TokenService};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub tokens: TokenService,
    pub otp: OtpHasher,
    pub mailer: Arc<Mailer>,
    pub uploads: UploadStore,
    pub auth_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, mailer: Mailer) -> anyhow::Result<Self> {
        let tokens = TokenService::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            config.jwt_expiry_hours,
        );
        let otp = OtpHasher::new(&config.otp_secret);
        let uploads = UploadStore::new(&config.upload_dir, &config.base_url)?;
        let auth_limiter = Arc::new(IpRateLimiter::per_minute(config.auth_rate_limit_per_minute));

        Ok(Self {
            pool,
            config,
            tokens,
            otp,
            mailer: Arc::new(mailer),
            uploads,
            auth_limiter,
        })
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
