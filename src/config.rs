use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,

    // JWT
    pub jwt_secret: Secret<String>,
    pub jwt_issuer: String,
    pub jwt_expiry_hours: i64,

    // Key for hashing OTP codes at rest (falls back to the JWT secret)
    pub otp_secret: Secret<String>,

    // SMTP (only required outside dev mode)
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,

    // Log emails to the console instead of delivering them
    pub dev_mode: bool,

    // Uploads
    pub upload_dir: String,
    pub max_upload_bytes: usize,

    // Limits
    pub request_timeout_secs: u64,
    pub auth_rate_limit_per_minute: u32,
    /// Key the auth limiter on `X-Forwarded-For`/`X-Real-IP`; only behind a trusted proxy.
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let dev_mode: bool = config.get("dev_mode").unwrap_or(false);

        let jwt_secret: String = config.get("jwt_secret")?;
        let otp_secret: String = config
            .get("otp_secret")
            .unwrap_or_else(|_| jwt_secret.clone());

        let smtp = match config.get::<String>("smtp_host") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: config.get("smtp_port").unwrap_or(587),
                username: config.get("smtp_username")?,
                password: Secret::new(config.get("smtp_password")?),
            }),
            Err(_) if dev_mode => None,
            Err(e) => return Err(e),
        };

        Ok(Self {
            database_url: config.get("database_url")?,
            base_url: config.get("base_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port").unwrap_or(8080),
            cors_origin: config.get("cors_origin").ok(),

            jwt_secret: Secret::new(jwt_secret),
            jwt_issuer: config
                .get("jwt_issuer")
                .unwrap_or_else(|_| "shutterbook".to_string()),
            jwt_expiry_hours: config.get("jwt_expiry_hours").unwrap_or(24),

            otp_secret: Secret::new(otp_secret),

            smtp,
            mail_from: config
                .get("mail_from")
                .unwrap_or_else(|_| "Shutterbook <no-reply@localhost>".to_string()),

            dev_mode,

            upload_dir: config
                .get("upload_dir")
                .unwrap_or_else(|_| "uploads".to_string()),
            max_upload_bytes: config.get("max_upload_bytes").unwrap_or(10 * 1024 * 1024),

            request_timeout_secs: config.get("request_timeout_secs").unwrap_or(30),
            auth_rate_limit_per_minute: config.get("auth_rate_limit_per_minute").unwrap_or(10),
            trust_proxy_headers: config.get("trust_proxy_headers").unwrap_or(false),
        })
    }

    /// Configuration used by tests; never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/shutterbook_test".to_string(),
            base_url: "http://localhost:8080".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origin: None,
            jwt_secret: Secret::new("test-jwt-secret".to_string()),
            jwt_issuer: "shutterbook".to_string(),
            jwt_expiry_hours: 1,
            otp_secret: Secret::new("test-otp-secret".to_string()),
            smtp: None,
            mail_from: "Shutterbook <no-reply@localhost>".to_string(),
            dev_mode: true,
            upload_dir: std::env::temp_dir()
                .join("shutterbook-uploads")
                .to_string_lossy()
                .into_owned(),
            max_upload_bytes: 1024 * 1024,
            request_timeout_secs: 30,
            auth_rate_limit_per_minute: 1000,
            trust_proxy_headers: false,
        }
    }
}
