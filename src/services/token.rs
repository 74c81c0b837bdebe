use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    issuer: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &Secret<String>, issuer: &str, ttl_hours: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: Arc::new(EncodingKey::from_secret(bytes)),
            decoding: Arc::new(DecodingKey::from_secret(bytes)),
            issuer: issuer.to_string(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, subject: Uuid, email: &str, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject,
            email: email.to_string(),
            role,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, issuer: &str) -> TokenService {
        TokenService::new(&Secret::new(secret.to_string()), issuer, 1)
    }

    #[test]
    fn test_issue_and_verify() {
        let svc = service("secret", "shutterbook");
        let id = Uuid::new_v4();
        let token = svc.issue(id, "admin@example.com", Role::Admin).unwrap();

        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service("secret-a", "shutterbook")
            .issue(Uuid::new_v4(), "a@example.com", Role::User)
            .unwrap();
        assert!(service("secret-b", "shutterbook").verify(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = service("secret", "someone-else")
            .issue(Uuid::new_v4(), "a@example.com", Role::User)
            .unwrap();
        assert!(service("secret", "shutterbook").verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(service("secret", "shutterbook").verify("not.a.jwt").is_err());
    }
}
