// src/auth.rs
use crate::app_log;
use crate::config::AuthSettings;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize, // Expiration timestamp
    pub iat: usize, // Issued at timestamp
}

/// Signing material for admin capability tokens.
pub struct AuthConfig {
    secret: Option<String>,
    token_ttl_hours: i64,
}

impl AuthConfig {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            secret: settings
                .admin_jwt_secret
                .clone()
                .filter(|s| !s.trim().is_empty()),
            token_ttl_hours: settings.token_ttl_hours,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    pub fn issue_admin_token(&self, subject: &str, hours: Option<i64>) -> Result<String> {
        let secret = self
            .secret
            .as_deref()
            .context("ADMIN_JWT_SECRET is not configured")?;
        issue_admin_token(secret, subject, hours.unwrap_or(self.token_ttl_hours))
    }

    pub fn verify(&self, token: &str) -> Result<AdminClaims, AuthError> {
        let secret = self.secret.as_deref().ok_or(AuthError::AdminDisabled)?;
        verify_admin_token(secret, token)
    }
}

pub fn issue_admin_token(secret: &str, subject: &str, hours: i64) -> Result<String> {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: subject.to_string(),
        role: ADMIN_ROLE.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(hours)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to sign admin token")
}

fn verify_admin_token(secret: &str, token: &str) -> Result<AdminClaims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        app_log!(warn, "Admin token verification failed: {}", e);
        AuthError::TokenVerificationFailed
    })?;

    if data.claims.role != ADMIN_ROLE {
        return Err(AuthError::NotAuthorized);
    }
    Ok(data.claims)
}

/// Request carrying a valid admin capability token.
pub struct AdminAuth {
    pub claims: AdminClaims,
}

impl AdminAuth {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminAuth {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_config = match req.guard::<&State<AuthConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error((status, _)) => return Outcome::Error((status, AuthError::AdminDisabled)),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let token = match req.headers().get_one("Authorization") {
            Some(header) if header.starts_with("Bearer ") => &header[7..],
            Some(_) => {
                app_log!(warn, "Invalid Authorization header format");
                return Outcome::Error((Status::Unauthorized, AuthError::InvalidToken));
            }
            None => return Outcome::Error((Status::Unauthorized, AuthError::MissingToken)),
        };

        match auth_config.verify(token) {
            Ok(claims) => {
                app_log!(info, "Admin {} authenticated", claims.sub);
                Outcome::Success(AdminAuth { claims })
            }
            Err(AuthError::NotAuthorized) => {
                Outcome::Error((Status::Forbidden, AuthError::NotAuthorized))
            }
            Err(e) => Outcome::Error((Status::Unauthorized, e)),
        }
    }
}

// Never fails; routes decide what a missing admin means
pub struct OptionalAdmin {
    pub admin: Option<AdminAuth>,
}

impl OptionalAdmin {
    pub fn is_admin(&self) -> bool {
        self.admin.is_some()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAdmin {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AdminAuth::from_request(req).await {
            Outcome::Success(admin) => Outcome::Success(OptionalAdmin { admin: Some(admin) }),
            _ => Outcome::Success(OptionalAdmin { admin: None }),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenVerificationFailed,
    NotAuthorized,
    AdminDisabled,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token required",
            AuthError::InvalidToken => "Invalid authorization token format",
            AuthError::TokenVerificationFailed => "Token verification failed",
            AuthError::NotAuthorized => "Admin role required",
            AuthError::AdminDisabled => "Admin access is not configured on this server",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: Option<&str>) -> AuthConfig {
        AuthConfig::new(&AuthSettings {
            admin_jwt_secret: secret.map(str::to_string),
            token_ttl_hours: 1,
        })
    }

    #[test]
    fn test_issued_token_verifies() {
        let auth = config(Some("s3cret"));
        let token = auth.issue_admin_token("ops@example.com", None).unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, "ops@example.com");
        assert_eq!(claims.role, ADMIN_ROLE);
    }

    #[test]
    fn test_wrong_secret_and_wrong_role_are_rejected() {
        let token = issue_admin_token("other", "ops", 1).unwrap();
        assert_eq!(
            config(Some("s3cret")).verify(&token).unwrap_err(),
            AuthError::TokenVerificationFailed
        );

        let now = Utc::now().timestamp() as usize;
        let viewer = AdminClaims {
            sub: "viewer".to_string(),
            role: "viewer".to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &viewer,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();
        assert_eq!(
            config(Some("s3cret")).verify(&token).unwrap_err(),
            AuthError::NotAuthorized
        );
    }

    #[test]
    fn test_admin_disabled_without_secret() {
        let auth = config(Some("  "));
        assert!(!auth.is_enabled());
        assert!(auth.issue_admin_token("ops", None).is_err());
        assert_eq!(auth.verify("anything").unwrap_err(), AuthError::AdminDisabled);
    }
}
