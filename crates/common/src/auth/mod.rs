//! Admin session guard
//!
//! Provides:
//! - The pluggable `SessionGuard` contract (authenticate / authorize)
//! - A shared-secret guard: argon2-hashed secret, JWT session tokens
//! - An axum extractor gating admin handlers
//!
//! A single shared secret is not an identity system. Replacing it with
//! per-admin credentials only needs another `SessionGuard` implementation.

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Subject of every shared-secret session
pub const ADMIN_SUBJECT: &str = "admin";

/// Scope granting article mutations
pub const WRITE_SCOPE: &str = "articles:write";

/// Token handed to the admin UI after a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// An authorized admin session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub subject: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Check if the session has a specific scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Require a specific scope, returning error if not present
    pub fn require_scope(&self, scope: &str) -> Result<()> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(AppError::Unauthorized {
                message: format!("Missing required scope: {}", scope),
            })
        }
    }
}

/// Credential check in front of article mutations
pub trait SessionGuard: Send + Sync {
    /// Exchange the admin credential for a session token
    fn authenticate(&self, secret: &str) -> Result<SessionToken>;

    /// Resolve a token presented by a client into a session
    fn authorize(&self, token: &str) -> Result<AdminSession>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Token id
    pub jti: String,

    /// Scopes
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &[u8], expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, subject: &str, scopes: Vec<String>) -> Result<SessionToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: subject.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            scopes,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            AppError::Internal {
                message: format!("Failed to generate token: {}", e),
            }
        })?;

        Ok(SessionToken {
            token,
            token_type: "Bearer".to_string(),
            expires_at: timestamp(claims.exp),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Unauthenticated {
                    message: "Session expired".to_string(),
                },
                _ => AppError::Unauthenticated {
                    message: "Invalid session token".to_string(),
                },
            })
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

/// Hash a secret into an argon2 PHC string
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash secret: {}", e),
        })
}

/// Guard backed by one shared admin secret
pub struct SharedSecretGuard {
    secret_hash: String,
    jwt: JwtManager,
}

impl SharedSecretGuard {
    /// Build from an argon2 PHC hash of the admin secret
    pub fn new(secret_hash: String, jwt: JwtManager) -> Result<Self> {
        PasswordHash::new(&secret_hash).map_err(|e| AppError::Configuration {
            message: format!("admin secret hash is not a valid PHC string: {}", e),
        })?;

        Ok(Self { secret_hash, jwt })
    }

    /// Build from configuration; an admin secret is mandatory
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret_hash = match (&config.admin_secret_hash, &config.admin_secret) {
            (Some(hash), _) => hash.clone(),
            (None, Some(secret)) if !secret.trim().is_empty() => hash_secret(secret)?,
            _ => {
                return Err(AppError::Configuration {
                    message: "set auth.admin_secret or auth.admin_secret_hash".to_string(),
                })
            }
        };

        let jwt_secret = match config.jwt_secret {
            Some(ref secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!("auth.jwt_secret not set, sessions will not survive a restart");
                rand::random::<[u8; 32]>().to_vec()
            }
        };

        Self::new(
            secret_hash,
            JwtManager::new(&jwt_secret, config.jwt_expiration_secs),
        )
    }
}

impl SessionGuard for SharedSecretGuard {
    fn authenticate(&self, secret: &str) -> Result<SessionToken> {
        let hash = PasswordHash::new(&self.secret_hash).map_err(|e| AppError::Internal {
            message: format!("Stored secret hash is invalid: {}", e),
        })?;

        Argon2::default()
            .verify_password(secret.as_bytes(), &hash)
            .map_err(|_| AppError::Unauthenticated {
                message: "Invalid admin secret".to_string(),
            })?;

        self.jwt
            .generate_token(ADMIN_SUBJECT, vec![WRITE_SCOPE.to_string()])
    }

    fn authorize(&self, token: &str) -> Result<AdminSession> {
        let claims = self.jwt.validate_token(token)?;

        if claims.sub != ADMIN_SUBJECT {
            return Err(AppError::Unauthenticated {
                message: "Invalid session token".to_string(),
            });
        }

        Ok(AdminSession {
            subject: claims.sub,
            scopes: claims.scopes,
            expires_at: timestamp(claims.exp),
        })
    }
}

/// Extract the token from an Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AdminSession
///
/// Any state that can hand out the guard works, so handlers stay unaware
/// of the guard implementation.
impl<S> FromRequestParts<S> for AdminSession
where
    Arc<dyn SessionGuard>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer_token(auth_header).ok_or_else(|| AppError::Unauthenticated {
            message: "Authorization header must use the Bearer scheme".to_string(),
        })?;

        let guard = Arc::<dyn SessionGuard>::from_ref(state);
        let session = guard.authorize(token)?;
        session.require_scope(WRITE_SCOPE)?;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> SharedSecretGuard {
        let config = AuthConfig {
            admin_secret: Some("segredo-forte".into()),
            jwt_secret: Some("test_secret".into()),
            ..Default::default()
        };
        SharedSecretGuard::from_config(&config).unwrap()
    }

    #[test]
    fn test_login_and_authorize() {
        let guard = guard();
        let token = guard.authenticate("segredo-forte").unwrap();
        assert_eq!(token.token_type, "Bearer");

        let session = guard.authorize(&token.token).unwrap();
        assert_eq!(session.subject, ADMIN_SUBJECT);
        assert!(session.has_scope(WRITE_SCOPE));
        assert_eq!(session.expires_at, token.expires_at);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let err = guard().authenticate("admin123").unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn test_foreign_token_is_denied() {
        let other = JwtManager::new(b"another_secret", 3600);
        let token = other
            .generate_token(ADMIN_SUBJECT, vec![WRITE_SCOPE.into()])
            .unwrap();
        assert!(matches!(
            guard().authorize(&token.token),
            Err(AppError::Unauthenticated { .. })
        ));
        assert!(guard().authorize("not-a-jwt").is_err());
    }

    #[test]
    fn test_missing_secret_is_a_configuration_error() {
        let err = SharedSecretGuard::from_config(&AuthConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_precomputed_hash_is_accepted() {
        let hash = hash_secret("outro-segredo").unwrap();
        let config = AuthConfig {
            admin_secret_hash: Some(hash),
            ..Default::default()
        };
        let guard = SharedSecretGuard::from_config(&config).unwrap();
        assert!(guard.authenticate("outro-segredo").is_ok());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new(b"test_secret", 3600);
        let token = manager
            .generate_token("admin", vec!["articles:write".into()])
            .unwrap();
        let claims = manager.validate_token(&token.token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.scopes, vec!["articles:write"]);
        assert!(!claims.jti.is_empty());
    }
}
