//! Authentication Service
//!
//! Resolves bearer tokens into caller identities. Token issuance is owned by
//! the auth service; this side only needs to verify HS256 access tokens signed
//! with the shared secret, plus mint them for tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;

/// Identity resolution consulted once per connection upgrade or request.
pub trait AuthService: Send + Sync {
    /// Validate an access token and return the caller's user id.
    fn validate_token(&self, access_token: &str) -> Result<String, AuthError>;

    /// Mint an access token for `user_id`.
    fn issue_token(&self, user_id: &str) -> Result<AuthTokens, AuthError>;
}

/// Issued access token
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
///
/// The auth service puts the caller in `user_id`; `sub` is accepted as well.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// User ID as issued by the auth service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// JWT ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Caller identity carried by the token, if any.
    pub fn identity(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or(self.user_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// HS256 JWT implementation of [`AuthService`]
pub struct JwtAuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry_minutes: i64,
}

impl JwtAuthService {
    /// Create a new JwtAuthService
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation: Validation::default(),
            access_token_expiry_minutes: settings.access_token_expiry_minutes,
        }
    }
}

impl AuthService for JwtAuthService {
    fn validate_token(&self, access_token: &str) -> Result<String, AuthError> {
        if access_token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let token_data = decode::<Claims>(access_token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?;

        token_data
            .claims
            .identity()
            .map(str::to_owned)
            .ok_or(AuthError::InvalidToken)
    }

    fn issue_token(&self, user_id: &str) -> Result<AuthTokens, AuthError> {
        let now = Utc::now();
        let expiry = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = Claims {
            sub: Some(user_id.to_string()),
            user_id: None,
            exp: expiry.timestamp(),
            iat: Some(now.timestamp()),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        };

        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            expires_in: self.access_token_expiry_minutes * 60,
            token_type: "Bearer".to_string(),
        })
    }
}
