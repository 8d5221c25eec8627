/// JWT token generation and validation
///
/// Tokens are signed with HS256 and carry the user's id and role. The role
/// claim is informational: the API reloads the user on every request and
/// builds its [`Actor`](super::actor::Actor) from the database row, so role
/// changes and deactivation take effect immediately.
///
/// # Token Types
///
/// - **Access Token**: authenticates API requests (default 24 hours)
/// - **Refresh Token**: exchanged for a new access token (default 30 days)
///
/// # Example
///
/// ```
/// use hourglass_shared::auth::jwt::{TokenSigner, TokenType};
/// use hourglass_shared::models::user::UserRole;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let signer = TokenSigner::new(
///     "a-secret-of-at-least-thirty-two-bytes!",
///     Duration::hours(24),
///     Duration::days(30),
/// );
///
/// let user_id = Uuid::new_v4();
/// let pair = signer.issue_pair(user_id, UserRole::Employee)?;
/// let claims = signer.verify(&pair.access_token, TokenType::Access)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Value of the `iss` claim
pub const ISSUER: &str = "hourglass";

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Invalid token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Expected {expected} token")]
    WrongType { expected: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus `role` and
/// `token_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,

    /// Always [`ISSUER`]
    pub iss: String,

    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    /// Role when the token was issued
    pub role: UserRole,

    pub token_type: TokenType,
}

impl Claims {
    pub fn with_expiration(
        user_id: Uuid,
        role: UserRole,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            role,
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Access and refresh tokens returned by login, registration and refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Signs and verifies tokens with one shared secret
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[redacted]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Signs arbitrary claims
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        let key = EncodingKey::from_secret(self.secret.as_bytes());

        encode(&Header::new(Algorithm::HS256), claims, &key)
            .map_err(|e| JwtError::CreateError(e.to_string()))
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        role: UserRole,
        token_type: TokenType,
    ) -> Result<String, JwtError> {
        let claims = Claims::with_expiration(user_id, role, token_type, self.ttl(token_type));
        self.sign(&claims)
    }

    pub fn issue_pair(&self, user_id: Uuid, role: UserRole) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, role, TokenType::Access)?,
            refresh_token: self.issue(user_id, role, TokenType::Refresh)?,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Checks signature, expiry, `nbf`, issuer and token type
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::ValidationError(e.to_string()),
            })?
            .claims;

        if claims.token_type != expected {
            return Err(JwtError::WrongType {
                expected: expected.as_str(),
            });
        }

        Ok(claims)
    }
}
