/// JWT issuing and validation for the social API
///
/// Two kinds of tokens share one HS256 secret:
///
/// - **access** tokens, presented as `Authorization: Bearer <token>`;
/// - **confirmation** tokens, embedded in the link emailed after registration.
///
/// The token subject (`sub`) is always the user's email address. The `type`
/// claim keeps the two kinds apart: a confirmation token is never accepted
/// where an access token is expected and vice versa.
///
/// ## Usage
///
/// The secret must be installed once during startup:
///
/// ```rust,no_run
/// use crypto_core::jwt::{self, TokenType};
///
/// jwt::initialize_jwt_secret("change-me").expect("Failed to initialize JWT secret");
///
/// let token = jwt::generate_access_token("ada@example.com").unwrap();
/// let email = jwt::validate_token(&token, TokenType::Access).unwrap();
/// assert_eq!(email, "ada@example.com");
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 30;
const CONFIRMATION_TOKEN_EXPIRY_MINUTES: i64 = 1440;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Kind of token, carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Confirmation,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Confirmation => "confirmation",
        }
    }

    /// How long a freshly issued token of this kind stays valid
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenType::Access => Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES),
            TokenType::Confirmation => Duration::minutes(CONFIRMATION_TOKEN_EXPIRY_MINUTES),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims
///
/// `sub` and `type` are optional on the wire so that a token which omits
/// them decodes and is rejected with a precise [`TokenError`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user email)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type: "access" or "confirmation"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Reasons a token is refused
///
/// The `Display` strings are returned verbatim to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Token is missing \"sub\" field")]
    MissingSubject,

    #[error("Token has incorrect type, expected {0}")]
    WrongType(TokenType),

    #[error("JWT secret not initialized. Call initialize_jwt_secret() during startup.")]
    NotInitialized,

    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

// ============================================================================
// Key Storage
// ============================================================================

struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Keys are derived from the secret once at startup and never modified.
static JWT_KEYS: OnceCell<JwtKeys> = OnceCell::new();

// ============================================================================
// Initialization
// ============================================================================

/// Install the HS256 secret used for every token
///
/// MUST be called during application startup before any JWT operations.
/// Can only be called once; subsequent calls return an error.
pub fn initialize_jwt_secret(secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(anyhow!("JWT secret must not be empty"));
    }

    JWT_KEYS
        .set(JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
        .map_err(|_| anyhow!("JWT secret already initialized"))?;

    tracing::debug!("JWT secret initialized");
    Ok(())
}

fn keys() -> std::result::Result<&'static JwtKeys, TokenError> {
    JWT_KEYS.get().ok_or(TokenError::NotInitialized)
}

// ============================================================================
// Token Generation
// ============================================================================

/// Generate an access token for `email` (valid for 30 minutes)
pub fn generate_access_token(email: &str) -> std::result::Result<String, TokenError> {
    generate_token(email, TokenType::Access)
}

/// Generate a confirmation token for `email` (valid for 24 hours)
pub fn generate_confirmation_token(email: &str) -> std::result::Result<String, TokenError> {
    generate_token(email, TokenType::Confirmation)
}

/// Generate a token of the given kind for `email`
pub fn generate_token(email: &str, token_type: TokenType) -> std::result::Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: Some(email.to_string()),
        iat: now.timestamp(),
        exp: (now + token_type.lifetime()).timestamp(),
        token_type: Some(token_type.as_str().to_string()),
    };

    tracing::debug!(token_type = %token_type, "Creating token");
    encode_claims(&claims)
}

fn encode_claims(claims: &Claims) -> std::result::Result<String, TokenError> {
    let keys = keys()?;
    encode(&Header::new(JWT_ALGORITHM), claims, &keys.encoding)
        .map_err(|e| TokenError::Encoding(e.to_string()))
}

// ============================================================================
// Token Validation
// ============================================================================

/// Decode a token and check its signature and expiry
///
/// No leeway is applied to `exp`: a token is expired the second its
/// expiration time has passed.
pub fn decode_claims(token: &str) -> std::result::Result<Claims, TokenError> {
    let keys = keys()?;

    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}

/// Validate a token of the expected kind and return its subject (email)
///
/// ## Errors
///
/// - [`TokenError::Expired`] if the token is past its expiry
/// - [`TokenError::Invalid`] for bad signatures and malformed tokens
/// - [`TokenError::MissingSubject`] if `sub` is absent or empty
/// - [`TokenError::WrongType`] if `type` is not `expected`
pub fn validate_token(
    token: &str,
    expected: TokenType,
) -> std::result::Result<String, TokenError> {
    let claims = decode_claims(token)?;

    let email = match claims.sub {
        Some(sub) if !sub.is_empty() => sub,
        _ => return Err(TokenError::MissingSubject),
    };

    if claims.token_type.as_deref() != Some(expected.as_str()) {
        return Err(TokenError::WrongType(expected));
    }

    Ok(email)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "crypto-core-test-secret";

    fn init_test_secret() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            initialize_jwt_secret(TEST_SECRET).expect("Failed to initialize test secret");
        });
    }

    fn claims_for(sub: Option<&str>, token_type: Option<&str>, exp_offset_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: sub.map(str::to_string),
            iat: now,
            exp: now + exp_offset_secs,
            token_type: token_type.map(str::to_string),
        }
    }

    #[test]
    fn test_access_token_expires_after_30_minutes() {
        assert_eq!(TokenType::Access.lifetime(), Duration::minutes(30));
    }

    #[test]
    fn test_confirmation_token_expires_after_a_day() {
        assert_eq!(TokenType::Confirmation.lifetime(), Duration::minutes(1440));
    }

    #[test]
    fn test_generate_access_token() {
        init_test_secret();

        let token = generate_access_token("test@example.com").expect("should generate token");
        assert_eq!(token.matches('.').count(), 2);

        let claims = decode_claims(&token).expect("should decode");
        assert_eq!(claims.sub.as_deref(), Some("test@example.com"));
        assert_eq!(claims.token_type.as_deref(), Some("access"));
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_validate_access_token_returns_email() {
        init_test_secret();

        let token = generate_access_token("test@example.com").unwrap();
        let email = validate_token(&token, TokenType::Access).unwrap();
        assert_eq!(email, "test@example.com");
    }

    #[test]
    fn test_validate_confirmation_token_returns_email() {
        init_test_secret();

        let token = generate_confirmation_token("test@example.com").unwrap();
        let email = validate_token(&token, TokenType::Confirmation).unwrap();
        assert_eq!(email, "test@example.com");
    }

    #[test]
    fn test_confirmation_token_rejected_as_access() {
        init_test_secret();

        let token = generate_confirmation_token("test@example.com").unwrap();
        let err = validate_token(&token, TokenType::Access).unwrap_err();
        assert_eq!(err, TokenError::WrongType(TokenType::Access));
        assert_eq!(err.to_string(), "Token has incorrect type, expected access");
    }

    #[test]
    fn test_access_token_rejected_as_confirmation() {
        init_test_secret();

        let token = generate_access_token("test@example.com").unwrap();
        let err = validate_token(&token, TokenType::Confirmation).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Token has incorrect type, expected confirmation"
        );
    }

    #[test]
    fn test_expired_token() {
        init_test_secret();

        let token = encode_claims(&claims_for(Some("test@example.com"), Some("access"), -10))
            .unwrap();
        let err = validate_token(&token, TokenType::Access).unwrap_err();
        assert_eq!(err, TokenError::Expired);
        assert_eq!(err.to_string(), "Token has expired");
    }

    #[test]
    fn test_invalid_token() {
        init_test_secret();

        let err = validate_token("invalid.token.here", TokenType::Access).unwrap_err();
        assert_eq!(err, TokenError::Invalid);
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn test_token_signed_with_other_secret() {
        init_test_secret();

        let claims = claims_for(Some("test@example.com"), Some("access"), 600);
        let forged = encode(
            &Header::new(JWT_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();

        assert_eq!(
            validate_token(&forged, TokenType::Access),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_missing_subject() {
        init_test_secret();

        let token = encode_claims(&claims_for(None, Some("access"), 600)).unwrap();
        let err = validate_token(&token, TokenType::Access).unwrap_err();
        assert_eq!(err, TokenError::MissingSubject);
        assert_eq!(err.to_string(), "Token is missing \"sub\" field");
    }

    #[test]
    fn test_missing_type() {
        init_test_secret();

        let token = encode_claims(&claims_for(Some("test@example.com"), None, 600)).unwrap();
        assert_eq!(
            validate_token(&token, TokenType::Access),
            Err(TokenError::WrongType(TokenType::Access))
        );
    }

    #[test]
    fn test_double_initialization_fails() {
        init_test_secret();
        assert!(keys().is_ok());
        assert!(initialize_jwt_secret("another-secret").is_err());
    }

    #[test]
    fn test_claims_serialize_type_field() {
        let claims = claims_for(Some("a@b.c"), Some("confirmation"), 60);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "confirmation");
        assert_eq!(json["sub"], "a@b.c");
    }
}
