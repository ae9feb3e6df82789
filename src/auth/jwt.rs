//! Access and refresh tokens
//!
//! Both are HS256 JWTs signed with separate secrets. The access token carries
//! the principal's identity fields; the refresh token only the user id and is
//! additionally matched against the copy stored on the user.

use bson::oid::ObjectId;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{Args, MIN_SECRET_LEN};
use crate::db::schemas::UserDoc;
use crate::types::{Result, VidtubeError};

/// Claims of an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    /// User id (hex)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub iat: u64,
    pub exp: u64,
}

/// Claims of a refresh token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    /// User id (hex)
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Freshly issued token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and validates both token kinds
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: String,
    access_expiry_seconds: u64,
    refresh_secret: String,
    refresh_expiry_seconds: u64,
}

impl TokenIssuer {
    /// Create an issuer, rejecting secrets shorter than [`MIN_SECRET_LEN`]
    pub fn new(
        access_secret: String,
        access_expiry_seconds: u64,
        refresh_secret: String,
        refresh_expiry_seconds: u64,
    ) -> Result<Self> {
        for (name, secret) in [
            ("ACCESS_TOKEN_SECRET", &access_secret),
            ("REFRESH_TOKEN_SECRET", &refresh_secret),
        ] {
            if secret.len() < MIN_SECRET_LEN {
                return Err(VidtubeError::Config(format!(
                    "{} must be at least {} characters",
                    name, MIN_SECRET_LEN
                )));
            }
        }

        Ok(Self {
            access_secret,
            access_expiry_seconds,
            refresh_secret,
            refresh_expiry_seconds,
        })
    }

    /// Build from the resolved configuration
    pub fn from_args(args: &Args) -> Result<Self> {
        Self::new(
            args.access_secret(),
            args.access_token_expiry_seconds,
            args.refresh_secret(),
            args.refresh_token_expiry_seconds,
        )
    }

    pub fn access_expiry_seconds(&self) -> u64 {
        self.access_expiry_seconds
    }

    pub fn refresh_expiry_seconds(&self) -> u64 {
        self.refresh_expiry_seconds
    }

    /// Issue an access token for a stored user
    pub fn issue_access(&self, user: &UserDoc) -> Result<String> {
        let now = now_secs()?;
        let claims = AccessClaims {
            sub: user.id()?.to_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            iat: now,
            exp: now + self.access_expiry_seconds,
        };
        sign(&claims, &self.access_secret)
    }

    /// Issue a refresh token for a user id
    pub fn issue_refresh(&self, user_id: &ObjectId) -> Result<String> {
        let now = now_secs()?;
        let claims = RefreshClaims {
            sub: user_id.to_hex(),
            iat: now,
            exp: now + self.refresh_expiry_seconds,
        };
        sign(&claims, &self.refresh_secret)
    }

    /// Issue both tokens at once
    pub fn issue_pair(&self, user: &UserDoc) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(user)?,
            refresh_token: self.issue_refresh(&user.id()?)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        verify(token, &self.access_secret, "access token")
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        verify(token, &self.refresh_secret, "refresh token")
    }
}

fn now_secs() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| VidtubeError::Internal(format!("System time error: {}", e)))
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| VidtubeError::Internal(format!("Failed to generate token: {}", e)))
}

fn verify<C: DeserializeOwned>(token: &str, secret: &str, what: &str) -> Result<C> {
    decode::<C>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| {
        let reason = match err.kind() {
            ErrorKind::ExpiredSignature => "expired",
            ErrorKind::InvalidSignature => "has an invalid signature",
            _ => "is invalid",
        };
        VidtubeError::Unauthorized(format!("The {} {}", what, reason))
    })
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        return (!token.is_empty()).then_some(token);
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Registration;

    const ACCESS: &str = "access-secret-that-is-at-least-32-characters";
    const REFRESH: &str = "refresh-secret-that-is-at-least-32-characters";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(ACCESS.into(), 3600, REFRESH.into(), 7200).unwrap()
    }

    fn stored_user() -> UserDoc {
        let reg = Registration::normalized(
            Some("Bob Builder".into()),
            Some("bob@example.com".into()),
            Some("bob".into()),
            Some("can-we-fix-it".into()),
        )
        .unwrap();
        let mut user = UserDoc::create(reg, "https://cdn/bob.png".into(), None).unwrap();
        user._id = Some(ObjectId::new());
        user
    }

    #[test]
    fn test_access_token_carries_identity() {
        let user = stored_user();
        let token = issuer().issue_access(&user).unwrap();
        let claims = issuer().verify_access(&token).unwrap();

        assert_eq!(claims.sub, user._id.unwrap().to_hex());
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.email, "bob@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let user = stored_user();
        let pair = issuer().issue_pair(&user).unwrap();

        assert!(issuer().verify_refresh(&pair.refresh_token).is_ok());
        assert!(issuer().verify_access(&pair.refresh_token).is_err());
        assert!(issuer().verify_refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let claims = RefreshClaims {
            sub: ObjectId::new().to_hex(),
            iat: 1_000,
            exp: 2_000,
        };
        let token = sign(&claims, REFRESH).unwrap();

        let err = issuer().verify_refresh(&token).unwrap_err();
        assert_eq!(err.to_string(), "The refresh token expired");
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_short_secrets_rejected() {
        assert!(TokenIssuer::new("short".into(), 1, REFRESH.into(), 1).is_err());
        assert!(TokenIssuer::new(ACCESS.into(), 1, String::new(), 1).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }
}
