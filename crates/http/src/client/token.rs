//! Access token decoding
//!
//! The client never holds the signing key, so signatures are not checked
//! here; the backend verifies every bearer token it receives. What the client
//! does check is the payload schema: every claim the session depends on must
//! be present and well-typed, otherwise the token is treated as no session.

use bloomkart_core::{Role, UserIdentity};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Access/refresh token pair, replaced as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Claims carried by a BloomKart access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (the account email)
    pub sub: String,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Issued at (UTC timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiration (UTC timestamp)
    pub exp: i64,
    /// Only refresh tokens carry a type claim
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl AccessClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Remaining lifetime; negative once expired
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> TimeDelta {
        TimeDelta::seconds(self.exp - now.timestamp())
    }

    /// Whether the remaining lifetime is below `threshold`
    pub fn needs_refresh(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
        self.time_to_expiry(now) < threshold
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            user_id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Token decoding failures
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),

    #[error("Expected an access token, got a {0} token")]
    WrongKind(String),
}

/// Decode an access token payload against the strict claim schema
pub fn decode_access_token(token: &str) -> Result<AccessClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)?.claims;
    if let Some(kind) = &claims.token_type {
        return Err(TokenError::WrongKind(kind.clone()));
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    /// Mint an access token expiring `expires_in_secs` from now
    pub fn access_token(role: Role, expires_in_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: "asha@bloomkart.in".to_string(),
            user_id: 42,
            name: "Asha".to_string(),
            email: "asha@bloomkart.in".to_string(),
            role,
            iat: Some(now),
            exp: now + expires_in_secs,
            token_type: None,
        };
        encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::access_token;
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn sign(payload: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS512),
            payload,
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decodes_backend_claims() {
        let token = access_token(Role::Admin, 3600);
        let claims = decode_access_token(&token).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.identity().is_admin());
        assert!(!claims.is_expired(Utc::now()));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = access_token(Role::User, -60);
        let claims = decode_access_token(&token).unwrap();
        assert!(claims.is_expired(Utc::now()));
        assert!(claims.needs_refresh(Duration::from_secs(300), Utc::now()));
    }

    #[test]
    fn test_refresh_threshold() {
        let now = Utc::now();
        let soon = decode_access_token(&access_token(Role::User, 120)).unwrap();
        let later = decode_access_token(&access_token(Role::User, 3600)).unwrap();

        assert!(soon.needs_refresh(Duration::from_secs(300), now));
        assert!(!later.needs_refresh(Duration::from_secs(300), now));
    }

    #[test]
    fn test_missing_role_is_rejected() {
        let token = sign(&json!({
            "sub": "asha@bloomkart.in",
            "userId": 42,
            "name": "Asha",
            "email": "asha@bloomkart.in",
            "exp": Utc::now().timestamp() + 3600
        }));
        assert!(matches!(
            decode_access_token(&token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let token = sign(&json!({
            "sub": "asha@bloomkart.in",
            "userId": 42,
            "name": "Asha",
            "email": "asha@bloomkart.in",
            "role": "SUPERUSER",
            "exp": Utc::now().timestamp() + 3600
        }));
        assert!(decode_access_token(&token).is_err());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let token = sign(&json!({
            "sub": "asha@bloomkart.in",
            "userId": 42,
            "name": "Asha",
            "email": "asha@bloomkart.in",
            "role": "USER",
            "type": "refresh",
            "exp": Utc::now().timestamp() + 3600
        }));
        assert!(matches!(
            decode_access_token(&token),
            Err(TokenError::WrongKind(kind)) if kind == "refresh"
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode_access_token("not-a-jwt").is_err());
        assert!(decode_access_token("a.b.c").is_err());
        assert!(decode_access_token("").is_err());
    }
}
