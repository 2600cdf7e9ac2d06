pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::types::EntityId;

/// Bearer token claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: EntityId,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(account_id: EntityId, username: impl Into<String>) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let exp = (now + Duration::hours(security.jwt_expiry_hours as i64)).timestamp();

        Self {
            sub: account_id,
            username: username.into(),
            exp,
            iat: now.timestamp(),
            iss: security.jwt_issuer.clone(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "JWT secret not configured"),
        }
    }
}

impl std::error::Error for JwtError {}

fn secret() -> Result<&'static str, JwtError> {
    let secret = config::config().security.jwt_secret.as_str();
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    Ok(secret)
}

/// Sign claims with the configured HS256 secret
pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature, expiry and issuer
pub fn verify_jwt(token: &str) -> Result<Claims, JwtError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());
    let mut validation = Validation::default();
    validation.set_issuer(&[config::config().security.jwt_issuer.as_str()]);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims() {
        let token = generate_jwt(&Claims::new(7, "bob")).unwrap();
        let claims = verify_jwt(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.iss, config::config().security.jwt_issuer);
    }

    #[test]
    fn rejects_expired_tokens() {
        let mut claims = Claims::new(7, "bob");
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = generate_jwt(&claims).unwrap();
        assert!(matches!(verify_jwt(&token), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn rejects_foreign_issuers() {
        let mut claims = Claims::new(7, "bob");
        claims.iss = "someone-else".to_string();
        let token = generate_jwt(&claims).unwrap();
        assert!(verify_jwt(&token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(verify_jwt("not.a.token").is_err());
    }
}
