use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::AppConfig;

/// Name of the session cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Session claims: the caller's email plus whatever else the client posted
/// to `/jwt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Looks up a string-valued claim by name.
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "email" => Some(self.email.as_str()),
            _ => self.extra.get(field).and_then(Value::as_str),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Claims must include an email")]
    MissingEmail,

    #[error("Token lifetime of {0} days is out of range")]
    InvalidExpiry(u64),

    #[error("JWT generation error: {0}")]
    TokenGeneration(jsonwebtoken::errors::Error),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),
}

/// Signs and verifies session tokens and renders the `token` cookie.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    production: bool,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration, production: bool) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            production,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, JwtError> {
        let days = config.security.jwt_expiry_days;
        let ttl = i64::try_from(days)
            .ok()
            .and_then(Duration::try_days)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or(JwtError::InvalidExpiry(days))?;
        Self::new(&config.security.jwt_secret, ttl, config.is_production())
    }

    /// Signs the posted claims. `exp` and `iat` are always set here.
    pub fn issue(&self, mut claims: Map<String, Value>) -> Result<String, JwtError> {
        let email = match claims.remove("email") {
            Some(Value::String(email)) if !email.is_empty() => email,
            _ => return Err(JwtError::MissingEmail),
        };
        claims.remove("exp");
        claims.remove("iat");

        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(JwtError::InvalidExpiry(self.ttl.num_days().unsigned_abs()))?;
        let claims = Claims {
            email,
            extra: claims,
            exp: expires.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(JwtError::TokenGeneration)
    }

    /// Checks signature and expiry and returns the decoded claims.
    ///
    /// Client claims such as `aud` ride along unchecked; only `exp` is
    /// enforced.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.validate_aud = false;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::InvalidToken)
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn session_cookie(&self, token: &str) -> HeaderValue {
        self.cookie(token, self.ttl.num_seconds())
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn cleared_cookie(&self) -> HeaderValue {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> HeaderValue {
        let same_site = if self.production { "None" } else { "Strict" };
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite={}",
            TOKEN_COOKIE, value, max_age, same_site
        );
        if self.production {
            cookie.push_str("; Secure");
        }
        // JWTs are base64url and dot separated, always a valid header value
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("token=; Max-Age=0"))
    }
}

/// Extracts the session token from any `Cookie` header on the request
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service(production: bool) -> TokenService {
        TokenService::new("test_secret_key", Duration::days(90), production).unwrap()
    }

    fn claims(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_issue_and_verify_token() {
        let service = service(false);
        let token = service
            .issue(claims(json!({ "email": "org@example.com", "name": "Org" })))
            .unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.email, "org@example.com");
        assert_eq!(claims.get("name"), Some("Org"));

        // Token should expire in ~90 days
        let expires_in = claims.exp - Utc::now().timestamp();
        assert!(expires_in > 89 * 24 * 3600);
        assert!(expires_in <= 90 * 24 * 3600);
    }

    #[test]
    fn test_issue_requires_email() {
        let service = service(false);
        assert!(matches!(
            service.issue(claims(json!({ "name": "nobody" }))),
            Err(JwtError::MissingEmail)
        ));
        assert!(matches!(
            service.issue(claims(json!({ "email": 42 }))),
            Err(JwtError::MissingEmail)
        ));
    }

    #[test]
    fn test_client_cannot_pick_expiry() {
        let service = service(false);
        let token = service
            .issue(claims(json!({ "email": "a@x.com", "exp": 1 })))
            .unwrap();
        let claims = service.verify(&token).unwrap();
        assert!(claims.exp > Utc::now().timestamp());
        assert!(!claims.extra.contains_key("exp"));
    }

    #[test]
    fn test_registered_claims_from_client_still_verify() {
        let service = service(false);
        let token = service
            .issue(claims(json!({ "email": "a@x.com", "aud": "web", "iss": "front", "sub": "42" })))
            .unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.get("aud"), Some("web"));
    }

    #[test]
    fn test_expiry_days_out_of_range() {
        let mut config = AppConfig::for_tests();
        config.security.jwt_expiry_days = u64::MAX;
        assert!(matches!(
            TokenService::from_config(&config),
            Err(JwtError::InvalidExpiry(_))
        ));

        config.security.jwt_expiry_days = 1_000_000_000;
        assert!(matches!(
            TokenService::from_config(&config),
            Err(JwtError::InvalidExpiry(_))
        ));

        config.security.jwt_expiry_days = 30;
        assert!(TokenService::from_config(&config).is_ok());
    }

    #[test]
    fn test_wrong_secret() {
        let token = service(false)
            .issue(claims(json!({ "email": "a@x.com" })))
            .unwrap();
        let other = TokenService::new("other_secret", Duration::days(90), false).unwrap();
        assert!(matches!(other.verify(&token), Err(JwtError::InvalidToken(_))));
        assert!(other.verify("not.a.token").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = TokenService::new("test_secret_key", Duration::days(-1), false).unwrap();
        let token = service.issue(claims(json!({ "email": "a@x.com" }))).unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            TokenService::new("", Duration::days(1), false),
            Err(JwtError::InvalidSecret)
        ));
    }

    #[test]
    fn test_cookie_attributes_follow_environment() {
        let dev = service(false).session_cookie("abc");
        let dev = dev.to_str().unwrap();
        assert!(dev.starts_with("token=abc;"));
        assert!(dev.contains("HttpOnly"));
        assert!(dev.contains("SameSite=Strict"));
        assert!(dev.contains("Max-Age=7776000"));
        assert!(!dev.contains("Secure"));

        let prod = service(true).session_cookie("abc");
        let prod = prod.to_str().unwrap();
        assert!(prod.contains("SameSite=None"));
        assert!(prod.contains("Secure"));

        let cleared = service(true).cleared_cookie();
        assert!(cleared.to_str().unwrap().starts_with("token=; Path=/; Max-Age=0"));
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc.def.ghi"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("xtoken=abc"));
        assert_eq!(token_from_headers(&headers), None);
    }
}
