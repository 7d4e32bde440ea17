use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::TokenInspector;
use crate::error::AuthKitError;

/// Reads the `exp` claim of a JWT without verifying its signature.
///
/// Only the payload segment is decoded. Tokens held by the store were issued
/// to this client earlier; verifying them is the server's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtInspector;

impl JwtInspector {
    pub fn new() -> Self {
        JwtInspector
    }

    /// Decodes the payload segment of `token` into a JSON object.
    pub fn decode_payload(&self, token: &str) -> Result<Value, AuthKitError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(AuthKitError::Token(format!(
                "Expected 3 dot-separated segments, found {}",
                segments.len()
            )));
        }

        // Some issuers keep the padding; the URL-safe engine here does not accept it.
        let payload = segments[1].trim_end_matches('=');
        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthKitError::Token(format!("Invalid base64 in payload: {}", e)))?;

        let claims: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AuthKitError::Token(format!("Payload is not valid JSON: {}", e)))?;

        if !claims.is_object() {
            return Err(AuthKitError::Token("Payload is not a JSON object".into()));
        }
        Ok(claims)
    }
}

impl TokenInspector for JwtInspector {
    fn expires_at(&self, token: &str) -> Result<DateTime<Utc>, AuthKitError> {
        let claims = self.decode_payload(token)?;

        let seconds = match claims.get("exp") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Some(other) => {
                return Err(AuthKitError::Token(format!(
                    "Claim 'exp' is not numeric: {}",
                    other
                )))
            }
            None => return Err(AuthKitError::Token("Missing 'exp' claim".into())),
        }
        .ok_or_else(|| AuthKitError::Token("Claim 'exp' is out of range".into()))?;

        DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| AuthKitError::Token(format!("Claim 'exp' out of range: {}", seconds)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn mint(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .expect("Failed to create token")
    }

    #[test]
    fn test_reads_exp_claim() {
        let token = mint(json!({"sub": "user1", "exp": 4102444800i64}));
        let expires_at = JwtInspector::new().expires_at(&token).unwrap();
        assert_eq!(expires_at.timestamp(), 4102444800);
    }

    #[test]
    fn test_accepts_fractional_exp() {
        let token = mint(json!({"exp": 4102444800.75}));
        let expires_at = JwtInspector::new().expires_at(&token).unwrap();
        assert_eq!(expires_at.timestamp(), 4102444800);
    }

    #[test]
    fn test_past_exp_still_decodes() {
        let token = mint(json!({"exp": 1000}));
        let inspector = JwtInspector::new();
        assert_eq!(inspector.expires_at(&token).unwrap().timestamp(), 1000);
        assert!(!inspector.is_unexpired(&token));
    }

    #[test]
    fn test_missing_exp_is_token_error() {
        let token = mint(json!({"sub": "user1"}));
        let err = JwtInspector::new().expires_at(&token).unwrap_err();
        assert!(matches!(err, AuthKitError::Token(_)));
    }

    #[test]
    fn test_string_exp_is_token_error() {
        let token = mint(json!({"exp": "tomorrow"}));
        assert!(JwtInspector::new().expires_at(&token).is_err());
    }

    #[test]
    fn test_malformed_tokens_are_errors() {
        let inspector = JwtInspector::new();
        for token in ["", "abc", "invalid.token", "a.b.c.d", "a.!!!.c", "a.bm90IGpzb24.c"] {
            let err = inspector.expires_at(token).unwrap_err();
            assert!(
                matches!(err, AuthKitError::Token(_)),
                "expected token error for {:?}",
                token
            );
        }
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let payload = general_purpose::URL_SAFE.encode(br#"{"exp":4102444800}"#);
        let token = format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", payload);
        let expires_at = JwtInspector::new().expires_at(&token).unwrap();
        assert_eq!(expires_at.timestamp(), 4102444800);
    }
}
