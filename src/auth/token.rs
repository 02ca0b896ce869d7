use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Identity carried inside a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug)]
pub enum TokenError {
    /// Bad signature, bad encoding or a claim set that does not decode.
    Invalid(jwt::Error),
    Expired,
    /// The configured lifetime pushes `exp` past what a timestamp can hold.
    LifetimeOverflow,
}

/// Signs and checks HS256 tokens with the shared secret.
pub struct Tokens {
    key: Hmac<Sha256>,
    ttl: Option<i64>,
}

impl Tokens {
    pub fn new(secret: &str, ttl: Option<i64>) -> Tokens {
        let key = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC takes keys of any size");
        Tokens { key, ttl }
    }

    pub fn issue(&self, user_id: i32, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, Utc::now().timestamp())
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    fn issue_at(&self, user_id: i32, email: &str, now: i64) -> Result<String, TokenError> {
        let exp = match self.ttl {
            Some(ttl) => Some(now.checked_add(ttl).ok_or(TokenError::LifetimeOverflow)?),
            None => None,
        };
        let claims = Claims {
            id: user_id,
            email: email.to_owned(),
            iat: now,
            exp,
        };
        claims.sign_with_key(&self.key).map_err(TokenError::Invalid)
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let claims: Claims = token.verify_with_key(&self.key).map_err(TokenError::Invalid)?;
        match claims.exp {
            Some(exp) if exp <= now => Err(TokenError::Expired),
            _ => Ok(claims),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let tokens = Tokens::new("secret", None);
        let token = tokens.issue(42, "johndoe@example.com").unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.id, 42);
        assert_eq!(claims.email, "johndoe@example.com");
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn signing_is_deterministic() {
        let tokens = Tokens::new("secret", None);
        let a = tokens.issue_at(1, "a@example.com", 1_700_000_000).unwrap();
        let b = tokens.issue_at(1, "a@example.com", 1_700_000_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = Tokens::new("secret", None).issue(1, "a@example.com").unwrap();
        let result = Tokens::new("another-secret", None).verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let tokens = Tokens::new("secret", None);
        let token = tokens.issue(1, "a@example.com").unwrap();
        let forged = tokens.issue(2, "b@example.com").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];

        assert!(matches!(
            tokens.verify(&parts.join(".")),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = Tokens::new("secret", None);
        assert!(matches!(
            tokens.verify("invalidtoken"),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(tokens.verify("a.b.c"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn ttl_sets_and_enforces_expiry() {
        let tokens = Tokens::new("secret", Some(60));
        let token = tokens.issue_at(1, "a@example.com", 1_000).unwrap();

        let claims = tokens.verify_at(&token, 1_059).unwrap();
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, Some(1_060));

        assert!(matches!(
            tokens.verify_at(&token, 1_060),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn huge_ttl_fails_instead_of_overflowing() {
        let tokens = Tokens::new("secret", Some(i64::MAX));
        assert!(matches!(
            tokens.issue(1, "a@example.com"),
            Err(TokenError::LifetimeOverflow)
        ));
    }
}
