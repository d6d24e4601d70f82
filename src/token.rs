// quote-desk: signed, expiring admin session tokens

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;
const TOKEN_VERSION_V1: &str = "v1";
const MAX_TOKEN_LEN: usize = 1024;

/// Lifetime of a login token
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    InvalidFormat,
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("signing key rejected: {0}")]
    Key(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Admin id
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    pub fn issue(&self, admin_id: i64) -> Result<String, TokenError> {
        self.issue_at(admin_id, chrono::Utc::now().timestamp())
    }

    pub fn issue_at(&self, admin_id: i64, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: admin_id,
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::InvalidFormat)?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload);
        let sig_part = URL_SAFE_NO_PAD.encode(self.sign(&payload_part)?);
        Ok(format!("{}.{}.{}", TOKEN_VERSION_V1, payload_part, sig_part))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::InvalidFormat);
        }
        let mut parts = token.split('.');
        let (Some(version), Some(payload_part), Some(sig_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::InvalidFormat);
        };
        if version != TOKEN_VERSION_V1 {
            return Err(TokenError::InvalidFormat);
        }

        let expected = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|_| TokenError::InvalidFormat)?;
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|_| TokenError::InvalidFormat)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::InvalidFormat)?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, payload_part: &str) -> Result<Vec<u8>, TokenError> {
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| TokenError::Key(e.to_string()))
    }
}
