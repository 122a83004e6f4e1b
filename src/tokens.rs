//! Sealed, expiring tokens.
//!
//! A token is `hex(nonce || AES-256-GCM(claims))`. The GCM tag makes it
//! tamper-evident; the claims carry the user id, what the token is for, and
//! when it stops being valid. Opening a token never errors: anything wrong
//! with it reads as "no user".

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use anyhow::format_err;
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

const NONCE_LENGTH: usize = 12;

/// Lifetime of API tokens, in seconds.
pub const AUTH_TOKEN_EXPIRATION: u64 = 3600;
/// Lifetime of confirmation and password reset tokens, in seconds.
pub const ACCOUNT_TOKEN_EXPIRATION: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    /// API access
    Auth,
    /// Account email confirmation
    Confirm,
    /// Password reset
    Reset,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: i32,
    purpose: Purpose,
    /// Unix timestamp after which the token is rejected
    exp: i64,
}

/// Seal a token for `user_id` that expires `expires_in` seconds from now.
pub fn seal(
    key: &[u8; 32],
    purpose: Purpose,
    user_id: i32,
    expires_in: u64,
) -> Result<String, ServerError> {
    let expires_in = i64::try_from(expires_in).unwrap_or(i64::MAX);
    let claims = Claims {
        id: user_id,
        purpose,
        exp: Utc::now().timestamp().saturating_add(expires_in),
    };
    let plaintext = serde_json::to_vec(&claims).map_err(anyhow::Error::from)?;

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| format_err!("failed to create cipher: {}", e))?;
    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
        .map_err(|e| format_err!("sealing token failed: {}", e))?;

    let mut sealed = nonce_bytes.to_vec();
    sealed.extend_from_slice(&ciphertext);
    Ok(hex::encode(sealed))
}

/// Open a token, returning the user id it was sealed for.
pub fn open(key: &[u8; 32], purpose: Purpose, token: &str) -> Option<i32> {
    open_at(key, purpose, token, Utc::now().timestamp())
}

/// [`open`] as seen at unix time `now`.
pub fn open_at(key: &[u8; 32], purpose: Purpose, token: &str, now: i64) -> Option<i32> {
    let sealed = hex::decode(token.trim()).ok()?;
    if sealed.len() <= NONCE_LENGTH {
        return None;
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LENGTH);

    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    let plaintext = cipher.decrypt(Nonce::from_slice(nonce), ciphertext).ok()?;
    let claims: Claims = serde_json::from_slice(&plaintext).ok()?;

    if claims.purpose != purpose || now >= claims.exp {
        tracing::debug!("rejecting {:?} token for user {}", claims.purpose, claims.id);
        return None;
    }
    Some(claims.id)
}
