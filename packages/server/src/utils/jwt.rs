use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    pub exp: usize,  // Expiration timestamp
    /// Time of the original login; refreshes keep it so a token chain
    /// cannot be extended forever.
    pub orig_iat: usize,
}

/// Sign a new JWT token for a user.
///
/// `orig_iat` is `None` for a fresh login and carries the original issue time
/// when refreshing.
pub fn sign(
    user_id: i32,
    username: &str,
    secret: &str,
    ttl_secs: u64,
    orig_iat: Option<usize>,
) -> Result<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(i64::try_from(ttl_secs)?))
        .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        exp: expiration as usize,
        orig_iat: orig_iat.unwrap_or(now.timestamp() as usize),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Issue a successor for a still-valid token, keeping its `orig_iat`.
pub fn refresh(token: &str, secret: &str, ttl_secs: u64, refresh_window_secs: u64) -> Result<String> {
    let claims = verify(token, secret)?;
    let now = Utc::now().timestamp() as usize;
    if now.saturating_sub(claims.orig_iat) > refresh_window_secs as usize {
        bail!("refresh has expired");
    }
    sign(claims.uid, &claims.sub, secret, ttl_secs, Some(claims.orig_iat))
}
