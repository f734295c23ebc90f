//! Password hashing and signed session tokens.
//!
//! Sessions are stateless: the cookie carries `base64url(user_id:expiry)`
//! plus an HMAC-SHA256 tag keyed by the server secret, so no session table
//! is needed and a restart with a pinned secret keeps logins alive.

use crate::config::SessionConfig;
use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "refuge_session";

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("password hashing failed: {err}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| anyhow!("stored password hash is invalid: {err}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(anyhow!("password verification failed: {err}")),
    }
}

#[derive(Clone)]
pub struct SessionTokens {
    secret: String,
    ttl_secs: i64,
}

impl SessionTokens {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            ttl_secs: config.ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn issue(&self, user_id: &str) -> Result<String> {
        let expires = Utc::now().timestamp() + self.ttl_secs;
        let payload = format!("{user_id}:{expires}");
        let tag = self.sign(payload.as_bytes())?;
        let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
        Ok(format!("{}.{}", engine.encode(payload), engine.encode(tag)))
    }

    /// Returns the user id when the token is well-formed, untampered, and
    /// not yet expired.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (encoded_payload, encoded_tag) = token.split_once('.')?;
        let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let payload = engine.decode(encoded_payload).ok()?;
        let tag = engine.decode(encoded_tag).ok()?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(&payload);
        mac.verify_slice(&tag).ok()?;

        let payload = String::from_utf8(payload).ok()?;
        let (user_id, expires) = payload.rsplit_once(':')?;
        let expires: i64 = expires.parse().ok()?;
        if expires < Utc::now().timestamp() {
            return None;
        }
        Some(user_id.to_string())
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|err| anyhow!("invalid session secret: {err}"))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Strict"
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict")
}

/// Pulls the session token out of a `Cookie` request header.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value)
    })
}
