//! Token authentication.

use std::fmt::Write as _;

use rand::Rng;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::core::errors::{Result, SimError};
use crate::handlers::required_str;
use crate::router::dispatch::{HandlerReply, RequestContext};

/// `POST /auth-token/`: exchange username and password for the stored token.
pub fn obtain_token(ctx: &mut RequestContext<'_>) -> Result<HandlerReply> {
    let username = required_str(ctx, "username")?;
    let password = required_str(ctx, "password")?;

    let credential = ctx
        .state
        .credentials
        .get(&username)
        .filter(|c| c.password == password)
        .ok_or_else(|| SimError::Authentication {
            detail: "Unable to log in with provided credentials.".to_string(),
        })?;
    Ok(HandlerReply::ok(json!({ "token": credential.token })))
}

/// Fresh 40-hex-digit token bound to `username` and `password`.
pub(crate) fn issue_token<R: Rng + ?Sized>(username: &str, password: &str, rng: &mut R) -> String {
    let nonce: u64 = rng.random();
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update([0]);
    hasher.update(password.as_bytes());
    hasher.update(nonce.to_le_bytes());
    let digest = hasher.finalize();
    let mut token = String::with_capacity(40);
    for b in &digest[..20] {
        let _ = write!(token, "{b:02x}");
    }
    token
}
