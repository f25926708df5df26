//! Credential hashing for the WebAPI challenge-response handshake.
//!
//! The server proves nothing on its own; the client must fold a
//! server-issued random value into a password-derived MD5 chain and send
//! back the digest. The chain is fixed by the protocol:
//!
//! 1. `MD5(UTF-16LE(password))`
//! 2. `MD5(step1 ++ b"WebAPI")`, the password hash
//! 3. `MD5(step2 ++ hex-decode(srv_rand))`, hex-encoded, the answer
//!
//! The client also sends `cli_rand`, 16 random bytes hex-encoded, which the
//! server folds into its own proof (`cli_rand_answer`) so the exchange is
//! mutual.

use md5::{Digest, Md5};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::AuthError;

/// Literal the protocol appends to the first-stage password digest.
const WEBAPI_SALT: &[u8] = b"WebAPI";

/// Number of random bytes in the client nonce.
const CLIENT_NONCE_LEN: usize = 16;

fn md5_bytes(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes the password-derived key: `MD5(MD5(UTF-16LE(password)) ++ "WebAPI")`.
#[must_use]
pub fn password_hash(password: &str) -> [u8; 16] {
    let utf16le: Vec<u8> = password
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    let first = md5_bytes(&utf16le);

    let mut combined = Vec::with_capacity(first.len() + WEBAPI_SALT.len());
    combined.extend_from_slice(&first);
    combined.extend_from_slice(WEBAPI_SALT);
    md5_bytes(&combined)
}

/// Computes the hex-encoded answer to a server challenge.
///
/// `srv_rand` is the hex-encoded random value from the `auth/start`
/// response.
///
/// # Errors
/// Returns [`AuthError::ProtocolViolation`] if the challenge is not valid
/// hex.
pub fn challenge_answer(password: &str, srv_rand: &str) -> Result<String, AuthError> {
    let srv_rand_bytes = hex::decode(srv_rand)
        .map_err(|_| AuthError::ProtocolViolation(format!("malformed srv_rand: {srv_rand}")))?;

    let key = password_hash(password);
    let mut combined = Vec::with_capacity(key.len() + srv_rand_bytes.len());
    combined.extend_from_slice(&key);
    combined.extend_from_slice(&srv_rand_bytes);

    Ok(hex::encode(md5_bytes(&combined)))
}

/// Generates a fresh hex-encoded 16-byte client nonce.
#[must_use]
pub fn client_nonce() -> String {
    let mut bytes = [0u8; CLIENT_NONCE_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Checks the server's proof of the shared secret.
///
/// The `auth/answer` response may carry `cli_rand_answer`, the server's
/// digest over our nonce. Returns `false` on mismatch or malformed input;
/// callers treat that as a warning, matching the upstream manager tooling.
#[must_use]
pub fn verify_server_proof(password: &str, cli_rand: &str, cli_rand_answer: &str) -> bool {
    let Ok(cli_rand_bytes) = hex::decode(cli_rand) else {
        return false;
    };

    let key = password_hash(password);
    let mut combined = Vec::with_capacity(key.len() + cli_rand_bytes.len());
    combined.extend_from_slice(&key);
    combined.extend_from_slice(&cli_rand_bytes);

    hex::encode(md5_bytes(&combined)) == cli_rand_answer
}
