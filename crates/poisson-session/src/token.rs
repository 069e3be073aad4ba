//! Token generation and password digests.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};

/// Random bytes per token. 256 bits: guessing one is out of the question,
/// and so is two sessions ever drawing the same one.
pub const TOKEN_BYTES: usize = 32;

/// Generates a URL-safe base64 token (no padding) from [`TOKEN_BYTES`]
/// bytes of `rand`'s thread-local CSPRNG.
pub fn generate() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex-encoded SHA-256 of a secret. Lets diagnostics show whether two
/// sessions hold the same password without showing the password.
pub fn digest(secret: &Secret<String>) -> String {
    hex::encode(Sha256::digest(secret.expose_secret().as_bytes()))
}
