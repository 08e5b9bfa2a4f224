//! Password digests
//!
//! Salted, iterated SHA-256 digests stored as `<salt>$<digest>` with both
//! parts base64-encoded.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Digest iteration count.
const ITERATIONS: u32 = 100_000;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let digest = digest_with_salt(password, &salt);
    format!(
        "{}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest)
    )
}

/// Verify a plaintext password against a stored `<salt>$<digest>` value.
///
/// Malformed stored values verify as false rather than erroring.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = STANDARD_NO_PAD.decode(salt_b64) else {
        return false;
    };
    let Ok(expected) = STANDARD_NO_PAD.decode(digest_b64) else {
        return false;
    };

    let actual = digest_with_salt(password, &salt);
    eq_without_early_exit(&actual, &expected)
}

fn digest_with_salt(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut out = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..ITERATIONS {
        out = Sha256::digest(&out);
    }
    out.to_vec()
}

/// Comparison that does not short-circuit on the first mismatching byte.
fn eq_without_early_exit(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
