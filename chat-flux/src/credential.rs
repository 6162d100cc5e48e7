//! Salted password hashing: PBKDF2-HMAC-SHA256 at 1000 iterations.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const SALT_SIZE: usize = 16;
pub const HASH_SIZE: usize = 32;
const ITERATIONS: u32 = 1000;

pub type Salt = [u8; SALT_SIZE];
pub type Hash = [u8; HASH_SIZE];

/// Hash `password` under a freshly generated random salt.
#[inline]
pub fn make_credential(password: &str) -> (Salt, Hash) {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt);
    (salt, hash)
}

/// Recompute the hash for `password` under `salt` and compare it to `expected` in
/// constant time.
#[inline]
pub fn verify(password: &str, salt: &Salt, expected: &Hash) -> bool {
    let candidate = derive(password, salt);
    candidate.ct_eq(expected).into()
}

#[inline]
fn derive(password: &str, salt: &Salt) -> Hash {
    let mut out = [0u8; HASH_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut out);
    out
}
