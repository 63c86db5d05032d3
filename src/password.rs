use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use log::error;

/// Hash a plaintext password into a PHC string (algorithm, params, salt and
/// digest all encoded), suitable for storing in the `pwhash` column.
pub fn hash(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hashed| hashed.to_string())
}

/// Verify a plaintext password against a stored PHC string. A stored hash
/// that won't parse is treated as a failed verification, not a panic.
pub fn verify(stored: &str, plain: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("unparseable stored password hash: {e}");
            return false;
        }
    };

    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}
