use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::PasswordError;

/// Stored hashes look like `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
const SCHEME: &str = "pbkdf2-sha256";
pub const PBKDF2_ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 600_000 };
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;
pub const MIN_PASSWORD_LENGTH: usize = 10;

/// Derived key material, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedHash([u8; HASH_LENGTH]);

impl DerivedHash {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut out = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
        Self(out)
    }
}

/// Hash a password for storage with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort(MIN_PASSWORD_LENGTH));
    }
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    let derived = DerivedHash::derive(password, &salt, PBKDF2_ITERATIONS);
    Ok(format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(derived.0)
    ))
}

/// Check a password against a stored hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<(), PasswordError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(PasswordError::MalformedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| PasswordError::MalformedHash)?;
    if iterations == 0 {
        return Err(PasswordError::MalformedHash);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| PasswordError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| PasswordError::MalformedHash)?;
    if expected.len() != HASH_LENGTH {
        return Err(PasswordError::MalformedHash);
    }

    let derived = DerivedHash::derive(password, &salt, iterations);
    if bool::from(derived.0.ct_eq(expected.as_slice())) {
        Ok(())
    } else {
        Err(PasswordError::WrongPassword)
    }
}
