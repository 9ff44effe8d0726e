use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Minimum accepted password length in bytes.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Well-formed Argon2id hash with the default cost parameters that no
/// password matches. Verifying against it costs the same as a real account.
pub const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$X+dDwu6DilWWOoyfmC64JQ$I5MRk0Olq3Q4s/CA1/XlLxHXcbNj5Di5lZ8rT2592mM";

/// Hash a password with Argon2id and a fresh random salt.
///
/// The PHC string carries the salt and cost parameters, so hashes made with
/// older parameters keep verifying after the defaults change.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` for a wrong password, `Err` only when the stored hash is unusable.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
