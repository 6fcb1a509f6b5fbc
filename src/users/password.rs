use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::error;

const PLACEHOLDER_LEN: usize = 32;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Random secret for users created implicitly; nobody is told what it is.
pub fn placeholder_password() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(PLACEHOLDER_LEN)
        .map(char::from)
        .collect()
}
