use crate::error::TilError;
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

/// Hash a password into an Argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, TilError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TilError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC string.
///
/// Google-delegated accounts store an empty hash; any unparsable hash fails closed so
/// those accounts can never be entered through the password form.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn empty_stored_hash_never_verifies() {
        assert!(!verify_password("", ""));
        assert!(!verify_password("anything", ""));
    }
}
