use crate::error::Result;

pub use bcrypt::DEFAULT_COST;

/// Hashes `password` with bcrypt at [`DEFAULT_COST`].
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with_cost(password, DEFAULT_COST)
}

/// Hashes `password` with bcrypt at `cost` (4 to 31).
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Checks `password` against a bcrypt `hash`. A malformed hash is an error,
/// a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}
