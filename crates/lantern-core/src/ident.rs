//! Client identifier allocation
//!
//! Identifiers are opaque hex tokens with UUIDv4-equivalent entropy.
//! Allocation does not consult the registry: the registration step
//! rejects the (vanishingly rare) collision by closing the new
//! connection instead of overwriting a live one.

/// Length of the random portion in bytes (128 bits)
pub const CLIENT_ID_BYTES: usize = 16;

/// Allocate a fresh client identifier
///
/// # Panics
/// Panics if the system random number generator fails (extremely rare).
/// Use `try_allocate_client_id` if you need to handle this case.
pub fn allocate_client_id() -> String {
    try_allocate_client_id().expect("RNG failed - system entropy source unavailable")
}

/// Try to allocate a client identifier, returning an error if RNG fails
pub fn try_allocate_client_id() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; CLIENT_ID_BYTES];
    getrandom::fill(&mut bytes)?;
    Ok(hex::encode(bytes))
}
