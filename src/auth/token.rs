use rand::{rngs::OsRng, RngCore};

const TOKEN_BYTES: usize = 32;

/// Produces an unguessable opaque bearer token: 32 random bytes, hex-encoded.
/// The token is a pure lookup key and carries no embedded claims.
pub fn generate_token() -> String {
    let mut raw = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut raw);
    hex::encode(raw)
}
