//! String hashes used for cache staleness checks and hashed-key lookups.
use base64::prelude::{Engine, BASE64_STANDARD};
use sha2::{Digest, Sha256};

/// djb2 hash with 32-bit wrapping, matching the hash the server uses for
/// `user_hash` and `hashed_sdk_key_used`. The result is the decimal string of
/// the signed 32-bit value.
pub(crate) fn djb2(value: &str) -> String {
    let mut hash: i32 = 0;
    for character in value.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(character as i32);
    }
    hash.to_string()
}

/// SHA-256 of `name`, base64-encoded. The server may key gates/configs/layers
/// by this hash instead of the plain name to shrink payloads.
pub(crate) fn hash_name(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    BASE64_STANDARD.encode(digest)
}
