//! Reversible payload obfuscation for `data-encode`.
//!
//! The payload is XORed with a keystream of SHA-256 blocks derived from the
//! secret, the key and a block counter, then rendered as unpadded URL-safe
//! base64. This hides a payload from casual inspection; it is not
//! encryption and offers no integrity protection.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

const BLOCK: usize = 32;

fn keystream_block(secret: &str, key: &str, counter: u32) -> [u8; BLOCK] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update([0]);
    hasher.update(key.as_bytes());
    hasher.update([0]);
    hasher.update(counter.to_be_bytes());
    hasher.finalize().into()
}

fn xor_keystream(data: &mut [u8], secret: &str, key: &str) {
    for (counter, chunk) in (0u32..).zip(data.chunks_mut(BLOCK)) {
        let block = keystream_block(secret, key, counter);
        for (byte, mask) in chunk.iter_mut().zip(block) {
            *byte ^= mask;
        }
    }
}

/// Obfuscate `cdc` under `secret` and `key`.
pub fn tangle(cdc: &str, secret: &str, key: &str) -> String {
    let mut bytes = cdc.as_bytes().to_vec();
    xor_keystream(&mut bytes, secret, key);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Recover the payload produced by [`tangle`] with the same secret and key.
pub fn untangle(tangled: &str, secret: &str, key: &str) -> Result<String> {
    let mut bytes = URL_SAFE_NO_PAD
        .decode(tangled)
        .map_err(|e| Error::invalid_parameter("tangled", e.to_string()))?;
    xor_keystream(&mut bytes, secret, key);
    String::from_utf8(bytes).map_err(|_| {
        Error::invalid_parameter("tangled", "does not decode to text under this secret and key")
    })
}
