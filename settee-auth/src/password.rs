//! PBKDF2 password hashes.

use settee::{Error, Result};
use sha1::Sha1;

/// Name of the only supported password scheme.
pub const PBKDF2_SCHEME: &str = "pbkdf2";

const KEY_LEN: usize = 20;

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);
    key
}

/// Returns true if `password` derives `derived_key` (lowercase hex) under
/// the given salt and iteration count.
pub fn validate_pbkdf2(password: &str, salt: &str, derived_key: &str, iterations: u32) -> bool {
    let Ok(expected) = hex::decode(derived_key) else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    derive(password, salt, iterations).as_slice() == expected.as_slice()
}

/// Encodes a password in the administrator hash format
/// `-pbkdf2-<derivedKeyHex>,<salt>,<iterations>`.
pub fn hash_password(password: &str, salt: &str, iterations: u32) -> String {
    let key = hex::encode(derive(password, salt, iterations));
    format!("-{PBKDF2_SCHEME}-{key},{salt},{iterations}")
}

/// The parts of a stored administrator hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredHash {
    pub derived_key: String,
    pub salt: String,
    pub iterations: u32,
}

pub(crate) fn parse_admin_hash(hash: &str) -> Result<StoredHash> {
    let prefix = format!("-{PBKDF2_SCHEME}-");
    let rest = hash
        .strip_prefix(&prefix)
        .ok_or_else(|| Error::internal("unrecognized password scheme"))?;
    let mut parts = rest.split(',');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(salt), Some(iterations), None) => Ok(StoredHash {
            derived_key: key.to_string(),
            salt: salt.to_string(),
            iterations: iterations
                .parse()
                .map_err(|_| Error::internal("unrecognized hash format"))?,
        }),
        _ => Err(Error::internal("unrecognized hash format")),
    }
}
