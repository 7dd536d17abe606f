//! Session token encoding.
//!
//! A token is the unpadded URL-safe base64 of
//! `name ":" HEX(issued_at) ":" HMAC-SHA1(salt, name ":" HEX(issued_at))`,
//! where the MAC is appended as raw bytes.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use settee::{Error, Result};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

fn mac(salt: &str, payload: &str) -> Result<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(salt.as_bytes())
        .map_err(|e| Error::internal(format!("session key rejected: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Issues a token for `name`, keyed by the user's current salt.
pub fn create_token(name: &str, salt: &str, issued_at: i64) -> Result<String> {
    let payload = format!("{name}:{issued_at:X}");
    let signature = mac(salt, &payload)?.finalize().into_bytes();
    let mut raw = payload.into_bytes();
    raw.push(b':');
    raw.extend_from_slice(&signature);
    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// Splits a token into its user name, issue time and signature.
///
/// Only the encoding is checked; the signature is not verified.
pub fn decode_token(token: &str) -> Result<(String, i64)> {
    let (name, issued_at, _) = split(token)?;
    Ok((name, issued_at))
}

fn split(token: &str) -> Result<(String, i64, Vec<u8>)> {
    let malformed = || Error::bad_request("malformed session token");
    let raw = URL_SAFE_NO_PAD.decode(token).map_err(|_| malformed())?;
    let mut parts = raw.splitn(3, |b| *b == b':');
    let name = parts.next().ok_or_else(malformed)?;
    let issued_at = parts.next().ok_or_else(malformed)?;
    let signature = parts.next().ok_or_else(malformed)?;
    let name = std::str::from_utf8(name).map_err(|_| malformed())?;
    let issued_at = std::str::from_utf8(issued_at).map_err(|_| malformed())?;
    let issued_at = i64::from_str_radix(issued_at, 16).map_err(|_| malformed())?;
    if name.is_empty() {
        return Err(malformed());
    }
    Ok((name.to_string(), issued_at, signature.to_vec()))
}

/// Checks a presented token against `name`'s current salt.
///
/// Valid from the issue time up to, but excluding, `issued_at + timeout`.
pub(crate) fn verify(token: &str, name: &str, salt: &str, timeout: i64, now: i64) -> Result<()> {
    let (token_name, issued_at, signature) = split(token)?;
    if token_name != name {
        return Err(Error::unauthorized("session token names another user"));
    }
    mac(salt, &format!("{token_name}:{issued_at:X}"))?
        .verify_slice(&signature)
        .map_err(|_| Error::unauthorized("session signature mismatch"))?;
    if now < issued_at || now >= issued_at.saturating_add(timeout) {
        return Err(Error::unauthorized("session expired"));
    }
    Ok(())
}
