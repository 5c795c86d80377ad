// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HMAC-SHA256 verification for signed status-patch requests.
//!
//! The signer sends `x-status-timestamp` and `x-status-signature`, where the
//! signature is the hex HMAC of `"{timestamp}.{raw_body}"`. No freshness
//! window is applied to the timestamp, so a captured valid request can be
//! replayed.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "x-status-timestamp";
/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-status-signature";

fn mac_for(secret: &str, timestamp: &str, raw_body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    Some(mac)
}

/// Hex signature for `timestamp` and `raw_body`.
pub fn sign(secret: &str, timestamp: &str, raw_body: &[u8]) -> String {
    mac_for(secret, timestamp, raw_body)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Constant-time check of `signature_hex` against the expected HMAC.
///
/// Every failure, including bad hex or a wrong length, is `false`.
pub fn verify(timestamp: &str, raw_body: &[u8], signature_hex: &str, secret: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    let Some(mac) = mac_for(secret, timestamp, raw_body) else {
        return false;
    };

    mac.verify_slice(&signature).is_ok()
}
