//! Content fingerprinting.
//!
//! The fingerprint is a 31-multiplier rolling hash over the trimmed text,
//! accumulated in a signed 32-bit integer with two's-complement wrapping and
//! rendered as the base-36 magnitude. Producers and the store must agree on
//! it bit-for-bit, so every component goes through [`content_hash`].
//!
//! Collisions are not handled: two different texts with the same
//! fingerprint are treated as duplicates.

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Compute the fingerprint of `content`.
///
/// Leading and trailing whitespace is ignored, so `content_hash(s)` always
/// equals `content_hash(s.trim())`.
pub fn content_hash(content: &str) -> String {
    let acc = rolling_hash(content.trim());
    to_base36(i64::from(acc).unsigned_abs())
}

/// Raw signed accumulator: `acc = acc * 31 + code_point`, wrapping at 32 bits.
pub fn rolling_hash(text: &str) -> i32 {
    text.chars().fold(0i32, |acc, c| {
        acc.wrapping_mul(31).wrapping_add(c as u32 as i32)
    })
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
