//! Single-digit base64 mapping used by the VLQ codec

use crate::error::{Result, SourceMapError};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Map a 6-bit integer to its base64 character.
pub fn encode(digit: u32) -> Result<char> {
    ALPHABET
        .get(digit as usize)
        .map(|&byte| byte as char)
        .ok_or(SourceMapError::Base64OutOfRange(digit))
}

/// Character for the low six bits of `digit`.
pub(crate) fn digit_char(digit: u8) -> char {
    ALPHABET[usize::from(digit & 0x3f)] as char
}

/// Map a base64 character back to its 6-bit integer, or `None` if it is not
/// part of the alphabet.
pub fn decode(byte: u8) -> Option<u32> {
    let digit = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(digit as u32)
}
