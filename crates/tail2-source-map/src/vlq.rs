//! Base64 VLQ codec for the `mappings` field.
//!
//! A value is stored sign-in-low-bit (`n << 1`, or `(-n << 1) | 1` when
//! negative), then emitted as 5-bit groups from least to most significant.
//! Bit 6 of each base64 digit is the continuation flag.

use crate::base64;
use crate::error::{Result, SourceMapError};

const VLQ_BASE_SHIFT: u32 = 5;
const VLQ_BASE: u64 = 1 << VLQ_BASE_SHIFT;
const VLQ_BASE_MASK: u64 = VLQ_BASE - 1;
const VLQ_CONTINUATION_BIT: u64 = VLQ_BASE;

fn to_vlq_signed(value: i32) -> u64 {
    let value = i64::from(value);
    if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    }
}

/// Append the VLQ encoding of `value` to `out`.
pub fn encode_into(value: i32, out: &mut String) {
    let mut vlq = to_vlq_signed(value);
    loop {
        let mut digit = vlq & VLQ_BASE_MASK;
        vlq >>= VLQ_BASE_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION_BIT;
        }
        out.push(base64::digit_char(digit as u8));
        if vlq == 0 {
            break;
        }
    }
}

/// Encode a signed integer as a base64 VLQ string.
pub fn encode(value: i32) -> String {
    let mut out = String::new();
    encode_into(value, &mut out);
    out
}

/// Decode one VLQ value from `text` starting at byte `start`.
///
/// Returns the value and the index just past its last digit.
pub fn decode(text: &str, start: usize) -> Result<(i32, usize)> {
    let bytes = text.as_bytes();
    let mut index = start;
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(index) else {
            return Err(SourceMapError::VlqUnexpectedEof);
        };
        let digit = base64::decode(byte).ok_or_else(|| {
            let ch = text
                .get(index..)
                .and_then(|rest| rest.chars().next())
                .unwrap_or(byte as char);
            SourceMapError::InvalidBase64Digit(ch)
        })?;
        index += 1;

        if shift > 32 {
            return Err(SourceMapError::VlqOverflow);
        }
        let digit = u64::from(digit);
        result += (digit & VLQ_BASE_MASK) << shift;
        shift += VLQ_BASE_SHIFT;

        if digit & VLQ_CONTINUATION_BIT == 0 {
            break;
        }
    }

    let negative = result & 1 == 1;
    let magnitude = (result >> 1) as i64;
    let value = if negative { -magnitude } else { magnitude };
    let value = i32::try_from(value).map_err(|_| SourceMapError::VlqOverflow)?;
    Ok((value, index))
}
