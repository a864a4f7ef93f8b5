//! Modified UTF-8 as used by `CONSTANT_Utf8_info` (JVMS §4.4.7).
//!
//! It differs from standard UTF-8 in two ways: the NUL character is encoded as
//! the two bytes `C0 80`, and characters outside the basic multilingual plane
//! are encoded as a surrogate pair of three-byte sequences.
//!
//! Class files may also hold byte sequences that no Rust string can represent
//! faithfully, such as the unpaired surrogate `ED A0 80` that javac emits for
//! `"\uD800"`. Decoding those is lossy, which is why the constant pool keeps
//! the bytes it read next to the decoded string.

use std::borrow::Cow;

use crate::{ClassFileError, Result};

/// Decodes a modified UTF-8 byte string.
///
/// Unpaired surrogates become U+FFFD and overlong forms are accepted. Only
/// bytes the JVM itself rejects fail: `00`, `F0` to `FF`, and sequences cut
/// short or missing a continuation byte.
pub fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    if let Some(at) = bytes.iter().position(|b| *b == 0 || *b >= 0xf0) {
        return Err(ClassFileError::InvalidModifiedUtf8(at));
    }

    match cesu8::from_java_cesu8(bytes) {
        Ok(s) => Ok(s),
        Err(_) => decode_lossy(bytes).map(Cow::Owned),
    }
}

/// Encodes `s` in the canonical modified UTF-8 form.
pub fn encode(s: &str) -> Cow<'_, [u8]> {
    cesu8::to_java_cesu8(s)
}

fn decode_lossy(bytes: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let unit = if b & 0x80 == 0 {
            i += 1;
            b as u16
        } else if b & 0xe0 == 0xc0 {
            let b2 = continuation(bytes, i + 1)?;
            i += 2;
            ((b as u16 & 0x1f) << 6) | b2
        } else if b & 0xf0 == 0xe0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            i += 3;
            ((b as u16 & 0x0f) << 12) | (b2 << 6) | b3
        } else {
            // A continuation byte with no lead byte
            return Err(ClassFileError::InvalidModifiedUtf8(i));
        };
        units.push(unit);
    }

    Ok(char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

fn continuation(bytes: &[u8], at: usize) -> Result<u16> {
    match bytes.get(at) {
        Some(b) if b & 0xc0 == 0x80 => Ok((b & 0x3f) as u16),
        _ => Err(ClassFileError::InvalidModifiedUtf8(at)),
    }
}
