use thiserror::Error;

/// The error type that describes failures to decode Base64 encoded strings.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum DecodeError {
    /// An invalid byte was found in the input. The offset and offending byte are provided.
    #[error("invalid byte {1} at offset {0}")]
    InvalidByte(usize, u8),
}

/// Decodes a URL-safe Base64 string, 6 bits per character.
///
/// Consent strings are not required to carry padding: trailing `=` characters are ignored,
/// and the last incomplete byte, if any, is filled with zeroes.
pub fn decode_base64_url(s: &str) -> Result<Vec<u8>, DecodeError> {
    let input = s.trim_end_matches('=').as_bytes();
    let mut output = Vec::with_capacity(input.len() * 6 / 8 + 1);

    // at most 12 pending bits between two output bytes
    let mut pending: u16 = 0;
    let mut pending_bits: u32 = 0;

    for (offset, &b) in input.iter().enumerate() {
        let value = base64_value(b).ok_or(DecodeError::InvalidByte(offset, b))?;
        pending = (pending << 6) | u16::from(value);
        pending_bits += 6;

        if pending_bits >= 8 {
            pending_bits -= 8;
            output.push((pending >> pending_bits) as u8);
            pending &= (1 << pending_bits) - 1;
        }
    }

    if pending_bits > 0 {
        output.push((pending << (8 - pending_bits)) as u8);
    }

    Ok(output)
}

fn base64_value(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}
