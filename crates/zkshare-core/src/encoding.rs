//! Text encodings used for identifiers: base58 for ledger keys and
//! signatures, RFC 4648 base32 (lowercase, unpadded) for content ids.

use data_encoding::BASE32_NOPAD;

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encode bytes as base58 (Bitcoin alphabet).
pub fn base58_encode(input: &[u8]) -> String {
    let zeros = input.iter().take_while(|b| **b == 0).count();

    // Little-endian base-58 digits.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &byte in &input[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat('1').take(zeros));
    out.extend(digits.iter().rev().map(|d| BASE58_ALPHABET[*d as usize] as char));
    out
}

/// Decode base58 text. Returns `None` on any character outside the alphabet.
pub fn base58_decode(input: &str) -> Option<Vec<u8>> {
    let zeros = input.bytes().take_while(|b| *b == b'1').count();

    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
    for c in input.bytes().skip(zeros) {
        let mut carry = BASE58_ALPHABET.iter().position(|a| *a == c)? as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Some(out)
}

/// Encode bytes as lowercase base32 without padding.
pub fn base32_lower_encode(input: &[u8]) -> String {
    BASE32_NOPAD.encode(input).to_ascii_lowercase()
}

/// Decode lowercase unpadded base32. Returns `None` on uppercase input,
/// characters outside the alphabet or an impossible length.
pub fn base32_lower_decode(input: &str) -> Option<Vec<u8>> {
    if input.bytes().any(|b| b.is_ascii_uppercase()) {
        return None;
    }
    BASE32_NOPAD.decode(input.to_ascii_uppercase().as_bytes()).ok()
}
