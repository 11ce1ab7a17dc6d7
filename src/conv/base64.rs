//! Base64 and URL-safe Base64 conversions (RFC 4648) using the `base64` crate.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::Result;

/// Encode text as padded standard Base64.
pub fn base64_encode(data: &str) -> String {
    if data.is_empty() {
        return String::new();
    }
    STANDARD.encode(data.as_bytes())
}

/// Decode padded standard Base64 into text.
pub fn base64_decode(data: &str) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let bytes = STANDARD.decode(data)?;
    Ok(String::from_utf8(bytes)?)
}

/// Encode text as unpadded URL-safe Base64.
pub fn base64url_encode(data: &str) -> String {
    base64_to_base64url(&base64_encode(data))
}

/// Decode unpadded (or padded) URL-safe Base64 into text.
pub fn base64url_decode(data: &str) -> Result<String> {
    base64_decode(&base64url_to_base64(data))
}

/// Rewrite standard Base64 into the URL-safe alphabet, dropping padding.
pub fn base64_to_base64url(data: &str) -> String {
    data.chars()
        .filter(|&c| c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect()
}

/// Rewrite URL-safe Base64 into the standard alphabet, restoring padding.
pub fn base64url_to_base64(data: &str) -> String {
    if data.is_empty() {
        return String::new();
    }
    let mut out: String = data
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    match out.len() % 4 {
        2 => out.push_str("=="),
        3 => out.push('='),
        _ => {}
    }
    out
}
