//! basE91 encoding with an optional shell-safe escape of `"`, `$` and `` ` ``.
//!
//! The escape sequences use `-`, which is not part of the alphabet.

use crate::error::{Error, Result};

const ALPHABET: &[u8; 91] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&()*+,./:;<=>?@[]^_`{|}~\"";

const ESCAPES: [(char, char); 3] = [('"', 'q'), ('$', 'd'), ('`', 'g')];

fn decode_table() -> [u8; 256] {
    let mut table = [0xff; 256];
    for (i, &c) in ALPHABET.iter().enumerate() {
        table[c as usize] = i as u8;
    }
    table
}

fn encode_bytes(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(data.len() * 123 / 100 + 2);
    let mut bits: u32 = 0;
    let mut n: u32 = 0;

    for &byte in data {
        bits |= (byte as u32) << n;
        n += 8;
        if n > 13 {
            let mut v = bits & 8191;
            if v > 88 {
                bits >>= 13;
                n -= 13;
            } else {
                v = bits & 16383;
                bits >>= 14;
                n -= 14;
            }
            out.push(ALPHABET[(v % 91) as usize]);
            out.push(ALPHABET[(v / 91) as usize]);
        }
    }

    if n > 0 {
        out.push(ALPHABET[(bits % 91) as usize]);
        if n > 7 || bits > 90 {
            out.push(ALPHABET[(bits / 91) as usize]);
        }
    }

    // alphabet is pure ASCII
    out.into_iter().map(char::from).collect()
}

fn decode_bytes(data: &str) -> Result<Vec<u8>> {
    let table = decode_table();
    let mut out = Vec::with_capacity(data.len() * 14 / 16 + 1);
    let mut bits: u32 = 0;
    let mut n: u32 = 0;
    let mut pending: Option<u32> = None;

    for (pos, &c) in data.as_bytes().iter().enumerate() {
        let d = table[c as usize];
        if d == 0xff {
            return Err(Error::Decode(format!(
                "illegal base91 data at input byte {pos}"
            )));
        }
        match pending.take() {
            None => pending = Some(d as u32),
            Some(first) => {
                let v = first + d as u32 * 91;
                bits |= v << n;
                n += if (v & 8191) > 88 { 13 } else { 14 };
                loop {
                    out.push((bits & 0xff) as u8);
                    bits >>= 8;
                    n -= 8;
                    if n <= 7 {
                        break;
                    }
                }
            }
        }
    }

    if let Some(v) = pending {
        out.push(((bits | v << n) & 0xff) as u8);
    }

    Ok(out)
}

fn escape(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len() + 8);
    for c in encoded.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, code)) => {
                out.push('-');
                out.push(*code);
            }
            None => out.push(c),
        }
    }
    out
}

fn unescape(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            let raw = chars
                .peek()
                .and_then(|next| ESCAPES.iter().find(|(_, code)| code == next))
                .map(|(raw, _)| *raw);
            if let Some(raw) = raw {
                chars.next();
                out.push(raw);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Encode text as basE91, optionally escaping shell-sensitive characters.
pub fn base91_encode(data: &str, escape_chars: bool) -> String {
    if data.is_empty() {
        return String::new();
    }
    let encoded = encode_bytes(data.as_bytes());
    if escape_chars {
        escape(&encoded)
    } else {
        encoded
    }
}

/// Decode basE91 text, optionally reversing the shell-safe escape first.
pub fn base91_decode(data: &str, unescape_chars: bool) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let bytes = if unescape_chars {
        decode_bytes(&unescape(data))?
    } else {
        decode_bytes(data)?
    };
    Ok(String::from_utf8(bytes)?)
}
