//! Percent encoding for resource name elements.
//!
//! Only the RFC 3986 `pchar` set is emitted literally: unreserved
//! characters, sub-delims, `:` and `@`. Everything else, `/` included,
//! becomes `%XX` with upper-case hex digits over the UTF-8 bytes.

use crate::error::{ResourceError, ResourceResult};

/// The RFC 3986 `pchar` set: bytes left unescaped inside a path element.
fn is_pchar(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+'
                | b',' | b';' | b'=' | b':' | b'@'
        )
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encode a decoded element.
///
/// When `fold_case` is set, ASCII letters are lower-cased; this yields the
/// canonical form used for comparison and display.
pub fn url_encode(element: &str, fold_case: bool) -> String {
    let mut out = String::with_capacity(element.len());
    for &b in element.as_bytes() {
        if is_pchar(b) {
            out.push(if fold_case { b.to_ascii_lowercase() } else { b } as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
    }
    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes, passing every other character through unchanged.
///
/// Consecutive escapes are gathered into one byte run so multi-byte UTF-8
/// sequences decode correctly. Fails on truncated or non-hex escapes, and on
/// byte runs that are not valid UTF-8.
pub fn url_decode(s: &str) -> ResourceResult<String> {
    if !s.contains('%') {
        return Ok(s.to_string());
    }

    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        if i + 2 >= bytes.len() {
            return Err(ResourceError::MalformedName(format!(
                "incomplete percent escape at offset {} in '{}'",
                i, s
            )));
        }
        let (hi, lo) = match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
            (Some(hi), Some(lo)) => (hi, lo),
            _ => {
                return Err(ResourceError::MalformedName(format!(
                    "invalid percent escape at offset {} in '{}'",
                    i, s
                )))
            }
        };
        out.push((hi << 4) | lo);
        i += 3;
    }

    String::from_utf8(out).map_err(|_| {
        ResourceError::MalformedName(format!("percent escapes in '{}' are not valid UTF-8", s))
    })
}
