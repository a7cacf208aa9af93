//! ISO 9075 name encoding for path segments.
//!
//! Characters that may not appear in an XML name are written as `_xHHHH_`.
//! An underscore that would otherwise start such a sequence is escaped as
//! `_x005F_` so decoding is lossless.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENCODED_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"_x([0-9A-Fa-f]{4,6})_").unwrap());

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn starts_escape(rest: &[char]) -> bool {
    rest.len() >= 6
        && rest[0] == 'x'
        && rest[1..5].iter().all(|c| c.is_ascii_hexdigit())
        && rest[5] == '_'
}

/// Encode a local name for use inside a path
pub fn encode(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    for (i, &c) in chars.iter().enumerate() {
        let valid = if i == 0 { is_name_start(c) } else { is_name_char(c) };
        if valid && !(c == '_' && starts_escape(&chars[i + 1..])) {
            out.push(c);
        } else {
            out.push_str(&format!("_x{:04X}_", c as u32));
        }
    }
    out
}

/// Decode an encoded local name
pub fn decode(encoded: &str) -> String {
    if !encoded.contains("_x") {
        return encoded.to_string();
    }
    ENCODED_CHAR
        .replace_all(encoded, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
