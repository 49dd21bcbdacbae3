//! Formes textuelles des littéraux ; chaque forme se relexe vers les mêmes octets.

use std::fmt::Write as _;

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut bytes = text.bytes();
    bytes.next().is_some_and(|b| b == b'_' || b.is_ascii_alphabetic())
        && bytes.all(|b| b == b'_' || b.is_ascii_alphanumeric())
}

/// Vrai si `text` tient entre `%"` et `"`.
pub(crate) fn is_quotable(text: &str) -> bool { !text.chars().any(|c| c == '"' || c.is_control()) }

pub(crate) fn checksum_literal(crc: u32) -> String { format!("%(0x{crc:08x})") }

/// Plus courte décimale qui relit le même `f32`, partie fractionnaire obligatoire.
pub(crate) fn float(v: f32) -> String {
    let mut s = v.to_string();
    if v.is_finite() && !s.contains('.') {
        s.push_str(".0");
    }
    s
}

/// Corps d'une chaîne, sans les guillemets.
pub(crate) fn escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\x07' => out.push_str("\\a"),
                '\x08' => out.push_str("\\b"),
                '\x0C' => out.push_str("\\f"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\x0B' => out.push_str("\\v"),
                c if c.is_ascii_control() => {
                    let _ = write!(out, "\\{:03o}", c as u32);
                }
                c => out.push(c),
            }
        }
        for b in chunk.invalid() {
            let _ = write!(out, "\\{b:03o}");
        }
    }
    out
}
