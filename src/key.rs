//! Composite keys: `(index name, ordered parts)` mapped onto the flat ledger keyspace.
//!
//! Layout: `NAMESPACE` then the index name and every part, each escaped and
//! followed by `SEPARATOR`. Escaping guarantees `SEPARATOR` never appears
//! inside a segment, so segment boundaries are unambiguous and a key built
//! from leading parts is a byte prefix of every key that extends it.
use std::fmt;

use crate::error::{Error, Result};

const NAMESPACE: u8 = 0x00;
const SEPARATOR: u8 = 0x00;
const ESCAPE: u8 = 0x01;
// escaped forms of SEPARATOR and ESCAPE
const ESCAPED_SEPARATOR: u8 = 0x01;
const ESCAPED_ESCAPE: u8 = 0x02;

/// An encoded composite key or a composite key prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(Vec<u8>);

/// The decoded form of a [`CompositeKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    pub index: String,
    pub parts: Vec<String>,
}

/// Builds the key for `index` and its full ordered `parts`.
pub fn build<S: AsRef<str>>(index: &str, parts: &[S]) -> Result<CompositeKey> {
    if index.is_empty() {
        return Err(Error::KeyFormat {
            key: String::new(),
            reason: "index name must be not empty".into(),
        });
    }

    let mut out = Vec::with_capacity(2 + index.len() + parts.len() * 40);
    out.push(NAMESPACE);
    push_segment(&mut out, index);
    for part in parts {
        push_segment(&mut out, part.as_ref());
    }

    Ok(CompositeKey(out))
}

/// Builds the scan prefix covering every key of `index` whose leading parts
/// equal `partial`.
pub fn prefix<S: AsRef<str>>(index: &str, partial: &[S]) -> Result<CompositeKey> {
    // terminated segments make a partial key a strict prefix, so "ab" never matches "abc"
    build(index, partial)
}

/// Exact left inverse of [`build`].
pub fn parse(key: &[u8]) -> Result<KeyParts> {
    let malformed = |reason: &str| Error::KeyFormat {
        key: hex::encode(key),
        reason: reason.to_string(),
    };

    let Some((&first, mut rest)) = key.split_first() else {
        return Err(malformed("empty key"));
    };
    if first != NAMESPACE {
        return Err(malformed("missing composite key namespace"));
    }

    let mut segments = Vec::new();
    while !rest.is_empty() {
        let mut segment = Vec::new();
        let mut terminated = false;
        let mut i = 0;
        while i < rest.len() {
            match rest[i] {
                SEPARATOR => {
                    terminated = true;
                    i += 1;
                    break;
                }
                ESCAPE => {
                    match rest.get(i + 1) {
                        Some(&ESCAPED_SEPARATOR) => segment.push(SEPARATOR),
                        Some(&ESCAPED_ESCAPE) => segment.push(ESCAPE),
                        _ => return Err(malformed("invalid escape sequence")),
                    }
                    i += 2;
                }
                byte => {
                    segment.push(byte);
                    i += 1;
                }
            }
        }
        if !terminated {
            return Err(malformed("unterminated segment"));
        }
        rest = &rest[i..];

        let segment =
            String::from_utf8(segment).map_err(|_| malformed("segment is not valid UTF-8"))?;
        segments.push(segment);
    }

    let mut segments = segments.into_iter();
    let index = segments
        .next()
        .filter(|index| !index.is_empty())
        .ok_or_else(|| malformed("missing index name"))?;

    Ok(KeyParts {
        index,
        parts: segments.collect(),
    })
}

fn push_segment(out: &mut Vec<u8>, segment: &str) {
    for &byte in segment.as_bytes() {
        match byte {
            SEPARATOR => out.extend_from_slice(&[ESCAPE, ESCAPED_SEPARATOR]),
            ESCAPE => out.extend_from_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            _ => out.push(byte),
        }
    }
    out.push(SEPARATOR);
}

impl CompositeKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
    pub fn starts_with(&self, prefix: &CompositeKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
    pub fn parse(&self) -> Result<KeyParts> {
        parse(&self.0)
    }
}

impl AsRef<[u8]> for CompositeKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Renders `index/part/...` for messages, falling back to hex.
impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parse() {
            Ok(KeyParts { index, parts }) if parts.is_empty() => write!(f, "{index}"),
            Ok(KeyParts { index, parts }) => write!(f, "{index}/{}", parts.join("/")),
            Err(_) => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse() {
        let key = build("Bid", &["3f1e", "x"]).unwrap();
        let parsed = key.parse().unwrap();

        assert_eq!(parsed.index, "Bid");
        assert_eq!(parsed.parts, vec!["3f1e", "x"]);
    }

    #[test]
    fn zero_parts_round_trip() {
        let key = build::<&str>("Config", &[]).unwrap();
        let parsed = key.parse().unwrap();

        assert_eq!(parsed.index, "Config");
        assert!(parsed.parts.is_empty());
    }

    #[test]
    fn separator_inside_parts_is_escaped() {
        let a = build("Bid", &["a\u{0}b"]).unwrap();
        let b = build("Bid", &["a", "b"]).unwrap();
        assert_ne!(a, b);

        assert_eq!(a.parse().unwrap().parts, vec!["a\u{0}b"]);
        assert_eq!(
            build("Bid", &["\u{1}\u{0}"]).unwrap().parse().unwrap().parts,
            vec!["\u{1}\u{0}"]
        );
    }

    #[test]
    fn index_names_do_not_collide() {
        let a = build("Bid", &["x"]).unwrap();
        let b = build("Bidx", &[] as &[&str]).unwrap();
        let c = build("Bi", &["dx"]).unwrap();

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn prefix_matches_extensions_only() {
        let prefix = prefix("Bid", &["ab"]).unwrap();

        assert!(build("Bid", &["ab", "1"]).unwrap().starts_with(&prefix));
        assert!(build("Bid", &["ab"]).unwrap().starts_with(&prefix));
        assert!(!build("Bid", &["abc"]).unwrap().starts_with(&prefix));
        assert!(!build("Invoice", &["ab"]).unwrap().starts_with(&prefix));
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!(parse(b"").is_err());
        assert!(parse(b"Bid\x00").is_err());
        assert!(parse(b"\x00Bid").is_err());
        assert!(parse(b"\x00Bid\x00a\x01\x07\x00").is_err());
        assert!(parse(b"\x00\x00").is_err());
        assert!(parse(b"\x00Bid\x00\xff\x00").is_err());
    }

    #[test]
    fn empty_index_is_rejected() {
        assert!(build("", &["a"]).is_err());
    }

    #[test]
    fn display_is_readable() {
        let key = build("Invoice", &["0190"]).unwrap();
        assert_eq!(key.to_string(), "Invoice/0190");
    }
}
