use std::fmt::Display;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// A valid URL and filename safe base64 encoding of binary data.
///
/// Padding is never emitted, so the text only ever contains `A-Za-z0-9-_`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Base64(Vec<u8>);

impl Base64 {
    /// Accepts already encoded text, if every character is in the alphabet
    /// and the length is one a padless encoding can have.
    pub fn parse(s: &str) -> Option<Base64> {
        if s.len() % 4 == 1 || !s.bytes().all(|b| sextet(b).is_some()) {
            return None;
        }
        Some(Base64(s.as_bytes().to_vec()))
    }

    pub fn as_str(&self) -> &str {
        // Only ever holds bytes from ALPHABET.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

fn sextet(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'Z' => Some(c - b'A'),
        b'a'..=b'z' => Some(c - b'a' + 26),
        b'0'..=b'9' => Some(c - b'0' + 52),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}

impl Display for Base64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'a> From<&'a [u8]> for Base64 {
    fn from(bytes: &[u8]) -> Self {
        let mut out = Vec::with_capacity((bytes.len() * 4 + 2) / 3);
        for chunk in bytes.chunks(3) {
            let b0 = chunk[0];
            let b1 = chunk.get(1).copied().unwrap_or(0);
            let b2 = chunk.get(2).copied().unwrap_or(0);
            out.push(ALPHABET[(b0 >> 2) as usize]);
            out.push(ALPHABET[(((b0 & 0b11) << 4) | (b1 >> 4)) as usize]);
            if chunk.len() > 1 {
                out.push(ALPHABET[(((b1 & 0b1111) << 2) | (b2 >> 6)) as usize]);
            }
            if chunk.len() > 2 {
                out.push(ALPHABET[(b2 & 0b111111) as usize]);
            }
        }
        Base64(out)
    }
}

impl From<Base64> for Vec<u8> {
    fn from(value: Base64) -> Self {
        let mut v = Vec::with_capacity(value.0.len() * 3 / 4);
        let mut acc: u32 = 0;
        let mut bits = 0;
        for &c in &value.0 {
            // Base64 values are validated on construction.
            let s = sextet(c).unwrap_or(0);
            acc = (acc << 6) | s as u32;
            bits += 6;
            if bits >= 8 {
                bits -= 8;
                v.push((acc >> bits) as u8);
                acc &= (1 << bits) - 1;
            }
        }
        v
    }
}

#[test]
fn test_base64_round_trip() {
    let examples: [&[u8]; 6] = [b"", b"h", b"he", b"hel", b"hello, world", &[0xfb, 0xff, 0xfe]];
    for example in examples {
        let encoded = Base64::from(example);
        let bytes: Vec<u8> = encoded.into();
        assert_eq!(example, &bytes[..]);
    }
}

#[test]
fn test_base64_url_safe_alphabet() {
    // Standard base64 would render these as "+/+/".
    let encoded = Base64::from(&[0xfb, 0xff, 0xbf][..]);
    assert_eq!(encoded.to_string(), "-_-_");
    assert_eq!(Base64::from(&b"hello"[..]).to_string(), "aGVsbG8");
}
