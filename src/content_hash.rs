use crate::b64::Base64;
use sha2::{Digest, Sha384};

use std::{fmt::Display, str::FromStr};

/// The digest of a particular piece of binary content.
/// Under the hood, this is a SHA-384 hash.
///
/// It is displayed in URL-safe base64, always 64 characters long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 48]);

impl ContentHash {
    pub const ENCODED_LEN: usize = 64;

    fn finish(hasher: Sha384) -> Self {
        let mut digest = [0u8; 48];
        digest.copy_from_slice(&hasher.finalize());
        ContentHash(digest)
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b: &[u8] = &self.0;
        write!(f, "{}", Base64::from(b))
    }
}

impl FromStr for ContentHash {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::ENCODED_LEN {
            return Err(());
        }
        let bytes: Vec<u8> = Base64::parse(s).ok_or(())?.into();
        let bytes: [u8; 48] = bytes.try_into().map_err(|_| ())?;
        Ok(ContentHash(bytes))
    }
}

impl From<&Vec<u8>> for ContentHash {
    fn from(vec: &Vec<u8>) -> Self {
        ContentHash::from(vec.as_slice())
    }
}

impl From<&[u8]> for ContentHash {
    fn from(bytes: &[u8]) -> Self {
        let mut hasher = Sha384::new();
        hasher.update(bytes);
        ContentHash::finish(hasher)
    }
}

#[test]
fn test_known_digest() {
    // sha384("hello") in url-safe base64.
    let hash = ContentHash::from(&b"hello"[..]);
    assert_eq!(
        hash.to_string(),
        "WeF0h3dEjGnea4ANejO7-5_xtGPkQ1TDVTvNucZm-pASWjx5-QOXvfX2oT3oKGhP"
    );
    assert_eq!(hash.to_string().len(), ContentHash::ENCODED_LEN);
}

#[test]
fn test_deterministic() {
    let a = ContentHash::from(&b"some bytes"[..]);
    let b = ContentHash::from(&b"some bytes".to_vec());
    assert_eq!(a, b);
    assert_ne!(a, ContentHash::from(&b"some bytes!"[..]));
    assert_eq!(a.to_string().parse::<ContentHash>(), Ok(a));
    assert!("not a hash".parse::<ContentHash>().is_err());
}
