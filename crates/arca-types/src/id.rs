use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Digest algorithms an Arca deployment can address content with.
///
/// The tag is part of every [`ContentId`], so ids produced by different
/// algorithms never compare equal even if their bytes happen to match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Blake3,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// All supported algorithms.
    pub const ALL: [Self; 3] = [Self::Blake3, Self::Sha256, Self::Sha512];

    /// Canonical lowercase tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length in bytes of a digest produced by this algorithm.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Blake3 | Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == tag)
            .ok_or(TypeError::UnknownAlgorithm(s.to_string()))
    }
}

/// Content-addressed identifier for a stored object.
///
/// A `ContentId` is the digest of an object's serialized bytes together with
/// the tag of the algorithm that produced it. Identical content always maps
/// to the same id. The string form is `<algorithm>:<lowercase hex>`.
///
/// The null id (empty digest) never addresses real content; it backs the
/// "no parent" sentinel of commit links.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId {
    algorithm: DigestAlgorithm,
    digest: Vec<u8>,
}

impl ContentId {
    /// Wrap raw digest bytes, checking the length against the algorithm.
    pub fn new(algorithm: DigestAlgorithm, digest: Vec<u8>) -> Result<Self, TypeError> {
        if digest.len() != algorithm.digest_len() {
            return Err(TypeError::InvalidLength {
                algorithm: algorithm.to_string(),
                expected: algorithm.digest_len(),
                actual: digest.len(),
            });
        }
        Ok(Self { algorithm, digest })
    }

    /// The null content id. Represents "no object".
    pub fn null() -> Self {
        Self {
            algorithm: DigestAlgorithm::Blake3,
            digest: Vec::new(),
        }
    }

    /// Returns `true` if this is the null content id.
    pub fn is_null(&self) -> bool {
        self.digest.is_empty()
    }

    /// The algorithm that produced this id.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Hex-encoded digest (without the algorithm prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..self.digest.len().min(4)])
    }

    /// Parse a hex digest for a known algorithm.
    pub fn from_hex(algorithm: DigestAlgorithm, s: &str) -> Result<Self, TypeError> {
        let digest = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::new(algorithm, digest)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("ContentId(null)");
        }
        write!(f, "ContentId({}:{})", self.algorithm, self.short_hex())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, hex) = s
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedId(s.to_string()))?;
        let algorithm = tag.parse::<DigestAlgorithm>()?;
        Self::from_hex(algorithm, hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(alg: DigestAlgorithm, byte: u8) -> ContentId {
        ContentId::new(alg, vec![byte; alg.digest_len()]).unwrap()
    }

    #[test]
    fn algorithm_tags_parse_case_insensitively() {
        assert_eq!("BLAKE3".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Blake3);
        assert_eq!(" sha256 ".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("sha512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = "md5".parse::<DigestAlgorithm>().unwrap_err();
        assert_eq!(err, TypeError::UnknownAlgorithm("md5".into()));
    }

    #[test]
    fn wrong_digest_length_is_rejected() {
        let err = ContentId::new(DigestAlgorithm::Sha512, vec![0; 32]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { expected: 64, actual: 32, .. }));
    }

    #[test]
    fn display_carries_algorithm_prefix() {
        let id = sample(DigestAlgorithm::Sha256, 0xab);
        let text = id.to_string();
        assert!(text.starts_with("sha256:"));
        assert_eq!(text.len(), "sha256:".len() + 64);
    }

    #[test]
    fn same_bytes_different_algorithm_are_distinct() {
        let a = sample(DigestAlgorithm::Blake3, 7);
        let b = sample(DigestAlgorithm::Sha256, 7);
        assert_ne!(a, b);
    }

    #[test]
    fn null_id() {
        let null = ContentId::null();
        assert!(null.is_null());
        assert!(!sample(DigestAlgorithm::Blake3, 1).is_null());
        assert_eq!(format!("{null:?}"), "ContentId(null)");
    }

    #[test]
    fn malformed_string_is_rejected() {
        assert!(matches!(
            "deadbeef".parse::<ContentId>(),
            Err(TypeError::MalformedId(_))
        ));
        assert!(matches!(
            "blake3:zz".parse::<ContentId>(),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn ordering_is_algorithm_then_bytes() {
        let a = sample(DigestAlgorithm::Blake3, 9);
        let b = sample(DigestAlgorithm::Sha256, 0);
        assert!(a < b);
        assert!(sample(DigestAlgorithm::Blake3, 1) < sample(DigestAlgorithm::Blake3, 2));
    }

    #[test]
    fn serde_json_roundtrip() {
        let id = sample(DigestAlgorithm::Sha512, 3);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    proptest! {
        #[test]
        fn string_form_parses_back(bytes in proptest::collection::vec(any::<u8>(), 32)) {
            let id = ContentId::new(DigestAlgorithm::Blake3, bytes).unwrap();
            let parsed: ContentId = id.to_string().parse().unwrap();
            prop_assert_eq!(id, parsed);
        }
    }
}
