use std::io::Read;

use arca_types::{ContentId, DigestAlgorithm};
use sha2::Digest as _;

use crate::error::{DigestError, DigestResult};

/// Read buffer used when digesting streams.
const STREAM_BUF_SIZE: usize = 64 * 1024;

/// Typed digest computation over bytes or streams.
///
/// Implementations are stateless; a single instance is shared by every
/// component that needs the algorithm.
pub trait Digester: Send + Sync {
    /// The algorithm this digester implements.
    fn algorithm(&self) -> DigestAlgorithm;

    /// Digest an in-memory buffer.
    fn digest(&self, data: &[u8]) -> ContentId;

    /// Digest everything readable from `reader`.
    fn digest_reader(&self, reader: &mut dyn Read) -> DigestResult<ContentId>;

    /// Verify that `data` digests to `expected`.
    fn verify(&self, expected: &ContentId, data: &[u8]) -> DigestResult<()> {
        check_algorithm(self.algorithm(), expected)?;
        let computed = self.digest(data);
        compare(expected, computed)
    }

    /// Verify that the contents of `reader` digest to `expected`.
    fn verify_reader(&self, expected: &ContentId, reader: &mut dyn Read) -> DigestResult<()> {
        check_algorithm(self.algorithm(), expected)?;
        let computed = self.digest_reader(reader)?;
        compare(expected, computed)
    }
}

fn check_algorithm(digester: DigestAlgorithm, expected: &ContentId) -> DigestResult<()> {
    if expected.algorithm() != digester {
        return Err(DigestError::AlgorithmMismatch {
            expected: expected.clone(),
            digester,
        });
    }
    Ok(())
}

fn compare(expected: &ContentId, computed: ContentId) -> DigestResult<()> {
    if *expected != computed {
        return Err(DigestError::IntegrityViolation {
            expected: expected.clone(),
            computed,
        });
    }
    Ok(())
}

/// Feed a reader through `update` in fixed-size chunks.
fn pump(reader: &mut dyn Read, mut update: impl FnMut(&[u8])) -> std::io::Result<()> {
    let mut buf = vec![0u8; STREAM_BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        update(&buf[..n]);
    }
}

fn wrap(algorithm: DigestAlgorithm, bytes: &[u8]) -> ContentId {
    // Digest lengths are fixed per algorithm, so this cannot fail.
    match ContentId::new(algorithm, bytes.to_vec()) {
        Ok(id) => id,
        Err(e) => unreachable!("{algorithm} produced a malformed digest: {e}"),
    }
}

/// BLAKE3 (32-byte output).
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Digester;

impl Digester for Blake3Digester {
    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Blake3
    }

    fn digest(&self, data: &[u8]) -> ContentId {
        wrap(self.algorithm(), blake3::hash(data).as_bytes())
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> DigestResult<ContentId> {
        let mut hasher = blake3::Hasher::new();
        pump(reader, |chunk| {
            hasher.update(chunk);
        })?;
        Ok(wrap(self.algorithm(), hasher.finalize().as_bytes()))
    }
}

/// SHA-256 (32-byte output).
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Digester;

impl Digester for Sha256Digester {
    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sha256
    }

    fn digest(&self, data: &[u8]) -> ContentId {
        wrap(self.algorithm(), &sha2::Sha256::digest(data))
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> DigestResult<ContentId> {
        let mut hasher = sha2::Sha256::new();
        pump(reader, |chunk| hasher.update(chunk))?;
        Ok(wrap(self.algorithm(), &hasher.finalize()))
    }
}

/// SHA-512 (64-byte output).
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Digester;

impl Digester for Sha512Digester {
    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sha512
    }

    fn digest(&self, data: &[u8]) -> ContentId {
        wrap(self.algorithm(), &sha2::Sha512::digest(data))
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> DigestResult<ContentId> {
        let mut hasher = sha2::Sha512::new();
        pump(reader, |chunk| hasher.update(chunk))?;
        Ok(wrap(self.algorithm(), &hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<Box<dyn Digester>> {
        vec![
            Box::new(Blake3Digester),
            Box::new(Sha256Digester),
            Box::new(Sha512Digester),
        ]
    }

    #[test]
    fn digest_is_deterministic() {
        for d in all() {
            assert_eq!(d.digest(b"hello world"), d.digest(b"hello world"));
            assert_ne!(d.digest(b"hello"), d.digest(b"world"));
        }
    }

    #[test]
    fn digest_lengths_match_algorithm() {
        for d in all() {
            let id = d.digest(b"x");
            assert_eq!(id.algorithm(), d.algorithm());
            assert_eq!(id.digest().len(), d.algorithm().digest_len());
        }
    }

    #[test]
    fn stream_digest_matches_buffer_digest() {
        // Larger than one read buffer so the stream path loops.
        let data: Vec<u8> = (0..(STREAM_BUF_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        for d in all() {
            let streamed = d.digest_reader(&mut data.as_slice()).unwrap();
            assert_eq!(streamed, d.digest(&data));
        }
    }

    #[test]
    fn known_sha256_vector() {
        let id = Sha256Digester.digest(b"abc");
        assert_eq!(
            id.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_accepts_matching_data() {
        for d in all() {
            let id = d.digest(b"test data");
            d.verify(&id, b"test data").unwrap();
            d.verify_reader(&id, &mut &b"test data"[..]).unwrap();
        }
    }

    #[test]
    fn verify_rejects_tampered_data() {
        let id = Blake3Digester.digest(b"original");
        let err = Blake3Digester.verify(&id, b"tampered").unwrap_err();
        assert!(matches!(err, DigestError::IntegrityViolation { .. }));
    }

    #[test]
    fn verify_rejects_foreign_algorithm() {
        let id = Sha256Digester.digest(b"data");
        let err = Blake3Digester.verify(&id, b"data").unwrap_err();
        assert!(matches!(
            err,
            DigestError::AlgorithmMismatch { digester: DigestAlgorithm::Blake3, .. }
        ));
    }
}
