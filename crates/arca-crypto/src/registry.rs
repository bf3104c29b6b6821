use std::sync::Arc;

use arca_types::DigestAlgorithm;
use tracing::debug;

use crate::digester::{Blake3Digester, Digester, Sha256Digester, Sha512Digester};
use crate::error::{DigestError, DigestResult};

/// Resolve a configuration tag (e.g. `"blake3"`, `"sha256"`) to a digester.
///
/// Called at configuration time so that an unsupported tag fails fast with
/// [`DigestError::Unimplemented`].
pub fn digester_for(tag: &str) -> DigestResult<Arc<dyn Digester>> {
    let algorithm = tag
        .parse::<DigestAlgorithm>()
        .map_err(|_| DigestError::Unimplemented(tag.to_string()))?;
    Ok(digester_for_algorithm(algorithm))
}

/// Digester for an already-parsed algorithm tag.
pub fn digester_for_algorithm(algorithm: DigestAlgorithm) -> Arc<dyn Digester> {
    match algorithm {
        DigestAlgorithm::Blake3 => Arc::new(Blake3Digester),
        DigestAlgorithm::Sha256 => Arc::new(Sha256Digester),
        DigestAlgorithm::Sha512 => Arc::new(Sha512Digester),
    }
}

/// The two digests computed for every object.
#[derive(Clone)]
pub struct DigestPair {
    primary: Arc<dyn Digester>,
    secondary: Arc<dyn Digester>,
}

impl DigestPair {
    /// Pair two digesters. They must use different algorithms.
    pub fn new(primary: Arc<dyn Digester>, secondary: Arc<dyn Digester>) -> DigestResult<Self> {
        if primary.algorithm() == secondary.algorithm() {
            return Err(DigestError::SameAlgorithm(primary.algorithm()));
        }
        Ok(Self { primary, secondary })
    }

    /// Resolve both digesters from configuration tags.
    pub fn from_tags(primary: &str, secondary: &str) -> DigestResult<Self> {
        let pair = Self::new(digester_for(primary)?, digester_for(secondary)?)?;
        debug!(
            primary = %pair.primary.algorithm(),
            secondary = %pair.secondary.algorithm(),
            "digest pair resolved"
        );
        Ok(pair)
    }

    /// The addressing digester.
    pub fn primary(&self) -> &Arc<dyn Digester> {
        &self.primary
    }

    /// The collision-detection digester.
    pub fn secondary(&self) -> &Arc<dyn Digester> {
        &self.secondary
    }
}

impl Default for DigestPair {
    /// BLAKE3 addressing with SHA-256 collision detection.
    fn default() -> Self {
        Self {
            primary: Arc::new(Blake3Digester),
            secondary: Arc::new(Sha256Digester),
        }
    }
}

impl std::fmt::Debug for DigestPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestPair")
            .field("primary", &self.primary.algorithm())
            .field("secondary", &self.secondary.algorithm())
            .finish()
    }
}
