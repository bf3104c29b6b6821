//! Digest provider for Arca.
//!
//! Every object carries two independent digests: the **primary** digest is
//! its address, the **secondary** digest is stored beside it in the metadata
//! index and only serves to detect accidental primary collisions. Neither is
//! a defence against adversarial input.
//!
//! Algorithms are resolved from their configuration tags once, at startup,
//! through [`digester_for`]; an unknown tag fails there rather than on first
//! use.

pub mod digester;
pub mod error;
pub mod registry;

pub use digester::{Blake3Digester, Digester, Sha256Digester, Sha512Digester};
pub use error::{DigestError, DigestResult};
pub use registry::{digester_for, digester_for_algorithm, DigestPair};
