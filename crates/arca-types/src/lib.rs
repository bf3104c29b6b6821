//! Foundation types for Arca.
//!
//! Every other Arca crate depends on `arca-types`. It defines the values that
//! flow between the digest provider, the object model, the metadata index and
//! the storage backends.
//!
//! # Key Types
//!
//! - [`DigestAlgorithm`] -- Tag naming a digest algorithm
//! - [`ContentId`] -- Algorithm tag plus raw digest bytes
//! - [`ObjectType`] -- The closed set of object variants
//! - [`Link`] -- A named, typed edge into the object graph

pub mod duration;
pub mod error;
pub mod id;
pub mod link;

pub use duration::duration_ms;
pub use error::TypeError;
pub use id::{ContentId, DigestAlgorithm};
pub use link::{Link, ObjectType};
