//! Metadata index for Arca.
//!
//! The index maps each object's primary id to its secondary id, object type
//! and optional media type. It is the source of truth for "does this object
//! exist" during write validation, and its atomic conditional insert is what
//! makes a writer the writer of record for a primary id.
//!
//! # Modules
//!
//! - [`error`] -- Error types for index operations
//! - [`traits`] -- The [`MetadataIndex`] trait and [`MetadataEntry`]
//! - [`memory`] -- In-memory [`InMemoryMetadataIndex`]
//! - [`journal`] -- File-backed [`JournalMetadataIndex`]

pub mod error;
pub mod journal;
pub mod memory;
pub mod traits;

pub use error::{IndexError, Result};
pub use journal::JournalMetadataIndex;
pub use memory::InMemoryMetadataIndex;
pub use traits::{MetadataEntry, MetadataIndex};
