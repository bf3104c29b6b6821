//! The [`MetadataIndex`] trait and the record it stores.

use arca_types::{ContentId, ObjectType};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the index knows about one stored object, keyed by primary id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Independent digest of the same bytes, used to detect collisions.
    pub secondary: ContentId,
    pub object_type: ObjectType,
    /// Caller-supplied content type. The only mutable field.
    pub media_type: Option<String>,
}

impl MetadataEntry {
    pub fn new(secondary: ContentId, object_type: ObjectType) -> Self {
        Self {
            secondary,
            object_type,
            media_type: None,
        }
    }
}

/// Storage for metadata entries.
///
/// Implementations must be thread-safe and make [`conditional_insert`]
/// atomic: of any number of racing inserts for one primary id, exactly one
/// returns `true`.
///
/// [`conditional_insert`]: MetadataIndex::conditional_insert
pub trait MetadataIndex: Send + Sync {
    /// Look up the entry for a primary id.
    ///
    /// Returns `Ok(None)` if no entry exists.
    fn find_by_primary(&self, primary: &ContentId) -> Result<Option<MetadataEntry>>;

    /// Insert an entry unless one already exists.
    ///
    /// Returns `Ok(true)` if this call created the entry.
    fn conditional_insert(
        &self,
        primary: &ContentId,
        secondary: &ContentId,
        object_type: ObjectType,
    ) -> Result<bool>;

    /// Remove the entry. Returns `Ok(false)` if there was none.
    fn delete(&self, primary: &ContentId) -> Result<bool>;

    /// Set or clear the media type. Fails with `NotFound` if there is no entry.
    fn update_media_type(&self, primary: &ContentId, media_type: Option<String>) -> Result<()>;

    /// Returns `true` if an entry exists for `primary`.
    fn exists(&self, primary: &ContentId) -> Result<bool> {
        Ok(self.find_by_primary(primary)?.is_some())
    }

    /// Returns `true` if an entry exists for `primary` with this secondary id.
    fn exists_with(&self, primary: &ContentId, secondary: &ContentId) -> Result<bool> {
        Ok(self
            .find_by_primary(primary)?
            .is_some_and(|entry| &entry.secondary == secondary))
    }
}
