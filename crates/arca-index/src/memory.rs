//! In-memory metadata index for tests and single-process use.

use std::collections::HashMap;
use std::sync::RwLock;

use arca_types::{ContentId, ObjectType};

use crate::error::{IndexError, Result};
use crate::traits::{MetadataEntry, MetadataIndex};

/// An in-memory implementation of [`MetadataIndex`].
///
/// All entries live in a `HashMap` behind a `RwLock`; the write lock makes
/// `conditional_insert` atomic. Data is lost when the index is dropped.
#[derive(Debug, Default)]
pub struct InMemoryMetadataIndex {
    entries: RwLock<HashMap<ContentId, MetadataEntry>>,
}

impl InMemoryMetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }
}

impl MetadataIndex for InMemoryMetadataIndex {
    fn find_by_primary(&self, primary: &ContentId) -> Result<Option<MetadataEntry>> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.get(primary).cloned())
    }

    fn conditional_insert(
        &self,
        primary: &ContentId,
        secondary: &ContentId,
        object_type: ObjectType,
    ) -> Result<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        if entries.contains_key(primary) {
            return Ok(false);
        }
        entries.insert(
            primary.clone(),
            MetadataEntry::new(secondary.clone(), object_type),
        );
        Ok(true)
    }

    fn delete(&self, primary: &ContentId) -> Result<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        Ok(entries.remove(primary).is_some())
    }

    fn update_media_type(&self, primary: &ContentId, media_type: Option<String>) -> Result<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        let entry = entries
            .get_mut(primary)
            .ok_or_else(|| IndexError::NotFound(primary.clone()))?;
        entry.media_type = media_type;
        Ok(())
    }
}
