//! File-backed metadata index.
//!
//! Every mutation is appended to a journal of JSON lines and applied to an
//! in-memory map. On open the journal is replayed front-to-back; a torn final
//! line from a crash is skipped with a warning.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use arca_types::{ContentId, ObjectType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{IndexError, Result};
use crate::memory::InMemoryMetadataIndex;
use crate::traits::{MetadataEntry, MetadataIndex};

/// One journal line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Record {
    Insert {
        primary: ContentId,
        secondary: ContentId,
        object_type: ObjectType,
    },
    MediaType {
        primary: ContentId,
        media_type: Option<String>,
    },
    Delete {
        primary: ContentId,
    },
}

/// A [`MetadataIndex`] persisted as an append-only journal.
///
/// The journal writer mutex also serializes mutations, so a record is on
/// disk before any reader can observe its effect.
pub struct JournalMetadataIndex {
    path: PathBuf,
    state: InMemoryMetadataIndex,
    writer: Mutex<BufWriter<File>>,
}

impl JournalMetadataIndex {
    /// Open (or create) the journal at `path` and replay it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let state = InMemoryMetadataIndex::new();
        let mut replayed = 0usize;
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (number, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Record>(&line) {
                    Ok(record) => {
                        apply(&state, record)?;
                        replayed += 1;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), line = number + 1, error = %e, "skipping unreadable journal record");
                    }
                }
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        // Terminate a torn tail so the next record starts on its own line.
        let raw = fs::read(&path)?;
        if raw.last().is_some_and(|b| *b != b'\n') {
            file.write_all(b"\n")?;
        }
        info!(path = %path.display(), records = replayed, entries = state.len(), "metadata journal opened");
        Ok(Self {
            path,
            state,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    fn append(writer: &mut BufWriter<File>, record: &Record) -> Result<()> {
        let mut line =
            serde_json::to_vec(record).map_err(|e| IndexError::Serialization(e.to_string()))?;
        line.push(b'\n');
        writer.write_all(&line)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }
}

fn apply(state: &InMemoryMetadataIndex, record: Record) -> Result<()> {
    match record {
        Record::Insert {
            primary,
            secondary,
            object_type,
        } => {
            state.conditional_insert(&primary, &secondary, object_type)?;
        }
        Record::MediaType {
            primary,
            media_type,
        } => {
            // A later delete may have removed the entry already.
            if state.exists(&primary)? {
                state.update_media_type(&primary, media_type)?;
            }
        }
        Record::Delete { primary } => {
            state.delete(&primary)?;
        }
    }
    Ok(())
}

impl MetadataIndex for JournalMetadataIndex {
    fn find_by_primary(&self, primary: &ContentId) -> Result<Option<MetadataEntry>> {
        self.state.find_by_primary(primary)
    }

    fn conditional_insert(
        &self,
        primary: &ContentId,
        secondary: &ContentId,
        object_type: ObjectType,
    ) -> Result<bool> {
        let mut writer = self.writer.lock().expect("journal lock poisoned");
        if self.state.exists(primary)? {
            return Ok(false);
        }
        Self::append(
            &mut writer,
            &Record::Insert {
                primary: primary.clone(),
                secondary: secondary.clone(),
                object_type,
            },
        )?;
        let inserted = self.state.conditional_insert(primary, secondary, object_type)?;
        debug!(id = %primary, kind = %object_type, "metadata entry recorded");
        Ok(inserted)
    }

    fn delete(&self, primary: &ContentId) -> Result<bool> {
        let mut writer = self.writer.lock().expect("journal lock poisoned");
        if !self.state.exists(primary)? {
            return Ok(false);
        }
        Self::append(
            &mut writer,
            &Record::Delete {
                primary: primary.clone(),
            },
        )?;
        self.state.delete(primary)
    }

    fn update_media_type(&self, primary: &ContentId, media_type: Option<String>) -> Result<()> {
        let mut writer = self.writer.lock().expect("journal lock poisoned");
        if !self.state.exists(primary)? {
            return Err(IndexError::NotFound(primary.clone()));
        }
        Self::append(
            &mut writer,
            &Record::MediaType {
                primary: primary.clone(),
                media_type: media_type.clone(),
            },
        )?;
        self.state.update_media_type(primary, media_type)
    }
}

impl std::fmt::Debug for JournalMetadataIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalMetadataIndex")
            .field("path", &self.path)
            .field("entries", &self.state.len())
            .finish()
    }
}
