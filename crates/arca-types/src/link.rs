use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::ContentId;

/// The closed set of object variants stored by Arca.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    /// Opaque byte payload (leaf).
    Blob,
    /// Ordered chain of blob/list links (chunked content).
    List,
    /// Ordered, named hierarchy of blob/list/tree links.
    Tree,
    /// Versioned snapshot record.
    Commit,
}

impl ObjectType {
    /// Stable one-byte tag used as the first byte of every serialized object.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Blob => 0x01,
            Self::List => 0x02,
            Self::Tree => 0x03,
            Self::Commit => 0x04,
        }
    }

    /// Parse from a serialized tag byte.
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        match tag {
            0x01 => Ok(Self::Blob),
            0x02 => Ok(Self::List),
            0x03 => Ok(Self::Tree),
            0x04 => Ok(Self::Commit),
            other => Err(TypeError::UnknownObjectType(other)),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::List => write!(f, "list"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A named, typed reference into the object graph.
///
/// Links are plain values: building, cloning or renaming one never touches
/// storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Caller-chosen name (file name, chunk label, role).
    pub name: String,
    /// Content id of the referenced object.
    pub id: ContentId,
    /// Type of the referenced object.
    pub object_type: ObjectType,
}

impl Link {
    pub fn new(name: impl Into<String>, id: ContentId, object_type: ObjectType) -> Self {
        Self {
            name: name.into(),
            id,
            object_type,
        }
    }

    /// The "no parent" sentinel used by root commits.
    pub fn empty_commit() -> Self {
        Self {
            name: String::new(),
            id: ContentId::null(),
            object_type: ObjectType::Commit,
        }
    }

    /// Returns `true` if this is the empty commit sentinel.
    pub fn is_empty_commit(&self) -> bool {
        self.object_type == ObjectType::Commit && self.id.is_null()
    }

    /// A copy of this link under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.object_type, self.id, self.name)
    }
}
