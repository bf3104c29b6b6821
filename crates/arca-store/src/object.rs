use arca_types::{Link, ObjectType};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Opaque byte payload. Leaf of the object graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

/// Ordered chain of blob or list links; represents chunked content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub links: Vec<Link>,
}

impl List {
    pub fn new(links: Vec<Link>) -> Self {
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Ordered, named hierarchy of blob, list and tree links.
///
/// Entry order is preserved as given; two trees with the same entries in a
/// different order are different objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<Link>,
}

impl Tree {
    pub fn new(entries: Vec<Link>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&Link> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A versioned snapshot: content plus author, chained to its parent commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Milliseconds since the UNIX epoch.
    pub timestamp: i64,
    pub message: String,
    /// Previous commit, or [`Link::empty_commit`] for a root commit.
    pub parent: Link,
    pub content: Link,
    pub author: Link,
}

impl Commit {
    /// Create a commit stamped with the current wall-clock time.
    pub fn new(message: impl Into<String>, parent: Link, content: Link, author: Link) -> Self {
        Self::at(
            chrono::Utc::now().timestamp_millis(),
            message,
            parent,
            content,
            author,
        )
    }

    /// Create a commit with an explicit timestamp.
    pub fn at(
        timestamp: i64,
        message: impl Into<String>,
        parent: Link,
        content: Link,
        author: Link,
    ) -> Self {
        Self {
            timestamp,
            message: message.into(),
            parent,
            content,
            author,
        }
    }

    /// Returns `true` if this commit has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_empty_commit()
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Any storable object.
///
/// Canonical encoding: one [`ObjectType::tag`] byte followed by the body.
/// Blob bodies are the raw payload; list, tree and commit bodies are bincode
/// encodings, which are deterministic for these types. Because the tag leads,
/// an empty blob and an empty tree encode (and therefore hash) differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    List(List),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::List(_) => ObjectType::List,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
        }
    }

    /// Child links in order. A commit yields author, content, then parent
    /// (the empty-commit sentinel is skipped).
    pub fn links(&self) -> Vec<&Link> {
        match self {
            Self::Blob(_) => Vec::new(),
            Self::List(list) => list.links.iter().collect(),
            Self::Tree(tree) => tree.entries.iter().collect(),
            Self::Commit(commit) => {
                let mut links = vec![&commit.author, &commit.content];
                if !commit.is_root() {
                    links.push(&commit.parent);
                }
                links
            }
        }
    }

    /// Encode into the canonical byte form.
    pub fn serialize(&self) -> StoreResult<Vec<u8>> {
        let tag = self.object_type().tag();
        let body = match self {
            Self::Blob(blob) => {
                let mut out = Vec::with_capacity(blob.data.len() + 1);
                out.push(tag);
                out.extend_from_slice(&blob.data);
                return Ok(out);
            }
            Self::List(list) => bincode::serialize(list),
            Self::Tree(tree) => bincode::serialize(tree),
            Self::Commit(commit) => bincode::serialize(commit),
        }
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(tag);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode from the canonical byte form.
    pub fn deserialize(bytes: &[u8]) -> StoreResult<Self> {
        let (&tag, body) = bytes
            .split_first()
            .ok_or_else(|| StoreError::Malformed("empty object encoding".into()))?;
        let object_type = ObjectType::from_tag(tag)?;
        let decode_err = |e: bincode::Error| {
            StoreError::Malformed(format!("cannot decode {object_type} body: {e}"))
        };
        Ok(match object_type {
            ObjectType::Blob => Self::Blob(Blob::new(body)),
            ObjectType::List => Self::List(bincode::deserialize(body).map_err(decode_err)?),
            ObjectType::Tree => Self::Tree(bincode::deserialize(body).map_err(decode_err)?),
            ObjectType::Commit => Self::Commit(bincode::deserialize(body).map_err(decode_err)?),
        })
    }

    /// Read the type tag of an encoded object without decoding the body.
    pub fn peek_type(bytes: &[u8]) -> StoreResult<ObjectType> {
        let tag = bytes
            .first()
            .ok_or_else(|| StoreError::Malformed("empty object encoding".into()))?;
        Ok(ObjectType::from_tag(*tag)?)
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<List> for Object {
    fn from(list: List) -> Self {
        Self::List(list)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Self::Commit(commit)
    }
}
