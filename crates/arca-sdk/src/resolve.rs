use arca_store::{Blob, Commit, List, Object, StorageBackend, Tree};
use arca_types::{Link, ObjectType};

use crate::error::{ServiceError, ServiceResult};

/// Reads and decodes objects through a backend, checking that each decoded
/// object matches the type its link claims.
pub struct Resolver<'a> {
    backend: &'a dyn StorageBackend,
}

impl<'a> Resolver<'a> {
    pub fn new(backend: &'a dyn StorageBackend) -> Self {
        Self { backend }
    }

    /// Fetch, verify and decode the object behind `link`.
    pub fn read_object(&self, link: &Link) -> ServiceResult<Object> {
        let bytes = self.backend.get(link)?;
        let object = Object::deserialize(&bytes)?;
        if object.object_type() != link.object_type {
            return Err(ServiceError::IntegrityViolation(format!(
                "link {:?} claims {} but {} decodes as {}",
                link.name,
                link.object_type,
                link.id,
                object.object_type()
            )));
        }
        Ok(object)
    }

    fn read_expecting(&self, link: &Link, expected: ObjectType) -> ServiceResult<Object> {
        if link.object_type != expected {
            return Err(ServiceError::InvalidInput(format!(
                "link {:?} is a {}, not a {expected}",
                link.name, link.object_type
            )));
        }
        self.read_object(link)
    }

    pub fn read_blob(&self, link: &Link) -> ServiceResult<Blob> {
        match self.read_expecting(link, ObjectType::Blob)? {
            Object::Blob(blob) => Ok(blob),
            other => Err(mismatch(link, &other)),
        }
    }

    pub fn read_list(&self, link: &Link) -> ServiceResult<List> {
        match self.read_expecting(link, ObjectType::List)? {
            Object::List(list) => Ok(list),
            other => Err(mismatch(link, &other)),
        }
    }

    pub fn read_tree(&self, link: &Link) -> ServiceResult<Tree> {
        match self.read_expecting(link, ObjectType::Tree)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(mismatch(link, &other)),
        }
    }

    pub fn read_commit(&self, link: &Link) -> ServiceResult<Commit> {
        match self.read_expecting(link, ObjectType::Commit)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(mismatch(link, &other)),
        }
    }

    /// Every link reachable from `link`, depth-first, `link` first.
    ///
    /// Blob entries of lists and trees are listed without being fetched.
    /// For a commit the author and content follow the commit itself; with
    /// `include_history` the parent chain is walked the same way, one commit
    /// after another.
    pub fn resolve(&self, link: &Link, include_history: bool) -> ServiceResult<Vec<Link>> {
        let mut out = Vec::new();
        let mut next = Some(link.clone());
        while let Some(current) = next.take() {
            if current.object_type != ObjectType::Commit {
                self.collect(&current, &mut out)?;
                break;
            }
            let commit = self.read_commit(&current)?;
            out.push(current);
            self.collect(&commit.author, &mut out)?;
            self.collect(&commit.content, &mut out)?;
            if include_history && !commit.is_root() {
                next = Some(commit.parent);
            }
        }
        Ok(out)
    }

    fn collect(&self, link: &Link, out: &mut Vec<Link>) -> ServiceResult<()> {
        match link.object_type {
            ObjectType::Blob => out.push(link.clone()),
            ObjectType::List | ObjectType::Tree => {
                let object = self.read_object(link)?;
                out.push(link.clone());
                for child in object.links() {
                    if child.object_type == ObjectType::Blob {
                        out.push(child.clone());
                    } else {
                        self.collect(child, out)?;
                    }
                }
            }
            // Only reachable through a malformed graph; list it shallowly.
            ObjectType::Commit => {
                let commit = self.read_commit(link)?;
                out.push(link.clone());
                self.collect(&commit.author, out)?;
                self.collect(&commit.content, out)?;
            }
        }
        Ok(())
    }
}

fn mismatch(link: &Link, object: &Object) -> ServiceError {
    ServiceError::IntegrityViolation(format!(
        "{} decoded as {}, expected {}",
        link.id,
        object.object_type(),
        link.object_type
    ))
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
