//! Node model: handles, the directory/file sum type and file metadata.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a node name in bytes.
pub const MAX_NAME_LEN: usize = 99;

/// Token naming the parent of the current directory.
pub const PARENT_TOKEN: &str = "..";

/// Token naming the current directory itself.
pub const SELF_TOKEN: &str = ".";

/// Generation-checked handle to a node in a [`Tree`](crate::Tree).
///
/// A handle outlives the node it names; using it after the node was released
/// yields [`Error::StaleHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Informational file type tag. Not enforced against content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Numeric,
    #[default]
    Character,
    Binary,
    Program,
}

impl FileKind {
    /// Returns the lowercase name used in listings and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Numeric => "numeric",
            FileKind::Character => "character",
            FileKind::Binary => "binary",
            FileKind::Program => "program",
        }
    }

    /// Parse a kind from its name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "numeric" => Some(FileKind::Numeric),
            "character" => Some(FileKind::Character),
            "binary" => Some(FileKind::Binary),
            "program" => Some(FileKind::Program),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata and content owned by a file node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Informational byte count.
    pub size: u64,
    pub kind: FileKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    /// Assigned at creation; not guaranteed unique.
    pub id: u32,
    /// Numeric permission tag, stored but never enforced.
    pub permission: u32,
    /// Text content. `None` means the file was never written.
    pub content: Option<String>,
}

impl FileMeta {
    /// Create metadata with empty content and all timestamps set to now.
    pub fn new(size: u64, kind: FileKind, id: u32, permission: u32) -> Self {
        let now = Utc::now();
        Self {
            size,
            kind,
            created: now,
            modified: now,
            accessed: now,
            id,
            permission,
            content: None,
        }
    }
}

/// Head and tail of a directory's child list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirLinks {
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
}

impl DirLinks {
    /// True when the directory has no children.
    pub fn is_empty(&self) -> bool {
        self.first_child.is_none()
    }
}

/// Variant payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory(DirLinks),
    File(FileMeta),
}

/// A directory or file together with its position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Construct a detached directory.
    pub fn directory(name: impl Into<String>) -> Result<Self> {
        Self::with_kind(name.into(), NodeKind::Directory(DirLinks::default()))
    }

    /// Construct a detached file.
    pub fn file(name: impl Into<String>, meta: FileMeta) -> Result<Self> {
        Self::with_kind(name.into(), NodeKind::File(meta))
    }

    fn with_kind(name: String, kind: NodeKind) -> Result<Self> {
        validate_name(&name)?;
        Ok(Self {
            name,
            parent: None,
            prev: None,
            next: None,
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-owning back-reference to the owning directory.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Previous sibling.
    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    /// Next sibling.
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    /// File metadata, if this is a file.
    pub fn as_file(&self) -> Option<&FileMeta> {
        match &self.kind {
            NodeKind::File(meta) => Some(meta),
            NodeKind::Directory(_) => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut FileMeta> {
        match &mut self.kind {
            NodeKind::File(meta) => Some(meta),
            NodeKind::Directory(_) => None,
        }
    }

    pub(crate) fn dir_links(&self) -> Option<&DirLinks> {
        match &self.kind {
            NodeKind::Directory(links) => Some(links),
            NodeKind::File(_) => None,
        }
    }

    pub(crate) fn dir_links_mut(&mut self) -> Option<&mut DirLinks> {
        match &mut self.kind {
            NodeKind::Directory(links) => Some(links),
            NodeKind::File(_) => None,
        }
    }
}

/// Check that `name` can be stored in a directory.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_name(
            name,
            format!("name too long: {} bytes (max {})", name.len(), MAX_NAME_LEN),
        ));
    }

    if name.contains('\0') {
        return Err(Error::invalid_name(name, "name cannot contain null bytes"));
    }

    if name.contains('/') {
        return Err(Error::invalid_name(name, "name cannot contain '/'"));
    }

    if name == PARENT_TOKEN || name == SELF_TOKEN {
        return Err(Error::invalid_name(name, "name is reserved"));
    }

    Ok(())
}
