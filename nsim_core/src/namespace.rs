//! Name-aware operations on a namespace tree.
//!
//! Every operation is evaluated relative to a directory handle supplied by the
//! caller (the "current directory"). Validation always completes before the
//! first mutation, so an operation that fails leaves the tree untouched.

use crate::config::NamespaceConfig;
use crate::error::{Error, Result};
use crate::node::{
    FileKind, FileMeta, Node, NodeId, NodeKind, PARENT_TOKEN, SELF_TOKEN, validate_name,
};
use crate::tree::Tree;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Summary of one directory entry, as produced by [`Namespace::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    Directory {
        name: String,
    },
    File {
        name: String,
        size: u64,
        kind: FileKind,
        id: u32,
        permission: u32,
    },
}

impl Entry {
    fn from_node(node: &Node) -> Self {
        match node.kind() {
            NodeKind::Directory(_) => Entry::Directory {
                name: node.name().to_string(),
            },
            NodeKind::File(meta) => Entry::File {
                name: node.name().to_string(),
                size: meta.size,
                kind: meta.kind,
                id: meta.id,
                permission: meta.permission,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Directory { name } | Entry::File { name, .. } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }
}

/// An entry of a recursive listing, with its depth below the listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkEntry {
    /// 1 for direct children.
    pub depth: usize,
    #[serde(flatten)]
    pub entry: Entry,
}

/// Full metadata of one node, as produced by [`Namespace::stat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub path: String,
    #[serde(flatten)]
    pub detail: NodeDetail,
}

/// Variant-specific part of [`NodeInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeDetail {
    Directory {
        entries: usize,
    },
    File {
        size: u64,
        kind: FileKind,
        id: u32,
        permission: u32,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
        accessed: DateTime<Utc>,
        /// Byte length of the content, `None` if never written.
        content_len: Option<usize>,
    },
}

/// What [`Namespace::move_or_rename`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The node now lives in the given directory.
    Moved { into: NodeId },
    /// The node kept its place and took the new name.
    Renamed,
}

/// An in-memory tree of directories and files with a single root.
#[derive(Debug)]
pub struct Namespace {
    tree: Tree,
    root: NodeId,
    config: NamespaceConfig,
    next_id: u32,
}

impl Namespace {
    /// Create a namespace holding only an empty root directory.
    pub fn new(config: NamespaceConfig) -> Result<Self> {
        let mut tree = Tree::new();
        let root = tree.insert(Node::directory(config.root_name.clone())?);
        tracing::debug!(root = %config.root_name, "namespace created");

        Ok(Self {
            tree,
            root,
            config,
            next_id: 1,
        })
    }

    /// Handle of the root directory.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    /// Read access to the underlying arena.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Borrow a node by handle.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.tree.get(id)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Hand out the next file id.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Borrow `dir`, failing unless it is a directory.
    fn directory(&self, dir: NodeId) -> Result<&Node> {
        let node = self.tree.get(dir)?;
        if !node.is_dir() {
            return Err(Error::not_a_directory(node.name()));
        }
        Ok(node)
    }

    fn find(&self, dir: NodeId, name: &str) -> Result<Option<NodeId>> {
        self.directory(dir)?;
        tracing::trace!(%dir, name, "lookup");
        Ok(self
            .tree
            .children(dir)?
            .find(|(_, node)| node.name() == name)
            .map(|(id, _)| id))
    }

    /// Find the child of `dir` called `name`, directory or file.
    pub fn lookup(&self, dir: NodeId, name: &str) -> Result<NodeId> {
        self.find(dir, name)?.ok_or_else(|| Error::not_found(name))
    }

    fn lookup_file(&self, dir: NodeId, name: &str) -> Result<NodeId> {
        let id = self.lookup(dir, name)?;
        if self.tree.get(id)?.is_dir() {
            return Err(Error::is_a_directory(name));
        }
        Ok(id)
    }

    /// Fail with `Collision` if `dir` already has a child called `name`.
    fn ensure_vacant(&self, dir: NodeId, name: &str) -> Result<()> {
        if self.find(dir, name)?.is_some() {
            return Err(Error::collision(name, self.tree.get(dir)?.name()));
        }
        Ok(())
    }

    fn attach_new(&mut self, dir: NodeId, node: Node) -> Result<NodeId> {
        self.ensure_vacant(dir, node.name())?;
        let id = self.tree.insert(node);
        self.tree.append(dir, id)?;
        Ok(id)
    }

    /// Create an empty directory called `name` inside `dir`.
    pub fn create_directory(&mut self, dir: NodeId, name: &str) -> Result<NodeId> {
        let id = self.attach_new(dir, Node::directory(name)?)?;
        tracing::debug!(%dir, name, node = %id, "created directory");
        Ok(id)
    }

    /// Create an empty file with explicit metadata inside `dir`.
    pub fn create_file(
        &mut self,
        dir: NodeId,
        name: &str,
        size: u64,
        kind: FileKind,
        id: u32,
        permission: u32,
    ) -> Result<NodeId> {
        let node = Node::file(name, FileMeta::new(size, kind, id, permission))?;
        let handle = self.attach_new(dir, node)?;
        tracing::debug!(%dir, name, node = %handle, file_id = id, "created file");
        Ok(handle)
    }

    /// Create an empty file with the configured defaults and a fresh id.
    pub fn touch(&mut self, dir: NodeId, name: &str) -> Result<NodeId> {
        // Validate before consuming an id.
        validate_name(name)?;
        self.ensure_vacant(dir, name)?;

        let id = self.allocate_id();
        let NamespaceConfig {
            default_file_size,
            default_kind,
            default_permission,
            ..
        } = self.config;
        self.create_file(
            dir,
            name,
            default_file_size,
            default_kind,
            id,
            default_permission,
        )
    }

    /// Summaries of `dir`'s children in sibling order.
    pub fn list(&self, dir: NodeId) -> Result<Vec<Entry>> {
        self.directory(dir)?;
        Ok(self
            .tree
            .children(dir)?
            .map(|(_, node)| Entry::from_node(node))
            .collect())
    }

    /// Depth-first listing of everything beneath `dir`.
    pub fn walk(&self, dir: NodeId) -> Result<Vec<WalkEntry>> {
        self.directory(dir)?;

        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = self
            .tree
            .children(dir)?
            .map(|(id, _)| (id, 1))
            .collect();
        stack.reverse();

        while let Some((id, depth)) = stack.pop() {
            let node = self.tree.get(id)?;
            out.push(WalkEntry {
                depth,
                entry: Entry::from_node(node),
            });

            if node.is_dir() {
                let children: Vec<(NodeId, usize)> = self
                    .tree
                    .children(id)?
                    .map(|(child, _)| (child, depth + 1))
                    .collect();
                stack.extend(children.into_iter().rev());
            }
        }

        Ok(out)
    }

    /// Resolve a `cd` target: `..`, `.`, or the name of a child directory.
    pub fn change_directory(&self, dir: NodeId, target: &str) -> Result<NodeId> {
        let node = self.directory(dir)?;

        match target {
            PARENT_TOKEN => node.parent().ok_or(Error::AtRoot),
            SELF_TOKEN => Ok(dir),
            name => {
                let id = self.lookup(dir, name)?;
                if !self.tree.get(id)?.is_dir() {
                    return Err(Error::not_a_directory(name));
                }
                Ok(id)
            }
        }
    }

    /// Delete the child `name` of `dir` and everything beneath it.
    ///
    /// Returns the number of nodes released.
    pub fn remove(&mut self, dir: NodeId, name: &str) -> Result<usize> {
        let id = self.lookup(dir, name)?;
        self.tree.detach(id)?;
        let released = self.tree.destroy_subtree(id)?;
        tracing::debug!(%dir, name, released, "removed");
        Ok(released)
    }

    /// Move `source` into a directory, or rename it.
    ///
    /// `target` names a destination when it is `..` or a child directory of
    /// `dir`; otherwise it is the new name. Destination resolution wins over
    /// renaming.
    pub fn move_or_rename(
        &mut self,
        dir: NodeId,
        source: &str,
        target: &str,
    ) -> Result<MoveOutcome> {
        let source_id = self.lookup(dir, source)?;
        if source == target {
            return Err(Error::no_op(source));
        }

        if let Some(dest) = self.resolve_destination(dir, target)? {
            self.ensure_vacant(dest, source)?;
            self.tree.reparent(source_id, dest)?;
            tracing::debug!(%dir, source, node = %source_id, into = %dest, "moved");
            return Ok(MoveOutcome::Moved { into: dest });
        }

        validate_name(target)?;
        self.ensure_vacant(dir, target)?;
        self.tree.get_mut(source_id)?.name = target.to_string();
        tracing::debug!(%dir, source, to = target, node = %source_id, "renamed");
        Ok(MoveOutcome::Renamed)
    }

    fn resolve_destination(&self, dir: NodeId, target: &str) -> Result<Option<NodeId>> {
        if target == PARENT_TOKEN {
            return self.directory(dir)?.parent().map(Some).ok_or(Error::AtRoot);
        }

        Ok(self
            .find(dir, target)?
            .filter(|id| self.tree.get(*id).is_ok_and(Node::is_dir)))
    }

    /// Duplicate the file `source` as `dest` inside `dir`.
    ///
    /// The copy gets a fresh id and timestamps and its own copy of the content.
    pub fn copy(&mut self, dir: NodeId, source: &str, dest: &str) -> Result<NodeId> {
        let source_id = self.lookup_file(dir, source)?;
        validate_name(dest)?;
        self.ensure_vacant(dir, dest)?;

        let (size, kind, permission, content) = match self.tree.get(source_id)?.as_file() {
            Some(meta) => (meta.size, meta.kind, meta.permission, meta.content.clone()),
            None => return Err(Error::is_a_directory(source)),
        };

        let id = self.allocate_id();
        let mut meta = FileMeta::new(size, kind, id, permission);
        meta.content = content;

        let handle = self.attach_new(dir, Node::file(dest, meta)?)?;
        tracing::debug!(%dir, source, dest, node = %handle, file_id = id, "copied");
        Ok(handle)
    }

    /// Replace the content of file `name` and bump its modified time.
    pub fn write_content(&mut self, dir: NodeId, name: &str, text: &str) -> Result<()> {
        let id = self.lookup_file(dir, name)?;
        if let Some(meta) = self.tree.get_mut(id)?.as_file_mut() {
            meta.content = Some(text.to_string());
            meta.modified = Utc::now();
        }
        tracing::debug!(%dir, name, bytes = text.len(), "wrote content");
        Ok(())
    }

    /// Content of file `name`; `None` if it was never written.
    pub fn read_content(&self, dir: NodeId, name: &str) -> Result<Option<&str>> {
        let id = self.lookup_file(dir, name)?;
        Ok(self
            .tree
            .get(id)?
            .as_file()
            .and_then(|meta| meta.content.as_deref()))
    }

    /// Full metadata of the child `name` of `dir`.
    pub fn stat(&self, dir: NodeId, name: &str) -> Result<NodeInfo> {
        let id = self.lookup(dir, name)?;
        let node = self.tree.get(id)?;

        let detail = match node.kind() {
            NodeKind::Directory(_) => NodeDetail::Directory {
                entries: self.tree.children(id)?.count(),
            },
            NodeKind::File(meta) => NodeDetail::File {
                size: meta.size,
                kind: meta.kind,
                id: meta.id,
                permission: meta.permission,
                created: meta.created,
                modified: meta.modified,
                accessed: meta.accessed,
                content_len: meta.content.as_ref().map(String::len),
            },
        };

        Ok(NodeInfo {
            name: node.name().to_string(),
            path: self.tree.path_of(id)?,
            detail,
        })
    }

    /// Absolute path of `node`, `/` for the root.
    pub fn path(&self, node: NodeId) -> Result<String> {
        self.tree.path_of(node)
    }

    /// Verify link invariants, per-directory name uniqueness, and that every
    /// live node is reachable from the root.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        self.tree.check_invariants(self.root)?;

        let reachable = self.tree.preorder(self.root).map_err(|e| e.to_string())?;
        for &id in &reachable {
            let Ok(children) = self.tree.children(id) else {
                continue;
            };
            let mut names = HashSet::new();
            for (_, child) in children {
                if !names.insert(child.name()) {
                    return Err(format!("duplicate name '{}'", child.name()));
                }
            }
        }

        if reachable.len() != self.tree.len() {
            return Err(format!(
                "{} live nodes but {} reachable from the root",
                self.tree.len(),
                reachable.len()
            ));
        }

        Ok(())
    }
}
