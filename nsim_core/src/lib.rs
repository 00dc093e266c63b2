//! # nsim core
//!
//! An in-memory hierarchical namespace: a tree of directories and files that
//! can be navigated and edited with shell-like operations.
//!
//! This library provides the namespace data structure and the operations that
//! keep it consistent under mutation. Nothing is persisted; a [`Namespace`]
//! starts with an empty root directory and lives as long as the value does.
//!
//! ## Features
//!
//! - Directory and file nodes in a generation-checked arena
//! - Ordered, doubly-linked child lists with parent back-references
//! - Name-unique directories: create, move, rename and copy reject collisions
//! - Unified move-or-rename with `..` and subdirectory destinations
//! - Recursive removal of whole subtrees
//!
//! ## Example
//!
//! ```
//! use nsim_core::{MoveOutcome, Namespace, NamespaceConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ns = Namespace::new(NamespaceConfig::default())?;
//! let root = ns.root();
//!
//! // Build a small tree
//! let docs = ns.create_directory(root, "docs")?;
//! ns.touch(docs, "note.txt")?;
//! ns.write_content(docs, "note.txt", "hello")?;
//!
//! // Rename the directory; its contents come along
//! assert_eq!(ns.move_or_rename(root, "docs", "archive")?, MoveOutcome::Renamed);
//! let archive = ns.change_directory(root, "archive")?;
//! assert_eq!(ns.read_content(archive, "note.txt")?, Some("hello"));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod namespace;
mod node;
mod tree;

pub use config::NamespaceConfig;
pub use error::{Error, Result};
pub use namespace::{Entry, MoveOutcome, Namespace, NodeDetail, NodeInfo, WalkEntry};
pub use node::{
    DirLinks, FileKind, FileMeta, MAX_NAME_LEN, Node, NodeId, NodeKind, PARENT_TOKEN, SELF_TOKEN,
    validate_name,
};
pub use tree::{Ancestors, Children, Tree};
