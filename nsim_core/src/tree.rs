//! Node arena and the structural primitives of the namespace tree.
//!
//! Nothing in this module looks at names. Each directory owns an intrusive
//! doubly-linked list of children expressed as [`NodeId`] handles:
//!
//! - `first_child.prev` and `last_child.next` are always `None`
//! - `a.next == Some(b)` iff `b.prev == Some(a)`
//! - every child's `parent` is the directory whose list holds it
//!
//! Released slots are recycled with a bumped generation, so an old handle can
//! never silently alias a new node.

use crate::error::{Error, Result};
use crate::node::{DirLinks, Node, NodeId};
use std::collections::HashSet;

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena holding every live node of a namespace.
#[derive(Debug, Default)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Tree {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Store a detached node and return its handle.
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// True if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    /// Borrow a live node.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(Error::StaleHandle)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(Error::StaleHandle)
    }

    /// True if `id` currently sits in some directory's child list.
    pub fn is_attached(&self, id: NodeId) -> Result<bool> {
        let node = self.get(id)?;
        if node.prev.is_some() {
            return Ok(true);
        }

        let Some(parent) = node.parent else {
            return Ok(false);
        };

        Ok(self
            .get(parent)
            .ok()
            .and_then(Node::dir_links)
            .is_some_and(|links| links.first_child == Some(id)))
    }

    /// Insert `node` at the tail of `dir`'s child list and make `dir` its parent.
    ///
    /// `node` must be detached.
    pub fn append(&mut self, dir: NodeId, node: NodeId) -> Result<()> {
        let dir_node = self.get(dir)?;
        let tail = match dir_node.dir_links() {
            Some(links) => links.last_child,
            None => return Err(Error::not_a_directory(dir_node.name())),
        };

        if self.is_attached(node)? {
            return Err(Error::attached(self.get(node)?.name()));
        }
        if node == dir {
            return Err(Error::cycle(self.get(node)?.name()));
        }

        {
            let child = self.get_mut(node)?;
            child.parent = Some(dir);
            child.prev = tail;
            child.next = None;
        }

        match tail {
            Some(tail) => self.get_mut(tail)?.next = Some(node),
            None => {
                if let Some(links) = self.get_mut(dir)?.dir_links_mut() {
                    links.first_child = Some(node);
                }
            }
        }

        if let Some(links) = self.get_mut(dir)?.dir_links_mut() {
            links.last_child = Some(node);
        }

        Ok(())
    }

    /// Unlink `node` from its sibling list, fixing up the owning directory's
    /// head and tail. Clears `prev`/`next`; leaves `parent` untouched.
    ///
    /// Detaching a node that is not in any list is a no-op.
    pub fn detach(&mut self, node: NodeId) -> Result<()> {
        if !self.is_attached(node)? {
            return Ok(());
        }

        let (parent, prev, next) = {
            let n = self.get(node)?;
            (n.parent, n.prev, n.next)
        };

        match prev {
            Some(prev) => self.get_mut(prev)?.next = next,
            None => {
                if let Some(links) = self.parent_links_mut(parent)? {
                    links.first_child = next;
                }
            }
        }

        match next {
            Some(next) => self.get_mut(next)?.prev = prev,
            None => {
                if let Some(links) = self.parent_links_mut(parent)? {
                    links.last_child = prev;
                }
            }
        }

        let n = self.get_mut(node)?;
        n.prev = None;
        n.next = None;
        Ok(())
    }

    fn parent_links_mut(&mut self, parent: Option<NodeId>) -> Result<Option<&mut DirLinks>> {
        match parent {
            Some(parent) => Ok(self.get_mut(parent)?.dir_links_mut()),
            None => Ok(None),
        }
    }

    /// Release `node` and everything beneath it. Returns the number of nodes
    /// released.
    ///
    /// The node must already be detached. Descendants are released before
    /// their ancestors; file content is dropped with its node.
    pub fn destroy_subtree(&mut self, node: NodeId) -> Result<usize> {
        if self.is_attached(node)? {
            return Err(Error::attached(self.get(node)?.name()));
        }

        let order = self.preorder(node)?;
        for &id in order.iter().rev() {
            self.release(id);
        }

        tracing::trace!(released = order.len(), "destroyed subtree");
        Ok(order.len())
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize)
            && slot.generation == id.generation
            && slot.node.take().is_some()
        {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            self.live -= 1;
        }
    }

    /// Move `node` to the tail of `dest`'s child list, rewriting its parent.
    ///
    /// Rejected with [`Error::Cycle`] if `dest` is `node` or lies beneath it.
    pub fn reparent(&mut self, node: NodeId, dest: NodeId) -> Result<()> {
        let dest_node = self.get(dest)?;
        if !dest_node.is_dir() {
            return Err(Error::not_a_directory(dest_node.name()));
        }

        if node == dest || self.is_ancestor(node, dest)? {
            return Err(Error::cycle(self.get(node)?.name()));
        }

        self.detach(node)?;
        self.append(dest, node)
    }

    /// True if `ancestor` appears on the parent chain of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        self.get(ancestor)?;
        Ok(self.ancestors(node)?.any(|id| id == ancestor))
    }

    /// Iterate over `dir`'s children in sibling order.
    pub fn children(&self, dir: NodeId) -> Result<Children<'_>> {
        let node = self.get(dir)?;
        match node.dir_links() {
            Some(links) => Ok(Children {
                tree: self,
                next: links.first_child,
            }),
            None => Err(Error::not_a_directory(node.name())),
        }
    }

    /// Iterate over the parent chain of `node`, nearest first.
    pub fn ancestors(&self, node: NodeId) -> Result<Ancestors<'_>> {
        let next = self.get(node)?.parent;
        Ok(Ancestors { tree: self, next })
    }

    /// `/`-separated path of `node` from the topmost ancestor, which is
    /// rendered as `/`.
    pub fn path_of(&self, node: NodeId) -> Result<String> {
        let mut names = Vec::new();
        let mut current = Some(node);

        while let Some(id) = current {
            let n = self.get(id)?;
            if n.parent.is_none() {
                break;
            }
            names.push(n.name());
            current = n.parent;
        }

        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }

    /// Handles of `node` and its descendants in depth-first pre-order.
    pub fn preorder(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.get(node)?;

        let mut order = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Ok(children) = self.children(id) {
                let ids: Vec<NodeId> = children.map(|(child, _)| child).collect();
                stack.extend(ids.into_iter().rev());
            }
        }
        Ok(order)
    }

    /// Verify the link invariants for every directory reachable from `root`.
    pub fn check_invariants(&self, root: NodeId) -> std::result::Result<(), String> {
        let root_node = self.get(root).map_err(|e| e.to_string())?;
        if root_node.parent.is_some() {
            return Err(format!("root '{}' has a parent", root_node.name()));
        }

        let mut seen = HashSet::new();
        let mut stack = vec![root];

        while let Some(dir) = stack.pop() {
            if !seen.insert(dir) {
                return Err(format!("node {} reachable twice", dir));
            }

            let node = self.get(dir).map_err(|e| e.to_string())?;
            let Some(links) = node.dir_links() else {
                continue;
            };

            let mut prev = None;
            let mut cursor = links.first_child;
            while let Some(id) = cursor {
                let child = self
                    .get(id)
                    .map_err(|_| format!("dangling child {} in '{}'", id, node.name()))?;

                if child.parent != Some(dir) {
                    return Err(format!(
                        "'{}' does not point back to '{}'",
                        child.name(),
                        node.name()
                    ));
                }
                if child.prev != prev {
                    return Err(format!("asymmetric prev link at '{}'", child.name()));
                }

                stack.push(id);
                prev = Some(id);
                cursor = child.next;
            }

            if links.last_child != prev {
                return Err(format!("tail of '{}' is out of date", node.name()));
            }
        }

        Ok(())
    }
}

/// Iterator over a directory's children.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.get(id).ok()?;
        self.next = node.next;
        Some((id, node))
    }
}

/// Iterator over a node's parent chain.
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.get(id).ok()?.parent;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FileKind, FileMeta};

    fn file(name: &str) -> Node {
        Node::file(name, FileMeta::new(0, FileKind::Character, 0, 644)).unwrap()
    }

    fn dir(name: &str) -> Node {
        Node::directory(name).unwrap()
    }

    fn names(tree: &Tree, dir: NodeId) -> Vec<String> {
        tree.children(dir)
            .unwrap()
            .map(|(_, n)| n.name().to_string())
            .collect()
    }

    #[test]
    fn test_append_links_siblings() {
        let mut tree = Tree::new();
        let root = tree.insert(dir("root"));
        let a = tree.insert(file("a"));
        let b = tree.insert(file("b"));
        let c = tree.insert(file("c"));

        tree.append(root, a).unwrap();
        tree.append(root, b).unwrap();
        tree.append(root, c).unwrap();

        assert_eq!(names(&tree, root), ["a", "b", "c"]);
        assert_eq!(tree.get(a).unwrap().prev(), None);
        assert_eq!(tree.get(a).unwrap().next(), Some(b));
        assert_eq!(tree.get(b).unwrap().prev(), Some(a));
        assert_eq!(tree.get(c).unwrap().next(), None);
        assert_eq!(tree.get(c).unwrap().parent(), Some(root));
        tree.check_invariants(root).unwrap();
    }

    #[test]
    fn test_append_into_file_rejected() {
        let mut tree = Tree::new();
        let f = tree.insert(file("f"));
        let g = tree.insert(file("g"));

        assert_eq!(tree.append(f, g), Err(Error::not_a_directory("f")));
    }

    #[test]
    fn test_append_attached_rejected() {
        let mut tree = Tree::new();
        let root = tree.insert(dir("root"));
        let a = tree.insert(file("a"));
        tree.append(root, a).unwrap();

        assert_eq!(tree.append(root, a), Err(Error::attached("a")));
        assert_eq!(names(&tree, root), ["a"]);
    }

    #[test]
    fn test_detach_head_middle_tail() {
        let mut tree = Tree::new();
        let root = tree.insert(dir("root"));
        let ids: Vec<NodeId> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| {
                let id = tree.insert(file(n));
                tree.append(root, id).unwrap();
                id
            })
            .collect();

        tree.detach(ids[1]).unwrap();
        assert_eq!(names(&tree, root), ["a", "c", "d"]);
        tree.check_invariants(root).unwrap();

        tree.detach(ids[0]).unwrap();
        assert_eq!(names(&tree, root), ["c", "d"]);
        assert_eq!(tree.get(ids[2]).unwrap().prev(), None);
        tree.check_invariants(root).unwrap();

        tree.detach(ids[3]).unwrap();
        assert_eq!(names(&tree, root), ["c"]);
        tree.check_invariants(root).unwrap();

        tree.detach(ids[2]).unwrap();
        assert!(names(&tree, root).is_empty());
        tree.check_invariants(root).unwrap();

        // Links cleared, parent kept.
        let c = tree.get(ids[2]).unwrap();
        assert_eq!(c.prev(), None);
        assert_eq!(c.next(), None);
        assert_eq!(c.parent(), Some(root));
        assert!(!tree.is_attached(ids[2]).unwrap());
    }

    #[test]
    fn test_detach_is_noop_when_detached() {
        let mut tree = Tree::new();
        let a = tree.insert(file("a"));
        tree.detach(a).unwrap();
        tree.detach(a).unwrap();
        assert!(tree.contains(a));
    }

    #[test]
    fn test_destroy_subtree_releases_everything() {
        let mut tree = Tree::new();
        let root = tree.insert(dir("root"));
        let docs = tree.insert(dir("docs"));
        let inner = tree.insert(dir("inner"));
        let f1 = tree.insert(file("f1"));
        let f2 = tree.insert(file("f2"));
        let keep = tree.insert(file("keep"));

        tree.append(root, docs).unwrap();
        tree.append(root, keep).unwrap();
        tree.append(docs, inner).unwrap();
        tree.append(docs, f1).unwrap();
        tree.append(inner, f2).unwrap();
        assert_eq!(tree.len(), 6);

        assert_eq!(tree.destroy_subtree(docs), Err(Error::attached("docs")));

        tree.detach(docs).unwrap();
        assert_eq!(tree.destroy_subtree(docs).unwrap(), 4);
        assert_eq!(tree.len(), 2);

        for id in [docs, inner, f1, f2] {
            assert_eq!(tree.get(id), Err(Error::StaleHandle));
        }
        assert_eq!(names(&tree, root), ["keep"]);
        tree.check_invariants(root).unwrap();
    }

    #[test]
    fn test_released_slot_reuse_bumps_generation() {
        let mut tree = Tree::new();
        let a = tree.insert(file("a"));
        tree.destroy_subtree(a).unwrap();

        let b = tree.insert(file("b"));
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(!tree.contains(a));
        assert_eq!(tree.get(b).unwrap().name(), "b");
    }

    #[test]
    fn test_reparent_and_cycle_guard() {
        let mut tree = Tree::new();
        let root = tree.insert(dir("root"));
        let a = tree.insert(dir("a"));
        let b = tree.insert(dir("b"));
        tree.append(root, a).unwrap();
        tree.append(a, b).unwrap();

        assert_eq!(tree.reparent(a, b), Err(Error::cycle("a")));
        assert_eq!(tree.reparent(a, a), Err(Error::cycle("a")));
        tree.check_invariants(root).unwrap();

        tree.reparent(b, root).unwrap();
        assert_eq!(names(&tree, root), ["a", "b"]);
        assert_eq!(tree.get(b).unwrap().parent(), Some(root));
        tree.check_invariants(root).unwrap();
    }

    #[test]
    fn test_path_and_ancestors() {
        let mut tree = Tree::new();
        let root = tree.insert(dir("root"));
        let a = tree.insert(dir("a"));
        let b = tree.insert(dir("b"));
        tree.append(root, a).unwrap();
        tree.append(a, b).unwrap();

        assert_eq!(tree.path_of(root).unwrap(), "/");
        assert_eq!(tree.path_of(b).unwrap(), "/a/b");
        assert_eq!(tree.ancestors(b).unwrap().collect::<Vec<_>>(), [a, root]);
        assert!(tree.is_ancestor(root, b).unwrap());
        assert!(!tree.is_ancestor(b, a).unwrap());
        assert_eq!(tree.preorder(root).unwrap(), [root, a, b]);
    }

    // Property-based tests
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize),
        Move(usize, usize),
        Remove(usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize).prop_map(Op::Add),
            (any::<usize>(), 0..3usize).prop_map(|(k, d)| Op::Move(k, d)),
            any::<usize>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Sibling links stay symmetric and match a simple list model under
        /// arbitrary append/detach sequences.
        #[test]
        fn prop_sibling_symmetry(ops in prop::collection::vec(arb_op(), 1..60)) {
            let mut tree = Tree::new();
            let root = tree.insert(dir("root"));
            let d1 = tree.insert(dir("d1"));
            let d2 = tree.insert(dir("d2"));
            tree.append(root, d1).unwrap();
            tree.append(root, d2).unwrap();
            let dirs = [root, d1, d2];

            // Model: files per directory, in order.
            let mut model: [Vec<NodeId>; 3] = [Vec::new(), Vec::new(), Vec::new()];
            let mut counter = 0;

            for op in ops {
                match op {
                    Op::Add(d) => {
                        counter += 1;
                        let id = tree.insert(file(&format!("f{}", counter)));
                        tree.append(dirs[d], id).unwrap();
                        model[d].push(id);
                    }
                    Op::Move(k, d) => {
                        let all: Vec<(usize, usize)> = (0..3)
                            .flat_map(|i| (0..model[i].len()).map(move |j| (i, j)))
                            .collect();
                        if all.is_empty() {
                            continue;
                        }
                        let (i, j) = all[k % all.len()];
                        let id = model[i].remove(j);
                        tree.reparent(id, dirs[d]).unwrap();
                        model[d].push(id);
                    }
                    Op::Remove(k) => {
                        let all: Vec<(usize, usize)> = (0..3)
                            .flat_map(|i| (0..model[i].len()).map(move |j| (i, j)))
                            .collect();
                        if all.is_empty() {
                            continue;
                        }
                        let (i, j) = all[k % all.len()];
                        let id = model[i].remove(j);
                        tree.detach(id).unwrap();
                        prop_assert_eq!(tree.destroy_subtree(id).unwrap(), 1);
                    }
                }

                prop_assert!(tree.check_invariants(root).is_ok());
            }

            let files: usize = model.iter().map(Vec::len).sum();
            prop_assert_eq!(tree.len(), 3 + files);

            for (d, expected) in model.iter().enumerate() {
                let actual: Vec<NodeId> = tree
                    .children(dirs[d])
                    .unwrap()
                    .map(|(id, _)| id)
                    .filter(|id| *id != d1 && *id != d2)
                    .collect();
                prop_assert_eq!(&actual, expected);

                // Adjacent pairs point at each other.
                let all: Vec<NodeId> = tree.children(dirs[d]).unwrap().map(|(id, _)| id).collect();
                for pair in all.windows(2) {
                    prop_assert_eq!(tree.get(pair[0]).unwrap().next(), Some(pair[1]));
                    prop_assert_eq!(tree.get(pair[1]).unwrap().prev(), Some(pair[0]));
                }
            }
        }
    }
}
