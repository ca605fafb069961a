//! The tree of hot blocks.
//!
//! Blocks live in an arena keyed by root; parent links are roots, never
//! pointers, so pruning can delete entries without leaving anything dangling.
//! The tree is always rooted at the finalized block.

use std::collections::HashMap;
use types::{Hash256, Slot};

#[derive(Debug, PartialEq, Clone)]
pub enum BlockTreeError {
    UnknownParent {
        block_root: Hash256,
        parent_root: Hash256,
    },
    UnknownBlock(Hash256),
    /// Tried to re-root at a block that is not in the tree.
    UnknownNewRoot(Hash256),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    slot: Slot,
    parent: Option<Hash256>,
    children: Vec<Hash256>,
}

/// The result of re-rooting the tree at a newly finalized block.
#[derive(Debug, Default, PartialEq)]
pub struct ReRooted {
    /// Roots that were competing with the finalized chain and are now dead.
    pub pruned: Vec<Hash256>,
    /// Roots on the finalized chain between the old and new tree root. They
    /// leave the hot set but remain part of canonical history.
    pub finalized_chain: Vec<Hash256>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockTree {
    root: Hash256,
    nodes: HashMap<Hash256, Node>,
}

impl BlockTree {
    pub fn new(root: Hash256, root_slot: Slot) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                slot: root_slot,
                parent: None,
                children: vec![],
            },
        );
        Self { root, nodes }
    }

    pub fn root(&self) -> Hash256 {
        self.root
    }

    pub fn contains(&self, root: Hash256) -> bool {
        self.nodes.contains_key(&root)
    }

    pub fn slot_of(&self, root: Hash256) -> Option<Slot> {
        self.nodes.get(&root).map(|node| node.slot)
    }

    pub fn children(&self, root: Hash256) -> &[Hash256] {
        self.nodes
            .get(&root)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Hash256> {
        self.nodes.keys()
    }

    /// Adds a block below an existing parent.
    pub fn insert(
        &mut self,
        root: Hash256,
        slot: Slot,
        parent_root: Hash256,
    ) -> Result<(), BlockTreeError> {
        if self.nodes.contains_key(&root) {
            return Ok(());
        }
        if !self.nodes.contains_key(&parent_root) {
            return Err(BlockTreeError::UnknownParent {
                block_root: root,
                parent_root,
            });
        }

        self.nodes.insert(
            root,
            Node {
                slot,
                parent: Some(parent_root),
                children: vec![],
            },
        );
        self.nodes
            .get_mut(&parent_root)
            .expect("parent presence checked above")
            .children
            .push(root);

        Ok(())
    }

    /// Returns the root of the block in effect at `slot` on the ancestry of
    /// `root`: the most recent block with a slot not later than `slot`.
    ///
    /// Returns the tree root when the whole ancestry is later than `slot`.
    pub fn ancestor_at_slot(&self, root: Hash256, slot: Slot) -> Result<Hash256, BlockTreeError> {
        let mut current = root;
        loop {
            let node = self
                .nodes
                .get(&current)
                .ok_or(BlockTreeError::UnknownBlock(current))?;
            if node.slot <= slot {
                return Ok(current);
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
    }

    /// Returns `true` if `descendant` is `ancestor` or on the subtree below
    /// it.
    pub fn is_descendant(&self, ancestor: Hash256, descendant: Hash256) -> bool {
        let mut current = descendant;
        loop {
            if current == ancestor {
                return true;
            }
            match self.nodes.get(&current).and_then(|node| node.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Re-roots the tree at `new_root`, dropping every node outside its
    /// subtree.
    pub fn re_root(&mut self, new_root: Hash256) -> Result<ReRooted, BlockTreeError> {
        if !self.nodes.contains_key(&new_root) {
            return Err(BlockTreeError::UnknownNewRoot(new_root));
        }
        if new_root == self.root {
            return Ok(ReRooted::default());
        }

        // Walk the retained subtree.
        let mut retained = std::collections::HashSet::new();
        let mut stack = vec![new_root];
        while let Some(root) = stack.pop() {
            retained.insert(root);
            stack.extend(self.children(root).iter().copied());
        }

        // The chain from the new root back to the old root stays canonical;
        // everything else competing with it dies.
        let mut finalized_chain = vec![];
        let mut current = self.nodes[&new_root].parent;
        while let Some(root) = current {
            finalized_chain.push(root);
            current = self.nodes[&root].parent;
        }

        let mut result = ReRooted {
            pruned: vec![],
            finalized_chain,
        };
        self.nodes.retain(|root, _| {
            let keep = retained.contains(root);
            if !keep && !result.finalized_chain.contains(root) {
                result.pruned.push(*root);
            }
            keep
        });

        self.nodes
            .get_mut(&new_root)
            .expect("new root is retained")
            .parent = None;
        self.root = new_root;

        Ok(result)
    }
}
