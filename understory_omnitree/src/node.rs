// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena-backed node storage.

use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::types::Bounds;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeIdx(usize);

impl NodeIdx {
    #[inline]
    fn new(i: usize) -> Self {
        Self(i)
    }

    #[inline]
    pub(crate) fn get(self) -> usize {
        self.0
    }
}

/// Octant index to child node.
pub(crate) type Children = HashMap<usize, NodeIdx>;

#[derive(Clone, Debug)]
pub(crate) enum NodeKind<T> {
    /// Unordered items.
    Leaf(Vec<T>),
    /// Sparse children keyed by octant.
    Branch(Children),
}

#[derive(Clone, Debug)]
pub(crate) struct Node<T, M> {
    pub(crate) bounds: Bounds<M>,
    pub(crate) parent: Option<NodeIdx>,
    /// Octant occupied within the parent; zero for the root.
    pub(crate) octant: usize,
    pub(crate) depth: usize,
    /// Items stored in this node's subtree.
    pub(crate) count: usize,
    pub(crate) kind: NodeKind<T>,
}

impl<T, M> Node<T, M> {
    pub(crate) fn leaf(
        bounds: Bounds<M>,
        parent: Option<NodeIdx>,
        octant: usize,
        depth: usize,
    ) -> Self {
        Self {
            bounds,
            parent,
            octant,
            depth,
            count: 0,
            kind: NodeKind::Leaf(Vec::new()),
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub(crate) fn push_item(&mut self, item: T) {
        match &mut self.kind {
            NodeKind::Leaf(items) => items.push(item),
            NodeKind::Branch(_) => unreachable!("omnitree invariant violated: push into a branch"),
        }
        self.count += 1;
    }

    pub(crate) fn items(&self) -> &[T] {
        match &self.kind {
            NodeKind::Leaf(items) => items,
            NodeKind::Branch(_) => &[],
        }
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<T> {
        match &mut self.kind {
            NodeKind::Leaf(items) => items,
            NodeKind::Branch(_) => {
                unreachable!("omnitree invariant violated: expected a leaf")
            }
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children {
        match &mut self.kind {
            NodeKind::Branch(children) => children,
            NodeKind::Leaf(_) => {
                unreachable!("omnitree invariant violated: expected a branch")
            }
        }
    }

    /// `(octant, child)` pairs of a branch, copied out so the arena can be mutated while
    /// iterating. Empty for a leaf.
    pub(crate) fn child_snapshot(&self) -> SmallVec<[(usize, NodeIdx); 8]> {
        match &self.kind {
            NodeKind::Branch(children) => children.iter().map(|(&o, &c)| (o, c)).collect(),
            NodeKind::Leaf(_) => SmallVec::new(),
        }
    }
}

/// Slot arena with a free list, so node indices stay stable while the tree reshapes.
#[derive(Clone, Debug)]
pub(crate) struct Arena<T, M> {
    pub(crate) slots: Vec<Option<Node<T, M>>>,
    free_list: Vec<usize>,
}

impl<T, M> Arena<T, M> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, node: Node<T, M>) -> NodeIdx {
        if let Some(i) = self.free_list.pop() {
            self.slots[i] = Some(node);
            NodeIdx::new(i)
        } else {
            self.slots.push(Some(node));
            NodeIdx::new(self.slots.len() - 1)
        }
    }

    #[inline]
    pub(crate) fn get(&self, idx: NodeIdx) -> &Node<T, M> {
        self.slots[idx.get()]
            .as_ref()
            .expect("omnitree invariant violated: dangling node index")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, idx: NodeIdx) -> &mut Node<T, M> {
        self.slots[idx.get()]
            .as_mut()
            .expect("omnitree invariant violated: dangling node index")
    }

    /// Free `idx` and every node below it, appending their items to `out`.
    pub(crate) fn drain_subtree(&mut self, idx: NodeIdx, out: &mut Vec<T>) {
        let mut stack: SmallVec<[NodeIdx; 16]> = SmallVec::new();
        stack.push(idx);
        while let Some(idx) = stack.pop() {
            let node = self.slots[idx.get()]
                .take()
                .expect("omnitree invariant violated: dangling node index");
            self.free_list.push(idx.get());
            match node.kind {
                NodeKind::Leaf(items) => out.extend(items),
                NodeKind::Branch(children) => stack.extend(children.into_values()),
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}
