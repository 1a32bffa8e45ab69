// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tree itself: construction, insertion, and the leaf/branch reshaping shared by every
//! mutating operation.

use alloc::format;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::{self, Debug};

use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace};

use crate::axis::{Axis, Natural};
use crate::error::OmnitreeError;
use crate::load::LoadFactor;
use crate::locate::{Locate, locate_checked};
use crate::node::{Arena, Children, Node, NodeIdx, NodeKind};
use crate::types::{Bounds, Point, Scalar};

/// Largest supported number of axes; octant indices must fit in a `usize`.
pub const MAX_AXES: usize = usize::BITS as usize - 1;

/// An adaptive N-dimensional spatial tree.
///
/// Items of type `T` are positioned by a [`Locate`] collaborator returning one `M` per axis,
/// and `M` values are ordered and bisected by an [`Axis`] strategy (the [`Natural`] order of
/// a [`Scalar`] by default).
///
/// Leaves split into up to `2^dimensions` children when they overflow, and branches collapse
/// back into leaves when removals leave them under-loaded. The capacity of a leaf and the
/// maximum depth of the tree are both bounded by a load that tracks `len()^(1/dimensions)`.
///
/// Items that move must be followed by [`update`](Self::update) (or
/// [`update_in`](Self::update_in)) before queries see them at their new position.
#[derive(Clone)]
pub struct Omnitree<T, M, L, A = Natural> {
    pub(crate) axis: A,
    pub(crate) locate: L,
    pub(crate) bounds: Bounds<M>,
    pub(crate) arena: Arena<T, M>,
    pub(crate) top: NodeIdx,
    pub(crate) count: usize,
    pub(crate) load: LoadFactor,
}

impl<T, M, L> Omnitree<T, M, L, Natural>
where
    M: Scalar,
    L: Locate<T, M>,
{
    /// Create an empty tree over `bounds` using the natural order of `M`.
    ///
    /// ```
    /// use smallvec::smallvec;
    /// use understory_omnitree::{Bounds, Omnitree, Point};
    ///
    /// let mut tree = Omnitree::new(
    ///     Bounds::from_slices(&[0.0, 0.0], &[100.0, 100.0]),
    ///     |p: &[f64; 2]| -> Point<f64> { smallvec![p[0], p[1]] },
    /// )
    /// .unwrap();
    /// tree.add([10.0, 20.0]).unwrap();
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn new(bounds: Bounds<M>, locate: L) -> Result<Self, OmnitreeError> {
        Self::with_axis(bounds, locate, Natural)
    }
}

impl<T, M, L, A> Omnitree<T, M, L, A>
where
    M: Clone + Debug,
    L: Locate<T, M>,
    A: Axis<M>,
{
    /// Create an empty tree over `bounds` with a custom axis strategy.
    ///
    /// Fails when `bounds` has no axes, more than [`MAX_AXES`] axes, corners of different
    /// length, a minimum that is not below the maximum on some axis, or an axis average that
    /// falls outside the corners.
    pub fn with_axis(bounds: Bounds<M>, locate: L, axis: A) -> Result<Self, OmnitreeError> {
        let dimensions = bounds.min.len();
        if dimensions == 0 {
            return Err(OmnitreeError::NoAxes);
        }
        if bounds.max.len() != dimensions {
            return Err(OmnitreeError::DimensionMismatch {
                expected: dimensions,
                found: bounds.max.len(),
            });
        }
        let exponent = u32::try_from(dimensions)
            .ok()
            .filter(|&d| d < usize::BITS)
            .ok_or(OmnitreeError::TooManyAxes {
                max: MAX_AXES,
                found: dimensions,
            })?;
        for (i, (lo, hi)) in bounds.min.iter().zip(&bounds.max).enumerate() {
            if axis.compare(lo, hi) != Ordering::Less {
                return Err(OmnitreeError::InvertedBounds { axis: i });
            }
            let mid = axis.average(lo, hi);
            if axis.compare(&mid, lo) == Ordering::Less || axis.compare(&mid, hi) == Ordering::Greater
            {
                return Err(OmnitreeError::InvalidAverage { axis: i });
            }
        }

        let mut arena = Arena::new();
        let top = arena.insert(Node::leaf(bounds.clone(), None, 0, 0));
        Ok(Self {
            axis,
            locate,
            bounds,
            arena,
            top,
            count: 0,
            load: LoadFactor::new(exponent),
        })
    }

    /// Number of axes.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.bounds.min.len()
    }

    /// Number of stored items.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the tree holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The universe every item must lie in.
    #[inline]
    pub fn bounds(&self) -> &Bounds<M> {
        &self.bounds
    }

    /// Minimum corner of the universe.
    #[inline]
    pub fn min(&self) -> &[M] {
        &self.bounds.min
    }

    /// Maximum corner of the universe.
    #[inline]
    pub fn max(&self) -> &[M] {
        &self.bounds.max
    }

    /// Center of the universe, the per-axis average of its corners.
    pub fn origin(&self) -> Point<M> {
        self.bounds.center(&self.axis)
    }

    /// The axis strategy.
    #[inline]
    pub fn axis(&self) -> &A {
        &self.axis
    }

    /// Current load: the leaf capacity and depth limit.
    #[inline]
    pub fn load(&self) -> usize {
        self.load.get()
    }

    /// Depth of the deepest node; zero while the root is a leaf.
    pub fn depth(&self) -> usize {
        self.arena
            .slots
            .iter()
            .flatten()
            .map(|node| node.depth)
            .max()
            .unwrap_or(0)
    }

    /// Current coordinate of `item`, checked to have one value per axis.
    #[inline]
    pub fn locate(&self, item: &T) -> Result<Point<M>, OmnitreeError> {
        locate_checked(&self.locate, self.dimensions(), item)
    }

    /// Insert `item`.
    ///
    /// Fails without inserting when the tree is full, `locate` returns the wrong number of
    /// values, or the coordinate lies outside the universe. Bounds are inclusive on both ends.
    pub fn add(&mut self, item: T) -> Result<(), OmnitreeError> {
        if self.count == usize::MAX {
            return Err(OmnitreeError::CapacityExhausted(self.count));
        }
        let point = self.locate(&item)?;
        if !self.bounds.contains_point(&self.axis, &point) {
            return Err(self.out_of_bounds("add", &point));
        }
        if self.load.grow_for(self.count) {
            debug!(load = self.load.get(), count = self.count, "omnitree load grew");
        }
        self.place(self.top, item, &point)?;
        self.count += 1;
        Ok(())
    }

    /// Insert every item of `items`, stopping at the first failure.
    pub fn try_extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> Result<(), OmnitreeError> {
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }

    /// Remove every item, and reset the load.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.top = self
            .arena
            .insert(Node::leaf(self.bounds.clone(), None, 0, 0));
        self.count = 0;
        self.load.reset();
        debug!("omnitree cleared");
    }

    /// Copy every item into a freshly built tree with the same universe and collaborators.
    ///
    /// Unlike [`Clone`], which copies the current shape as is, the copy is shaped as if its
    /// items had just been added. Fails if an item has moved outside the universe.
    pub fn try_clone(&self) -> Result<Self, OmnitreeError>
    where
        T: Clone,
        L: Clone,
        A: Clone,
    {
        let mut tree = Self::with_axis(self.bounds.clone(), self.locate.clone(), self.axis.clone())?;
        tree.try_extend(self.iter().cloned())?;
        Ok(tree)
    }

    /// Copy every item into a vector, in no particular order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Place a new `item` at or below `idx`, counting it on every node it passes.
    ///
    /// Fails without changing anything if a full leaf on the way cannot be split because one of
    /// its items is no longer in the universe.
    fn place(&mut self, idx: NodeIdx, item: T, point: &[M]) -> Result<(), OmnitreeError> {
        self.descend(idx, item, point, true)
    }

    /// Place an item that is already part of the tree. Never fails: a full leaf that cannot be
    /// split keeps the item anyway.
    fn rehome(&mut self, idx: NodeIdx, item: T, point: &[M]) {
        self.descend(idx, item, point, false)
            .expect("omnitree invariant violated: lenient placement failed");
    }

    fn descend(&mut self, idx: NodeIdx, item: T, point: &[M], strict: bool) -> Result<(), OmnitreeError> {
        let load = self.load.get();
        let node = self.arena.get(idx);
        if let NodeKind::Leaf(items) = &node.kind {
            if node.depth >= load || items.len() < load {
                self.arena.get_mut(idx).push_item(item);
                return Ok(());
            }
            return match self.promote(idx) {
                Ok(()) => self.descend(idx, item, point, strict),
                Err(err) if strict => Err(err),
                Err(_) => {
                    trace!(depth = self.arena.get(idx).depth, "omnitree leaf left unsplit");
                    self.arena.get_mut(idx).push_item(item);
                    Ok(())
                }
            };
        }

        let octant = node.bounds.octant(&self.axis, point);
        match self.child_at(idx, octant) {
            Some(child) => self.descend(child, item, point, strict)?,
            None => {
                let child = self.grow_leaf(idx, octant);
                self.arena.get_mut(child).push_item(item);
            }
        }
        self.arena.get_mut(idx).count += 1;
        Ok(())
    }

    fn child_at(&self, idx: NodeIdx, octant: usize) -> Option<NodeIdx> {
        match &self.arena.get(idx).kind {
            NodeKind::Branch(children) => children.get(&octant).copied(),
            NodeKind::Leaf(_) => None,
        }
    }

    fn grow_leaf(&mut self, parent: NodeIdx, octant: usize) -> NodeIdx {
        let node = self.arena.get(parent);
        let bounds = node.bounds.octant_bounds(&self.axis, octant);
        let depth = node.depth + 1;
        let child = self
            .arena
            .insert(Node::leaf(bounds, Some(parent), octant, depth));
        self.arena.get_mut(parent).children_mut().insert(octant, child);
        child
    }

    /// Turn the leaf at `idx` into a branch in place and redistribute its items.
    ///
    /// Every item is located before anything changes; the redistribution reuses those
    /// coordinates and cannot fail. Items that no longer lie in the leaf's box are relocated
    /// from the nearest enclosing ancestor.
    fn promote(&mut self, idx: NodeIdx) -> Result<(), OmnitreeError> {
        let points = self
            .arena
            .get(idx)
            .items()
            .iter()
            .map(|item| self.locate_in_universe(item, "add"))
            .collect::<Result<Vec<_>, _>>()?;

        let node = self.arena.get_mut(idx);
        let kind = core::mem::replace(&mut node.kind, NodeKind::Branch(Children::new()));
        let NodeKind::Leaf(items) = kind else {
            unreachable!("omnitree invariant violated: promoting a branch")
        };
        node.count = 0;
        let parent = node.parent;
        trace!(depth = node.depth, items = items.len(), "omnitree leaf promoted");

        for (item, point) in items.into_iter().zip(points) {
            self.redistribute(idx, parent, item, &point);
        }
        Ok(())
    }

    /// Turn the branch at `idx` back into a leaf holding everything below it.
    ///
    /// Fails before changing anything if an item below `idx` cannot be located in the
    /// universe. Items that no longer lie in the node's box are relocated from the nearest
    /// enclosing ancestor.
    pub(crate) fn demote(&mut self, idx: NodeIdx, operation: &'static str) -> Result<(), OmnitreeError> {
        self.check_subtree(idx, operation)?;

        let node = self.arena.get_mut(idx);
        let kind = core::mem::replace(&mut node.kind, NodeKind::Leaf(Vec::new()));
        let mut items = Vec::with_capacity(node.count);
        node.count = 0;
        let parent = node.parent;
        if let NodeKind::Branch(children) = kind {
            for child in children.into_values() {
                self.arena.drain_subtree(child, &mut items);
            }
        }
        trace!(
            depth = self.arena.get(idx).depth,
            items = items.len(),
            "omnitree branch demoted"
        );

        for item in items {
            match self.locate_in_universe(&item, operation) {
                Ok(point) => self.redistribute(idx, parent, item, &point),
                // Only a locate that changed its answer since the check gets here.
                Err(_) => self.arena.get_mut(idx).push_item(item),
            }
        }
        Ok(())
    }

    /// Put an item that was counted on `idx`'s ancestors back below `idx`, or relocate it if
    /// it has left `idx`'s box.
    fn redistribute(&mut self, idx: NodeIdx, parent: Option<NodeIdx>, item: T, point: &[M]) {
        if self.arena.get(idx).bounds.contains_point(&self.axis, point) {
            self.rehome(idx, item, point);
        } else {
            self.reinsert_from(parent, item, point);
        }
    }

    /// Demote the branch at `idx` if it has fallen under the load.
    ///
    /// An empty non-root branch is left for its parent to chop; an empty root becomes an
    /// empty leaf.
    pub(crate) fn settle(&mut self, idx: NodeIdx, operation: &'static str) -> Result<(), OmnitreeError> {
        let node = self.arena.get(idx);
        if node.is_leaf()
            || node.count >= self.load.get()
            || (node.count == 0 && node.parent.is_some())
        {
            return Ok(());
        }
        self.demote(idx, operation)
    }

    /// Detach `child` from `parent` and free it, dropping anything it still holds.
    pub(crate) fn chop(&mut self, parent: NodeIdx, octant: usize, child: NodeIdx) {
        self.arena.get_mut(parent).children_mut().remove(&octant);
        let mut dropped = Vec::new();
        self.arena.drain_subtree(child, &mut dropped);
    }

    /// Move an item that is counted on `start` and its ancestors up to the nearest ancestor
    /// enclosing `point`, uncounting it on the way, and place it from there.
    ///
    /// `point` must lie in the universe.
    pub(crate) fn reinsert_from(&mut self, start: Option<NodeIdx>, item: T, point: &[M]) {
        let mut cursor = start;
        while let Some(idx) = cursor {
            let node = self.arena.get_mut(idx);
            node.count -= 1;
            if node.bounds.contains_point(&self.axis, point) {
                trace!(depth = node.depth, "omnitree item relocated");
                self.rehome(idx, item, point);
                return;
            }
            cursor = node.parent;
        }
        unreachable!("omnitree invariant violated: the root encloses every in-bounds coordinate")
    }

    /// Current coordinate of `item`, which must lie in the universe.
    fn locate_in_universe(
        &self,
        item: &T,
        operation: &'static str,
    ) -> Result<Point<M>, OmnitreeError> {
        let point = self.locate(item)?;
        if self.bounds.contains_point(&self.axis, &point) {
            Ok(point)
        } else {
            Err(self.out_of_bounds(operation, &point))
        }
    }

    /// Check that every item below `idx` locates inside the universe.
    pub(crate) fn check_subtree(&self, idx: NodeIdx, operation: &'static str) -> Result<(), OmnitreeError> {
        let mut stack: SmallVec<[NodeIdx; 16]> = smallvec![idx];
        while let Some(idx) = stack.pop() {
            match &self.arena.get(idx).kind {
                NodeKind::Leaf(items) => {
                    for item in items {
                        self.locate_in_universe(item, operation)?;
                    }
                }
                NodeKind::Branch(children) => stack.extend(children.values().copied()),
            }
        }
        Ok(())
    }

    pub(crate) fn check_dimensions(&self, found: usize) -> Result<(), OmnitreeError> {
        if found == self.dimensions() {
            Ok(())
        } else {
            Err(OmnitreeError::DimensionMismatch {
                expected: self.dimensions(),
                found,
            })
        }
    }

    pub(crate) fn check_region(&self, region: &Bounds<M>) -> Result<(), OmnitreeError> {
        self.check_dimensions(region.min.len())?;
        self.check_dimensions(region.max.len())
    }

    pub(crate) fn out_of_bounds(&self, operation: &'static str, point: &[M]) -> OmnitreeError {
        OmnitreeError::OutOfBounds {
            operation,
            point: format!("{point:?}"),
            min: format!("{:?}", self.bounds.min.as_slice()),
            max: format!("{:?}", self.bounds.max.as_slice()),
        }
    }

    /// Panic unless the structure is consistent: containment, counts, octant geometry,
    /// parent links, depths, and no leaked or empty non-root nodes.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self)
    where
        M: PartialEq,
    {
        let top = self.arena.get(self.top);
        assert_eq!(top.count, self.count, "tree count equals root count");
        assert!(top.parent.is_none(), "root has no parent");

        let mut stack = alloc::vec![self.top];
        let mut reached = 0;
        while let Some(idx) = stack.pop() {
            reached += 1;
            let node = self.arena.get(idx);
            match &node.kind {
                NodeKind::Leaf(items) => {
                    assert_eq!(node.count, items.len(), "leaf count equals its items");
                    for item in items {
                        let point = self.locate(item).unwrap();
                        assert!(
                            node.bounds.contains_point(&self.axis, &point),
                            "leaf at depth {} holds an item outside of it",
                            node.depth
                        );
                    }
                }
                NodeKind::Branch(children) => {
                    let sum: usize = children.values().map(|&c| self.arena.get(c).count).sum();
                    assert_eq!(node.count, sum, "branch count equals sum of children");
                    for (&octant, &child) in children {
                        let c = self.arena.get(child);
                        assert!(c.count > 0, "empty children are chopped");
                        assert_eq!(c.parent, Some(idx), "child links back to its parent");
                        assert_eq!(c.octant, octant, "child knows its octant");
                        assert_eq!(c.depth, node.depth + 1, "child is one level deeper");
                        assert!(
                            c.bounds == node.bounds.octant_bounds(&self.axis, octant),
                            "child box is the bisected parent box"
                        );
                        stack.push(child);
                    }
                }
            }
        }
        assert_eq!(reached, self.arena.live(), "every live node is reachable");
    }
}

impl<T, M: Debug, L, A> Debug for Omnitree<T, M, L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Omnitree")
            .field("bounds", &self.bounds)
            .field("count", &self.count)
            .field("load", &self.load.get())
            .field("nodes", &self.arena.live())
            .finish_non_exhaustive()
    }
}
