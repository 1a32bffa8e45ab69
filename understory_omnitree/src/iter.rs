// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazy iteration over all items, a region, or a coordinate.

use core::fmt::{self, Debug};
use core::iter::FusedIterator;
use core::slice;

use smallvec::{SmallVec, smallvec};

use crate::axis::Axis;
use crate::error::OmnitreeError;
use crate::locate::Locate;
use crate::node::{Node, NodeIdx, NodeKind};
use crate::traverse::{Prune, Scope};
use crate::tree::Omnitree;
use crate::types::Bounds;

/// Iterator over every item of an [`Omnitree`], in no particular order.
///
/// Created by [`Omnitree::iter`].
pub struct Iter<'a, T, M> {
    nodes: slice::Iter<'a, Option<Node<T, M>>>,
    items: slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T, M> Iterator for Iter<'a, T, M> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.items.next() {
                self.remaining -= 1;
                return Some(item);
            }
            if let Some(node) = self.nodes.next()? {
                self.items = node.items().iter();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, M> ExactSizeIterator for Iter<'_, T, M> {}
impl<T, M> FusedIterator for Iter<'_, T, M> {}

impl<T, M> Debug for Iter<'_, T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

/// Mutable iterator over every item of an [`Omnitree`], in no particular order.
///
/// Created by [`Omnitree::iter_mut`].
pub struct IterMut<'a, T, M> {
    nodes: slice::IterMut<'a, Option<Node<T, M>>>,
    items: slice::IterMut<'a, T>,
    remaining: usize,
}

impl<'a, T, M> Iterator for IterMut<'a, T, M> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        loop {
            if let Some(item) = self.items.next() {
                self.remaining -= 1;
                return Some(item);
            }
            if let Some(Node {
                kind: NodeKind::Leaf(items),
                ..
            }) = self.nodes.next()?
            {
                self.items = items.iter_mut();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, M> ExactSizeIterator for IterMut<'_, T, M> {}
impl<T, M> FusedIterator for IterMut<'_, T, M> {}

impl<T, M> Debug for IterMut<'_, T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

/// Lazy iterator over the items in a region or at a coordinate.
///
/// Items are located as they are reached, so a misbehaving [`Locate`] shows up as an `Err`
/// item, after which the iterator is exhausted. Created by [`Omnitree::query_rect`] and
/// [`Omnitree::query_point`].
pub struct Query<'a, T, M, L, A> {
    tree: &'a Omnitree<T, M, L, A>,
    scope: Scope<'a, M>,
    /// Pending nodes, and whether their subtree is known to lie inside the scope.
    stack: SmallVec<[(NodeIdx, bool); 16]>,
    items: slice::Iter<'a, T>,
    whole: bool,
    error: Option<OmnitreeError>,
}

impl<'a, T, M, L, A> Query<'a, T, M, L, A> {
    fn new(
        tree: &'a Omnitree<T, M, L, A>,
        scope: Scope<'a, M>,
        checked: Result<(), OmnitreeError>,
    ) -> Self {
        let (stack, error) = match checked {
            Ok(()) => (smallvec![(tree.top, false)], None),
            Err(err) => (SmallVec::new(), Some(err)),
        };
        Self {
            tree,
            scope,
            stack,
            items: slice::Iter::default(),
            whole: false,
            error,
        }
    }

    fn fail(&mut self, err: OmnitreeError) -> Option<Result<&'a T, OmnitreeError>> {
        self.stack.clear();
        self.items = slice::Iter::default();
        Some(Err(err))
    }
}

impl<'a, T, M, L, A> Iterator for Query<'a, T, M, L, A>
where
    M: Clone + Debug,
    L: Locate<T, M>,
    A: Axis<M>,
{
    type Item = Result<&'a T, OmnitreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.error.take() {
            return self.fail(err);
        }
        let tree = self.tree;
        let axis = &tree.axis;
        loop {
            while let Some(item) = self.items.next() {
                if self.whole {
                    return Some(Ok(item));
                }
                match tree.locate(item) {
                    Ok(point) if self.scope.admits(axis, &point) => return Some(Ok(item)),
                    Ok(_) => {}
                    Err(err) => return self.fail(err),
                }
            }

            let (idx, whole) = self.stack.pop()?;
            let node = tree.arena.get(idx);
            let whole = whole
                || match self.scope.prune(axis, &node.bounds) {
                    Prune::Skip => continue,
                    Prune::Whole => true,
                    Prune::Descend => false,
                };
            match &node.kind {
                NodeKind::Leaf(items) => {
                    self.items = items.iter();
                    self.whole = whole;
                }
                NodeKind::Branch(children) => {
                    self.stack.extend(children.values().map(|&child| (child, whole)));
                }
            }
        }
    }
}

impl<T, M, L, A> FusedIterator for Query<'_, T, M, L, A>
where
    M: Clone + Debug,
    L: Locate<T, M>,
    A: Axis<M>,
{
}

impl<T, M, L, A> Debug for Query<'_, T, M, L, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("pending_nodes", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl<T, M, L, A> Omnitree<T, M, L, A> {
    /// Iterate over every item, in no particular order.
    pub fn iter(&self) -> Iter<'_, T, M> {
        Iter {
            nodes: self.arena.slots.iter(),
            items: slice::Iter::default(),
            remaining: self.count,
        }
    }

    /// Iterate mutably over every item, in no particular order.
    ///
    /// Changing an item's coordinate is allowed; follow up with [`update`](Self::update).
    pub fn iter_mut(&mut self) -> IterMut<'_, T, M> {
        IterMut {
            nodes: self.arena.slots.iter_mut(),
            items: slice::IterMut::default(),
            remaining: self.count,
        }
    }
}

impl<T, M, L, A> Omnitree<T, M, L, A>
where
    M: Clone + Debug,
    L: Locate<T, M>,
    A: Axis<M>,
{
    /// Lazily iterate over the items whose coordinate lies in `region`, edges included.
    ///
    /// ```
    /// use smallvec::smallvec;
    /// use understory_omnitree::{Bounds, Omnitree, Point};
    ///
    /// let mut tree = Omnitree::new(
    ///     Bounds::from_slices(&[-11.0; 3], &[11.0; 3]),
    ///     |i: &i32| -> Point<f64> { smallvec![f64::from(*i); 3] },
    /// )
    /// .unwrap();
    /// tree.try_extend(0..10).unwrap();
    ///
    /// let region = Bounds::from_slices(&[5.0; 3], &[10.0; 3]);
    /// let mut hits = tree.query_rect(&region).collect::<Result<Vec<_>, _>>().unwrap();
    /// hits.sort();
    /// assert_eq!(hits, [&5, &6, &7, &8, &9]);
    /// ```
    pub fn query_rect<'a>(&'a self, region: &'a Bounds<M>) -> Query<'a, T, M, L, A> {
        let checked = self.check_region(region);
        Query::new(self, Scope::Region(region), checked)
    }

    /// Lazily iterate over the items located exactly at `point`, per [`Axis::equate`].
    pub fn query_point<'a>(&'a self, point: &'a [M]) -> Query<'a, T, M, L, A> {
        let checked = self.check_dimensions(point.len());
        Query::new(self, Scope::At(point), checked)
    }
}

impl<'a, T, M, L, A> IntoIterator for &'a Omnitree<T, M, L, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, M, L, A> IntoIterator for &'a mut Omnitree<T, M, L, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
