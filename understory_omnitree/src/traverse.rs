// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visitors over the whole tree, a region, or a single coordinate.
//!
//! Each query shape comes in four flavors: plain, mutating, breakable (`_until`), and
//! breakable + mutating. All of them run on one of two recursive walkers.

use core::fmt::Debug;

use tracing::trace;

use crate::axis::Axis;
use crate::error::OmnitreeError;
use crate::locate::{Locate, locate_checked};
use crate::node::{NodeIdx, NodeKind};
use crate::step::StepStatus;
use crate::tree::Omnitree;
use crate::types::{Bounds, coordinates_equal};

/// Which items an operation is restricted to.
pub(crate) enum Scope<'a, M> {
    Everywhere,
    Region(&'a Bounds<M>),
    At(&'a [M]),
}

impl<M> Clone for Scope<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Scope<'_, M> {}

/// What to do with a whole subtree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Prune {
    /// Nothing inside can match.
    Skip,
    /// Everything inside matches.
    Whole,
    /// Check the children (or items).
    Descend,
}

impl<M> Scope<'_, M> {
    #[inline]
    pub(crate) fn prune<A: Axis<M>>(&self, axis: &A, bounds: &Bounds<M>) -> Prune {
        match self {
            Self::Everywhere => Prune::Whole,
            Self::Region(region) => {
                if !region.overlaps(axis, bounds) {
                    Prune::Skip
                } else if region.encloses(axis, bounds) {
                    Prune::Whole
                } else {
                    Prune::Descend
                }
            }
            Self::At(point) => {
                if bounds.contains_point(axis, point) {
                    Prune::Descend
                } else {
                    Prune::Skip
                }
            }
        }
    }

    #[inline]
    pub(crate) fn admits<A: Axis<M>>(&self, axis: &A, point: &[M]) -> bool {
        match self {
            Self::Everywhere => true,
            Self::Region(region) => region.contains_point(axis, point),
            Self::At(at) => coordinates_equal(axis, at, point),
        }
    }

    #[inline]
    pub(crate) fn is_everywhere(&self) -> bool {
        matches!(self, Self::Everywhere)
    }
}

/// Map a callback's signal to "keep going" (`None`) or the status to stop with.
#[inline]
fn stop_on(status: StepStatus) -> Result<Option<StepStatus>, OmnitreeError> {
    match status {
        StepStatus::Continue => Ok(None),
        StepStatus::Break | StepStatus::Restart => Ok(Some(status)),
        StepStatus::Previous => Err(OmnitreeError::InvalidStep(status)),
    }
}

impl<T, M, L, A> Omnitree<T, M, L, A>
where
    M: Clone + Debug,
    L: Locate<T, M>,
    A: Axis<M>,
{
    /// Call `f` on every item.
    pub fn visit(&self, f: impl FnMut(&T)) {
        self.iter().for_each(f);
    }

    /// Call `f` on every item, allowing in-place changes.
    ///
    /// Changing an item's coordinate is allowed; follow up with [`update`](Self::update).
    pub fn visit_mut(&mut self, f: impl FnMut(&mut T)) {
        self.iter_mut().for_each(f);
    }

    /// Call `f` on every item until it returns [`StepStatus::Break`].
    ///
    /// [`StepStatus::Restart`] starts the traversal over from the top. Returns the status that
    /// ended the traversal, or fails with [`OmnitreeError::InvalidStep`] on
    /// [`StepStatus::Previous`].
    ///
    /// ```
    /// use smallvec::smallvec;
    /// use understory_omnitree::{Bounds, Omnitree, Point, StepStatus};
    ///
    /// let mut tree = Omnitree::new(Bounds::from_slices(&[0], &[100]), |v: &i64| -> Point<i64> {
    ///     smallvec![*v]
    /// })
    /// .unwrap();
    /// tree.try_extend(0..50).unwrap();
    ///
    /// let mut seen = 0;
    /// let status = tree
    ///     .visit_until(|_| {
    ///         seen += 1;
    ///         if seen == 10 { StepStatus::Break } else { StepStatus::Continue }
    ///     })
    ///     .unwrap();
    /// assert_eq!(status, StepStatus::Break);
    /// assert_eq!(seen, 10);
    /// ```
    pub fn visit_until(
        &self,
        mut f: impl FnMut(&T) -> StepStatus,
    ) -> Result<StepStatus, OmnitreeError> {
        self.run(Scope::Everywhere, &mut f)
    }

    /// Mutating form of [`visit_until`](Self::visit_until).
    pub fn visit_mut_until(
        &mut self,
        mut f: impl FnMut(&mut T) -> StepStatus,
    ) -> Result<StepStatus, OmnitreeError> {
        self.run_mut(Scope::Everywhere, &mut f)
    }

    /// Call `f` on every item whose coordinate lies in `region`, edges included.
    ///
    /// Subtrees strictly inside the region are visited without locating their items; subtrees
    /// outside it are skipped.
    pub fn visit_rect(&self, region: &Bounds<M>, mut f: impl FnMut(&T)) -> Result<(), OmnitreeError> {
        self.check_region(region)?;
        self.run(Scope::Region(region), &mut |item: &T| {
            f(item);
            StepStatus::Continue
        })
        .map(drop)
    }

    /// Mutating form of [`visit_rect`](Self::visit_rect).
    pub fn visit_rect_mut(
        &mut self,
        region: &Bounds<M>,
        mut f: impl FnMut(&mut T),
    ) -> Result<(), OmnitreeError> {
        self.check_region(region)?;
        self.run_mut(Scope::Region(region), &mut |item: &mut T| {
            f(item);
            StepStatus::Continue
        })
        .map(drop)
    }

    /// Breakable form of [`visit_rect`](Self::visit_rect).
    pub fn visit_rect_until(
        &self,
        region: &Bounds<M>,
        mut f: impl FnMut(&T) -> StepStatus,
    ) -> Result<StepStatus, OmnitreeError> {
        self.check_region(region)?;
        self.run(Scope::Region(region), &mut f)
    }

    /// Breakable, mutating form of [`visit_rect`](Self::visit_rect).
    pub fn visit_rect_mut_until(
        &mut self,
        region: &Bounds<M>,
        mut f: impl FnMut(&mut T) -> StepStatus,
    ) -> Result<StepStatus, OmnitreeError> {
        self.check_region(region)?;
        self.run_mut(Scope::Region(region), &mut f)
    }

    /// Call `f` on every item located exactly at `point`, per [`Axis::equate`].
    pub fn visit_point(&self, point: &[M], mut f: impl FnMut(&T)) -> Result<(), OmnitreeError> {
        self.check_dimensions(point.len())?;
        self.run(Scope::At(point), &mut |item: &T| {
            f(item);
            StepStatus::Continue
        })
        .map(drop)
    }

    /// Mutating form of [`visit_point`](Self::visit_point).
    pub fn visit_point_mut(
        &mut self,
        point: &[M],
        mut f: impl FnMut(&mut T),
    ) -> Result<(), OmnitreeError> {
        self.check_dimensions(point.len())?;
        self.run_mut(Scope::At(point), &mut |item: &mut T| {
            f(item);
            StepStatus::Continue
        })
        .map(drop)
    }

    /// Breakable form of [`visit_point`](Self::visit_point).
    pub fn visit_point_until(
        &self,
        point: &[M],
        mut f: impl FnMut(&T) -> StepStatus,
    ) -> Result<StepStatus, OmnitreeError> {
        self.check_dimensions(point.len())?;
        self.run(Scope::At(point), &mut f)
    }

    /// Breakable, mutating form of [`visit_point`](Self::visit_point).
    pub fn visit_point_mut_until(
        &mut self,
        point: &[M],
        mut f: impl FnMut(&mut T) -> StepStatus,
    ) -> Result<StepStatus, OmnitreeError> {
        self.check_dimensions(point.len())?;
        self.run_mut(Scope::At(point), &mut f)
    }

    /// Number of items whose coordinate lies in `region`, edges included.
    ///
    /// Subtrees strictly inside the region contribute their count without being visited.
    pub fn count_in(&self, region: &Bounds<M>) -> Result<usize, OmnitreeError> {
        self.check_region(region)?;
        self.count_node(self.top, Scope::Region(region))
    }

    fn count_node(&self, idx: NodeIdx, scope: Scope<'_, M>) -> Result<usize, OmnitreeError> {
        let node = self.arena.get(idx);
        match scope.prune(&self.axis, &node.bounds) {
            Prune::Skip => Ok(0),
            Prune::Whole => Ok(node.count),
            Prune::Descend => match &node.kind {
                NodeKind::Leaf(items) => {
                    let mut n = 0;
                    for item in items {
                        if scope.admits(&self.axis, &self.locate(item)?) {
                            n += 1;
                        }
                    }
                    Ok(n)
                }
                NodeKind::Branch(children) => children
                    .values()
                    .map(|&child| self.count_node(child, scope))
                    .sum(),
            },
        }
    }

    fn run<F>(&self, scope: Scope<'_, M>, f: &mut F) -> Result<StepStatus, OmnitreeError>
    where
        F: FnMut(&T) -> StepStatus,
    {
        loop {
            match self.walk(self.top, scope, f)? {
                StepStatus::Restart => trace!("omnitree traversal restarted"),
                status => return Ok(status),
            }
        }
    }

    fn run_mut<F>(&mut self, scope: Scope<'_, M>, f: &mut F) -> Result<StepStatus, OmnitreeError>
    where
        F: FnMut(&mut T) -> StepStatus,
    {
        loop {
            match self.walk_mut(self.top, scope, f)? {
                StepStatus::Restart => trace!("omnitree traversal restarted"),
                status => return Ok(status),
            }
        }
    }

    fn walk<F>(&self, idx: NodeIdx, scope: Scope<'_, M>, f: &mut F) -> Result<StepStatus, OmnitreeError>
    where
        F: FnMut(&T) -> StepStatus,
    {
        let node = self.arena.get(idx);
        let scope = match scope.prune(&self.axis, &node.bounds) {
            Prune::Skip => return Ok(StepStatus::Continue),
            Prune::Whole => Scope::Everywhere,
            Prune::Descend => scope,
        };
        match &node.kind {
            NodeKind::Leaf(items) => {
                for item in items {
                    if !scope.is_everywhere() && !scope.admits(&self.axis, &self.locate(item)?) {
                        continue;
                    }
                    if let Some(status) = stop_on(f(item))? {
                        return Ok(status);
                    }
                }
            }
            NodeKind::Branch(children) => {
                for &child in children.values() {
                    match self.walk(child, scope, f)? {
                        StepStatus::Continue => {}
                        status => return Ok(status),
                    }
                }
            }
        }
        Ok(StepStatus::Continue)
    }

    fn walk_mut<F>(
        &mut self,
        idx: NodeIdx,
        scope: Scope<'_, M>,
        f: &mut F,
    ) -> Result<StepStatus, OmnitreeError>
    where
        F: FnMut(&mut T) -> StepStatus,
    {
        let dimensions = self.dimensions();
        let node = self.arena.get(idx);
        let scope = match scope.prune(&self.axis, &node.bounds) {
            Prune::Skip => return Ok(StepStatus::Continue),
            Prune::Whole => Scope::Everywhere,
            Prune::Descend => scope,
        };
        if node.is_leaf() {
            let (arena, locate, axis) = (&mut self.arena, &self.locate, &self.axis);
            for item in arena.get_mut(idx).items_mut() {
                if !scope.is_everywhere() {
                    let point = locate_checked(locate, dimensions, item)?;
                    if !scope.admits(axis, &point) {
                        continue;
                    }
                }
                if let Some(status) = stop_on(f(item))? {
                    return Ok(status);
                }
            }
            return Ok(StepStatus::Continue);
        }
        for (_, child) in node.child_snapshot() {
            match self.walk_mut(child, scope, f)? {
                StepStatus::Continue => {}
                status => return Ok(status),
            }
        }
        Ok(StepStatus::Continue)
    }
}
