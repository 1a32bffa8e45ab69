// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Removal by predicate, region, coordinate, or item.

use alloc::vec::Vec;
use core::fmt::Debug;

use tracing::debug;

use crate::axis::Axis;
use crate::error::OmnitreeError;
use crate::locate::Locate;
use crate::node::{NodeIdx, NodeKind};
use crate::traverse::{Prune, Scope};
use crate::tree::Omnitree;
use crate::types::Bounds;

/// Predicate type used when a removal has no predicate.
type NoPredicate<T> = fn(&T) -> bool;

impl<T, M, L, A> Omnitree<T, M, L, A>
where
    M: Clone + Debug,
    L: Locate<T, M>,
    A: Axis<M>,
{
    /// Remove every item matching `predicate`. Returns how many were removed.
    pub fn remove_where(&mut self, predicate: impl FnMut(&T) -> bool) -> Result<usize, OmnitreeError> {
        self.cull_top(Scope::Everywhere, Some(predicate))
    }

    /// Remove every item whose coordinate lies in `region`, edges included.
    ///
    /// Subtrees strictly inside the region are dropped whole. Returns how many items were
    /// removed.
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
    /// let removed = tree.remove_in(&Bounds::from_slices(&[0.0; 3], &[3.0; 3])).unwrap();
    /// assert_eq!(removed, 4);
    /// assert_eq!(tree.len(), 6);
    /// ```
    pub fn remove_in(&mut self, region: &Bounds<M>) -> Result<usize, OmnitreeError> {
        self.check_region(region)?;
        self.cull_top(Scope::Region(region), None::<NoPredicate<T>>)
    }

    /// Remove every item in `region` that also matches `predicate`.
    pub fn remove_in_where(
        &mut self,
        region: &Bounds<M>,
        predicate: impl FnMut(&T) -> bool,
    ) -> Result<usize, OmnitreeError> {
        self.check_region(region)?;
        self.cull_top(Scope::Region(region), Some(predicate))
    }

    /// Remove every item located exactly at `point`, per [`Axis::equate`].
    pub fn remove_at(&mut self, point: &[M]) -> Result<usize, OmnitreeError> {
        self.check_dimensions(point.len())?;
        self.cull_top(Scope::At(point), None::<NoPredicate<T>>)
    }

    /// Remove every item located exactly at `point` that also matches `predicate`.
    pub fn remove_at_where(
        &mut self,
        point: &[M],
        predicate: impl FnMut(&T) -> bool,
    ) -> Result<usize, OmnitreeError> {
        self.check_dimensions(point.len())?;
        self.cull_top(Scope::At(point), Some(predicate))
    }

    /// Remove every stored item equal to `item` at `item`'s current coordinate.
    pub fn remove_item(&mut self, item: &T) -> Result<usize, OmnitreeError>
    where
        T: PartialEq,
    {
        self.remove_item_by(item, |a, b| a == b)
    }

    /// Remove every stored item that `equate` considers equal to `item`, looking only at
    /// `item`'s current coordinate.
    pub fn remove_item_by(
        &mut self,
        item: &T,
        mut equate: impl FnMut(&T, &T) -> bool,
    ) -> Result<usize, OmnitreeError> {
        let point = self.locate(item)?;
        self.remove_at_where(&point, |stored| equate(stored, item))
    }

    fn cull_top<P>(&mut self, scope: Scope<'_, M>, mut predicate: Option<P>) -> Result<usize, OmnitreeError>
    where
        P: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        let result = self.cull(self.top, scope, &mut predicate, &mut removed);
        self.count -= removed;
        if self.load.shrink_for(self.count) {
            debug!(load = self.load.get(), count = self.count, "omnitree load shrank");
        }
        result.map(|()| removed)
    }

    /// Remove matching items below `idx`, adding their number to `removed`.
    ///
    /// Counts stay consistent even when an error stops the walk part way: a leaf is only
    /// changed once every one of its items has been checked, and each branch subtracts what
    /// its children removed before propagating.
    fn cull<P>(
        &mut self,
        idx: NodeIdx,
        scope: Scope<'_, M>,
        predicate: &mut Option<P>,
        removed: &mut usize,
    ) -> Result<(), OmnitreeError>
    where
        P: FnMut(&T) -> bool,
    {
        let entry = *removed;
        let node = self.arena.get(idx);
        if let NodeKind::Leaf(items) = &node.kind {
            let mut doomed = Vec::with_capacity(items.len());
            for item in items {
                let in_scope = scope.is_everywhere() || scope.admits(&self.axis, &self.locate(item)?);
                doomed.push(in_scope && predicate.as_mut().is_none_or(|p| p(item)));
            }
            let hits = doomed.iter().filter(|&&d| d).count();
            if hits > 0 {
                let node = self.arena.get_mut(idx);
                let mut doomed = doomed.into_iter();
                node.items_mut().retain(|_| !doomed.next().unwrap_or(false));
                node.count -= hits;
                *removed += hits;
            }
            return Ok(());
        }

        let mut result = Ok(());
        for (octant, child) in node.child_snapshot() {
            let before = *removed;
            let prune = scope.prune(&self.axis, &self.arena.get(child).bounds);
            let chopped = match prune {
                Prune::Skip => continue,
                Prune::Whole if predicate.is_none() => {
                    *removed += self.arena.get(child).count;
                    self.chop(idx, octant, child);
                    true
                }
                Prune::Whole => {
                    result = self.cull(child, Scope::Everywhere, predicate, removed);
                    false
                }
                Prune::Descend => {
                    result = self.cull(child, scope, predicate, removed);
                    false
                }
            };
            self.arena.get_mut(idx).count -= *removed - before;
            if !chopped && self.arena.get(child).count == 0 {
                self.chop(idx, octant, child);
            }
            if result.is_err() {
                break;
            }
        }
        result?;
        if *removed > entry {
            self.settle(idx, "remove")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::OmnitreeError;
    use crate::tree::Omnitree;
    use crate::types::{Bounds, Point};
    use alloc::vec::Vec;
    use smallvec::smallvec;

    #[derive(Clone, Debug, PartialEq)]
    struct Tagged {
        pos: [f64; 2],
        tag: u32,
    }

    type Plane = Omnitree<Tagged, f64, fn(&Tagged) -> Point<f64>>;

    fn plane() -> Plane {
        fn at(t: &Tagged) -> Point<f64> {
            smallvec![t.pos[0], t.pos[1]]
        }
        Omnitree::new(
            Bounds::from_slices(&[0.0, 0.0], &[100.0, 100.0]),
            at as fn(&Tagged) -> Point<f64>,
        )
        .unwrap()
    }

    fn filled() -> Plane {
        let mut tree = plane();
        let mut tag = 0;
        for x in 0..20 {
            for y in 0..20 {
                tree.add(Tagged {
                    pos: [f64::from(x) * 5.0, f64::from(y) * 5.0],
                    tag,
                })
                .unwrap();
                tag += 1;
            }
        }
        tree
    }

    fn tags(tree: &Plane) -> Vec<u32> {
        let mut v: Vec<_> = tree.iter().map(|t| t.tag).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn remove_where_by_predicate() {
        let mut tree = filled();
        let removed = tree.remove_where(|t| t.tag % 3 == 0).unwrap();
        assert_eq!(removed, 134);
        assert_eq!(tree.len(), 400 - 134);
        assert!(tree.iter().all(|t| t.tag % 3 != 0));
        tree.assert_invariants();
    }

    #[test]
    fn remove_in_drops_exactly_the_region() {
        let mut tree = filled();
        let region = Bounds::from_slices(&[10.0, 10.0], &[52.0, 30.0]);
        let expected = tree
            .iter()
            .filter(|t| (10.0..=52.0).contains(&t.pos[0]) && (10.0..=30.0).contains(&t.pos[1]))
            .count();
        assert_eq!(tree.remove_in(&region).unwrap(), expected);
        assert_eq!(tree.len(), 400 - expected);
        assert_eq!(tree.count_in(&region).unwrap(), 0);
        tree.assert_invariants();
    }

    #[test]
    fn remove_in_whole_universe_empties_the_tree() {
        let mut tree = filled();
        let everything = Bounds::from_slices(&[-1.0, -1.0], &[101.0, 101.0]);
        assert_eq!(tree.remove_in(&everything).unwrap(), 400);
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.load(), crate::MIN_LOAD);
        tree.assert_invariants();
    }

    #[test]
    fn remove_in_where_combines_both_tests() {
        let mut tree = filled();
        let region = Bounds::from_slices(&[0.0, 0.0], &[50.0, 50.0]);
        let expected = tree
            .iter()
            .filter(|t| t.pos[0] <= 50.0 && t.pos[1] <= 50.0 && t.tag % 2 == 0)
            .count();
        let removed = tree.remove_in_where(&region, |t| t.tag % 2 == 0).unwrap();
        assert_eq!(removed, expected);
        assert!(
            tree.iter()
                .all(|t| !(t.pos[0] <= 50.0 && t.pos[1] <= 50.0 && t.tag % 2 == 0))
        );
        tree.assert_invariants();
    }

    #[test]
    fn remove_at_and_remove_item() {
        let mut tree = filled();
        let twin = Tagged {
            pos: [25.0, 25.0],
            tag: 9_999,
        };
        tree.add(twin.clone()).unwrap();
        assert_eq!(tree.len(), 401);

        assert_eq!(tree.remove_item(&twin).unwrap(), 1);
        assert_eq!(tree.len(), 400);
        assert_eq!(tree.query_point(&[25.0, 25.0]).count(), 1);
        assert!(tree.iter().all(|t| t.tag != 9_999));

        assert_eq!(tree.remove_at(&[25.0, 25.0]).unwrap(), 1);
        assert_eq!(tree.remove_at(&[25.0, 25.0]).unwrap(), 0);
        assert_eq!(tree.len(), 399);
        tree.assert_invariants();
    }

    #[test]
    fn remove_at_where_keeps_non_matching_twins() {
        let mut tree = plane();
        for tag in 0..6 {
            tree.add(Tagged {
                pos: [1.0, 1.0],
                tag,
            })
            .unwrap();
        }
        assert_eq!(tree.remove_at_where(&[1.0, 1.0], |t| t.tag >= 4).unwrap(), 2);
        assert_eq!(tags(&tree), [0, 1, 2, 3]);
        tree.assert_invariants();
    }

    #[test]
    fn removing_everything_then_refilling() {
        let mut tree = filled();
        assert_eq!(tree.remove_where(|_| true).unwrap(), 400);
        assert!(tree.is_empty());
        tree.assert_invariants();
        tree.add(Tagged {
            pos: [3.0, 4.0],
            tag: 1,
        })
        .unwrap();
        assert_eq!(tags(&tree), [1]);
        tree.assert_invariants();
    }

    #[test]
    fn load_shrinks_after_removal() {
        let mut tree = filled();
        let grown = tree.load();
        assert!(grown > crate::MIN_LOAD, "400 items in 2D grow the load");
        tree.remove_where(|t| t.tag >= 10).unwrap();
        assert!(tree.load() < grown);
        // 3^2 = 9 <= 10
        assert_eq!(tree.load(), 3);
        tree.assert_invariants();
    }

    #[test]
    fn removal_keeps_tree_consistent_when_locate_fails() {
        let mut tree = Omnitree::new(Bounds::from_slices(&[0.0], &[10.0]), |v: &Vec<f64>| {
            v.iter().copied().collect::<Point<f64>>()
        })
        .unwrap();
        for i in 0..8 {
            tree.add(alloc::vec![f64::from(i)]).unwrap();
        }
        // Corrupt one item so it no longer locates.
        tree.visit_mut(|v| {
            if v[0] == 7.0 {
                v.push(0.0);
            }
        });
        let err = tree.remove_at(&[7.0]).unwrap_err();
        assert_eq!(
            err,
            OmnitreeError::InvalidLocation {
                expected: 1,
                found: 2
            }
        );
        assert_eq!(tree.len(), 8);
        assert_eq!(tree.iter().count(), 8);
        // Removals that never need to locate the corrupted item still work.
        assert_eq!(tree.remove_at(&[1.0]).unwrap(), 1);
        assert_eq!(tree.len(), 7);
    }
}
