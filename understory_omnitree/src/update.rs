// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relocation of items whose coordinates changed since they were placed.

use core::fmt::Debug;

use smallvec::SmallVec;
use tracing::trace;

use crate::axis::Axis;
use crate::error::OmnitreeError;
use crate::locate::Locate;
use crate::node::{NodeIdx, NodeKind};
use crate::tree::Omnitree;
use crate::types::{Bounds, Point};

impl<T, M, L, A> Omnitree<T, M, L, A>
where
    M: Clone + Debug,
    L: Locate<T, M>,
    A: Axis<M>,
{
    /// Move every item that left its leaf to the leaf covering its current coordinate.
    ///
    /// Call this after changing item coordinates through [`visit_mut`](Self::visit_mut),
    /// [`iter_mut`](Self::iter_mut), or shared interior state read by the [`Locate`]
    /// collaborator. Each displaced item climbs to the nearest ancestor that encloses it and is
    /// placed from there. Fails with [`OmnitreeError::OutOfBounds`] if an item left the
    /// universe; leaves checked before that point stay updated.
    ///
    /// ```
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    ///
    /// use smallvec::smallvec;
    /// use understory_omnitree::{Bounds, Omnitree, Point};
    ///
    /// let mut tree = Omnitree::new(
    ///     Bounds::from_slices(&[0.0, 0.0], &[10.0, 10.0]),
    ///     |p: &Rc<Cell<[f64; 2]>>| -> Point<f64> { smallvec![p.get()[0], p.get()[1]] },
    /// )
    /// .unwrap();
    /// let handles: Vec<_> = (0..20)
    ///     .map(|i| Rc::new(Cell::new([f64::from(i) * 0.5, 1.0])))
    ///     .collect();
    /// tree.try_extend(handles.iter().cloned()).unwrap();
    ///
    /// handles[3].set([9.0, 9.0]);
    /// tree.update().unwrap();
    /// assert_eq!(tree.query_point(&[9.0, 9.0]).count(), 1);
    /// assert_eq!(tree.len(), 20);
    /// ```
    pub fn update(&mut self) -> Result<(), OmnitreeError> {
        self.refresh(self.top, None)
    }

    /// Like [`update`](Self::update), but only for nodes overlapping `region`.
    ///
    /// Items that moved out of a leaf outside the region are not noticed.
    pub fn update_in(&mut self, region: &Bounds<M>) -> Result<(), OmnitreeError> {
        self.check_region(region)?;
        self.refresh(self.top, Some(region))
    }

    fn refresh(&mut self, idx: NodeIdx, region: Option<&Bounds<M>>) -> Result<(), OmnitreeError> {
        let node = self.arena.get(idx);
        if let Some(region) = region
            && !region.overlaps(&self.axis, &node.bounds)
        {
            return Ok(());
        }
        if node.is_leaf() {
            return self.refresh_leaf(idx);
        }
        let before = node.count;
        for (octant, child) in node.child_snapshot() {
            let result = self.refresh(child, region);
            if self.arena.get(child).count == 0 {
                self.chop(idx, octant, child);
            }
            result?;
        }
        if self.arena.get(idx).count < before {
            self.settle(idx, "update")?;
        }
        Ok(())
    }

    /// Relocate the items of one leaf that no longer lie in its box.
    ///
    /// The whole leaf is checked before anything moves, and the relocation reuses the checked
    /// coordinates, so a failure leaves the leaf untouched.
    fn refresh_leaf(&mut self, idx: NodeIdx) -> Result<(), OmnitreeError> {
        let node = self.arena.get(idx);
        let NodeKind::Leaf(items) = &node.kind else {
            return Ok(());
        };
        let mut displaced: SmallVec<[(usize, Point<M>); 8]> = SmallVec::new();
        for (i, item) in items.iter().enumerate() {
            let point = self.locate(item)?;
            if node.bounds.contains_point(&self.axis, &point) {
                continue;
            }
            if !self.bounds.contains_point(&self.axis, &point) {
                return Err(self.out_of_bounds("update", &point));
            }
            displaced.push((i, point));
        }
        if displaced.is_empty() {
            return Ok(());
        }

        let node = self.arena.get_mut(idx);
        let parent = node.parent;
        let items = node.items_mut();
        // Highest index first, so each swap_remove only moves an item that stays.
        let moved: SmallVec<[(T, Point<M>); 8]> = displaced
            .into_iter()
            .rev()
            .map(|(i, point)| (items.swap_remove(i), point))
            .collect();
        node.count -= moved.len();
        trace!(
            depth = node.depth,
            items = moved.len(),
            "omnitree relocating displaced items"
        );
        for (item, point) in moved {
            self.reinsert_from(parent, item, &point);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::OmnitreeError;
    use crate::tree::Omnitree;
    use crate::types::{Bounds, Point};
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::Cell;
    use smallvec::smallvec;

    type Handle = Rc<Cell<[f64; 2]>>;

    fn handle(x: f64, y: f64) -> Handle {
        Rc::new(Cell::new([x, y]))
    }

    fn tree_of(handles: &[Handle]) -> Omnitree<Handle, f64, fn(&Handle) -> Point<f64>> {
        fn at(h: &Handle) -> Point<f64> {
            let [x, y] = h.get();
            smallvec![x, y]
        }
        let mut tree = Omnitree::new(
            Bounds::from_slices(&[-50.0, -50.0], &[50.0, 50.0]),
            at as fn(&Handle) -> Point<f64>,
        )
        .unwrap();
        tree.try_extend(handles.iter().cloned()).unwrap();
        tree
    }

    fn scatter() -> Vec<Handle> {
        (0..100)
            .map(|i| {
                let x = f64::from(i % 10) * 9.0 - 45.0;
                let y = f64::from(i / 10) * 9.0 - 45.0;
                handle(x, y)
            })
            .collect()
    }

    #[test]
    fn moved_item_is_found_at_its_new_coordinate() {
        let handles = scatter();
        let mut tree = tree_of(&handles);
        let moving = &handles[0];
        let old = moving.get();
        moving.set([44.0, 44.0]);

        tree.update().unwrap();
        tree.assert_invariants();
        assert_eq!(tree.len(), 100);
        assert_eq!(tree.query_point(&[44.0, 44.0]).count(), 1);
        assert_eq!(tree.query_point(&old).count(), 0);
    }

    #[test]
    fn many_moves_keep_the_structure_valid() {
        let handles = scatter();
        let mut tree = tree_of(&handles);
        for (i, h) in handles.iter().enumerate() {
            let [x, y] = h.get();
            if i % 3 == 0 {
                h.set([-x, y * 0.5]);
            }
        }
        tree.update().unwrap();
        tree.assert_invariants();
        assert_eq!(tree.len(), 100);
        for h in &handles {
            let [x, y] = h.get();
            assert!(
                tree.query_point(&[x, y]).any(|found| Rc::ptr_eq(found.unwrap(), h)),
                "item at ({x}, {y}) is reachable after update"
            );
        }
    }

    #[test]
    fn moves_that_collapse_into_one_corner() {
        let handles = scatter();
        let mut tree = tree_of(&handles);
        for h in &handles {
            h.set([-49.0, -49.0]);
        }
        tree.update().unwrap();
        tree.assert_invariants();
        assert_eq!(tree.query_point(&[-49.0, -49.0]).count(), 100);
    }

    #[test]
    fn update_in_only_touches_the_region() {
        let handles = scatter();
        let mut tree = tree_of(&handles);
        // (-45, -45) sits far from the region; (36, 36) is inside it. Neither target is a
        // grid coordinate.
        handles[0].set([2.0, 2.0]);
        handles[99].set([1.0, 1.0]);

        tree.update_in(&Bounds::from_slices(&[20.0, 20.0], &[50.0, 50.0]))
            .unwrap();
        assert_eq!(tree.query_point(&[1.0, 1.0]).count(), 1);
        assert_eq!(tree.query_point(&[2.0, 2.0]).count(), 0);

        tree.update().unwrap();
        assert_eq!(tree.query_point(&[2.0, 2.0]).count(), 1);
        tree.assert_invariants();
    }

    #[test]
    fn leaving_the_universe_is_an_error() {
        let handles = scatter();
        let mut tree = tree_of(&handles);
        handles[5].set([500.0, 0.0]);
        let err = tree.update().unwrap_err();
        assert!(matches!(
            err,
            OmnitreeError::OutOfBounds {
                operation: "update",
                ..
            }
        ));
        assert_eq!(tree.len(), 100);
        assert_eq!(tree.iter().count(), 100);

        handles[5].set([0.5, 0.5]);
        tree.update().unwrap();
        tree.assert_invariants();
    }

    /// Small xorshift generator so the stress tests below are reproducible.
    fn xorshift(seed: &mut u64) -> u64 {
        *seed ^= *seed << 13;
        *seed ^= *seed >> 7;
        *seed ^= *seed << 17;
        *seed
    }

    type Cursor = Rc<Cell<f64>>;

    fn line_of(seed: &mut u64, n: usize) -> (Vec<Cursor>, Omnitree<Cursor, f64, fn(&Cursor) -> Point<f64>>) {
        fn at(c: &Cursor) -> Point<f64> {
            smallvec![c.get()]
        }
        let cursors: Vec<Cursor> = (0..n)
            .map(|_| Rc::new(Cell::new((xorshift(seed) % 101) as f64)))
            .collect();
        let mut tree = Omnitree::new(
            Bounds::from_slices(&[0.0], &[100.0]),
            at as fn(&Cursor) -> Point<f64>,
        )
        .unwrap();
        tree.try_extend(cursors.iter().cloned()).unwrap();
        (cursors, tree)
    }

    #[test]
    fn a_failed_update_keeps_every_item_counted() {
        let mut seed = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..300 {
            let (cursors, mut tree) = line_of(&mut seed, 40);
            for c in &cursors {
                if xorshift(&mut seed) % 3 == 0 {
                    c.set((xorshift(&mut seed) % 101) as f64);
                }
            }
            let stray = &cursors[(xorshift(&mut seed) % 40) as usize];
            stray.set(500.0);

            assert!(tree.update().is_err());
            assert_eq!(tree.len(), 40);
            assert_eq!(tree.iter().count(), tree.len());

            stray.set(50.0);
            tree.update().unwrap();
            tree.assert_invariants();
            assert_eq!(tree.iter().count(), 40);
        }
    }

    #[test]
    fn adding_to_a_full_leaf_with_a_stray_item_fails_cleanly() {
        let mut seed = 1;
        let (cursors, mut tree) = line_of(&mut seed, 2);
        cursors[0].set(500.0);
        let err = tree.add(Rc::new(Cell::new(10.0))).unwrap_err();
        assert!(matches!(err, OmnitreeError::OutOfBounds { operation: "add", .. }));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.iter().count(), 2);

        cursors[0].set(20.0);
        tree.add(Rc::new(Cell::new(10.0))).unwrap();
        tree.assert_invariants();
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn a_failed_removal_keeps_every_item_counted() {
        let mut seed = 0x2545_F491_4F6C_DD1D;
        for _ in 0..300 {
            let (cursors, mut tree) = line_of(&mut seed, 40);
            for c in &cursors {
                if xorshift(&mut seed) % 4 == 0 {
                    c.set((xorshift(&mut seed) % 101) as f64);
                }
            }
            let stray = &cursors[(xorshift(&mut seed) % 40) as usize];
            stray.set(500.0);
            let cut = (xorshift(&mut seed) % 101) as f64;

            let before = tree.len();
            if let Ok(removed) = tree.remove_where(|c| c.get() < cut) {
                assert_eq!(tree.len(), before - removed);
            }
            assert!(tree.len() <= before);
            assert_eq!(tree.iter().count(), tree.len());

            stray.set(50.0);
            tree.update().unwrap();
            tree.assert_invariants();
        }
    }

    #[test]
    fn update_on_an_untouched_tree_is_a_no_op() {
        let handles = scatter();
        let mut tree = tree_of(&handles);
        let depth = tree.depth();
        tree.update().unwrap();
        tree.assert_invariants();
        assert_eq!(tree.len(), 100);
        assert_eq!(tree.depth(), depth);
    }
}
