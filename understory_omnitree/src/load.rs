// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::util::saturating_pow;

/// Smallest (and initial) load.
pub const MIN_LOAD: usize = 2;

/// Tracks `load ~ count^(1/dimensions)`, which bounds both leaf capacity and tree depth.
///
/// The powers `load^dimensions` and `(load + 1)^dimensions` are cached because they are
/// checked on every insertion and removal.
#[derive(Copy, Clone, Debug)]
pub(crate) struct LoadFactor {
    dimensions: u32,
    load: usize,
    powered: usize,
    plus_one_powered: usize,
}

impl LoadFactor {
    pub(crate) fn new(dimensions: u32) -> Self {
        let mut this = Self {
            dimensions,
            load: MIN_LOAD,
            powered: 0,
            plus_one_powered: 0,
        };
        this.recompute();
        this
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.load
    }

    pub(crate) fn reset(&mut self) {
        self.load = MIN_LOAD;
        self.recompute();
    }

    /// Grow the load by one step if `count` has outgrown it. Returns whether it changed.
    pub(crate) fn grow_for(&mut self, count: usize) -> bool {
        if count > self.plus_one_powered {
            self.load += 1;
            self.recompute();
            true
        } else {
            false
        }
    }

    /// Shrink the load until `load^dimensions <= count` or it reaches [`MIN_LOAD`].
    /// Returns whether it changed.
    pub(crate) fn shrink_for(&mut self, count: usize) -> bool {
        let before = self.load;
        while self.powered > count && self.load > MIN_LOAD {
            self.load -= 1;
            self.recompute();
        }
        self.load != before
    }

    fn recompute(&mut self) {
        self.powered = saturating_pow(self.load, self.dimensions);
        self.plus_one_powered = saturating_pow(self.load + 1, self.dimensions);
    }
}
