// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::cmp::Ordering;
use core::fmt::Debug;

use smallvec::SmallVec;

use crate::axis::Axis;

/// A coordinate: one value per axis.
///
/// Up to four axes are stored inline; higher dimensional trees spill to the heap.
pub type Point<M> = SmallVec<[M; 4]>;

/// Axis-aligned bounding box in N dimensions.
///
/// Both corners are inclusive. Every predicate takes the [`Axis`] strategy used to compare
/// values, so the same box type serves natural scalars and caller-defined orderings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bounds<M> {
    /// Minimum corner.
    pub min: Point<M>,
    /// Maximum corner.
    pub max: Point<M>,
}

impl<M> Bounds<M> {
    /// Create a new box from min/max corners.
    #[inline(always)]
    pub const fn new(min: Point<M>, max: Point<M>) -> Self {
        Self { min, max }
    }

    /// Number of axes of the minimum corner.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    /// Whether the box contains the point, edges included.
    ///
    /// # Examples
    ///
    /// ```
    /// use understory_omnitree::{Bounds, Natural};
    ///
    /// let b = Bounds::from_slices(&[0.0, 0.0], &[10.0, 10.0]);
    /// assert!(b.contains_point(&Natural, &[10.0, 0.0]));
    /// assert!(!b.contains_point(&Natural, &[10.5, 0.0]));
    /// ```
    #[inline]
    pub fn contains_point<A: Axis<M> + ?Sized>(&self, axis: &A, point: &[M]) -> bool {
        self.min
            .iter()
            .zip(&self.max)
            .zip(point)
            .all(|((lo, hi), p)| {
                axis.compare(p, lo) != Ordering::Less && axis.compare(p, hi) != Ordering::Greater
            })
    }

    /// Whether `inner` lies strictly inside this box on every axis.
    ///
    /// Shared edges do not count, so a box never encloses itself.
    #[inline]
    pub fn encloses<A: Axis<M> + ?Sized>(&self, axis: &A, inner: &Self) -> bool {
        (0..self.min.len()).all(|i| {
            axis.compare(&self.min[i], &inner.min[i]) == Ordering::Less
                && axis.compare(&self.max[i], &inner.max[i]) == Ordering::Greater
        })
    }

    /// Determines whether this box overlaps with another in any way.
    ///
    /// Note that the edge of the box is considered to be part of itself, meaning
    /// that two boxes that share an edge are considered to overlap.
    #[inline]
    pub fn overlaps<A: Axis<M> + ?Sized>(&self, axis: &A, other: &Self) -> bool {
        (0..self.min.len()).all(|i| {
            axis.compare(&self.max[i], &other.min[i]) != Ordering::Less
                && axis.compare(&self.min[i], &other.max[i]) != Ordering::Greater
        })
    }
}

impl<M: Clone> Bounds<M> {
    /// Create a box by copying the corners out of slices.
    pub fn from_slices(min: &[M], max: &[M]) -> Self {
        Self {
            min: min.iter().cloned().collect(),
            max: max.iter().cloned().collect(),
        }
    }

    /// Per-axis average of the corners.
    pub fn center<A: Axis<M> + ?Sized>(&self, axis: &A) -> Point<M> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| axis.average(lo, hi))
            .collect()
    }

    /// Index of the half-open child cell that `point` falls in.
    ///
    /// Bit `i` is set when the point is not below the center on axis `i`.
    pub(crate) fn octant<A: Axis<M> + ?Sized>(&self, axis: &A, point: &[M]) -> usize {
        let mut octant = 0;
        for (i, p) in point.iter().enumerate() {
            let mid = axis.average(&self.min[i], &self.max[i]);
            if axis.compare(p, &mid) != Ordering::Less {
                octant |= 1 << i;
            }
        }
        octant
    }

    /// The box of the child cell at `octant`, bisecting this box at its center.
    pub(crate) fn octant_bounds<A: Axis<M> + ?Sized>(&self, axis: &A, octant: usize) -> Self {
        let mut min = Point::with_capacity(self.min.len());
        let mut max = Point::with_capacity(self.max.len());
        for (i, (lo, hi)) in self.min.iter().zip(&self.max).enumerate() {
            let mid = axis.average(lo, hi);
            if octant & (1 << i) != 0 {
                min.push(mid);
                max.push(hi.clone());
            } else {
                min.push(lo.clone());
                max.push(mid);
            }
        }
        Self { min, max }
    }
}

/// Per-axis equality of two coordinates, using the axis's `equate`.
#[inline]
pub fn coordinates_equal<M, A: Axis<M> + ?Sized>(axis: &A, a: &[M], b: &[M]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| axis.equate(x, y))
}

/// Numeric scalar abstraction used by the [`Natural`](crate::Natural) axis.
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Midpoint between `a` and `b`, never outside of them.
    fn mid(a: Self, b: Self) -> Self;
}

impl Scalar for f32 {
    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }
}

impl Scalar for f64 {
    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }
}

impl Scalar for i32 {
    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        // Average without overflow: (a & b) + ((a ^ b) >> 1)
        (a & b) + ((a ^ b) >> 1)
    }
}

impl Scalar for i64 {
    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        (a & b) + ((a ^ b) >> 1)
    }
}
