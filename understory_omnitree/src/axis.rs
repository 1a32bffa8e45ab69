// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis strategies: how coordinate values are compared, averaged, and equated.

use core::cmp::Ordering;
use core::fmt;

use crate::types::Scalar;

/// Ordering and bisection of values along an axis.
///
/// Every axis of a tree shares one strategy. `compare` must be a consistent ordering, and
/// `average` must return a value between its operands (equal to either one is allowed).
pub trait Axis<M> {
    /// Compare two axis values.
    fn compare(&self, a: &M, b: &M) -> Ordering;

    /// A value between `a` and `b`, used to bisect a box.
    fn average(&self, a: &M, b: &M) -> M;

    /// Whether two axis values denote the same coordinate.
    ///
    /// Defaults to `compare` reporting [`Ordering::Equal`].
    #[inline]
    fn equate(&self, a: &M, b: &M) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    /// Replace the axis equality with `equate`, keeping ordering and averaging.
    ///
    /// Useful for tolerance-based point lookups over floating-point coordinates.
    fn with_equate<E>(self, equate: E) -> Equating<Self, E>
    where
        Self: Sized,
        E: Fn(&M, &M) -> bool,
    {
        Equating { inner: self, equate }
    }
}

/// The natural ordering of a [`Scalar`], averaged with [`Scalar::mid`].
///
/// This crate assumes no NaNs for floating-point coordinates; incomparable values are treated
/// as equal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Natural;

impl<M: Scalar> Axis<M> for Natural {
    #[inline]
    fn compare(&self, a: &M, b: &M) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Equal)
    }

    #[inline]
    fn average(&self, a: &M, b: &M) -> M {
        M::mid(*a, *b)
    }
}

/// An axis built from caller-supplied comparison and averaging closures.
///
/// ```
/// use core::cmp::Ordering;
/// use understory_omnitree::{Axis, FnAxis};
///
/// // Byte coordinates, averaged without overflowing `u8`.
/// let axis = FnAxis::new(
///     |a: &u8, b: &u8| a.cmp(b),
///     |a: &u8, b: &u8| a / 2 + b / 2 + (a & b & 1),
/// );
/// assert_eq!(axis.compare(&1, &2), Ordering::Less);
/// assert_eq!(axis.average(&10, &20), 15);
/// ```
#[derive(Clone, Copy)]
pub struct FnAxis<C, V> {
    compare: C,
    average: V,
}

impl<C, V> FnAxis<C, V> {
    /// Create an axis from `compare` and `average`.
    pub const fn new(compare: C, average: V) -> Self {
        Self { compare, average }
    }
}

impl<M, C, V> Axis<M> for FnAxis<C, V>
where
    C: Fn(&M, &M) -> Ordering,
    V: Fn(&M, &M) -> M,
{
    #[inline]
    fn compare(&self, a: &M, b: &M) -> Ordering {
        (self.compare)(a, b)
    }

    #[inline]
    fn average(&self, a: &M, b: &M) -> M {
        (self.average)(a, b)
    }
}

impl<C, V> fmt::Debug for FnAxis<C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAxis").finish_non_exhaustive()
    }
}

/// An axis with its equality replaced. See [`Axis::with_equate`].
#[derive(Clone, Copy)]
pub struct Equating<A, E> {
    inner: A,
    equate: E,
}

impl<M, A, E> Axis<M> for Equating<A, E>
where
    A: Axis<M>,
    E: Fn(&M, &M) -> bool,
{
    #[inline]
    fn compare(&self, a: &M, b: &M) -> Ordering {
        self.inner.compare(a, b)
    }

    #[inline]
    fn average(&self, a: &M, b: &M) -> M {
        self.inner.average(a, b)
    }

    #[inline]
    fn equate(&self, a: &M, b: &M) -> bool {
        (self.equate)(a, b)
    }
}

impl<A: fmt::Debug, E> fmt::Debug for Equating<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equating")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
