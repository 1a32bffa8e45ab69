// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::error::OmnitreeError;
use crate::types::Point;

/// Maps an item to its coordinate.
///
/// Implemented for every closure `Fn(&T) -> Point<M>`. The returned point must have one value
/// per axis of the tree; anything else is reported as [`OmnitreeError::InvalidLocation`] by
/// the operation that asked.
pub trait Locate<T, M> {
    /// The current coordinate of `item`.
    fn locate(&self, item: &T) -> Point<M>;
}

impl<T, M, F> Locate<T, M> for F
where
    F: Fn(&T) -> Point<M>,
{
    #[inline]
    fn locate(&self, item: &T) -> Point<M> {
        self(item)
    }
}

/// Locate `item` and check the coordinate has `dimensions` values.
#[inline]
pub(crate) fn locate_checked<T, M, L: Locate<T, M>>(
    locate: &L,
    dimensions: usize,
    item: &T,
) -> Result<Point<M>, OmnitreeError> {
    let point = locate.locate(item);
    if point.len() == dimensions {
        Ok(point)
    } else {
        Err(OmnitreeError::InvalidLocation {
            expected: dimensions,
            found: point.len(),
        })
    }
}
