// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

use crate::step::StepStatus;

/// Errors reported by [`Omnitree`](crate::Omnitree) operations.
///
/// None of these are retried internally. Each one points at a misbehaving collaborator, a
/// coordinate outside the tree's universe, or a misuse of the API.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OmnitreeError {
    /// The universe has no axes.
    #[error("an omnitree needs at least one axis")]
    NoAxes,
    /// More axes than octant indices can address.
    #[error("an omnitree supports at most {max} axes, got {found}")]
    TooManyAxes {
        /// Largest supported axis count.
        max: usize,
        /// Requested axis count.
        found: usize,
    },
    /// A caller-provided point or box has the wrong number of axes.
    #[error("expected {expected} coordinate values, found {found}")]
    DimensionMismatch {
        /// Axis count of the tree.
        expected: usize,
        /// Axis count that was provided.
        found: usize,
    },
    /// The universe's minimum is not below its maximum on some axis.
    #[error("universe min is not less than max on axis {axis}")]
    InvertedBounds {
        /// Offending axis.
        axis: usize,
    },
    /// The axis average of the universe's corners lies outside of them.
    #[error("average of universe min and max falls outside of them on axis {axis}")]
    InvalidAverage {
        /// Offending axis.
        axis: usize,
    },
    /// The locate collaborator returned a coordinate with the wrong number of axes.
    #[error("locate returned {found} coordinate values for a {expected}-axis tree")]
    InvalidLocation {
        /// Axis count of the tree.
        expected: usize,
        /// Axis count of the returned coordinate.
        found: usize,
    },
    /// An item's coordinate lies outside the tree's universe.
    #[error("{operation}: coordinate {point} is outside of the universe {min}..={max}")]
    OutOfBounds {
        /// Operation that found the item.
        operation: &'static str,
        /// Debug rendering of the offending coordinate.
        point: String,
        /// Debug rendering of the universe's minimum corner.
        min: String,
        /// Debug rendering of the universe's maximum corner.
        max: String,
    },
    /// The tree already holds `usize::MAX` items.
    #[error("omnitree is full ({0} items)")]
    CapacityExhausted(usize),
    /// A traversal callback returned a signal the traversal cannot honor.
    #[error("traversal callback returned {0:?}, which an omnitree traversal cannot honor")]
    InvalidStep(StepStatus),
}
