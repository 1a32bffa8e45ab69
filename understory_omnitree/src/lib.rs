// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_omnitree --heading-base-level=0

//! Understory Omnitree: an adaptive N-dimensional spatial tree.
//!
//! An [`Omnitree`] stores arbitrary items, each positioned at a point in an N-dimensional space
//! (N ≥ 1) by a [`Locate`] collaborator. It generalizes quadtrees and octrees: a leaf that
//! overflows splits into up to `2^N` children around the midpoint of its box, and branches
//! collapse back into leaves when removals leave them under-loaded.
//!
//! - Insert items, remove them by predicate, region, coordinate, or equality.
//! - Visit all items, the items in an inclusive region, or the items at a coordinate, with
//!   plain, mutating, and breakable callbacks driven by [`StepStatus`].
//! - Re-home items whose coordinates changed with [`Omnitree::update`].
//!
//! The tree tunes itself: a single load factor tracks `len()^(1/N)` and bounds both the item
//! capacity of a leaf and the maximum depth of the tree.
//!
//! Coordinates are ordered and bisected by an [`Axis`] strategy. Numeric scalars use the
//! [`Natural`] order by default; [`FnAxis`] wraps closures for anything else.
//!
//! # Example
//!
//! ```rust
//! use smallvec::smallvec;
//! use understory_omnitree::{Bounds, Omnitree, Point};
//!
//! let mut tree = Omnitree::new(
//!     Bounds::from_slices(&[-11.0; 3], &[11.0; 3]),
//!     |i: &i32| -> Point<f64> { smallvec![f64::from(*i); 3] },
//! )
//! .unwrap();
//! tree.try_extend(0..10).unwrap();
//! assert_eq!(tree.len(), 10);
//!
//! // Regions are inclusive on both corners.
//! let region = Bounds::from_slices(&[5.0; 3], &[10.0; 3]);
//! assert_eq!(tree.count_in(&region).unwrap(), 5);
//!
//! let removed = tree.remove_in(&Bounds::from_slices(&[0.0; 3], &[3.0; 3])).unwrap();
//! assert_eq!(removed, 4);
//! assert_eq!(tree.len(), 6);
//! ```
//!
//! Every fallible operation returns [`OmnitreeError`]. A failed call never loses or duplicates
//! items: `len()` always agrees with the stored items. `add` stores nothing when it fails.
//! Removals and [`Omnitree::update`] work leaf by leaf, and each leaf or branch is checked
//! before it is reshaped. Work finished before the failure stays done: earlier leaves stay
//! updated and earlier matches stay removed. Once a reshape has been checked, the items it
//! moves are always placed. A full leaf that cannot be split because it holds an item outside
//! the universe just takes the item.
//!
//! ### Float semantics
//!
//! The [`Natural`] order treats incomparable values (NaN) as equal. Keep NaNs out of
//! coordinates, or supply an [`Axis`] that orders them.

#![no_std]

extern crate alloc;

mod axis;
mod error;
mod iter;
mod load;
mod locate;
mod node;
mod remove;
mod step;
mod traverse;
mod tree;
mod types;
mod update;
pub(crate) mod util;

pub use axis::{Axis, Equating, FnAxis, Natural};
pub use error::OmnitreeError;
pub use iter::{Iter, IterMut, Query};
pub use load::MIN_LOAD;
pub use locate::Locate;
pub use step::StepStatus;
pub use tree::{MAX_AXES, Omnitree};
pub use types::{Bounds, Point, Scalar, coordinates_equal};
