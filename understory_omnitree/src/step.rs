// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Control signal returned by breakable traversal callbacks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StepStatus {
    /// Keep visiting.
    #[default]
    Continue,
    /// Stop the traversal immediately.
    Break,
    /// Abandon the traversal and start it again from the top.
    Restart,
    /// Step back to the previous item.
    ///
    /// Tree traversals have no stable order to step back through, so returning this from a
    /// callback fails with [`OmnitreeError::InvalidStep`](crate::OmnitreeError::InvalidStep).
    Previous,
}
