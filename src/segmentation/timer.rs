// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Separation-timer seam.
//!
//! The segmentation manager does not own a clock; the reactor that owns it
//! provides one through this trait and calls back
//! [`crate::segmentation::SegmentationManager::on_timer_expired`] when a
//! timer fires. Timer ids are segmentizer slot indices.

use std::time::Duration;

/// Shared timer manager collaborator.
pub trait TimerService {
    /// Arm (or re-arm) the timer `timer_id` to fire after `delay`.
    fn start(&mut self, timer_id: usize, delay: Duration);

    /// Cancel a pending timer; firing a cancelled id is a no-op.
    fn cancel(&mut self, timer_id: usize);
}
