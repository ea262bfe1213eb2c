// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred work requested by the controller.
//!
//! The core never sleeps. Operations that need to continue later push a
//! [`PendingWake`]; the platform drains them with
//! [`FeedController::take_wakes`](crate::controller::FeedController::take_wakes)
//! and hands each [`Wake`] back through
//! [`FeedController::wake`](crate::controller::FeedController::wake) once
//! `after` has elapsed. Each wake carries the token it needs to detect that it
//! has gone stale, so drivers never have to cancel timers.

use core::time::Duration;

use crate::audio::SyncEpoch;
use crate::generation::Generation;
use crate::preload::ChainId;

/// A deferred continuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wake {
    /// Run the next step of a preload chain.
    PreloadStep(ChainId),
    /// Pause a primed video unless it has become active.
    PrimeFrame {
        /// Slide that was primed.
        index: usize,
    },
    /// Run one audio drift-correction tick.
    AudioSync(SyncEpoch),
    /// Report a video that is still loading.
    SlowLoad {
        /// Slide being loaded.
        index: usize,
        /// Registry epoch when the load started.
        epoch: u64,
    },
    /// Ask the application to move past the active image or GIF.
    AutoAdvance(Generation),
}

/// A [`Wake`] and the delay after which it is due.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PendingWake {
    /// What to run.
    pub wake: Wake,
    /// Delay from the moment it was requested.
    pub after: Duration,
}

impl PendingWake {
    /// Creates a pending wake.
    #[inline]
    #[must_use]
    pub const fn new(wake: Wake, after: Duration) -> Self {
        Self { wake, after }
    }
}
