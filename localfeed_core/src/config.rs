// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tunable knobs for the feed controller.
//!
//! All values are plain data with `const` presets. [`FeedConfig::standard`]
//! matches the behavior of the shipped web frontend.

use core::time::Duration;

/// Drift-correction parameters for the audio sync loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncConfig {
    /// Interval between correction ticks.
    pub interval: Duration,
    /// Drift (seconds) at or below which the carrier runs at exactly 1.0×.
    pub nudge_threshold: f64,
    /// Drift (seconds) above which the carrier is seeked instead of nudged.
    pub hard_seek_threshold: f64,
    /// Rate offset applied while nudging (0.05 means 0.95× or 1.05×).
    pub nudge: f64,
}

impl SyncConfig {
    /// 100 ms ticks, 50 ms dead band, 1 s hard-seek threshold, ±5 % nudge.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            interval: Duration::from_millis(100),
            nudge_threshold: 0.05,
            hard_seek_threshold: 1.0,
            nudge: 0.05,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// How far preload chains walk from the active slide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreloadReach {
    /// Steps ahead for ordinary feeds.
    pub near: usize,
    /// Steps ahead once the feed is larger than `large_feed_threshold`.
    pub far: usize,
    /// Feed length above which `far` applies.
    pub large_feed_threshold: usize,
}

impl PreloadReach {
    /// Three steps, dropping to one for feeds above 1000 items.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            near: 3,
            far: 1,
            large_feed_threshold: 1000,
        }
    }

    /// Returns the chain length for a feed of `len` slides.
    #[must_use]
    pub const fn reach_for(&self, len: usize) -> usize {
        if len > self.large_feed_threshold {
            self.far
        } else {
            self.near
        }
    }
}

impl Default for PreloadReach {
    fn default() -> Self {
        Self::standard()
    }
}

/// Configuration for [`FeedController`](crate::controller::FeedController).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedConfig {
    /// Lookahead (in slides) of the visibility observer.
    ///
    /// At 0, a slide only requests content once its bounds overlap the
    /// physical viewport; above 0, the observer margin may fire early.
    pub preload_distance: u32,
    /// Length of the forward preload chain.
    pub reach: PreloadReach,
    /// Length of the chain walking against the scroll direction.
    pub preload_behind: usize,
    /// Delay between preload chain steps.
    pub preload_step: Duration,
    /// Minimum intersection ratio for a slide to become active.
    pub snap_ratio: f64,
    /// How long a primed next video plays muted before it is paused.
    pub prime_hold: Duration,
    /// A video still loading after this long is reported as slow.
    pub slow_load_after: Duration,
    /// Delay before requesting an advance past an image or GIF; `None`
    /// disables auto-advance entirely.
    pub auto_advance: Option<Duration>,
    /// Audio drift correction.
    pub sync: SyncConfig,
}

/// Auto-advance delay used by [`FeedConfig::with_auto_advance`].
pub const DEFAULT_AUTO_ADVANCE: Duration = Duration::from_secs(3);

impl FeedConfig {
    /// Defaults of the web frontend. Auto-advance is off.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            preload_distance: 3,
            reach: PreloadReach::standard(),
            preload_behind: 1,
            preload_step: Duration::from_millis(150),
            snap_ratio: 0.5,
            prime_hold: Duration::from_millis(50),
            slow_load_after: Duration::from_secs(8),
            auto_advance: None,
            sync: SyncConfig::standard(),
        }
    }

    /// Returns `self` with auto-advance enabled at [`DEFAULT_AUTO_ADVANCE`].
    #[must_use]
    pub const fn with_auto_advance(mut self) -> Self {
        self.auto_advance = Some(DEFAULT_AUTO_ADVANCE);
        self
    }

    /// Returns `self` with the given observer lookahead.
    #[must_use]
    pub const fn with_preload_distance(mut self, distance: u32) -> Self {
        self.preload_distance = distance;
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::standard()
    }
}
