// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform contract for the media elements behind each slide.
//!
//! The core never touches an element directly. A platform provides:
//!
//! - **Surface**: Implements [`MediaSurface`] over whatever owns the slide
//!   elements (DOM nodes in the browser, an in-memory table in tests). The
//!   controller refers to slides by index only.
//!
//! - **Audio carriers**: Implements
//!   [`AudioCarrier`](crate::audio::AudioCarrier) for the two long-lived audio
//!   elements.
//!
//! - **Wake driver**: Drains [`PendingWake`](crate::wake::PendingWake)
//!   records from the controller and calls back when they are due
//!   (`setTimeout` in the browser, a virtual clock in the simulator).
//!
//! - **Events**: Forwards intersection batches, load/error completion,
//!   video `ended`, and carrier readiness into the controller.
//!
//! # Crate boundaries
//!
//! `localfeed_core` owns the state machine and this contract module. Backend
//! crates depend on `localfeed_core` and provide platform glue. Application
//! code creates the slide elements and wires both together.

use core::fmt;

use crate::slide::Slide;

/// How urgently a load should proceed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadPriority {
    /// The slide is (or is about to be) the active slide.
    Active,
    /// The immediately-next slide in the scroll direction.
    Next,
    /// Any other neighbour.
    Background,
}

impl LoadPriority {
    /// Buffering hint a video should start with at this priority.
    #[must_use]
    pub const fn buffering(self) -> Buffering {
        match self {
            Self::Active | Self::Next => Buffering::Auto,
            Self::Background => Buffering::Metadata,
        }
    }
}

/// Buffering eagerness of a video element (its `preload` attribute).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Buffering {
    /// Buffer as much as the platform likes.
    Auto,
    /// Fetch only enough to know dimensions and duration.
    Metadata,
    /// Do not buffer ahead.
    None,
}

impl Buffering {
    /// The HTML `preload` attribute value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Metadata => "metadata",
            Self::None => "none",
        }
    }
}

/// Network transfer state of a slide's element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transfer {
    /// No source, or no element.
    Idle,
    /// Bytes are still arriving.
    InFlight,
    /// The transfer has finished.
    Complete,
}

/// Playback clock of a video element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoClock {
    /// Current playback position in seconds.
    pub position: f64,
    /// Whether the element is paused.
    pub paused: bool,
}

/// Why a play request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaybackError {
    /// The platform's autoplay policy refused playback.
    Blocked,
    /// A pause or source change interrupted the request.
    Interrupted,
    /// The source format cannot be played.
    Unsupported,
    /// There is no playable element at that index.
    NoElement,
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked => f.write_str("playback blocked by autoplay policy"),
            Self::Interrupted => f.write_str("play request interrupted"),
            Self::Unsupported => f.write_str("media format not supported"),
            Self::NoElement => f.write_str("no playable element"),
        }
    }
}

impl core::error::Error for PlaybackError {}

/// Drives the media elements of the feed's slides.
///
/// Every method addresses a slide by index. Implementations ignore indices
/// they have no element for.
pub trait MediaSurface {
    /// Attaches content to the slide's element and starts the transfer.
    ///
    /// Completion must be reported back through
    /// [`FeedController::content_loaded`] or
    /// [`FeedController::content_failed`].
    ///
    /// [`FeedController::content_loaded`]: crate::controller::FeedController::content_loaded
    /// [`FeedController::content_failed`]: crate::controller::FeedController::content_failed
    fn load(&mut self, slide: &Slide, priority: LoadPriority);

    /// Reports whether bytes are still arriving for the slide.
    fn transfer(&self, index: usize) -> Transfer;

    /// Starts playback of a video.
    fn play(&mut self, index: usize) -> Result<(), PlaybackError>;

    /// Pauses a video.
    fn pause(&mut self, index: usize);

    /// Mutes or unmutes a video's own audio track.
    fn set_muted(&mut self, index: usize, muted: bool);

    /// Sets a video's buffering hint.
    fn set_buffering(&mut self, index: usize, buffering: Buffering);

    /// Freezes (`false`) or resumes (`true`) a GIF animation.
    fn set_animating(&mut self, index: usize, animating: bool);

    /// Reads a video's playback clock.
    fn video_clock(&self, index: usize) -> Option<VideoClock>;

    /// Cancels the transfer and strips the slide back to an empty shell.
    fn abort(&mut self, index: usize);

    /// Shows the inline error indicator on the slide.
    fn show_error(&mut self, index: usize);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_buffering() {
        assert_eq!(LoadPriority::Active.buffering(), Buffering::Auto);
        assert_eq!(LoadPriority::Next.buffering(), Buffering::Auto);
        assert_eq!(LoadPriority::Background.buffering(), Buffering::Metadata);
        assert_eq!(Buffering::None.as_str(), "none");
    }
}
