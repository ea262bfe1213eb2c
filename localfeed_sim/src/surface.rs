// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`MediaSurface`].
//!
//! [`SimSurface`] keeps one [`SimElement`] per slide that has ever been
//! loaded and logs every call it receives. Transfers never finish on their
//! own: the [`Runner`](crate::runner::Runner) completes them on its virtual
//! clock, or tests call [`SimSurface::complete`] directly.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use localfeed_core::media::MediaKind;
use localfeed_core::slide::Slide;
use localfeed_core::surface::{
    Buffering, LoadPriority, MediaSurface, PlaybackError, Transfer, VideoClock,
};

/// One call received by a [`SimSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    /// [`MediaSurface::load`].
    Load {
        /// Slide index.
        index: usize,
        /// Requested priority.
        priority: LoadPriority,
    },
    /// [`MediaSurface::play`] (logged whether or not it succeeded).
    Play(usize),
    /// [`MediaSurface::pause`].
    Pause(usize),
    /// [`MediaSurface::set_muted`].
    Mute {
        /// Slide index.
        index: usize,
        /// New muted flag.
        muted: bool,
    },
    /// [`MediaSurface::set_buffering`].
    Buffer {
        /// Slide index.
        index: usize,
        /// New hint.
        buffering: Buffering,
    },
    /// [`MediaSurface::set_animating`].
    Animate {
        /// Slide index.
        index: usize,
        /// Whether the GIF runs.
        animating: bool,
    },
    /// [`MediaSurface::abort`].
    Abort(usize),
    /// [`MediaSurface::show_error`].
    ShowError(usize),
}

impl Call {
    /// Slide the call addressed.
    #[must_use]
    pub const fn index(&self) -> usize {
        match *self {
            Self::Load { index, .. }
            | Self::Mute { index, .. }
            | Self::Buffer { index, .. }
            | Self::Animate { index, .. } => index,
            Self::Play(index) | Self::Pause(index) | Self::Abort(index) | Self::ShowError(index) => {
                index
            }
        }
    }
}

/// Simulated element state of one slide.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimElement {
    /// Media kind of the content last attached.
    pub kind: Option<MediaKind>,
    /// Attached source, `None` after an abort.
    pub src: Option<String>,
    /// Bytes are still arriving.
    pub in_flight: bool,
    /// The transfer finished successfully.
    pub loaded: bool,
    /// A video is playing.
    pub playing: bool,
    /// A video's own track is muted.
    pub muted: bool,
    /// Current video buffering hint.
    pub buffering: Option<Buffering>,
    /// A GIF is animating.
    pub animating: bool,
    /// Video playback position in seconds.
    pub position: f64,
    /// The error indicator is showing.
    pub error_shown: bool,
    /// Bumped on every load and abort; a completion for an older serial is
    /// never delivered.
    pub serial: u64,
}

/// In-memory slide elements with a call log.
#[derive(Debug, Default)]
pub struct SimSurface {
    elements: BTreeMap<usize, SimElement>,
    calls: Vec<Call>,
    started: Vec<(usize, u64)>,
    refuse_play: BTreeSet<usize>,
}

impl SimSurface {
    /// Creates a surface with no elements.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Forgets the call log.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Calls addressed to slide `index`.
    pub fn calls_for(&self, index: usize) -> impl Iterator<Item = &Call> {
        self.calls.iter().filter(move |c| c.index() == index)
    }

    /// Number of loads started for slide `index`.
    #[must_use]
    pub fn load_count(&self, index: usize) -> usize {
        self.calls_for(index)
            .filter(|c| matches!(c, Call::Load { .. }))
            .count()
    }

    /// Element state of slide `index`, if it was ever loaded.
    #[must_use]
    pub fn element(&self, index: usize) -> Option<&SimElement> {
        self.elements.get(&index)
    }

    /// Indices of videos that are currently playing.
    #[must_use]
    pub fn playing(&self) -> Vec<usize> {
        self.elements
            .iter()
            .filter(|(_, e)| e.playing)
            .map(|(&i, _)| i)
            .collect()
    }

    /// Makes every later `play` on slide `index` fail with
    /// [`PlaybackError::Blocked`].
    pub fn refuse_play(&mut self, index: usize) {
        self.refuse_play.insert(index);
    }

    /// Returns the `(index, serial)` of loads started since the last call.
    pub fn take_started(&mut self) -> Vec<(usize, u64)> {
        std::mem::take(&mut self.started)
    }

    /// Finishes the transfer of slide `index` successfully.
    ///
    /// Returns `false` if nothing was in flight.
    pub fn complete(&mut self, index: usize) -> bool {
        match self.elements.get_mut(&index) {
            Some(e) if e.in_flight => {
                e.in_flight = false;
                e.loaded = true;
                true
            }
            _ => false,
        }
    }

    /// Ends the transfer of slide `index` with a network error.
    ///
    /// Returns `false` if nothing was in flight.
    pub fn fail(&mut self, index: usize) -> bool {
        match self.elements.get_mut(&index) {
            Some(e) if e.in_flight => {
                e.in_flight = false;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if slide `index` still has the transfer `serial` in
    /// flight.
    #[must_use]
    pub fn is_pending(&self, index: usize, serial: u64) -> bool {
        self.elements
            .get(&index)
            .is_some_and(|e| e.in_flight && e.serial == serial)
    }

    /// Moves the clock of every playing, loaded video forward by `dt`.
    pub fn advance_clocks(&mut self, dt: Duration) {
        for e in self.elements.values_mut() {
            if e.playing && e.loaded {
                e.position += dt.as_secs_f64();
            }
        }
    }

    /// Moves one video's playback position.
    pub fn seek(&mut self, index: usize, position: f64) {
        if let Some(e) = self.elements.get_mut(&index) {
            e.position = position;
        }
    }

    fn with(&mut self, index: usize, f: impl FnOnce(&mut SimElement)) {
        if let Some(e) = self.elements.get_mut(&index) {
            f(e);
        }
    }
}

impl MediaSurface for SimSurface {
    fn load(&mut self, slide: &Slide, priority: LoadPriority) {
        let index = slide.index();
        let kind = slide.kind();
        let e = self.elements.entry(index).or_default();
        e.kind = Some(kind);
        e.src = Some(String::from(slide.media_id()));
        e.in_flight = true;
        e.loaded = false;
        e.playing = false;
        e.error_shown = false;
        e.position = 0.0;
        e.serial += 1;
        e.buffering = kind.is_video().then(|| priority.buffering());
        e.animating = kind == MediaKind::Gif;
        self.started.push((index, e.serial));
        self.calls.push(Call::Load { index, priority });
    }

    fn transfer(&self, index: usize) -> Transfer {
        match self.elements.get(&index) {
            Some(e) if e.in_flight => Transfer::InFlight,
            Some(e) if e.loaded => Transfer::Complete,
            _ => Transfer::Idle,
        }
    }

    fn play(&mut self, index: usize) -> Result<(), PlaybackError> {
        self.calls.push(Call::Play(index));
        if self.refuse_play.contains(&index) {
            return Err(PlaybackError::Blocked);
        }
        match self.elements.get_mut(&index) {
            Some(e) if e.src.is_some() && e.kind == Some(MediaKind::Video) => {
                e.playing = true;
                Ok(())
            }
            _ => Err(PlaybackError::NoElement),
        }
    }

    fn pause(&mut self, index: usize) {
        self.calls.push(Call::Pause(index));
        self.with(index, |e| e.playing = false);
    }

    fn set_muted(&mut self, index: usize, muted: bool) {
        self.calls.push(Call::Mute { index, muted });
        self.with(index, |e| e.muted = muted);
    }

    fn set_buffering(&mut self, index: usize, buffering: Buffering) {
        self.calls.push(Call::Buffer { index, buffering });
        self.with(index, |e| e.buffering = Some(buffering));
    }

    fn set_animating(&mut self, index: usize, animating: bool) {
        self.calls.push(Call::Animate { index, animating });
        self.with(index, |e| e.animating = animating);
    }

    fn video_clock(&self, index: usize) -> Option<VideoClock> {
        let e = self.elements.get(&index)?;
        if e.kind != Some(MediaKind::Video) || e.src.is_none() {
            return None;
        }
        Some(VideoClock {
            position: e.position,
            paused: !e.playing,
        })
    }

    fn abort(&mut self, index: usize) {
        self.calls.push(Call::Abort(index));
        self.with(index, |e| {
            e.src = None;
            e.in_flight = false;
            e.loaded = false;
            e.playing = false;
            e.animating = false;
            e.position = 0.0;
            e.serial += 1;
        });
    }

    fn show_error(&mut self, index: usize) {
        self.calls.push(Call::ShowError(index));
        self.with(index, |e| {
            e.error_shown = true;
            e.in_flight = false;
            e.playing = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localfeed_core::slide::SlideRegistry;

    fn registry() -> SlideRegistry {
        let mut r = SlideRegistry::new();
        r.rebuild(["clip.mp4", "loop.gif"]);
        r
    }

    #[test]
    fn transfer_follows_load_and_abort() {
        let r = registry();
        let mut s = SimSurface::new();
        assert_eq!(s.transfer(0), Transfer::Idle);

        s.load(r.get(0).unwrap(), LoadPriority::Background);
        assert_eq!(s.transfer(0), Transfer::InFlight);
        assert_eq!(s.element(0).unwrap().buffering, Some(Buffering::Metadata));
        let started = s.take_started();
        assert_eq!(started, [(0, 1)]);

        s.abort(0);
        assert_eq!(s.transfer(0), Transfer::Idle);
        assert!(!s.is_pending(0, 1), "abort invalidates the serial");
        assert!(!s.complete(0));
    }

    #[test]
    fn clock_runs_only_while_playing_and_loaded() {
        let r = registry();
        let mut s = SimSurface::new();
        s.load(r.get(0).unwrap(), LoadPriority::Active);
        s.play(0).unwrap();
        s.advance_clocks(Duration::from_secs(1));
        assert_eq!(s.video_clock(0).unwrap().position, 0.0);

        assert!(s.complete(0));
        s.advance_clocks(Duration::from_millis(500));
        let clock = s.video_clock(0).unwrap();
        assert!((clock.position - 0.5).abs() < 1e-9);
        assert!(!clock.paused);
    }

    #[test]
    fn gifs_cannot_play() {
        let r = registry();
        let mut s = SimSurface::new();
        s.load(r.get(1).unwrap(), LoadPriority::Active);
        assert!(s.element(1).unwrap().animating);
        assert_eq!(s.play(1), Err(PlaybackError::NoElement));
        assert_eq!(s.video_clock(1), None);
    }

    #[test]
    fn refused_play_is_logged() {
        let r = registry();
        let mut s = SimSurface::new();
        s.load(r.get(0).unwrap(), LoadPriority::Active);
        s.refuse_play(0);
        assert_eq!(s.play(0), Err(PlaybackError::Blocked));
        assert_eq!(s.calls().last(), Some(&Call::Play(0)));
        assert!(s.playing().is_empty());
    }
}
