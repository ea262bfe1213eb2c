// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Audio carrier pair and drift correction.
//!
//! Videos always play muted; sound comes from a separate audio element (the
//! *carrier*) whose position is kept aligned with the active video. Two
//! carriers exist: the **primary** plays the active video's audio, the
//! **standby** silently buffers the next video's audio. When the user reaches
//! that video, the two swap roles instead of starting a fresh load.
//!
//! Carriers can only start playback after a user gesture, so they are handed
//! in lazily through [`AudioSync::unlock`] and persist for the session.
//!
//! # Drift correction
//!
//! While attached, the engine runs a periodic tick (100 ms by default) that
//! compares the carrier and video positions:
//!
//! ```text
//!   |drift| ≤ 0.05 s        rate 1.0
//!   0.05 s < |drift| ≤ 1 s  rate 1.0 ∓ 0.05, toward closing the gap
//!   |drift| > 1 s           seek to the video position, rate 1.0
//! ```
//!
//! Thresholds and the nudge size come from [`SyncConfig`].

use alloc::string::String;

use crate::config::SyncConfig;
use crate::media::resolve;
use crate::surface::{PlaybackError, VideoClock};
use crate::wake::{PendingWake, Wake};

/// Drives one platform audio element.
pub trait AudioCarrier {
    /// Replaces the source and starts fetching it.
    fn load(&mut self, url: &str);
    /// Starts playback.
    fn play(&mut self) -> Result<(), PlaybackError>;
    /// Pauses playback.
    fn pause(&mut self);
    /// Returns `true` if playback is paused.
    fn is_paused(&self) -> bool;
    /// Current position in seconds.
    fn position(&self) -> f64;
    /// Moves the playback position.
    fn seek(&mut self, position: f64);
    /// Current playback rate.
    fn rate(&self) -> f64;
    /// Sets the playback rate.
    fn set_rate(&mut self, rate: f64);
    /// Mutes or unmutes output.
    fn set_muted(&mut self, muted: bool);
    /// Returns `true` if output is muted.
    fn is_muted(&self) -> bool;
    /// Returns `true` once enough data is buffered to start playing.
    fn has_playable_data(&self) -> bool;
}

/// Stable identity of a carrier across role swaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CarrierId(pub u8);

/// Which role a carrier currently plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CarrierRole {
    /// Audible, tracking the active video.
    Primary,
    /// Muted, buffering the next video.
    Standby,
}

/// A carrier handle plus the media it is bound to.
#[derive(Debug)]
pub struct Carrier<C> {
    id: CarrierId,
    bound: Option<String>,
    handle: C,
}

impl<C> Carrier<C> {
    fn new(id: CarrierId, handle: C) -> Self {
        Self {
            id,
            bound: None,
            handle,
        }
    }

    /// Identity of this carrier.
    #[must_use]
    pub fn id(&self) -> CarrierId {
        self.id
    }

    /// Resolved URL of the bound media, if any.
    #[must_use]
    pub fn bound_media(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    /// The platform handle.
    #[must_use]
    pub fn handle(&self) -> &C {
        &self.handle
    }

    fn holds(&self, url: &str) -> bool {
        self.bound.as_deref() == Some(url)
    }
}

impl<C: AudioCarrier> Carrier<C> {
    fn bind(&mut self, url: String) {
        self.handle.load(&url);
        self.bound = Some(url);
    }
}

/// The primary/standby pair. Roles move by swapping, never by reallocation.
#[derive(Debug)]
pub struct CarrierPair<C> {
    primary: Carrier<C>,
    standby: Carrier<C>,
}

impl<C> CarrierPair<C> {
    /// The audible carrier.
    #[must_use]
    pub fn primary(&self) -> &Carrier<C> {
        &self.primary
    }

    /// The buffering carrier.
    #[must_use]
    pub fn standby(&self) -> &Carrier<C> {
        &self.standby
    }

    /// Exchanges the roles of the two carriers.
    pub fn swap(&mut self) {
        core::mem::swap(&mut self.primary, &mut self.standby);
    }

    /// Returns the current role of the carrier with `id`.
    #[must_use]
    pub fn role_of(&self, id: CarrierId) -> Option<CarrierRole> {
        if self.primary.id == id {
            Some(CarrierRole::Primary)
        } else if self.standby.id == id {
            Some(CarrierRole::Standby)
        } else {
            None
        }
    }
}

/// What a correction tick did to the primary carrier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Correction {
    /// Within the dead band; rate held at exactly 1.0.
    InSync,
    /// Rate adjusted toward closing the gap.
    Nudge {
        /// The applied playback rate.
        rate: f64,
    },
    /// Drift too large to nudge; position reset to the video's.
    HardSeek,
}

/// Classifies a drift (`carrier − video`, in seconds).
///
/// A carrier ahead of the video is slowed down; one behind is sped up.
#[must_use]
pub fn correction_for(drift: f64, config: &SyncConfig) -> Correction {
    let magnitude = drift.abs();
    if magnitude > config.hard_seek_threshold {
        Correction::HardSeek
    } else if magnitude > config.nudge_threshold {
        let rate = if drift > 0.0 {
            1.0 - config.nudge
        } else {
            1.0 + config.nudge
        };
        Correction::Nudge { rate }
    } else {
        Correction::InSync
    }
}

/// How [`AudioSync::attach`] obtained audio for the active video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachPath {
    /// The standby already held it and became primary.
    Swapped,
    /// The primary already held it.
    Reused,
    /// The primary was loaded fresh.
    Fresh,
}

/// Whether the primary carrier started playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StartState {
    /// Aligned and playing.
    Playing,
    /// Waiting for playable data.
    Deferred,
    /// Aligned but left paused because the video is paused.
    Held,
    /// The play request was refused.
    Rejected(PlaybackError),
}

/// Result of [`AudioSync::preload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreloadOutcome {
    /// The standby was loaded with the media.
    Loaded,
    /// Carriers have not been unlocked yet.
    Locked,
    /// The standby already holds the media.
    AlreadyPreloaded,
    /// The media belongs to the active video.
    Active,
}

/// Token identifying one run of the correction loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SyncEpoch(pub u64);

/// Outcome of a successful [`AudioSync::attach`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttachReport {
    /// Slide index of the video.
    pub index: usize,
    /// How the audio was obtained.
    pub path: AttachPath,
    /// Whether playback started.
    pub start: StartState,
    /// First correction tick.
    pub wake: PendingWake,
}

/// Outcome of one correction tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncTick {
    /// Measured drift, when a correction was evaluated.
    pub drift: Option<f64>,
    /// The applied correction.
    pub correction: Option<Correction>,
    /// Set when this tick (re)started playback.
    pub start: Option<StartState>,
    /// The following tick.
    pub next: PendingWake,
}

#[derive(Clone, Debug)]
struct ActiveVideo {
    index: usize,
    media: String,
}

/// Keeps an audio carrier aligned with the active muted video.
#[derive(Debug)]
pub struct AudioSync<C> {
    config: SyncConfig,
    origin: String,
    carriers: Option<CarrierPair<C>>,
    enabled: bool,
    active: Option<ActiveVideo>,
    path: Option<AttachPath>,
    pending_start: bool,
    epoch: SyncEpoch,
    running: bool,
}

impl<C: AudioCarrier> AudioSync<C> {
    /// Creates an engine with no carriers; `origin` resolves relative URLs.
    #[must_use]
    pub fn new(config: SyncConfig, origin: &str) -> Self {
        Self {
            config,
            origin: String::from(origin),
            carriers: None,
            enabled: false,
            active: None,
            path: None,
            pending_start: false,
            epoch: SyncEpoch(0),
            running: false,
        }
    }

    /// Returns `true` once carriers exist.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.carriers.is_some()
    }

    /// Returns the user's audio preference.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `true` while the correction loop is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Slide index of the recorded active video.
    #[must_use]
    pub fn active_video(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    /// How the running loop obtained its audio.
    #[must_use]
    pub fn attach_path(&self) -> Option<AttachPath> {
        self.path.filter(|_| self.running)
    }

    /// The carrier pair, once unlocked.
    #[must_use]
    pub fn carriers(&self) -> Option<&CarrierPair<C>> {
        self.carriers.as_ref()
    }

    /// Current loop token.
    #[must_use]
    pub fn epoch(&self) -> SyncEpoch {
        self.epoch
    }

    /// Installs the carriers created during a user gesture.
    ///
    /// Returns `false` (dropping the arguments) if carriers already exist.
    pub fn unlock(&mut self, primary: C, standby: C) -> bool {
        if self.carriers.is_some() {
            return false;
        }
        let mut primary = Carrier::new(CarrierId(0), primary);
        let mut standby = Carrier::new(CarrierId(1), standby);
        primary.handle.set_muted(false);
        standby.handle.set_muted(true);
        self.carriers = Some(CarrierPair { primary, standby });
        true
    }

    /// Sets the audio preference. Disabling pauses the primary carrier.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop();
        }
    }

    /// Records the active video. Call [`attach`](Self::attach) to start audio.
    pub fn bind_video(&mut self, index: usize, media_id: &str) {
        self.active = Some(ActiveVideo {
            index,
            media: resolve(&self.origin, media_id),
        });
    }

    /// Attaches the primary carrier to the active video and starts the loop.
    ///
    /// Returns `None` when audio is disabled, no video is active, or the
    /// carriers are still locked.
    pub fn attach(&mut self, video: Option<VideoClock>) -> Option<AttachReport> {
        if !self.enabled {
            return None;
        }
        let active = self.active.as_ref()?;
        let index = active.index;
        let pair = self.carriers.as_mut()?;

        let path = if pair.standby.holds(&active.media) {
            pair.swap();
            AttachPath::Swapped
        } else if pair.primary.holds(&active.media) {
            AttachPath::Reused
        } else {
            pair.primary.bind(active.media.clone());
            AttachPath::Fresh
        };
        pair.standby.handle.pause();
        pair.standby.handle.set_muted(true);
        pair.primary.handle.set_muted(false);

        self.epoch = SyncEpoch(self.epoch.0.wrapping_add(1));
        self.path = Some(path);
        self.running = true;
        self.pending_start = true;
        let start = self.try_start(video);

        Some(AttachReport {
            index,
            path,
            start,
            wake: PendingWake::new(Wake::AudioSync(self.epoch), self.config.interval),
        })
    }

    /// Stops the loop, forgets the active video and pauses the primary.
    pub fn detach(&mut self) {
        self.stop();
        self.active = None;
    }

    /// Runs one correction tick against the video clock.
    ///
    /// Returns `None` when `epoch` belongs to a stopped loop.
    pub fn tick(&mut self, epoch: SyncEpoch, video: Option<VideoClock>) -> Option<SyncTick> {
        if !self.running || epoch != self.epoch {
            return None;
        }
        let mut tick = SyncTick {
            drift: None,
            correction: None,
            start: None,
            next: PendingWake::new(Wake::AudioSync(epoch), self.config.interval),
        };
        let Some(clock) = video else {
            return Some(tick);
        };
        if self.pending_start {
            tick.start = Some(self.try_start(Some(clock)));
            return Some(tick);
        }

        let config = self.config;
        let primary = &mut self.carriers.as_mut()?.primary.handle;
        if clock.paused {
            if !primary.is_paused() {
                primary.pause();
            }
            return Some(tick);
        }
        if primary.is_paused() {
            primary.seek(clock.position);
            primary.set_rate(1.0);
            tick.start = Some(start_state(primary.play()));
            return Some(tick);
        }

        let drift = primary.position() - clock.position;
        let correction = correction_for(drift, &config);
        match correction {
            Correction::InSync => primary.set_rate(1.0),
            Correction::Nudge { rate } => primary.set_rate(rate),
            Correction::HardSeek => {
                primary.seek(clock.position);
                primary.set_rate(1.0);
            }
        }
        tick.drift = Some(drift);
        tick.correction = Some(correction);
        Some(tick)
    }

    /// Handles a carrier reporting playable data.
    ///
    /// Starts a deferred attach when `id` is the primary.
    pub fn carrier_ready(&mut self, id: CarrierId, video: Option<VideoClock>) -> Option<StartState> {
        if !self.running || !self.pending_start {
            return None;
        }
        let role = self.carriers.as_ref()?.role_of(id)?;
        if role != CarrierRole::Primary {
            return None;
        }
        Some(self.try_start(video))
    }

    /// Handles a carrier element error, returning its role at the time.
    ///
    /// A failed primary stops sync until the next attach; a failed standby
    /// just forgets what it was preloading.
    pub fn carrier_failed(&mut self, id: CarrierId) -> Option<CarrierRole> {
        let pair = self.carriers.as_mut()?;
        let role = pair.role_of(id)?;
        match role {
            CarrierRole::Primary => {
                pair.primary.bound = None;
                pair.primary.handle.pause();
                self.running = false;
                self.pending_start = false;
            }
            CarrierRole::Standby => pair.standby.bound = None,
        }
        Some(role)
    }

    /// Buffers `media_id` on the standby carrier.
    ///
    /// The standby stays muted; a play-then-pause forces the platform to
    /// actually fetch instead of deferring.
    pub fn preload(&mut self, media_id: &str) -> PreloadOutcome {
        let Some(pair) = self.carriers.as_mut() else {
            return PreloadOutcome::Locked;
        };
        let target = resolve(&self.origin, media_id);
        if pair.standby.holds(&target) {
            return PreloadOutcome::AlreadyPreloaded;
        }
        if self.active.as_ref().is_some_and(|a| a.media == target) {
            return PreloadOutcome::Active;
        }
        let standby = &mut pair.standby;
        standby.bind(target);
        standby.handle.set_muted(true);
        let _ = standby.handle.play();
        standby.handle.pause();
        standby.handle.seek(0.0);
        PreloadOutcome::Loaded
    }

    fn stop(&mut self) {
        self.running = false;
        self.pending_start = false;
        if let Some(pair) = self.carriers.as_mut() {
            pair.primary.handle.pause();
            pair.primary.handle.set_rate(1.0);
        }
    }

    fn try_start(&mut self, video: Option<VideoClock>) -> StartState {
        let Some(pair) = self.carriers.as_mut() else {
            return StartState::Deferred;
        };
        let primary = &mut pair.primary.handle;
        if !primary.has_playable_data() {
            return StartState::Deferred;
        }
        self.pending_start = false;
        let Some(clock) = video else {
            return StartState::Held;
        };
        primary.seek(clock.position);
        primary.set_rate(1.0);
        if clock.paused {
            return StartState::Held;
        }
        start_state(primary.play())
    }
}

fn start_state(result: Result<(), PlaybackError>) -> StartState {
    match result {
        Ok(()) => StartState::Playing,
        Err(e) => StartState::Rejected(e),
    }
}
