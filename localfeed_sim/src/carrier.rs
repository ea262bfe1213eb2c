// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A simulated audio element.
//!
//! The controller owns its carriers once they are unlocked, so a
//! [`SimCarrier`] is a handle onto shared [`CarrierState`]: the driver keeps
//! a clone to advance its clock and to inspect or perturb it.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::time::Duration;

use localfeed_core::audio::AudioCarrier;
use localfeed_core::surface::PlaybackError;

/// Observable state of a [`SimCarrier`].
#[derive(Clone, Debug, PartialEq)]
pub struct CarrierState {
    /// Last source loaded.
    pub src: Option<String>,
    /// Number of `load` calls.
    pub loads: usize,
    /// Muted flag.
    pub muted: bool,
    /// Paused flag.
    pub paused: bool,
    /// Position in seconds.
    pub position: f64,
    /// Playback rate.
    pub rate: f64,
    /// Whether enough data is buffered to play.
    pub ready: bool,
    /// Whether a new source becomes ready immediately on load.
    pub instant_ready: bool,
    /// Makes `play` fail with [`PlaybackError::Blocked`].
    pub refuse_play: bool,
}

impl Default for CarrierState {
    fn default() -> Self {
        Self {
            src: None,
            loads: 0,
            muted: true,
            paused: true,
            position: 0.0,
            rate: 1.0,
            ready: false,
            instant_ready: true,
            refuse_play: false,
        }
    }
}

/// Shared handle to a simulated audio element.
#[derive(Clone, Debug, Default)]
pub struct SimCarrier {
    state: Rc<RefCell<CarrierState>>,
}

impl SimCarrier {
    /// Creates a paused, muted carrier with no source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the state.
    #[must_use]
    pub fn state(&self) -> Ref<'_, CarrierState> {
        self.state.borrow()
    }

    /// Mutably borrows the state.
    pub fn state_mut(&self) -> RefMut<'_, CarrierState> {
        self.state.borrow_mut()
    }

    /// Moves the position forward by `dt` at the current rate while playing.
    pub fn advance(&self, dt: Duration) {
        let mut s = self.state.borrow_mut();
        if !s.paused {
            s.position += dt.as_secs_f64() * s.rate;
        }
    }
}

impl AudioCarrier for SimCarrier {
    fn load(&mut self, url: &str) {
        let mut s = self.state.borrow_mut();
        s.src = Some(String::from(url));
        s.loads += 1;
        s.position = 0.0;
        s.paused = true;
        s.ready = s.instant_ready;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut s = self.state.borrow_mut();
        if s.refuse_play {
            return Err(PlaybackError::Blocked);
        }
        if s.src.is_none() {
            return Err(PlaybackError::NoElement);
        }
        s.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn position(&self) -> f64 {
        self.state.borrow().position
    }

    fn seek(&mut self, position: f64) {
        self.state.borrow_mut().position = position;
    }

    fn rate(&self) -> f64 {
        self.state.borrow().rate
    }

    fn set_rate(&mut self, rate: f64) {
        self.state.borrow_mut().rate = rate;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.state.borrow().muted
    }

    fn has_playable_data(&self) -> bool {
        let s = self.state.borrow();
        s.src.is_some() && s.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = SimCarrier::new();
        let mut b = a.clone();
        b.load("http://feed.local/a.mp4");
        assert_eq!(a.state().loads, 1);
        assert!(a.has_playable_data());

        b.play().unwrap();
        b.set_rate(1.05);
        a.advance(Duration::from_secs(2));
        assert!((b.position() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn unloaded_carrier_refuses_play() {
        let mut c = SimCarrier::new();
        assert_eq!(c.play(), Err(PlaybackError::NoElement));
        c.state_mut().instant_ready = false;
        c.load("a.mp4");
        assert!(!c.has_playable_data());
    }
}
