// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `HTMLAudioElement` audio carriers.

use alloc::boxed::Box;

use localfeed_core::audio::{AudioCarrier, CarrierId};
use localfeed_core::surface::PlaybackError;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Event, HtmlAudioElement};

/// `HTMLMediaElement.HAVE_FUTURE_DATA`.
const HAVE_FUTURE_DATA: u16 = 3;

/// Readiness change reported by a carrier element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarrierEvent {
    /// `canplay`.
    Ready(CarrierId),
    /// `error`.
    Failed(CarrierId),
}

/// An off-DOM `<audio>` element used as an [`AudioCarrier`].
///
/// Create carriers inside a user gesture handler; elements created earlier
/// cannot start audible playback on mobile browsers.
pub struct HtmlAudioCarrier {
    element: HtmlAudioElement,
    _on_ready: Closure<dyn FnMut(Event)>,
    _on_error: Closure<dyn FnMut(Event)>,
    play_rejected: Closure<dyn FnMut(JsValue)>,
}

impl core::fmt::Debug for HtmlAudioCarrier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HtmlAudioCarrier")
            .field("src", &self.element.src())
            .field("paused", &self.element.paused())
            .finish_non_exhaustive()
    }
}

impl HtmlAudioCarrier {
    /// Creates a carrier reporting `canplay` and `error` as [`CarrierEvent`]s
    /// for `id`.
    pub fn new(
        id: CarrierId,
        events: impl Fn(CarrierEvent) + Clone + 'static,
    ) -> Result<Self, JsValue> {
        let element = HtmlAudioElement::new()?;
        element.set_preload("auto");

        let ready = events.clone();
        let on_ready = Closure::wrap(
            Box::new(move |_: Event| ready(CarrierEvent::Ready(id))) as Box<dyn FnMut(Event)>
        );
        let on_error = Closure::wrap(
            Box::new(move |_: Event| events(CarrierEvent::Failed(id))) as Box<dyn FnMut(Event)>
        );
        element.set_oncanplay(Some(on_ready.as_ref().unchecked_ref()));
        element.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        let play_rejected = Closure::wrap(Box::new(move |reason: JsValue| {
            web_sys::console::debug_2(&"localfeed: carrier play() rejected".into(), &reason);
        }) as Box<dyn FnMut(JsValue)>);

        Ok(Self {
            element,
            _on_ready: on_ready,
            _on_error: on_error,
            play_rejected,
        })
    }

    /// The underlying element.
    #[must_use]
    pub fn element(&self) -> &HtmlAudioElement {
        &self.element
    }
}

impl Drop for HtmlAudioCarrier {
    fn drop(&mut self) {
        self.element.set_oncanplay(None);
        self.element.set_onerror(None);
        let _ = self.element.pause();
    }
}

impl AudioCarrier for HtmlAudioCarrier {
    fn load(&mut self, url: &str) {
        self.element.set_src(url);
        self.element.load();
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        match self.element.play() {
            Ok(promise) => {
                let _ = promise.catch(&self.play_rejected);
                Ok(())
            }
            Err(_) => Err(PlaybackError::Blocked),
        }
    }

    fn pause(&mut self) {
        let _ = self.element.pause();
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn position(&self) -> f64 {
        self.element.current_time()
    }

    fn seek(&mut self, position: f64) {
        self.element.set_current_time(position);
    }

    fn rate(&self) -> f64 {
        self.element.playback_rate()
    }

    fn set_rate(&mut self, rate: f64) {
        self.element.set_playback_rate(rate);
    }

    fn set_muted(&mut self, muted: bool) {
        self.element.set_muted(muted);
    }

    fn is_muted(&self) -> bool {
        self.element.muted()
    }

    fn has_playable_data(&self) -> bool {
        self.element.ready_state() >= HAVE_FUTURE_DATA
    }
}
