// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser backend for localfeed.
//!
//! This crate provides the platform half of the controller contract on top of
//! browser APIs:
//!
//! - [`DomSurface`]: `<img>` / `<video>` elements inside app-owned slide
//!   containers, with hard-abort and GIF freeze-frames
//! - [`HtmlAudioCarrier`]: off-DOM `<audio>` carriers
//! - [`FeedViewport`]: `IntersectionObserver` batches for the viewport and
//!   the lookahead band
//! - [`ConsoleSink`]: trace output to the browser console
//! - [`FeedHandle`]: owns the controller and wires all of the above together,
//!   including `setTimeout` wakes and the first-gesture audio unlock
//!
//! All callbacks arrive from the browser event loop. A [`FeedEvent`] listener
//! runs while the controller is borrowed and must not call back into the
//! handle synchronously; defer such work (e.g. scroll the feed and let the
//! observer report).

#![no_std]

extern crate alloc;

mod carrier;
mod console;
mod surface;
mod timer;
mod viewport;

pub use carrier::{CarrierEvent, HtmlAudioCarrier};
pub use console::ConsoleSink;
pub use surface::{DomSurface, ERROR_CLASS, ElementEvent, MEDIA_CLASS};
pub use viewport::{FeedViewport, INDEX_ATTRIBUTE};

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString as _};
use alloc::vec::Vec;
use core::cell::RefCell;

use localfeed_core::audio::CarrierId;
use localfeed_core::config::FeedConfig;
use localfeed_core::controller::{FeedController, FeedEvent};
use localfeed_core::trace::TraceSink;
use localfeed_core::wake::PendingWake;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget, HtmlElement};

/// The controller as driven in the browser.
pub type WebController = FeedController<DomSurface, HtmlAudioCarrier>;

/// Events that count as a user gesture for audio unlocking.
const GESTURE_EVENTS: [&str; 3] = ["pointerdown", "touchend", "keydown"];

struct Shared {
    controller: RefCell<WebController>,
    scroller: HtmlElement,
    viewport: RefCell<Option<FeedViewport>>,
    gesture: RefCell<Option<Closure<dyn FnMut(Event)>>>,
    gesture_target: RefCell<Option<EventTarget>>,
}

/// Owner of a browser feed session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct FeedHandle {
    shared: Rc<Shared>,
}

impl core::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("controller", &self.shared.controller)
            .field("viewport", &self.shared.viewport)
            .finish_non_exhaustive()
    }
}

/// Runs `f` against the controller, then hands its wakes to `setTimeout`.
fn run<R>(shared: &Rc<Shared>, f: impl FnOnce(&mut WebController) -> R) -> R {
    let (result, wakes) = {
        let mut controller = shared.controller.borrow_mut();
        let result = f(&mut controller);
        (result, controller.take_wakes())
    };
    for PendingWake { wake, after } in wakes {
        let weak = Rc::downgrade(shared);
        timer::after(after, move || {
            if let Some(shared) = weak.upgrade() {
                // Boxed so the recursive call reuses one `run` instantiation.
                let f: Box<dyn FnOnce(&mut WebController)> = Box::new(move |c| c.wake(wake));
                run(&shared, f);
            }
        });
    }
    result
}

fn element_events(weak: Weak<Shared>) -> impl Fn(ElementEvent) + 'static {
    move |event| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        run(&shared, |c| match event {
            ElementEvent::Loaded(index) => c.content_loaded(index),
            ElementEvent::Failed(index) => c.content_failed(index),
            ElementEvent::Ended(index) => c.video_ended(index),
        });
    }
}

fn carrier_events(weak: Weak<Shared>) -> impl Fn(CarrierEvent) + Clone + 'static {
    move |event| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        run(&shared, |c| match event {
            CarrierEvent::Ready(id) => c.carrier_ready(id),
            CarrierEvent::Failed(id) => c.carrier_failed(id),
        });
    }
}

/// Creates the carriers and hands them to the controller. Must run inside a
/// user gesture.
fn unlock(shared: &Rc<Shared>) -> Result<bool, JsValue> {
    if shared.controller.borrow().audio().is_unlocked() {
        return Ok(false);
    }
    let primary = HtmlAudioCarrier::new(CarrierId(0), carrier_events(Rc::downgrade(shared)))?;
    let standby = HtmlAudioCarrier::new(CarrierId(1), carrier_events(Rc::downgrade(shared)))?;
    Ok(run(shared, |c| c.unlock_audio(primary, standby)))
}

impl FeedHandle {
    /// Creates a session for the feed scrolled by `scroller`.
    ///
    /// Videos loop unless `config` enables auto-advance.
    pub fn new(config: FeedConfig, scroller: HtmlElement) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let origin = window.location().origin()?;

        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let mut surface = DomSurface::new(document, element_events(weak.clone()));
            surface.set_loop_videos(config.auto_advance.is_none());
            Shared {
                controller: RefCell::new(FeedController::new(config, surface, &origin)),
                scroller,
                viewport: RefCell::new(None),
                gesture: RefCell::new(None),
                gesture_target: RefCell::new(None),
            }
        });
        Ok(Self { shared })
    }

    /// Sets the receiver of [`FeedEvent`]s.
    pub fn set_listener(&self, listener: impl FnMut(FeedEvent) + 'static) {
        self.shared.controller.borrow_mut().set_listener(listener);
    }

    /// Installs a trace sink (see [`ConsoleSink`]).
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        self.shared.controller.borrow_mut().set_trace_sink(sink);
    }

    /// Replaces the feed with `media_ids`, one per container in `slides`.
    ///
    /// The containers must already be in the document, in feed order. Their
    /// [`INDEX_ATTRIBUTE`] is set here.
    pub fn load_feed(&self, media_ids: &[String], slides: Vec<HtmlElement>) -> Result<(), JsValue> {
        // Stop the old observers before its slides go away.
        self.shared.viewport.borrow_mut().take();
        for (index, slide) in slides.iter().enumerate() {
            slide.set_attribute(INDEX_ATTRIBUTE, &index.to_string())?;
        }

        let count = slides.len().min(media_ids.len());
        let observed = slides[..count].to_vec();
        let (epoch, distance, snap_ratio) = run(&self.shared, |c| {
            let epoch = c.rebuild(media_ids[..count].iter().cloned());
            c.surface_mut().set_slides(slides);
            for index in 0..count {
                c.attach(index);
            }
            let config = c.config();
            (epoch, config.preload_distance, config.snap_ratio)
        });

        let weak = Rc::downgrade(&self.shared);
        let viewport = FeedViewport::new(
            &self.shared.scroller,
            &observed,
            distance,
            snap_ratio,
            epoch,
            move |epoch, batch| {
                if let Some(shared) = weak.upgrade() {
                    run(&shared, |c| c.observe(epoch, batch));
                }
            },
        )?;
        *self.shared.viewport.borrow_mut() = Some(viewport);
        Ok(())
    }

    /// Unlocks audio on the first gesture received by `target`.
    ///
    /// The listeners are removed once the carriers exist.
    pub fn unlock_on_gesture(&self, target: &EventTarget) -> Result<(), JsValue> {
        let weak = Rc::downgrade(&self.shared);
        let closure = Closure::wrap(Box::new(move |_: Event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match unlock(&shared) {
                Ok(_) => {
                    if let (Some(target), Some(closure)) = (
                        shared.gesture_target.borrow_mut().take(),
                        shared.gesture.borrow().as_ref(),
                    ) {
                        for name in GESTURE_EVENTS {
                            let _ = target.remove_event_listener_with_callback(
                                name,
                                closure.as_ref().unchecked_ref(),
                            );
                        }
                    }
                }
                Err(e) => web_sys::console::warn_2(&"localfeed: audio unlock failed".into(), &e),
            }
        }) as Box<dyn FnMut(Event)>);

        for name in GESTURE_EVENTS {
            target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        }
        *self.shared.gesture_target.borrow_mut() = Some(target.clone());
        *self.shared.gesture.borrow_mut() = Some(closure);
        Ok(())
    }

    /// Unlocks audio now. Call from inside a user gesture handler.
    ///
    /// Returns `false` if audio was already unlocked.
    pub fn unlock_audio(&self) -> Result<bool, JsValue> {
        unlock(&self.shared)
    }

    /// Sets the audio preference.
    pub fn set_audio_enabled(&self, enabled: bool) {
        run(&self.shared, |c| {
            if enabled {
                c.enable_audio();
            } else {
                c.disable_audio();
            }
        });
    }

    /// Flips the audio preference and returns the new value.
    pub fn toggle_audio(&self) -> bool {
        run(&self.shared, WebController::toggle_audio)
    }

    /// Index of the active slide.
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.shared.controller.borrow().active_index()
    }

    /// Runs `f` against the controller and schedules whatever it requested.
    pub fn with<R>(&self, f: impl FnOnce(&mut WebController) -> R) -> R {
        run(&self.shared, f)
    }
}
