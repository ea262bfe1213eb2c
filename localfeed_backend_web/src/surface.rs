// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM media elements behind each slide.
//!
//! The application creates one container element per slide; [`DomSurface`]
//! creates, swaps and tears down the `<img>` / `<video>` inside it and
//! reports element events through an [`ElementEvent`] callback.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::time::Duration;

use localfeed_core::media::{MediaKind, poster_url};
use localfeed_core::slide::Slide;
use localfeed_core::surface::{
    Buffering, LoadPriority, MediaSurface, PlaybackError, Transfer, VideoClock,
};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Event, HtmlCanvasElement, HtmlElement, HtmlImageElement,
    HtmlMediaElement, HtmlVideoElement,
};

/// `HTMLMediaElement.NETWORK_LOADING`.
const NETWORK_LOADING: u16 = 2;
/// `HTMLMediaElement.HAVE_CURRENT_DATA`.
const HAVE_CURRENT_DATA: u16 = 2;
/// `HTMLMediaElement.HAVE_ENOUGH_DATA`.
const HAVE_ENOUGH_DATA: u16 = 4;

/// Class given to every media element the surface creates.
pub const MEDIA_CLASS: &str = "slide-media";
/// Class of the inline error indicator.
pub const ERROR_CLASS: &str = "slide-error";

/// An element event forwarded to the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementEvent {
    /// `load` (images) or `loadeddata` (videos).
    Loaded(usize),
    /// `error`.
    Failed(usize),
    /// A video reached its end.
    Ended(usize),
}

type EventCallback = Rc<dyn Fn(ElementEvent)>;
type Handler = Closure<dyn FnMut(Event)>;

enum MediaElement {
    Image(HtmlImageElement),
    Video(HtmlVideoElement),
}

impl MediaElement {
    fn html(&self) -> &HtmlElement {
        match self {
            Self::Image(img) => img,
            Self::Video(video) => video,
        }
    }
}

/// Content attached to one slide container.
struct MediaNode {
    element: MediaElement,
    kind: MediaKind,
    _handlers: Vec<Handler>,
    frozen: Option<HtmlCanvasElement>,
    error: Option<HtmlElement>,
}

impl MediaNode {
    fn clear_handlers(&self) {
        let el = self.element.html();
        el.set_onload(None);
        el.set_onloadeddata(None);
        el.set_onerror(None);
        el.set_onended(None);
    }

    fn detach(&mut self) {
        if let Some(canvas) = self.frozen.take() {
            canvas.remove();
        }
        if let Some(error) = self.error.take() {
            error.remove();
        }
        self.element.html().remove();
    }
}

impl Drop for MediaNode {
    fn drop(&mut self) {
        // The element may outlive its closures.
        self.clear_handlers();
    }
}

struct SlideNode {
    container: HtmlElement,
    media: Option<MediaNode>,
}

/// [`MediaSurface`] over DOM slide containers.
pub struct DomSurface {
    document: Document,
    slides: Vec<SlideNode>,
    loop_videos: bool,
    events: EventCallback,
    play_rejected: Closure<dyn FnMut(JsValue)>,
}

impl core::fmt::Debug for DomSurface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomSurface")
            .field("slides", &self.slides.len())
            .field("loop_videos", &self.loop_videos)
            .finish_non_exhaustive()
    }
}

impl DomSurface {
    /// Creates a surface with no slides.
    ///
    /// `events` receives element events; it is called from the browser's
    /// event loop, never from inside a surface method.
    pub fn new(document: Document, events: impl Fn(ElementEvent) + 'static) -> Self {
        let play_rejected = Closure::wrap(Box::new(|reason: JsValue| {
            // Autoplay refusals are expected and recovered by the next play.
            web_sys::console::debug_2(&"localfeed: play() rejected".into(), &reason);
        }) as Box<dyn FnMut(JsValue)>);
        Self {
            document,
            slides: Vec::new(),
            loop_videos: true,
            events: Rc::new(events),
            play_rejected,
        }
    }

    /// Sets whether videos loop. Turn off when videos should end (and
    /// auto-advance).
    pub fn set_loop_videos(&mut self, loop_videos: bool) {
        self.loop_videos = loop_videos;
    }

    /// Replaces the slide containers. Content of the old containers is
    /// detached.
    pub fn set_slides(&mut self, containers: Vec<HtmlElement>) {
        for slide in &mut self.slides {
            if let Some(mut media) = slide.media.take() {
                media.detach();
            }
        }
        self.slides = containers
            .into_iter()
            .map(|container| SlideNode {
                container,
                media: None,
            })
            .collect();
    }

    /// Container element of slide `index`.
    #[must_use]
    pub fn container(&self, index: usize) -> Option<&HtmlElement> {
        self.slides.get(index).map(|s| &s.container)
    }

    fn media(&self, index: usize) -> Option<&MediaNode> {
        self.slides.get(index)?.media.as_ref()
    }

    fn video(&self, index: usize) -> Option<&HtmlVideoElement> {
        match &self.media(index)?.element {
            MediaElement::Video(video) => Some(video),
            MediaElement::Image(_) => None,
        }
    }

    fn handler(&self, event: ElementEvent) -> Handler {
        let events = Rc::clone(&self.events);
        Closure::wrap(Box::new(move |_: Event| events(event)) as Box<dyn FnMut(Event)>)
    }

    fn create_video(&self, slide: &Slide, priority: LoadPriority) -> Result<MediaNode, JsValue> {
        let index = slide.index();
        let video: HtmlVideoElement = self.document.create_element("video")?.unchecked_into();
        video.set_class_name(MEDIA_CLASS);
        video.set_muted(true);
        video.set_default_muted(true);
        video.set_loop(self.loop_videos);
        video.set_preload(priority.buffering().as_str());
        video.set_attribute("playsinline", "")?;
        if let Some(poster) = poster_url(slide.media_id()) {
            video.set_poster(&poster);
        }

        let handlers = alloc::vec![
            self.handler(ElementEvent::Loaded(index)),
            self.handler(ElementEvent::Failed(index)),
            self.handler(ElementEvent::Ended(index)),
        ];
        video.set_onloadeddata(Some(handlers[0].as_ref().unchecked_ref()));
        video.set_onerror(Some(handlers[1].as_ref().unchecked_ref()));
        video.set_onended(Some(handlers[2].as_ref().unchecked_ref()));
        video.set_src(slide.media_id());

        Ok(MediaNode {
            element: MediaElement::Video(video),
            kind: MediaKind::Video,
            _handlers: handlers,
            frozen: None,
            error: None,
        })
    }

    fn create_image(&self, slide: &Slide) -> Result<MediaNode, JsValue> {
        let index = slide.index();
        let img = HtmlImageElement::new()?;
        img.set_class_name(MEDIA_CLASS);
        img.set_decoding("async");

        let handlers = alloc::vec![
            self.handler(ElementEvent::Loaded(index)),
            self.handler(ElementEvent::Failed(index)),
        ];
        img.set_onload(Some(handlers[0].as_ref().unchecked_ref()));
        img.set_onerror(Some(handlers[1].as_ref().unchecked_ref()));
        img.set_src(slide.media_id());

        Ok(MediaNode {
            element: MediaElement::Image(img),
            kind: slide.kind(),
            _handlers: handlers,
            frozen: None,
            error: None,
        })
    }

    fn freeze(&mut self, index: usize) -> Result<(), JsValue> {
        let Some(media) = self.slides.get_mut(index).and_then(|s| s.media.as_mut()) else {
            return Ok(());
        };
        let MediaElement::Image(img) = &media.element else {
            return Ok(());
        };
        if media.frozen.is_some() || !img.complete() || img.natural_width() == 0 {
            return Ok(());
        }

        let canvas: HtmlCanvasElement = self.document.create_element("canvas")?.unchecked_into();
        canvas.set_class_name(MEDIA_CLASS);
        canvas.set_width(img.natural_width());
        canvas.set_height(img.natural_height());
        let Some(context) = canvas.get_context("2d")? else {
            return Ok(());
        };
        let context: CanvasRenderingContext2d = context.dyn_into()?;
        context.draw_image_with_html_image_element(img, 0.0, 0.0)?;

        img.insert_adjacent_element("beforebegin", &canvas)?;
        let _ = img.style().set_property("display", "none");
        media.frozen = Some(canvas);
        Ok(())
    }

    fn unfreeze(&mut self, index: usize) {
        let Some(media) = self.slides.get_mut(index).and_then(|s| s.media.as_mut()) else {
            return;
        };
        if let Some(canvas) = media.frozen.take() {
            canvas.remove();
            let _ = media.element.html().style().remove_property("display");
        }
    }
}

fn warn(what: &str, result: Result<(), JsValue>) {
    if let Err(e) = result {
        web_sys::console::warn_2(&alloc::format!("localfeed: {what} failed").into(), &e);
    }
}

impl MediaSurface for DomSurface {
    fn load(&mut self, slide: &Slide, priority: LoadPriority) {
        let index = slide.index();
        let node = if slide.kind().is_video() {
            self.create_video(slide, priority)
        } else {
            self.create_image(slide)
        };
        let node = match node {
            Ok(node) => node,
            Err(e) => {
                warn("creating media element", Err(e));
                // The controller is borrowed for this call; report on the next
                // task so the slide leaves `Loading` and shows its indicator.
                let events = Rc::clone(&self.events);
                crate::timer::after(Duration::ZERO, move || events(ElementEvent::Failed(index)));
                return;
            }
        };
        let Some(entry) = self.slides.get_mut(index) else {
            return;
        };
        if let Some(mut old) = entry.media.take() {
            old.detach();
        }
        warn(
            "attaching media element",
            entry
                .container
                .append_child(node.element.html())
                .map(|_| ()),
        );
        entry.media = Some(node);
    }

    fn transfer(&self, index: usize) -> Transfer {
        let Some(media) = self.media(index) else {
            return Transfer::Idle;
        };
        match &media.element {
            MediaElement::Image(img) => {
                if img.src().is_empty() {
                    Transfer::Idle
                } else if img.complete() {
                    Transfer::Complete
                } else {
                    Transfer::InFlight
                }
            }
            MediaElement::Video(video) => {
                let ready = video.ready_state();
                if video.network_state() == NETWORK_LOADING && ready < HAVE_ENOUGH_DATA {
                    Transfer::InFlight
                } else if ready >= HAVE_CURRENT_DATA {
                    Transfer::Complete
                } else {
                    Transfer::Idle
                }
            }
        }
    }

    fn play(&mut self, index: usize) -> Result<(), PlaybackError> {
        let video = self.video(index).ok_or(PlaybackError::NoElement)?;
        match video.play() {
            Ok(promise) => {
                let _ = promise.catch(&self.play_rejected);
                Ok(())
            }
            Err(_) => Err(PlaybackError::Blocked),
        }
    }

    fn pause(&mut self, index: usize) {
        if let Some(video) = self.video(index) {
            warn("pause", video.pause());
        }
    }

    fn set_muted(&mut self, index: usize, muted: bool) {
        if let Some(video) = self.video(index) {
            video.set_muted(muted);
        }
    }

    fn set_buffering(&mut self, index: usize, buffering: Buffering) {
        if let Some(video) = self.video(index) {
            video.set_preload(buffering.as_str());
        }
    }

    fn set_animating(&mut self, index: usize, animating: bool) {
        if self.media(index).is_none_or(|m| m.kind != MediaKind::Gif) {
            return;
        }
        if animating {
            self.unfreeze(index);
        } else {
            let result = self.freeze(index);
            warn("freezing gif", result);
        }
    }

    fn video_clock(&self, index: usize) -> Option<VideoClock> {
        let video = self.video(index)?;
        Some(VideoClock {
            position: video.current_time(),
            paused: video.paused(),
        })
    }

    fn abort(&mut self, index: usize) {
        let Some(mut media) = self.slides.get_mut(index).and_then(|s| s.media.take()) else {
            return;
        };
        media.clear_handlers();
        match &media.element {
            MediaElement::Video(video) => {
                let _ = video.pause();
                let _ = video.remove_attribute("src");
                // Without a reload the transfer keeps running.
                HtmlMediaElement::load(video);
            }
            MediaElement::Image(img) => img.set_src(""),
        }
        media.detach();
    }

    fn show_error(&mut self, index: usize) {
        let Some(slide) = self.slides.get_mut(index) else {
            return;
        };
        let shown = match slide.media.as_ref() {
            Some(media) => media.error.is_some(),
            // No element was created; the container holds the indicator alone.
            None => slide
                .container
                .query_selector(&alloc::format!(".{ERROR_CLASS}"))
                .ok()
                .flatten()
                .is_some(),
        };
        if shown {
            return;
        }
        let indicator: HtmlElement = match self.document.create_element("div") {
            Ok(el) => el.unchecked_into(),
            Err(e) => {
                warn("creating error indicator", Err(e));
                return;
            }
        };
        indicator.set_class_name(ERROR_CLASS);
        indicator.set_text_content(Some("Could not load this item"));
        warn(
            "attaching error indicator",
            slide.container.append_child(&indicator).map(|_| ()),
        );
        if let Some(media) = slide.media.as_mut() {
            let _ = media.element.html().style().set_property("display", "none");
            media.error = Some(indicator);
        }
    }
}
