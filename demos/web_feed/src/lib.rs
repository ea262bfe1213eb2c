// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Full-screen swipe feed in the browser.
//!
//! Builds a scroll-snapping column of slides, one per media file, and hands
//! them to a [`FeedHandle`]. The media list comes from the `data-media`
//! attribute on `<body>` (comma separated, relative to the page), falling
//! back to a built-in list. Setting `data-auto-advance` on `<body>` makes
//! videos advance the feed when they end instead of looping.
//!
//! Build with: `wasm-pack build --target web demos/web_feed`
//! Then serve the directory holding `index.html` and the media files.

#![no_std]
#![cfg_attr(
    not(target_arch = "wasm32"),
    allow(dead_code, reason = "this crate only runs in the browser")
)]

extern crate alloc;

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use localfeed_backend_web::{ConsoleSink, FeedHandle};
use localfeed_core::config::FeedConfig;
use localfeed_core::controller::FeedEvent;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, HtmlButtonElement, HtmlElement};

const DEFAULT_MEDIA: [&str; 6] = [
    "media/welcome.jpg",
    "media/waves.mp4",
    "media/spinner.gif",
    "media/street.mp4",
    "media/night sky.png",
    "media/birds.mp4",
];

/// Entry point for the web-feed demo.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?;

    let media = media_list(body.get_attribute("data-media").as_deref());
    let mut config = FeedConfig::standard();
    if body.has_attribute("data-auto-advance") {
        config = config.with_auto_advance();
    }

    let scroller = element(&document, "main")?;
    style(
        &scroller,
        "position: fixed; inset: 0; overflow-y: scroll; scroll-snap-type: y mandatory; background: #000;",
    )?;
    let mut slides = Vec::with_capacity(media.len());
    for _ in &media {
        let slide = element(&document, "div")?;
        style(
            &slide,
            "position: relative; height: 100%; scroll-snap-align: start; scroll-snap-stop: always; display: flex; align-items: center; justify-content: center; overflow: hidden;",
        )?;
        scroller.append_child(&slide)?;
        slides.push(slide);
    }
    body.append_child(&scroller)?;

    let status = element(&document, "div")?;
    style(
        &status,
        "position: fixed; top: 12px; left: 12px; padding: 4px 10px; border-radius: 999px; background: rgba(0,0,0,0.55); color: #fff; font: 13px/1.4 system-ui, sans-serif;",
    )?;
    body.append_child(&status)?;

    let sound: HtmlButtonElement = document.create_element("button")?.unchecked_into();
    sound.set_text_content(Some("Sound off"));
    style(
        &sound,
        "position: fixed; top: 12px; right: 12px; border: 0; border-radius: 999px; padding: 6px 14px; background: rgba(255,255,255,0.85); font: 600 13px/1.4 system-ui, sans-serif; cursor: pointer;",
    )?;
    body.append_child(&sound)?;

    let handle = FeedHandle::new(config, scroller)?;
    handle.set_trace_sink(Box::new(ConsoleSink::new()));

    let total = media.len();
    let targets = slides.clone();
    handle.set_listener(move |event| match event {
        FeedEvent::ActiveChanged { index } => {
            status.set_text_content(Some(&format!("{} / {total}", index + 1)));
        }
        // The observer reports the new position once the scroll lands.
        FeedEvent::AdvanceRequested { to, .. } => {
            if let Some(slide) = targets.get(to) {
                slide.scroll_into_view();
            }
        }
    });
    handle.load_feed(&media, slides)?;

    // Bubbles to the document after the button handler, so the audio
    // preference is already set when the carriers are created.
    handle.unlock_on_gesture(&document)?;

    let toggle = handle.clone();
    let label = sound.clone();
    let sound_cb = Closure::wrap(Box::new(move |_event: Event| {
        let on = toggle.toggle_audio();
        label.set_text_content(Some(if on { "Sound on" } else { "Sound off" }));
    }) as Box<dyn FnMut(_)>);
    sound.add_event_listener_with_callback("click", sound_cb.as_ref().unchecked_ref())?;
    sound_cb.forget();

    // The session lives as long as the page.
    core::mem::forget(handle);
    Ok(())
}

/// Splits a `data-media` value, or returns the built-in list.
fn media_list(attribute: Option<&str>) -> Vec<String> {
    let listed: Vec<String> = attribute
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();
    if listed.is_empty() {
        DEFAULT_MEDIA.iter().map(ToString::to_string).collect()
    } else {
        listed
    }
}

fn element(doc: &Document, tag: &str) -> Result<HtmlElement, JsValue> {
    Ok(doc.create_element(tag)?.unchecked_into())
}

fn style(el: &web_sys::Element, css: &str) -> Result<(), JsValue> {
    el.set_attribute("style", css)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_list_from_attribute() {
        assert_eq!(
            media_list(Some(" a.jpg, b.mp4 ,,c.gif ")),
            ["a.jpg", "b.mp4", "c.gif"]
        );
    }

    #[test]
    fn media_list_falls_back_to_builtin() {
        assert_eq!(media_list(None).len(), DEFAULT_MEDIA.len());
        assert_eq!(media_list(Some(" , ")).len(), DEFAULT_MEDIA.len());
    }
}
