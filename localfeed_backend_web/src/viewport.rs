// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `IntersectionObserver`s over the slide containers.
//!
//! Two observers share one callback. The visibility observer's root is the
//! scrolling feed element itself, with thresholds fine enough to track the
//! snap ratio. The lookahead observer extends that root above and below by
//! `preload_distance` viewport heights and only reports slides entering or
//! leaving the band. Each entry's ratio is measured against the physical
//! viewport, whichever observer produced it.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use js_sys::{Array, Object, Reflect};
use kurbo::Rect;
use localfeed_core::visibility::{Intersection, ObserverEpoch};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{
    DomRectReadOnly, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit,
};

/// Attribute carrying a slide container's index.
pub const INDEX_ATTRIBUTE: &str = "data-index";

/// Base thresholds of the visibility observer.
const THRESHOLDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

type BatchClosure = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// Observes slide containers and reports batches for one observation
/// context.
///
/// Dropping the viewport disconnects both observers.
pub struct FeedViewport {
    visible: IntersectionObserver,
    lookahead: Option<IntersectionObserver>,
    epoch: ObserverEpoch,
    _callback: BatchClosure,
}

impl core::fmt::Debug for FeedViewport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeedViewport")
            .field("epoch", &self.epoch)
            .field("lookahead", &self.lookahead.is_some())
            .finish_non_exhaustive()
    }
}

impl FeedViewport {
    /// Starts observing `slides` inside `scroller`.
    ///
    /// Every slide must carry its index in [`INDEX_ATTRIBUTE`]. `on_batch`
    /// receives the converted entries tagged with `epoch`. The lookahead
    /// observer only exists when `preload_distance` is non-zero.
    pub fn new(
        scroller: &HtmlElement,
        slides: &[HtmlElement],
        preload_distance: u32,
        snap_ratio: f64,
        epoch: ObserverEpoch,
        mut on_batch: impl FnMut(ObserverEpoch, &[Intersection]) + 'static,
    ) -> Result<Self, JsValue> {
        let root = scroller.clone();
        let callback = Closure::wrap(Box::new(move |entries: Array, _: IntersectionObserver| {
            let viewport = rect(&root.get_bounding_client_rect());
            let batch: Vec<Intersection> = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .filter_map(|entry| convert(&entry, viewport))
                .collect();
            if !batch.is_empty() {
                on_batch(epoch, &batch);
            }
        }) as Box<dyn FnMut(Array, IntersectionObserver)>);

        let visible = observer(
            &callback,
            scroller,
            &root_margin(0),
            &viewport_thresholds(snap_ratio),
        )?;
        for slide in slides {
            visible.observe(slide);
        }

        let lookahead = if preload_distance > 0 {
            let lookahead = observer(&callback, scroller, &root_margin(preload_distance), &[0.0])?;
            for slide in slides {
                lookahead.observe(slide);
            }
            Some(lookahead)
        } else {
            None
        };

        Ok(Self {
            visible,
            lookahead,
            epoch,
            _callback: callback,
        })
    }

    /// The observation context this viewport reports for.
    #[must_use]
    pub fn epoch(&self) -> ObserverEpoch {
        self.epoch
    }
}

fn observer(
    callback: &BatchClosure,
    scroller: &HtmlElement,
    margin: &str,
    thresholds: &[f64],
) -> Result<IntersectionObserver, JsValue> {
    let thresholds: Array = thresholds.iter().map(|&t| JsValue::from_f64(t)).collect();
    let options = Object::new();
    Reflect::set(&options, &"root".into(), scroller)?;
    Reflect::set(&options, &"rootMargin".into(), &margin.into())?;
    Reflect::set(&options, &"threshold".into(), &thresholds)?;
    let options: IntersectionObserverInit = options.unchecked_into();
    IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
}

impl Drop for FeedViewport {
    fn drop(&mut self) {
        self.visible.disconnect();
        if let Some(lookahead) = &self.lookahead {
            lookahead.disconnect();
        }
    }
}

fn convert(entry: &IntersectionObserverEntry, viewport: Rect) -> Option<Intersection> {
    let index = parse_index(entry.target().get_attribute(INDEX_ATTRIBUTE).as_deref())?;
    let bounds = rect(&entry.bounding_client_rect());
    Some(Intersection {
        index,
        ratio: visible_ratio(bounds, viewport),
        is_intersecting: entry.is_intersecting(),
        bounds,
        viewport,
    })
}

fn rect(r: &DomRectReadOnly) -> Rect {
    Rect::new(r.left(), r.top(), r.right(), r.bottom())
}

/// Visibility thresholds, with `snap_ratio` added so crossing it always
/// produces a batch.
pub(crate) fn viewport_thresholds(snap_ratio: f64) -> Vec<f64> {
    let mut thresholds = THRESHOLDS.to_vec();
    if (0.0..=1.0).contains(&snap_ratio) {
        thresholds.push(snap_ratio);
    }
    thresholds.sort_by(f64::total_cmp);
    thresholds.dedup();
    thresholds
}

/// `rootMargin` extending the root by `distance` viewport heights.
pub(crate) fn root_margin(distance: u32) -> String {
    format!("{}% 0px", u64::from(distance) * 100)
}

/// Fraction of `bounds` inside `viewport`.
pub(crate) fn visible_ratio(bounds: Rect, viewport: Rect) -> f64 {
    let area = bounds.area();
    if area <= 0.0 {
        return 0.0;
    }
    (bounds.intersect(viewport).area() / area).clamp(0.0, 1.0)
}

pub(crate) fn parse_index(value: Option<&str>) -> Option<usize> {
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 400.0, 800.0);

    #[test]
    fn margin_in_viewport_heights() {
        assert_eq!(root_margin(0), "0% 0px");
        assert_eq!(root_margin(3), "300% 0px");
    }

    #[test]
    fn snap_ratio_is_a_threshold() {
        assert_eq!(viewport_thresholds(0.5), THRESHOLDS);
        assert_eq!(viewport_thresholds(0.6), [0.0, 0.25, 0.5, 0.6, 0.75, 1.0]);
        assert_eq!(viewport_thresholds(1.5), THRESHOLDS);
    }

    #[test]
    fn ratio_against_physical_viewport() {
        let full = Rect::new(0.0, 0.0, 400.0, 800.0);
        assert_eq!(visible_ratio(full, VIEWPORT), 1.0);

        let half = Rect::new(0.0, 400.0, 400.0, 1200.0);
        assert_eq!(visible_ratio(half, VIEWPORT), 0.5);

        let margin_only = Rect::new(0.0, 800.0, 400.0, 1600.0);
        assert_eq!(visible_ratio(margin_only, VIEWPORT), 0.0);
        assert_eq!(visible_ratio(Rect::ZERO, VIEWPORT), 0.0);
    }

    #[test]
    fn index_attribute_parsing() {
        assert_eq!(parse_index(Some("12")), Some(12));
        assert_eq!(parse_index(Some(" 3 ")), Some(3));
        assert_eq!(parse_index(Some("x")), None);
        assert_eq!(parse_index(None), None);
    }
}
