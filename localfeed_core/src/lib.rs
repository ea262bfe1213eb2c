// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport and media lifecycle control for a swipeable media feed.
//!
//! `localfeed_core` decides, for a vertical feed of full-screen slides, which
//! slide is active, which media elements load, play, pause or are torn down,
//! how off-screen transfers are cancelled, how a separate audio element is
//! kept in sync with the muted active video, and how neighbouring slides are
//! preloaded. It is `no_std` compatible (with `alloc`) and never touches a
//! platform API directly: elements sit behind the
//! [`MediaSurface`](surface::MediaSurface) and
//! [`AudioCarrier`](audio::AudioCarrier) traits, and timers are requested as
//! [`PendingWake`](wake::PendingWake) records.
//!
//! # Architecture
//!
//! ```text
//!   Platform (intersection batches, load/error events, timers)
//!       │
//!       ▼
//!   VisibilityTracker::observe() ──► Observation
//!                                        │
//!                 ┌──────────────────────┘
//!                 ▼
//!   FeedController ──► deactivate(previous) ──► activate(next) ──► MediaSurface
//!       │                                            │
//!       │                                            ▼
//!       │                                   AudioSync::attach() ──► AudioCarrier
//!       ▼
//!   PreloadScheduler::schedule() ──► PendingWake ──► FeedController::wake()
//! ```
//!
//! **[`media`]**: Classifies media identifiers into images, GIFs and videos
//! and normalizes their URLs.
//!
//! **[`slide`]**: The ordered slide registry and per-slide load states.
//!
//! **[`visibility`]**: Turns intersection batches into an activation
//! candidate and "needs content" signals.
//!
//! **[`controller`]**: [`FeedController`](controller::FeedController), the
//! owner of everything else and the target of every platform event.
//!
//! **[`audio`]**: Primary/standby audio carriers and drift correction.
//!
//! **[`preload`]**: Generation-stamped, self-terminating neighbour preload
//! chains.
//!
//! **[`generation`]**: The scroll generation counter.
//!
//! **[`surface`]**: The platform contract.
//!
//! **[`wake`]**: Deferred continuations handed to the platform's timer.
//!
//! **[`config`]**: Tunables with `const` presets.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! lifecycle instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod audio;
pub mod config;
pub mod controller;
pub mod generation;
pub mod media;
pub mod preload;
pub mod slide;
pub mod surface;
pub mod trace;
pub mod visibility;
pub mod wake;
