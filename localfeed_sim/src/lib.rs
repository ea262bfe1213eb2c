// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic simulation harness for `localfeed_core`.
//!
//! The crate provides the platform half of the controller contract in
//! memory, so whole feed sessions can be scripted and checked without a
//! browser:
//!
//! - [`surface::SimSurface`] records every call and keeps per-slide element
//!   state (source, transfer, playback clock, GIF animation).
//! - [`carrier::SimCarrier`] is an audio element whose clock moves with
//!   virtual time at its playback rate.
//! - [`runner::Runner`] lays slides out in a column, turns scroll offsets into
//!   intersection batches, completes transfers after a latency, fires wakes
//!   when due and records every trace event with its virtual timestamp.
//!
//! ```
//! use std::time::Duration;
//! use localfeed_core::config::FeedConfig;
//! use localfeed_sim::runner::Runner;
//!
//! let mut runner = Runner::new(FeedConfig::standard(), &["a.jpg", "b.mp4", "c.gif"]);
//! runner.scroll_to(0);
//! runner.scroll_to(1);
//! runner.advance(Duration::from_secs(1));
//! assert_eq!(runner.controller().active_index(), Some(1));
//! assert_eq!(runner.surface().playing(), [1]);
//! ```

pub mod carrier;
pub mod runner;
pub mod surface;

#[cfg(test)]
mod scenarios;
