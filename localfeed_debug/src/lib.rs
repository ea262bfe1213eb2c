// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for localfeed
//! diagnostics.
//!
//! This crate provides [`TraceSink`](localfeed_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::Recorder`]: timestamped in-memory recording; hand its
//!   [`sink`](recorder::Recorder::sink) to the controller and read the events
//!   back afterwards.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from a
//!   recording.

pub mod chrome;
pub mod pretty;
pub mod recorder;
