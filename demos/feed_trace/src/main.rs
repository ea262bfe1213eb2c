// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted feed session that exercises the tracing pipeline.
//!
//! Drives a simulated feed through a cold load, an audio unlock, an
//! auto-advance, a failing slide and a backward jump. Every trace event is
//! printed through a [`PrettyPrintSink`] with its virtual timestamp, and the
//! whole recording is exported as Chrome trace JSON (first argument, default
//! `feed_trace.json`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use localfeed_core::audio::CarrierId;
use localfeed_core::config::FeedConfig;
use localfeed_core::controller::FeedEvent;
use localfeed_debug::pretty::PrettyPrintSink;
use localfeed_sim::runner::Runner;

const FEED: [&str; 7] = [
    "intro.jpg",
    "clips/harbour.mp4",
    "loop.gif",
    "clips/ferry at dusk.mp4",
    "clips/gulls.mp4",
    "missing.png",
    "clips/tide.mp4",
];

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn main() -> io::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("feed_trace.json"));

    let config = FeedConfig::standard().with_auto_advance();
    let mut runner = Runner::new(config, &FEED);
    runner.set_slide_latency(3, ms(900));
    runner.fail_slide(5);

    // Cold load on the photo.
    runner.scroll_to(0);
    runner.advance(ms(600));

    // First tap unlocks audio; the carriers buffer a little later.
    runner.unlock_audio();
    runner.scroll_to(1);
    runner.advance(ms(120));
    runner.carrier_ready(CarrierId(0));
    runner.carrier_ready(CarrierId(1));
    runner.advance(ms(1500));

    // Slow video, then let it end and follow the advance request.
    runner.scroll_to(3);
    runner.advance(ms(2000));
    runner.video_ended(3);
    let follow = runner.events().iter().rev().find_map(|e| match e {
        FeedEvent::AdvanceRequested { to, .. } => Some(*to),
        FeedEvent::ActiveChanged { .. } => None,
    });
    if let Some(to) = follow {
        runner.scroll_to(to);
    }
    runner.advance(ms(800));

    // Broken slide, then a jump back up the feed.
    runner.scroll_to(5);
    runner.advance(ms(400));
    runner.scroll_to(2);
    runner.advance(ms(1000));

    // -- print ---------------------------------------------------------------
    let recorded = runner.recorded();
    let mut stdout = io::stdout().lock();
    {
        let mut pretty = PrettyPrintSink::with_writer(&mut stdout);
        for r in &recorded {
            write!(pretty.writer_mut(), "[{:>7.3}s] ", r.at.as_secs_f64())?;
            r.event.replay(&mut pretty);
        }
    }
    writeln!(stdout)?;
    for event in runner.events() {
        writeln!(stdout, "feed event: {event:?}")?;
    }

    // -- export --------------------------------------------------------------
    let mut writer = BufWriter::new(File::create(&path)?);
    localfeed_debug::chrome::export(&recorded, &mut writer)?;
    writer.flush()?;
    writeln!(stdout, "Wrote {path} ({} events)", recorded.len())?;
    Ok(())
}
