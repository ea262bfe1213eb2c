// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end feed sessions on the virtual clock.

use std::time::Duration;

use localfeed_core::audio::{AttachPath, CarrierRole, Correction, StartState};
use localfeed_core::config::FeedConfig;
use localfeed_core::controller::FeedEvent;
use localfeed_core::generation::Generation;
use localfeed_core::preload::StepOutcome;
use localfeed_core::slide::LoadState;
use localfeed_core::surface::{Buffering, LoadPriority, PlaybackError};
use localfeed_core::trace::Teardown;
use localfeed_debug::recorder::TraceEvent;

use crate::runner::{Runner, VIEWPORT_HEIGHT};
use crate::surface::Call;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Observer lookahead off, so only activation and chains load content.
fn lookahead_off() -> FeedConfig {
    FeedConfig::standard().with_preload_distance(0)
}

fn videos(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("clip{i}.mp4")).collect()
}

fn images(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("photo{i}.jpg")).collect()
}

#[test]
fn cold_load_notifies_once() {
    let mut r = Runner::new(FeedConfig::standard(), &["a.mp4", "b.jpg", "c.gif"]);
    r.scroll_to(0);
    r.scroll_to(0);
    r.scroll_to_offset(40.0);
    r.advance(ms(500));
    assert_eq!(r.events(), [FeedEvent::ActiveChanged { index: 0 }]);
}

#[test]
fn scrolling_past_snap_moves_active_with_lookahead() {
    let mut r = Runner::new(FeedConfig::standard(), &videos(6));
    r.scroll_to(0);
    r.advance(ms(500));

    // Slides 0 to 3 sit inside the lookahead band throughout, so only the
    // viewport observer sees slide 1 cross the snap ratio.
    r.scroll_to_offset(0.6 * VIEWPORT_HEIGHT);
    assert_eq!(r.controller().active_index(), Some(1));
    r.scroll_to(1);
    r.advance(ms(500));

    assert_eq!(
        r.events(),
        [
            FeedEvent::ActiveChanged { index: 0 },
            FeedEvent::ActiveChanged { index: 1 },
        ]
    );
    assert_eq!(r.surface().playing(), [1]);
}

#[test]
fn exactly_one_video_plays_at_a_time() {
    let mut r = Runner::new(FeedConfig::standard(), &videos(4));
    for index in 0..4 {
        r.surface_mut().clear_calls();
        r.scroll_to(index);

        if index > 0 {
            let calls = r.surface().calls();
            let paused = calls
                .iter()
                .position(|c| *c == Call::Pause(index - 1))
                .expect("previous video paused");
            let played = calls
                .iter()
                .position(|c| *c == Call::Play(index))
                .expect("new video played");
            assert!(paused < played, "deactivation precedes activation");
        }

        r.advance(Duration::from_secs(1));
        assert_eq!(r.controller().active_index(), Some(index));
        assert_eq!(r.surface().playing(), [index], "only the active video plays");
    }
}

#[test]
fn generation_moves_once_per_real_change() {
    let mut r = Runner::new(lookahead_off(), &images(5));
    let start = r.controller().generation();
    for index in [0, 1, 1, 2, 0, 0, 3] {
        r.scroll_to(index);
        r.advance(ms(20));
    }
    assert_eq!(r.controller().generation(), Generation(start.0 + 5));

    let generations: Vec<_> = r
        .trace_where(|e| matches!(e, TraceEvent::Generation(_)))
        .into_iter()
        .filter_map(|e| match e {
            TraceEvent::Generation(g) => Some(g.generation),
            _ => None,
        })
        .collect();
    assert!(
        generations.windows(2).all(|w| w[0] < w[1]),
        "generations strictly increase: {generations:?}"
    );
}

#[test]
fn jump_abandons_old_chain() {
    let mut r = Runner::new(lookahead_off(), &images(10));
    r.scroll_to(2);
    let old = r.controller().generation();

    // The first step of the forward chain has run.
    r.advance(ms(160));
    assert_eq!(r.surface().load_count(3), 1, "first step loaded slide 3");

    let jumped_at = r.now();
    r.scroll_to(7);
    r.advance(Duration::from_secs(2));

    for index in [4, 5] {
        assert_eq!(
            r.surface().load_count(index),
            0,
            "slide {index} belongs to the abandoned chain"
        );
    }
    for index in [3, 6, 8, 9] {
        assert_eq!(r.surface().load_count(index), 1, "slide {index} preloaded");
    }
    assert_eq!(r.controller().live_preload_chains(), 0);

    let steps_after_jump: Vec<_> = r
        .recorded()
        .into_iter()
        .filter(|rec| rec.at >= jumped_at)
        .filter_map(|rec| match rec.event {
            TraceEvent::PreloadStep(s) => Some(s),
            _ => None,
        })
        .collect();
    let old_steps: Vec<_> = steps_after_jump
        .iter()
        .filter(|s| s.generation == old)
        .collect();
    assert!(!old_steps.is_empty(), "the old chain woke after the jump");
    assert!(
        old_steps.iter().all(|s| s.outcome == StepOutcome::Stale),
        "old chains only report staleness: {old_steps:?}"
    );
    assert!(
        steps_after_jump
            .iter()
            .any(|s| s.target == Some(10) && s.outcome == StepOutcome::OutOfRange),
        "the third step past 7 runs off the end"
    );
}

#[test]
fn backward_scroll_leads_behind() {
    let mut r = Runner::new(lookahead_off(), &images(8));
    r.scroll_to(5);
    r.advance(Duration::from_secs(1));
    r.surface_mut().clear_calls();
    r.scroll_to(4);
    r.advance(Duration::from_secs(1));

    assert!(r.surface().calls().contains(&Call::Load {
        index: 3,
        priority: LoadPriority::Next,
    }));
    for index in [2, 1] {
        assert!(r.surface().calls().contains(&Call::Load {
            index,
            priority: LoadPriority::Background,
        }));
    }
    assert_eq!(r.surface().load_count(5), 0, "slide 5 is still resident");
}

#[test]
fn in_flight_slide_is_torn_down() {
    let mut r = Runner::new(lookahead_off(), &videos(2));
    r.set_slide_latency(0, Duration::from_secs(5));
    r.scroll_to(0);
    r.advance(ms(100));
    r.scroll_to(1);

    assert!(r.surface().calls().contains(&Call::Abort(0)));
    assert_eq!(r.controller().registry().state(0), Some(LoadState::Empty));
    assert_eq!(r.surface().element(0).and_then(|e| e.src.clone()), None);
    assert!(
        r.trace_where(|e| matches!(
            e,
            TraceEvent::Deactivate(d) if d.index == 0 && d.teardown == Teardown::Aborted
        ))
        .len()
            == 1,
        "one aborting deactivation"
    );
}

#[test]
fn loaded_slide_is_preserved() {
    let mut r = Runner::new(lookahead_off(), &videos(2));
    r.set_slide_latency(0, ms(20));
    r.scroll_to(0);
    r.advance(ms(100));
    r.scroll_to(1);

    assert!(!r.surface().calls().contains(&Call::Abort(0)));
    assert_eq!(r.controller().registry().state(0), Some(LoadState::Loaded));
    let element = r.surface().element(0).expect("slide 0 element");
    assert_eq!(element.buffering, Some(Buffering::None));
    assert!(!element.playing);
}

#[test]
fn stalled_video_stops_buffering_when_left() {
    let mut r = Runner::new(lookahead_off(), &videos(2));
    r.set_slide_latency(0, Duration::from_secs(5));
    r.scroll_to(0);
    r.advance(ms(100));
    // The transfer goes idle before any data event arrives.
    assert!(r.surface_mut().fail(0));
    r.scroll_to(1);

    assert!(!r.surface().calls().contains(&Call::Abort(0)));
    assert_eq!(r.controller().registry().state(0), Some(LoadState::Loading));
    let element = r.surface().element(0).expect("slide 0 element");
    assert_eq!(element.buffering, Some(Buffering::None));
    assert_eq!(element.src.as_deref(), Some("clip0.mp4"));
}

#[test]
fn late_completion_does_not_resurrect() {
    let mut r = Runner::new(lookahead_off(), &videos(3));
    r.set_slide_latency(1, ms(500));
    r.scroll_to(0);
    r.advance(ms(200));
    assert_eq!(r.controller().registry().state(1), Some(LoadState::Loading));

    // The user passes slide 1 before its bytes arrive.
    r.scroll_to(1);
    r.scroll_to(2);
    assert_eq!(r.controller().registry().state(1), Some(LoadState::Empty));

    // A completion that raced the abort is ignored.
    r.with_controller(|c| c.content_loaded(1));
    assert_eq!(r.controller().registry().state(1), Some(LoadState::Empty));
    assert!(!r.surface().playing().contains(&1));
}

#[test]
fn background_gif_is_frozen() {
    let mut r = Runner::new(FeedConfig::standard(), &["a.jpg", "b.gif"]);
    r.scroll_to(0);
    r.advance(ms(100));
    let gif = r.surface().element(1).expect("gif loaded by lookahead");
    assert!(!gif.animating, "inactive gif is frozen once loaded");

    r.scroll_to(1);
    assert!(r.surface().element(1).is_some_and(|e| e.animating));
    r.scroll_to(0);
    assert!(r.surface().element(1).is_some_and(|e| !e.animating));
}

#[test]
fn failed_slide_shows_error() {
    let mut r = Runner::new(lookahead_off(), &videos(2));
    r.fail_slide(0);
    r.scroll_to(0);
    r.advance(ms(100));
    assert_eq!(r.controller().registry().state(0), Some(LoadState::Errored));
    assert!(r.surface().element(0).is_some_and(|e| e.error_shown));

    r.scroll_to(1);
    assert!(!r.surface().calls().contains(&Call::Abort(0)));
    assert_eq!(r.surface().load_count(0), 1, "errored slides are not retried");
}

#[test]
fn refused_autoplay_is_traced() {
    let mut r = Runner::new(lookahead_off(), &videos(1));
    r.surface_mut().refuse_play(0);
    r.scroll_to(0);
    let rejected = r.trace_where(|e| matches!(e, TraceEvent::PlaybackRejected(_)));
    assert!(
        matches!(
            rejected.first(),
            Some(TraceEvent::PlaybackRejected(p)) if p.index == 0 && p.error == PlaybackError::Blocked
        ),
        "rejection recorded: {rejected:?}"
    );
}

#[test]
fn slow_video_is_reported() {
    let mut r = Runner::new(lookahead_off(), &videos(1));
    r.set_slide_latency(0, Duration::from_secs(10));
    r.scroll_to(0);
    r.advance(Duration::from_secs(12));

    let slow: Vec<_> = r
        .recorded()
        .into_iter()
        .filter(|rec| matches!(rec.event, TraceEvent::SlowLoad(_)))
        .collect();
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].at, Duration::from_secs(8));
    assert_eq!(r.controller().registry().state(0), Some(LoadState::Loaded));
}

#[test]
fn rebuild_stops_pending_chains() {
    let mut r = Runner::new(lookahead_off(), &images(5));
    r.scroll_to(0);
    r.rebuild(&images(3));
    r.advance(Duration::from_secs(1));

    assert_eq!(r.surface().load_count(1), 0);
    assert_eq!(r.controller().active_index(), None);
    assert!(
        !r.trace_where(|e| matches!(
            e,
            TraceEvent::PreloadStep(s) if s.outcome == StepOutcome::Stale
        ))
        .is_empty(),
        "the pre-rebuild chain ends stale"
    );
}

#[test]
fn auto_advance_follows_the_user() {
    let config = lookahead_off().with_auto_advance();
    let mut r = Runner::new(config, &images(3));
    r.scroll_to(0);
    r.advance(Duration::from_secs(2));
    r.scroll_to(1);
    r.advance(ms(1500));
    assert!(
        !r.events()
            .iter()
            .any(|e| matches!(e, FeedEvent::AdvanceRequested { .. })),
        "the timer of slide 0 went stale"
    );

    r.advance(Duration::from_secs(2));
    assert_eq!(
        r.events().last(),
        Some(&FeedEvent::AdvanceRequested { from: 1, to: 2 })
    );
}

// -- audio ------------------------------------------------------------------

/// Unlocks audio and settles on slide 0 with its video playing.
fn audible(ids: &[String]) -> Runner {
    let mut r = Runner::new(lookahead_off(), ids);
    r.unlock_audio();
    r.scroll_to(0);
    r.advance(Duration::from_secs(1));
    r
}

#[test]
fn next_video_audio_is_swapped_in() {
    let mut r = audible(&videos(3));
    let first_primary = r.primary().expect("unlocked").clone();
    assert_eq!(first_primary.state().loads, 1);

    let standby = r.standby().expect("unlocked").clone();
    assert_eq!(
        standby.state().src.as_deref(),
        Some("http://feed.local/clip1.mp4"),
        "the lead chain preloaded the next clip"
    );
    assert_eq!(standby.state().loads, 1);

    r.scroll_to(1);
    let primary = r.primary().expect("unlocked");
    assert_eq!(primary.state().loads, 1, "swap, not a fresh load");
    assert!(!primary.state().muted);
    assert!(!primary.state().paused);
    assert!(first_primary.state().muted, "old primary is the new standby");
    assert!(first_primary.state().paused);

    let attaches = r.trace_where(|e| matches!(e, TraceEvent::AudioAttach(_)));
    assert!(
        matches!(
            attaches.last(),
            Some(TraceEvent::AudioAttach(a)) if a.index == 1 && a.path == AttachPath::Swapped
        ),
        "second attach swapped: {attaches:?}"
    );
}

fn next_correction(r: &mut Runner) -> Option<Correction> {
    let seen = r.recorder().len();
    r.advance(ms(100));
    r.recorded()[seen..].iter().find_map(|rec| match rec.event {
        TraceEvent::Drift(d) => Some(d.correction),
        _ => None,
    })
}

fn set_drift(r: &Runner, drift: f64) {
    let video = r.surface().element(0).map_or(0.0, |e| e.position);
    r.primary().expect("unlocked").state_mut().position = video + drift;
}

#[test]
fn drift_is_corrected_by_band() {
    let mut r = audible(&videos(2));

    set_drift(&r, 0.02);
    assert_eq!(next_correction(&mut r), Some(Correction::InSync));

    set_drift(&r, 0.3);
    assert_eq!(
        next_correction(&mut r),
        Some(Correction::Nudge { rate: 0.95 })
    );

    set_drift(&r, 1.5);
    assert_eq!(next_correction(&mut r), Some(Correction::HardSeek));
    assert_eq!(next_correction(&mut r), Some(Correction::InSync));
    assert_eq!(r.primary().expect("unlocked").state().rate, 1.0);
}

#[test]
fn nudge_converges() {
    let mut r = audible(&videos(2));
    set_drift(&r, 0.3);
    r.advance(Duration::from_secs(8));

    let primary = r.primary().expect("unlocked");
    assert_eq!(primary.state().rate, 1.0, "back to normal speed");
    let video = r.surface().element(0).map_or(0.0, |e| e.position);
    assert!((primary.state().position - video).abs() <= 0.05);
}

#[test]
fn deferred_start_waits_for_carrier() {
    let mut r = Runner::new(lookahead_off(), &videos(2));
    r.unlock_audio();
    for id in [0, 1] {
        let carrier = r
            .carrier(localfeed_core::audio::CarrierId(id))
            .expect("unlocked");
        carrier.state_mut().instant_ready = false;
    }
    r.scroll_to(0);
    let primary = r.primary().expect("unlocked").clone();
    assert!(primary.state().paused, "nothing buffered yet");

    let id = r
        .controller()
        .audio()
        .carriers()
        .expect("unlocked")
        .primary()
        .id();
    r.carrier_ready(id);
    assert!(!primary.state().paused);

    let starts: Vec<_> = r
        .trace_where(|e| matches!(e, TraceEvent::AudioAttach(_)))
        .into_iter()
        .filter_map(|e| match e {
            TraceEvent::AudioAttach(a) => Some(a.start),
            _ => None,
        })
        .collect();
    assert_eq!(starts, [StartState::Deferred, StartState::Playing]);
}

#[test]
fn primary_failure_keeps_video_playing() {
    let mut r = audible(&videos(2));
    let id = r
        .controller()
        .audio()
        .carriers()
        .expect("unlocked")
        .primary()
        .id();
    r.carrier_failed(id);

    assert!(!r.controller().audio().is_running());
    assert_eq!(r.surface().playing(), [0]);
    assert!(
        matches!(
            r.trace_where(|e| matches!(e, TraceEvent::AudioFailure(_))).first(),
            Some(TraceEvent::AudioFailure(f)) if f.role == CarrierRole::Primary
        ),
        "failure traced"
    );

    // The next activation attaches afresh.
    r.scroll_to(1);
    assert!(r.controller().audio().is_running());
}

#[test]
fn disabling_audio_pauses_primary() {
    let mut r = audible(&videos(2));
    r.with_controller(|c| assert!(!c.toggle_audio(), "toggled off"));
    assert!(r.primary().expect("unlocked").state().paused);
    assert_eq!(r.surface().playing(), [0], "video keeps playing muted");

    r.with_controller(|c| assert!(c.toggle_audio(), "toggled on"));
    assert!(!r.primary().expect("unlocked").state().paused);
}
