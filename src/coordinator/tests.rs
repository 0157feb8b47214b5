use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::unbounded;

use super::*;
use crate::audio::{FocusArbiter, FocusKind, SharedFocus, next_client_id};
use crate::authority::Direction;
use crate::testing::{FakeRenderer, FixedScanner, MemoryStore, fast_audio, track, wait_for};

struct Fixture {
    coordinator: Arc<Coordinator>,
    renderer: FakeRenderer,
    focus: Arc<SharedFocus>,
    store: Arc<MemoryStore>,
    scanner: Arc<FixedScanner>,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.coordinator.release();
    }
}

fn fixture_with(store: MemoryStore, scanned: Vec<Track>) -> Fixture {
    let renderer = FakeRenderer::new();
    let focus = Arc::new(SharedFocus::new());
    let (engine, events) =
        AudioEngine::new(Box::new(renderer.clone()), focus.clone(), &fast_audio());
    let store = Arc::new(store);
    let scanner = Arc::new(FixedScanner::new(scanned));
    let coordinator = Coordinator::start(
        engine,
        events,
        Authority::new(),
        store.clone(),
        scanner.clone(),
    );
    Fixture {
        coordinator,
        renderer,
        focus,
        store,
        scanner,
    }
}

/// Banana, Apple, Cherry in scan order, loaded.
fn fruit() -> (Fixture, Track, Track, Track) {
    let a = track("a", "Banana");
    let b = track("b", "Apple");
    let c = track("c", "Cherry");
    let f = fixture_with(MemoryStore::default(), vec![a.clone(), b.clone(), c.clone()]);
    f.coordinator.load_library();
    (f, a, b, c)
}

fn block_focus(focus: &SharedFocus) {
    let (tx, _rx) = unbounded();
    assert!(focus.request(next_client_id(), FocusKind::TransientExclusive, tx));
}

#[test]
fn cold_start_scans_sorts_and_persists() {
    let (f, a, b, c) = fruit();
    let view = f.coordinator.view();

    assert_eq!(f.coordinator.tracks(), vec![b, a, c]);
    assert_eq!(view.tracks.get().len(), 3);
    assert_eq!(view.loaded.get(), 3);
    assert_eq!(view.total.get(), 3);
    assert!(!view.loading.get());
    assert_eq!(f.store.tracks.lock().unwrap().len(), 3);
    assert_eq!(f.scanner.scans.load(Ordering::SeqCst), 1);
}

#[test]
fn persisted_library_skips_the_scanner() {
    let a = track("a", "Banana");
    let b = track("b", "Apple");
    let f = fixture_with(
        MemoryStore::with_tracks(vec![a.clone(), b.clone()]),
        vec![track("x", "Unexpected")],
    );

    f.coordinator.load_library();
    f.coordinator.load_library();

    assert_eq!(f.scanner.scans.load(Ordering::SeqCst), 0);
    assert_eq!(f.coordinator.tracks(), vec![b, a]);
}

#[test]
fn empty_scan_gives_an_empty_library() {
    let f = fixture_with(MemoryStore::default(), Vec::new());
    f.coordinator.load_library();

    assert!(f.coordinator.tracks().is_empty());
    assert_eq!(f.store.inserts.load(Ordering::SeqCst), 0);
    f.coordinator.play_next();
    assert_eq!(f.coordinator.current(), None);
}

#[test]
fn load_tracks_runs_in_the_background() {
    let f = fixture_with(MemoryStore::default(), vec![track("a", "Banana")]);
    f.coordinator.load_tracks().join().unwrap();
    assert_eq!(f.coordinator.tracks().len(), 1);
}

#[test]
fn next_wraps_while_authority_advance_stops_at_the_end() {
    let (f, a, b, c) = fruit();
    let co = &f.coordinator;

    co.play(&b);
    assert_eq!(co.current(), Some(b.clone()));
    co.play_next();
    assert_eq!(co.current(), Some(a.clone()));
    co.play_next();
    assert_eq!(co.current(), Some(c.clone()));

    assert!(!co.authority().advance(Direction::Forward, &co.tracks()));
    assert_eq!(co.current(), Some(c.clone()));

    co.play_next();
    assert_eq!(co.current(), Some(b.clone()));
    assert_eq!(f.renderer.state().loaded, Some(b));
}

#[test]
fn previous_wraps_to_the_last_track() {
    let (f, _a, b, c) = fruit();
    f.coordinator.play(&b);
    f.coordinator.play_previous();
    assert_eq!(f.coordinator.current(), Some(c));
    assert!(f.coordinator.is_playing());
}

#[test]
fn play_without_current_starts_at_the_top() {
    let (f, _a, b, _c) = fruit();
    f.coordinator.play_next();
    assert_eq!(f.coordinator.current(), Some(b));
}

#[test]
fn play_rejects_tracks_outside_the_library() {
    let (f, ..) = fruit();
    f.coordinator.play(&track("z", "Zucchini"));
    assert_eq!(f.coordinator.current(), None);
    assert_eq!(f.renderer.state().loads, 0);
}

#[test]
fn focus_denial_leaves_current_and_playing_alone() {
    let (f, a, b, _c) = fruit();
    let co = &f.coordinator;
    co.play(&a);
    co.pause();

    block_focus(&f.focus);
    co.play(&b);

    assert_eq!(co.current(), Some(a.clone()));
    assert!(!co.is_playing());
    assert_eq!(co.view().current.get(), Some(a));
    assert!(!co.view().playing.get());
}

#[test]
fn shuffle_keeps_the_playing_track_first_without_restarting() {
    let (f, a, b, c) = fruit();
    let co = &f.coordinator;
    co.play(&c);
    let loads = f.renderer.state().loads;

    co.toggle_shuffle();

    let shuffled = co.tracks();
    assert_eq!(shuffled[0], c);
    assert_eq!(shuffled.len(), 3);
    assert!(shuffled.contains(&a) && shuffled.contains(&b));
    assert_eq!(co.current(), Some(c.clone()));
    assert!(co.is_playing());
    assert_eq!(f.renderer.state().loads, loads);
    assert!(co.view().shuffle.get());

    co.toggle_shuffle();
    assert_eq!(co.tracks(), vec![b, a, c]);
    assert!(!co.view().shuffle.get());
}

#[test]
fn shuffle_resumes_a_paused_track_in_place() {
    let (f, _a, _b, c) = fruit();
    let co = &f.coordinator;
    co.play(&c);
    co.pause();
    let loads = f.renderer.state().loads;

    co.toggle_shuffle();

    assert_eq!(co.tracks()[0], c);
    assert_eq!(co.current(), Some(c));
    assert!(co.is_playing());
    assert!(f.renderer.state().playing);
    assert_eq!(f.renderer.state().loads, loads);
}

#[test]
fn shuffle_with_nothing_current_starts_the_first_track() {
    let (f, ..) = fruit();
    f.coordinator.toggle_shuffle();

    let first = f.coordinator.tracks()[0].clone();
    assert_eq!(f.coordinator.current(), Some(first));
    assert!(f.coordinator.is_playing());
}

#[test]
fn set_shuffle_does_not_start_playback() {
    let (f, ..) = fruit();
    f.coordinator.set_shuffle(true);
    assert!(f.coordinator.is_shuffled());
    assert_eq!(f.coordinator.current(), None);
}

#[test]
fn last_played_is_saved_in_the_background() {
    let (f, a, ..) = fruit();
    f.coordinator.play(&a);
    f.coordinator.worker.flush();
    assert_eq!(*f.store.last_played.lock().unwrap(), Some(a));
}

#[test]
fn failing_last_played_write_is_swallowed() {
    let (f, a, ..) = fruit();
    f.store.fail_writes.store(true, Ordering::SeqCst);

    f.coordinator.play(&a);
    f.coordinator.worker.flush();

    assert!(f.coordinator.is_playing());
    assert_eq!(*f.store.last_played.lock().unwrap(), None);
}

#[test]
fn last_played_is_cued_after_load() {
    let a = track("a", "Banana");
    let b = track("b", "Apple");
    let store = MemoryStore::with_tracks(vec![a.clone(), b.clone()]);
    *store.last_played.lock().unwrap() = Some(a.clone());
    let f = fixture_with(store, Vec::new());

    f.coordinator.load_library();

    assert_eq!(f.coordinator.current(), Some(a.clone()));
    assert!(!f.coordinator.is_playing());
    assert_eq!(f.coordinator.view().scroll_to_index.get(), Some(1));
    assert_eq!(f.renderer.state().loads, 0);

    f.coordinator.toggle_play_pause();
    assert!(f.coordinator.is_playing());
    assert_eq!(f.renderer.state().loaded, Some(a));
}

#[test]
fn reload_drops_a_current_track_that_disappeared() {
    let (f, a, b, c) = fruit();
    f.coordinator.play(&a);
    f.coordinator.worker.flush();

    f.coordinator.install(vec![b, c]);

    assert_eq!(f.coordinator.current(), None);
    assert!(!f.coordinator.is_playing());
    assert!(!f.renderer.state().playing);
}

#[test]
fn toggle_play_pause_resumes_in_place() {
    let (f, a, ..) = fruit();
    let co = &f.coordinator;
    co.play(&a);

    co.toggle_play_pause();
    assert!(!co.is_playing());
    assert!(!f.renderer.state().playing);

    co.toggle_play_pause();
    assert!(co.is_playing());
    assert_eq!(f.renderer.state().loads, 1);
}

#[test]
fn stop_pauses_and_rewinds() {
    let (f, a, ..) = fruit();
    let co = &f.coordinator;
    co.play(&a);
    co.seek(Duration::from_secs(30));
    assert_eq!(f.renderer.state().position, Duration::from_secs(30));

    co.stop();

    assert!(!co.is_playing());
    assert_eq!(co.current(), Some(a));
    assert_eq!(f.renderer.state().position, Duration::ZERO);
    // Samples queued before the stop may land first; the rewind wins.
    assert!(wait_for(|| co.view().position.get() == Duration::ZERO));
}

#[test]
fn seek_to_fraction_uses_the_track_length() {
    let (f, a, ..) = fruit();
    f.coordinator.seek_to_fraction(0.5);
    assert_eq!(f.renderer.state().position, Duration::ZERO);

    f.coordinator.play(&a);
    f.coordinator.seek_to_fraction(0.5);

    assert_eq!(f.renderer.state().position, Duration::from_secs(90));
    assert!(wait_for(|| {
        (f.coordinator.view().progress.get() - 0.5).abs() < f32::EPSILON
    }));

    f.coordinator.seek_to_fraction(7.0);
    assert_eq!(f.renderer.state().position, Duration::from_secs(180));
}

#[test]
fn progress_fraction_is_bounded() {
    assert_eq!(progress_fraction(Duration::from_secs(30), UNKNOWN_DURATION), 0.0);
    assert_eq!(progress_fraction(Duration::ZERO, UNKNOWN_DURATION), 0.0);
    assert_eq!(
        progress_fraction(Duration::from_secs(90), Duration::from_secs(180)),
        0.5
    );
    assert_eq!(
        progress_fraction(Duration::from_secs(999), Duration::from_secs(180)),
        1.0
    );
}

#[test]
fn progress_is_zero_without_a_track() {
    let (f, ..) = fruit();
    let view = f.coordinator.view();
    view.position.set(Duration::from_secs(10));
    view.refresh_progress();
    assert_eq!(view.progress.get(), 0.0);
}

#[test]
fn scroll_signal_is_raised_and_cleared() {
    let (f, _a, _b, c) = fruit();
    let co = &f.coordinator;

    co.trigger_scroll_to(7);
    assert_eq!(co.view().scroll_to_index.get(), None);
    co.trigger_scroll_to(1);
    assert_eq!(co.view().scroll_to_index.get(), Some(1));
    co.clear_scroll_to_index();
    assert_eq!(co.view().scroll_to_index.get(), None);

    co.play(&c);
    co.trigger_scroll_to_current();
    assert_eq!(co.view().scroll_to_index.get(), Some(2));
}

#[test]
fn sync_current_from_player_restores_the_view() {
    let (f, a, ..) = fruit();
    let co = &f.coordinator;
    co.play(&a);
    co.view().current.set(None);

    co.sync_current_from_player();

    assert_eq!(co.view().current.get(), Some(a));
    assert_eq!(co.view().scroll_to_index.get(), Some(1));
}

#[test]
fn completed_track_advances() {
    let (f, a, b, _c) = fruit();
    f.coordinator.play(&b);

    f.renderer.finish();

    assert!(wait_for(|| f.coordinator.current() == Some(a.clone())));
    assert!(wait_for(|| f.renderer.state().loaded == Some(a.clone())));
}

#[test]
fn completion_skips_a_track_that_fails_to_load() {
    let (f, a, b, c) = fruit();
    f.coordinator.play(&b);
    f.renderer.state().unplayable.insert(a.path.clone());

    f.renderer.finish();

    assert!(wait_for(|| f.coordinator.current() == Some(c.clone())));
    assert!(wait_for(|| f.renderer.state().loaded == Some(c.clone())));
    assert!(f.coordinator.is_playing());
    assert!(f.renderer.state().playing);
}

#[test]
fn completion_with_nothing_playable_stops() {
    let (f, a, b, c) = fruit();
    f.coordinator.play(&b);
    {
        let mut s = f.renderer.state();
        for t in [&a, &b, &c] {
            s.unplayable.insert(t.path.clone());
        }
    }

    f.renderer.finish();

    assert!(wait_for(|| !f.coordinator.is_playing()));
    assert!(wait_for(|| !f.coordinator.view().playing.get()));
    assert_eq!(f.coordinator.current(), Some(b));
    assert!(!f.renderer.state().playing);
    assert_eq!(f.focus.holder(), None);
}

#[test]
fn authority_request_for_an_unknown_track_is_dropped() {
    let f = fixture_with(MemoryStore::default(), Vec::new());
    let co = &f.coordinator;
    let stray = track("stray", "Stray");

    co.authority().set_playing(Some(stray));

    assert!(wait_for(|| co.authority().current().is_none()));
    assert!(!co.authority().is_playing());
    assert!(f.renderer.state().loaded.is_none());
}

#[test]
fn authority_written_elsewhere_drives_the_engine() {
    let (f, a, b, _c) = fruit();
    let co = &f.coordinator;
    co.play(&b);

    assert!(co.authority().advance(Direction::Forward, &co.tracks()));

    assert!(wait_for(|| f.renderer.state().loaded == Some(a.clone())));
    assert!(wait_for(|| co.view().current.get() == Some(a.clone())));

    co.authority().pause();
    assert!(wait_for(|| !f.renderer.state().playing));
}

#[test]
fn denied_authority_request_republishes_the_real_state() {
    let (f, _a, b, _c) = fruit();
    let co = &f.coordinator;
    co.play(&b);
    block_focus(&f.focus);

    co.authority().advance(Direction::Forward, &co.tracks());

    assert!(wait_for(|| {
        co.authority().current() == Some(b.clone()) && !co.authority().is_playing()
    }));
    assert_eq!(f.renderer.state().loaded, Some(b));
}

#[test]
fn focus_loss_pauses_the_authority() {
    let (f, a, ..) = fruit();
    f.coordinator.play(&a);

    let (tx, _rx) = unbounded();
    f.focus.request(next_client_id(), FocusKind::Gain, tx);

    assert!(wait_for(|| !f.coordinator.is_playing()));
    assert!(wait_for(|| !f.coordinator.view().playing.get()));
    assert_eq!(f.coordinator.current(), Some(a));
}

#[test]
fn release_stops_everything() {
    let (f, a, ..) = fruit();
    f.coordinator.play(&a);

    f.coordinator.release();

    assert_eq!(f.coordinator.current(), None);
    assert!(!f.renderer.state().playing);
    assert_eq!(f.focus.holder(), None);
}
