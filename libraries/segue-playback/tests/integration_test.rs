//! Integration tests for the batch player
//!
//! These drive the full player (cache, scheduler, notifier, session) over a
//! virtual clock and fake sources.

mod common;

use common::{approx, source_key, Harness};
use segue_playback::{
    AudioEngine, BatchPlayer, BatchSize, PlaybackError, PlaybackState, PlayerConfig, PlayerEvent,
    ScheduleOutcome,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_play_schedules_contiguous_batch() {
    let h = Harness::new(&[10.0, 8.0, 12.0], 2);
    h.player.play().await.unwrap();

    let segments = h.player.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].track_index, 0);
    assert_eq!(segments[1].track_index, 1);
    assert!(approx(segments[0].start_time, 0.18));
    assert!(approx(segments[0].end_time, 10.18));
    assert!(approx(segments[1].start_time, 10.18));
    assert!(approx(segments[1].end_time, 18.18));

    assert_eq!(h.player.state(), PlaybackState::Playing);
    assert!(h.engine.is_running());
}

#[tokio::test]
async fn test_batch_progress_across_boundary() {
    let h = Harness::new(&[10.0, 8.0, 12.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(12.0);

    let batch = h.player.batch_progress();
    assert!(approx(batch.position, 12.0));
    assert!(approx(batch.duration, 18.0));

    assert_eq!(h.player.current_index(), 1);
    let track = h.player.track_progress().unwrap();
    assert!(approx(track.position, 2.0));
    assert!(approx(track.duration, 8.0));
}

#[tokio::test]
async fn test_seek_within_current_track() {
    let h = Harness::new(&[10.0, 8.0, 12.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(3.0);

    let outcome = h.player.seek_to(7.0).await.unwrap();
    assert_eq!(outcome, ScheduleOutcome::Applied);

    let segments = h.player.segments();
    assert_eq!(segments[0].track_index, 0);
    assert!(approx(segments[0].start_offset, 7.0));
    assert!(approx(segments[0].duration, 10.0));
    assert!(approx(segments[0].start_time, h.player.now() + 0.05));
    assert!(approx(segments[0].end_time, segments[0].start_time + 3.0));
    assert_eq!(segments[1].track_index, 1);
    assert_eq!(segments[1].start_offset, 0.0);

    assert_eq!(h.player.state(), PlaybackState::Playing);
    assert!(h.engine.is_running());
}

#[tokio::test]
async fn test_seek_wraps_following_tracks() {
    let h = Harness::new(&[10.0, 8.0], 2);
    h.player.rebuild_from(1, true).await.unwrap();
    h.advance_past_lead(1.0);

    h.player.seek_to(4.0).await.unwrap();
    let indices: Vec<usize> = h.player.segments().iter().map(|s| s.track_index).collect();
    assert_eq!(indices, vec![1, 0]);
}

#[tokio::test]
async fn test_old_voices_stop_on_seek() {
    let h = Harness::new(&[10.0, 8.0, 12.0], 2);
    h.player.play().await.unwrap();
    h.player.seek_to(2.0).await.unwrap();

    assert_eq!(h.engine.voices().len(), 4);
    assert_eq!(h.engine.active_voices().len(), 2);
}

#[tokio::test]
async fn test_seek_without_batch_stays_paused() {
    let h = Harness::new(&[10.0, 8.0], 1);
    h.player.seek_relative(4.0).await.unwrap();

    let segments = h.player.segments();
    assert_eq!(segments.len(), 1);
    assert!(approx(segments[0].start_offset, 4.0));
    assert_eq!(h.player.state(), PlaybackState::Paused);
    assert!(!h.engine.is_running());
}

#[tokio::test]
async fn test_seek_relative_before_start_seeks_to_zero() {
    let h = Harness::new(&[10.0, 8.0, 12.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(3.0);

    h.player.seek_relative(-5.0).await.unwrap();
    let first = h.player.segments()[0];
    assert_eq!(first.track_index, 0);
    assert_eq!(first.start_offset, 0.0);
}

#[tokio::test]
async fn test_seek_relative_past_end_skips() {
    let h = Harness::new(&[10.0, 8.0, 12.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(3.0);

    h.player.seek_relative(20.0).await.unwrap();
    let first = h.player.segments()[0];
    assert_eq!(first.track_index, 1);
    assert_eq!(first.start_offset, 0.0);
    assert_eq!(h.player.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_next_on_single_track_playlist() {
    let h = Harness::new(&[5.0], 3);
    h.player.play().await.unwrap();
    assert_eq!(h.player.segments().len(), 1);
    h.advance_past_lead(2.0);

    h.player.next().await.unwrap();
    let segments = h.player.segments();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].track_index, 0);
    assert_eq!(segments[0].start_offset, 0.0);
    assert!(approx(segments[0].start_time, h.player.now() + 0.18));
    assert_eq!(h.fetcher.fetch_count(0), 1);
}

#[tokio::test]
async fn test_next_preserves_pause() {
    let h = Harness::new(&[5.0, 5.0, 5.0], 1);
    h.player.rebuild_from(0, false).await.unwrap();
    assert_eq!(h.player.state(), PlaybackState::Paused);

    h.player.next().await.unwrap();
    assert_eq!(h.player.segments()[0].track_index, 1);
    assert_eq!(h.player.state(), PlaybackState::Paused);
    assert!(!h.engine.is_running());
}

#[tokio::test]
async fn test_prev_goes_back_early_in_track() {
    let h = Harness::new(&[10.0, 10.0, 10.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(2.0);

    h.player.prev().await.unwrap();
    assert_eq!(h.player.segments()[0].track_index, 2);
    assert_eq!(h.player.cursor(), 2);
}

#[tokio::test]
async fn test_prev_restarts_late_in_track() {
    let h = Harness::new(&[10.0, 10.0, 10.0], 2);
    h.player.rebuild_from(1, true).await.unwrap();
    h.advance_past_lead(4.0);

    h.player.prev().await.unwrap();
    let first = h.player.segments()[0];
    assert_eq!(first.track_index, 1);
    assert_eq!(first.start_offset, 0.0);
}

#[tokio::test]
async fn test_prev_after_seek_restarts_track() {
    let h = Harness::new(&[60.0, 60.0, 60.0], 2);
    h.player.rebuild_from(1, true).await.unwrap();
    h.advance_past_lead(0.5);

    h.player.seek_to(40.0).await.unwrap();
    h.advance_past_lead(1.0);
    assert!(approx(h.player.track_progress().unwrap().position, 41.0));

    h.player.prev().await.unwrap();
    let first = h.player.segments()[0];
    assert_eq!(first.track_index, 1);
    assert_eq!(first.start_offset, 0.0);
}

#[tokio::test]
async fn test_batch_progress_continuous_after_seek() {
    let h = Harness::new(&[10.0, 8.0, 12.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(3.0);
    h.player.seek_to(7.0).await.unwrap();

    h.advance_past_lead(2.99);
    assert!(approx(h.player.batch_progress().position, 9.99));
    h.engine.advance(0.02);
    assert!(approx(h.player.batch_progress().position, 10.01));
    assert!(approx(h.player.batch_progress().duration, 18.0));
}

#[tokio::test]
async fn test_play_after_batch_exhausted_continues() {
    let h = Harness::new(&[2.0, 3.0, 4.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(10.0);

    h.player.play().await.unwrap();
    let segments = h.player.segments();
    assert_eq!(segments[0].track_index, 2);
    assert_eq!(segments[1].track_index, 0);
    assert!(segments[0].start_time > h.player.now());
}

#[tokio::test]
async fn test_pause_freezes_position() {
    let h = Harness::new(&[10.0, 8.0], 2);
    h.player.play().await.unwrap();
    h.advance_past_lead(3.0);

    h.player.pause();
    assert_eq!(h.player.state(), PlaybackState::Paused);
    h.engine.advance(5.0);
    assert!(approx(h.player.track_progress().unwrap().position, 3.0));

    h.player.play().await.unwrap();
    h.engine.advance(1.0);
    assert!(approx(h.player.track_progress().unwrap().position, 4.0));
}

#[tokio::test]
async fn test_toggle() {
    let h = Harness::new(&[10.0, 8.0], 2);
    h.player.toggle().await.unwrap();
    assert!(h.player.is_playing());

    h.player.toggle().await.unwrap();
    assert_eq!(h.player.state(), PlaybackState::Paused);
    assert!(!h.engine.is_running());

    h.player.toggle().await.unwrap();
    assert!(h.player.is_playing());
    assert_eq!(h.engine.voices().len(), 2);
}

#[tokio::test]
async fn test_cache_evicts_oldest_first() {
    let config = PlayerConfig {
        batch_size: BatchSize::Limited(1),
        max_cached: 2,
        ..PlayerConfig::default()
    };
    let h = Harness::with_config(&[1.0, 1.0, 1.0, 1.0], config);

    h.player.play().await.unwrap();
    h.player.next().await.unwrap();
    h.player.next().await.unwrap();

    let cache = h.player.cache();
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.keys(), vec![source_key(1), source_key(2)]);
    assert!(!cache.contains(&source_key(0)));

    h.player.rebuild_from(0, true).await.unwrap();
    assert_eq!(h.fetcher.fetch_count(0), 2);
    assert_eq!(cache.keys(), vec![source_key(2), source_key(0)]);
}

#[tokio::test]
async fn test_cache_reads_do_not_refresh_order() {
    let config = PlayerConfig {
        batch_size: BatchSize::Limited(1),
        max_cached: 2,
        ..PlayerConfig::default()
    };
    let h = Harness::with_config(&[1.0, 1.0, 1.0], config);
    let cache = h.player.cache();

    cache.get(&source_key(0)).await.unwrap();
    cache.get(&source_key(1)).await.unwrap();
    cache.get(&source_key(0)).await.unwrap();
    cache.get(&source_key(2)).await.unwrap();

    assert_eq!(cache.keys(), vec![source_key(1), source_key(2)]);
    assert_eq!(h.fetcher.fetch_count(0), 1);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let h = Harness::new(&[3.0], 1);
    let gate = h.fetcher.gate(0);
    let key = source_key(0);
    let cache = h.player.cache();

    let (a, b, ()) = tokio::join!(cache.get(&key), cache.get(&key), async {
        tokio::task::yield_now().await;
        gate.notify_one();
    });

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a.same_audio(&b));
    assert_eq!(h.fetcher.fetch_count(0), 1);
}

#[tokio::test]
async fn test_failed_load_is_retried() {
    let h = Harness::new(&[3.0], 1);
    h.fetcher.fail(0);
    assert!(h.player.cache().get(&source_key(0)).await.is_err());
    assert!(h.player.cache().get(&source_key(0)).await.is_err());
    assert_eq!(h.fetcher.fetch_count(0), 2);
    assert!(h.player.cache().is_empty());
}

#[tokio::test]
async fn test_stale_rebuild_is_discarded() {
    let h = Harness::new(&[5.0, 5.0, 5.0], 1);
    let gate = h.fetcher.gate(0);

    let slow = {
        let player = h.player.clone();
        tokio::spawn(async move { player.rebuild_from(0, true).await })
    };
    while h.fetcher.fetch_count(0) == 0 {
        tokio::task::yield_now().await;
    }

    let outcome = h.player.rebuild_from(2, true).await.unwrap();
    assert_eq!(outcome, ScheduleOutcome::Applied);

    gate.notify_one();
    let outcome = slow.await.unwrap().unwrap();
    assert_eq!(outcome, ScheduleOutcome::Superseded);

    assert_eq!(h.player.segments()[0].track_index, 2);
    assert_eq!(h.player.cursor(), 2);
    assert_eq!(h.engine.active_voices().len(), 1);
    assert!(h
        .player
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::RebuildSuperseded { .. })));
}

#[tokio::test]
async fn test_failed_rebuild_goes_idle() {
    let h = Harness::new(&[5.0, 5.0, 5.0], 2);
    h.player.play().await.unwrap();
    h.fetcher.fail(2);

    let result = h.player.next().await;
    assert!(matches!(result, Err(PlaybackError::Fetch(_))));
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert!(h.player.segments().is_empty());
    assert!(h.engine.active_voices().is_empty());
    assert!(!h.engine.is_running());

    let events = h.player.drain_events();
    assert!(events.iter().any(|e| matches!(e, PlayerEvent::Error { .. })));
    assert!(events.contains(&PlayerEvent::StateChanged {
        state: PlaybackState::Idle
    }));
}

#[tokio::test]
async fn test_failed_seek_keeps_old_batch() {
    let config = PlayerConfig {
        batch_size: BatchSize::Limited(2),
        max_cached: 1,
        ..PlayerConfig::default()
    };
    let h = Harness::with_config(&[5.0, 5.0], config);
    h.player.play().await.unwrap();
    h.fetcher.fail(0);

    assert!(h.player.seek_to(1.0).await.is_err());
    assert_eq!(h.player.segments().len(), 2);
    assert_eq!(h.player.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_engine_unavailable() {
    let fetcher = Arc::new(common::FakeFetcher::new(&[5.0]));
    let provider = || -> segue_playback::Result<Box<dyn AudioEngine>> {
        Err(PlaybackError::EngineUnavailable("no output device".to_string()))
    };
    let player = BatchPlayer::builder(
        common::playlist(1),
        fetcher.clone(),
        Arc::new(common::SilenceDecoder),
        provider,
    )
    .build()
    .unwrap();

    let result = player.play().await;
    assert!(matches!(result, Err(PlaybackError::EngineUnavailable(_))));
    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(fetcher.fetches().is_empty());
    assert!(matches!(
        player.drain_events().as_slice(),
        [PlayerEvent::Error { .. }]
    ));
}

#[tokio::test]
async fn test_set_batch_size_rebuilds_live_batch() {
    let h = Harness::new(&[5.0, 5.0, 5.0, 5.0], 1);
    h.player.play().await.unwrap();
    h.advance_past_lead(1.0);

    h.player.set_batch_size(BatchSize::Unbounded).await.unwrap();
    let indices: Vec<usize> = h.player.segments().iter().map(|s| s.track_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(h.player.is_playing());

    assert!(matches!(
        h.player.set_batch_size(BatchSize::Limited(0)).await,
        Err(PlaybackError::InvalidBatchSize(_))
    ));
    assert_eq!(h.player.batch_size(), BatchSize::Unbounded);
}

#[tokio::test]
async fn test_set_batch_size_while_idle_only_stores() {
    let h = Harness::new(&[5.0, 5.0, 5.0], 1);
    h.player.set_batch_size(BatchSize::Limited(2)).await.unwrap();
    assert!(h.player.segments().is_empty());

    h.player.play().await.unwrap();
    assert_eq!(h.player.segments().len(), 2);
}

#[tokio::test]
async fn test_set_playlist_stops_and_clamps_cursor() {
    let h = Harness::new(&[5.0, 5.0, 5.0, 5.0], 1);
    h.player.rebuild_from(3, true).await.unwrap();

    h.player.set_playlist(common::playlist(2));
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert!(h.player.segments().is_empty());
    assert_eq!(h.player.cursor(), 1);
    assert!(h.engine.active_voices().is_empty());
}

#[tokio::test]
async fn test_volume() {
    let h = Harness::new(&[5.0], 1);
    h.player.set_volume(0.5).unwrap();
    h.player.play().await.unwrap();
    assert_eq!(h.engine.gain(), 0.5);

    h.player.set_volume(0.2).unwrap();
    assert_eq!(h.engine.gain(), 0.2);

    assert!(matches!(
        h.player.set_volume(1.5),
        Err(PlaybackError::InvalidVolume(_))
    ));
    assert_eq!(h.player.volume(), 0.2);
}

#[tokio::test]
async fn test_play_publishes_metadata() {
    let h = Harness::new(&[5.0, 5.0], 2);
    h.player.play().await.unwrap();

    assert_eq!(*h.sink.titles.lock().unwrap(), vec!["Track 0".to_string()]);
    assert_eq!(
        h.sink.states.lock().unwrap().last(),
        Some(&PlaybackState::Playing)
    );

    let events = h.player.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::BatchScheduled {
            start_index: 0,
            segments: 2,
            ..
        }
    )));
    assert!(events.contains(&PlayerEvent::TrackChanged {
        index: 0,
        title: "Track 0".to_string()
    }));
}

#[tokio::test]
async fn test_resync_republishes_changed_track() {
    let h = Harness::new(&[10.0, 8.0], 2);
    h.player.play().await.unwrap();
    h.player.drain_events();

    h.advance_past_lead(12.0);
    h.player.resync();
    let events = h.player.drain_events();
    assert!(events.contains(&PlayerEvent::TrackChanged {
        index: 1,
        title: "Track 1".to_string()
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, PlayerEvent::PositionUpdate { .. })));

    h.player.resync();
    assert!(!h
        .player
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::TrackChanged { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_notifier_announces_next_track() {
    let h = Harness::new(&[10.0, 8.0], 2);
    h.player.play().await.unwrap();
    h.player.drain_events();
    assert_eq!(h.player.pending_notifications(), 1);

    tokio::time::sleep(Duration::from_secs_f64(10.2)).await;

    let events = h.player.drain_events();
    assert!(events.contains(&PlayerEvent::TrackChanged {
        index: 1,
        title: "Track 1".to_string()
    }));
    assert_eq!(h.sink.titles.lock().unwrap().last().unwrap(), "Track 1");
}

#[tokio::test(start_paused = true)]
async fn test_first_track_announced_once() {
    let h = Harness::new(&[10.0, 8.0], 2);
    h.player.play().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let announcements = h
        .player
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, PlayerEvent::TrackChanged { index: 0, .. }))
        .count();
    assert_eq!(announcements, 1);
    assert_eq!(*h.sink.titles.lock().unwrap(), vec!["Track 0".to_string()]);

    h.player.pause();
    h.player.play().await.unwrap();
    assert_eq!(h.player.pending_notifications(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_cancels_notifications() {
    let h = Harness::new(&[10.0, 8.0], 2);
    h.player.play().await.unwrap();
    h.player.pause();
    assert_eq!(h.player.pending_notifications(), 0);
    h.player.drain_events();

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!h
        .player
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::TrackChanged { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_position_updates_while_playing() {
    let h = Harness::new(&[10.0], 1);
    h.player.play().await.unwrap();
    let before = h.sink.positions.lock().unwrap().len();

    let task = h.player.spawn_position_updates(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(3500)).await;
    let after = h.sink.positions.lock().unwrap().len();
    assert!(after - before >= 3, "only {} updates", after - before);

    h.player.pause();
    let paused = h.sink.positions.lock().unwrap().len();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.sink.positions.lock().unwrap().len(), paused);

    task.abort();
}
