//! End-to-end playback scenarios
//!
//! Seek clamping, end-of-list handling, auto-advance, unsupported media
//! remediation and the rehearsal session list lifecycle.

mod helpers;

use gigbook_common::events::{FailureKind, RemediationAction};
use gigbook_common::NavigationContext;
use gigbook_player::backend::{BackendFailure, BackendCall};
use gigbook_player::playback::SeekOutcome;
use gigbook_player::Error;
use helpers::{count_list_finished, TestRig};
use serial_test::serial;

#[tokio::test(start_paused = true)]
#[serial]
async fn test_seek_past_end_clamps_to_duration() {
    let rig = TestRig::new();
    let song = rig.add_song("Long Ballad", 180.0).await;
    rig.engine.play_song(song.id, false).await.unwrap();

    let outcome = rig.engine.seek(200.0).await.unwrap();

    assert_eq!(outcome, SeekOutcome::Applied { position: 180.0 });
    let state = rig.engine.playback_state().await;
    assert_eq!(state.duration_seconds, 180.0);
    assert_eq!(state.current_time_seconds, 180.0);
    assert_eq!(rig.seek_calls(), vec![180_000]);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_last_song_finishing_rewinds_and_stops() {
    let mut rig = TestRig::new();
    let a = rig.add_song("One", 60.0).await;
    let b = rig.add_song("Two", 60.0).await;
    let c = rig.add_song("Three", 60.0).await;
    let setlist = rig.add_setlist(&[&a, &b, &c]).await;

    rig.engine.play_setlist(setlist.id, 2).await.unwrap();
    assert!(rig.engine.playback_state().await.is_playing);

    rig.finish_current().await;

    let state = rig.engine.playback_state().await;
    assert!(!state.is_playing);
    assert_eq!(state.current_time_seconds, 0.0);

    assert!(!rig.engine.next().await.unwrap(), "no wraparound past the last song");
    let now = rig.engine.now_playing().await;
    assert_eq!(now.song_id, Some(c.id));
    assert_eq!(now.context.map(|ctx| ctx.index()), Some(2));
    assert_eq!(count_list_finished(&rig.take_events()), 1);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_finishing_song_auto_advances_and_keeps_playing() {
    let rig = TestRig::new();
    let a = rig.add_song("One", 60.0).await;
    let b = rig.add_song("Two", 75.0).await;
    let c = rig.add_song("Three", 60.0).await;
    let setlist = rig.add_setlist(&[&a, &b, &c]).await;

    rig.engine.play_setlist(setlist.id, 0).await.unwrap();
    rig.finish_current().await;

    let now = rig.engine.now_playing().await;
    assert_eq!(now.song_id, Some(b.id));
    assert_eq!(
        now.context,
        Some(NavigationContext::Setlist {
            setlist_id: setlist.id,
            index: 1
        })
    );

    let state = rig.engine.playback_state().await;
    assert!(state.is_playing, "play intent carries over");
    assert_eq!(state.duration_seconds, 75.0);
    assert_eq!(state.current_time_seconds, 0.0);

    let handle = rig.backend.current_handle().unwrap();
    assert!(rig.backend.is_playing(handle));
    assert_eq!(rig.backend.live_handles(), 1);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_unsupported_media_clears_reference_once() {
    let mut rig = TestRig::new();
    let song = rig
        .add_broken_song(
            "Odd Format",
            BackendFailure::Decoder {
                code: Some(-11800),
                message: "The operation could not be completed".into(),
            },
        )
        .await;

    let err = rig.engine.play_song(song.id, true).await.unwrap_err();

    assert!(matches!(err, Error::FormatUnsupported { .. }));
    assert_eq!(rig.catalog.cleared_references().await, vec![song.id]);

    let failures = rig.take_failures();
    assert_eq!(failures.len(), 1, "one message per failing operation");
    let (kind, action, message) = &failures[0];
    assert_eq!(*kind, FailureKind::UnsupportedFormat);
    assert_eq!(*action, RemediationAction::ClearReference);
    assert!(message.contains("not supported"));

    assert!(!rig.engine.playback_state().await.is_playing);
    assert_eq!(rig.backend.live_handles(), 0);

    // The song is now media-less; selecting it again must not clear again
    rig.engine.play_song(song.id, true).await.unwrap();
    assert_eq!(rig.catalog.cleared_references().await.len(), 1);
    assert_eq!(
        rig.backend.count_calls(|c| matches!(c, BackendCall::Load(_))),
        1
    );
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_session_list_created_and_deleted_once() {
    let rig = TestRig::new();
    let mut songs = Vec::new();
    for title in ["Warmup", "Groove", "Bridge", "Outro"] {
        songs.push(rig.add_song(title, 120.0).await);
    }
    let refs: Vec<&_> = songs.iter().collect();
    let session = rig.add_session(&refs).await;

    rig.engine.start_session(session.id).await.unwrap();

    assert_eq!(rig.scheduler.create_calls(), 1);
    let record = rig.scheduler.session(session.id).await.unwrap();
    let list_id = record.ephemeral_list_id.expect("list id stored on the session");
    assert_eq!(rig.scheduler.list(list_id).await.unwrap().songs.len(), 4);
    assert_eq!(
        rig.engine.now_playing().await.context,
        Some(NavigationContext::Session {
            session_id: session.id,
            index: 0
        })
    );

    assert!(rig.engine.stop_session(session.id).await.unwrap());
    assert_eq!(rig.scheduler.delete_calls(), 1);
    assert_eq!(rig.scheduler.live_lists().await, 0);
    assert_eq!(rig.backend.live_handles(), 0);

    assert!(!rig.engine.stop_session(session.id).await.unwrap());
    assert_eq!(rig.scheduler.delete_calls(), 1, "no second deletion");
}
