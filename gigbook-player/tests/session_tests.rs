//! Rehearsal session lifecycle through the engine

mod helpers;

use gigbook_common::{NavigationContext, PlayerEvent};
use gigbook_player::Error;
use helpers::TestRig;
use serial_test::serial;

#[tokio::test(start_paused = true)]
#[serial]
async fn test_single_song_session_plays_standalone() {
    let rig = TestRig::new();
    let song = rig.add_song("Scales", 90.0).await;
    let session = rig.add_session(&[&song]).await;

    rig.engine.start_session(session.id).await.unwrap();

    assert_eq!(rig.scheduler.create_calls(), 0);
    let now = rig.engine.now_playing().await;
    assert_eq!(now.song_id, Some(song.id));
    assert_eq!(now.context, None);
    assert!(rig.engine.playback_state().await.is_playing);

    let record = rig.scheduler.session(session.id).await.unwrap();
    assert!(record.is_active);
    assert!(record.started_at.is_some());
    assert_eq!(record.ephemeral_list_id, None);

    assert!(rig.engine.stop_session(session.id).await.unwrap());
    assert_eq!(rig.scheduler.delete_calls(), 0);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_complete_session_marks_record() {
    let mut rig = TestRig::new();
    let a = rig.add_song("One", 60.0).await;
    let b = rig.add_song("Two", 60.0).await;
    let session = rig.add_session(&[&a, &b]).await;

    rig.engine.start_session(session.id).await.unwrap();
    assert_eq!(rig.engine.active_session().await.map(|s| s.id), Some(session.id));

    assert!(rig.engine.complete_session(session.id).await.unwrap());

    let record = rig.scheduler.session(session.id).await.unwrap();
    assert!(record.completed);
    assert!(!record.is_active);
    assert_eq!(record.current_song_index, None);
    assert_eq!(record.ephemeral_list_id, None);
    assert_eq!(rig.scheduler.live_lists().await, 0);
    assert!(rig.engine.active_session().await.is_none());
    assert_eq!(rig.backend.live_handles(), 0);

    let events = rig.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::SessionStarted { song_count: 2, list_id: Some(_), .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::SessionEnded { completed: true, session_id, .. } if *session_id == session.id
    )));
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_starting_another_session_ends_the_first() {
    let rig = TestRig::new();
    let a = rig.add_song("One", 60.0).await;
    let b = rig.add_song("Two", 60.0).await;
    let c = rig.add_song("Three", 60.0).await;
    let first = rig.add_session(&[&a, &b]).await;
    let second = rig.add_session(&[&b, &c]).await;

    rig.engine.start_session(first.id).await.unwrap();
    rig.engine.start_session(second.id).await.unwrap();

    assert_eq!(rig.scheduler.live_lists().await, 1);
    let old = rig.scheduler.session(first.id).await.unwrap();
    assert!(!old.is_active);
    assert!(!old.completed);
    assert_eq!(old.ephemeral_list_id, None);

    assert_eq!(rig.engine.active_session().await.map(|s| s.id), Some(second.id));
    assert_eq!(rig.engine.now_playing().await.song_id, Some(b.id));
    assert_eq!(rig.backend.max_live_handles(), 1);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_restarting_same_session_replaces_its_list() {
    let rig = TestRig::new();
    let a = rig.add_song("One", 60.0).await;
    let b = rig.add_song("Two", 60.0).await;
    let session = rig.add_session(&[&a, &b]).await;

    rig.engine.start_session(session.id).await.unwrap();
    rig.engine.start_session(session.id).await.unwrap();

    assert_eq!(rig.scheduler.create_calls(), 2);
    assert_eq!(rig.scheduler.delete_calls(), 1);
    assert_eq!(rig.scheduler.live_lists().await, 1);
    assert!(rig.scheduler.session(session.id).await.unwrap().is_active);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_navigation_records_session_position() {
    let rig = TestRig::new();
    let a = rig.add_song("One", 60.0).await;
    let b = rig.add_song("Two", 60.0).await;
    let c = rig.add_song("Three", 60.0).await;
    let session = rig.add_session(&[&a, &b, &c]).await;

    rig.engine.start_session(session.id).await.unwrap();
    rig.engine.next().await.unwrap();

    let record = rig.scheduler.session(session.id).await.unwrap();
    assert_eq!(record.current_song_index, Some(1));

    rig.finish_current().await;
    let record = rig.scheduler.session(session.id).await.unwrap();
    assert_eq!(record.current_song_index, Some(2));
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_end_of_session_list_reports_session_context() {
    let mut rig = TestRig::new();
    let a = rig.add_song("One", 60.0).await;
    let b = rig.add_song("Two", 60.0).await;
    let session = rig.add_session(&[&a, &b]).await;

    rig.engine.start_session(session.id).await.unwrap();
    rig.finish_current().await;
    rig.finish_current().await;

    let finished: Vec<_> = rig
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            PlayerEvent::ListFinished { context, .. } => Some(context),
            _ => None,
        })
        .collect();
    assert_eq!(
        finished,
        vec![NavigationContext::Session {
            session_id: session.id,
            index: 1
        }]
    );
    // The session itself stays open until stopped or completed
    assert!(rig.scheduler.session(session.id).await.unwrap().is_active);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_empty_or_unknown_session_is_rejected() {
    let rig = TestRig::new();
    let empty = rig.add_session(&[]).await;

    let err = rig.engine.start_session(empty.id).await.unwrap_err();
    assert!(matches!(err, Error::EmptyList(_)));
    assert_eq!(rig.scheduler.create_calls(), 0);

    let err = rig
        .engine
        .start_session(gigbook_common::SessionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionNotFound(_)));
    assert!(rig.engine.active_session().await.is_none());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn test_session_with_missing_first_song_is_ended() {
    let mut rig = TestRig::new();
    let ghost = gigbook_common::Song::new("Deleted", 60.0);
    let b = rig.add_song("Two", 60.0).await;
    let session = rig.add_session(&[&ghost, &b]).await;

    let err = rig.engine.start_session(session.id).await.unwrap_err();
    assert!(matches!(err, Error::SongNotFound(id) if id == ghost.id));

    assert!(rig.engine.active_session().await.is_none());
    let record = rig.scheduler.session(session.id).await.unwrap();
    assert!(!record.is_active);
    assert!(!record.completed);
    assert_eq!(record.ephemeral_list_id, None);
    assert_eq!(rig.scheduler.live_lists().await, 0);
    assert_eq!(rig.engine.now_playing().await.context, None);
    assert_eq!(rig.load_count(), 0);

    let events = rig.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::SessionEnded { completed: false, session_id, .. } if *session_id == session.id
    )));
}
