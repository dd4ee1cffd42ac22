mod common;

use std::time::Duration;

use parley_core::models::bot::{Bot, NewBot};
use parley_core::models::message::Role;
use parley_core::wire::{HistoryEntry, HistoryRole};
use parley_session::{
    ContinuityStrategy, ConversationSession, SessionConfig, TurnOutcome, FAILURE_TEXT,
};

use common::{bot_content, config, wait_until, ScriptedTransport};

#[tokio::test]
async fn submit_appends_turn_before_any_io() {
    let transport = ScriptedTransport::new();
    let _feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hello").expect("turn should start");

    let snapshot = session.snapshot();
    assert!(snapshot.streaming);
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert_eq!(snapshot.messages[0].content, "hello");
    assert_eq!(snapshot.messages[1].role, Role::Bot);
    assert_eq!(snapshot.messages[1].content, "");
    // The spawned turn has not been polled yet on this runtime.
    assert!(transport.requests().is_empty());

    session.cancel();
    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Cancelled);
}

#[tokio::test]
async fn blank_submission_is_ignored() {
    let transport = ScriptedTransport::new();
    let session = ConversationSession::new(config(), transport.clone());

    assert!(session.submit("").is_none());
    assert!(session.submit("  \n\t").is_none());
    assert!(session.messages().is_empty());
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn submission_while_streaming_is_dropped() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("first").unwrap();
    assert!(session.submit("second").is_none());
    assert_eq!(session.messages().len(), 2);

    drop(feed);
    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Completed);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn deltas_concatenate_in_arrival_order() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    feed.raw("data: {\"message\":\"Hel\"}\n\ndata: {\"mess");
    feed.raw("age\":\"lo\"}\n");
    feed.raw("\ndata: {\"message\":\", world\"}\n\n");
    drop(feed);

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Completed);
    let snapshot = session.snapshot();
    assert_eq!(bot_content(&snapshot), "Hello, world");
    assert!(!snapshot.streaming);
}

#[tokio::test]
async fn malformed_frame_does_not_interrupt_stream() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    feed.delta("Hel");
    feed.raw("data: {not json at all\n\n");
    feed.delta("lo");
    drop(feed);

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Completed);
    assert_eq!(bot_content(&session.snapshot()), "Hello");
}

#[tokio::test]
async fn stream_end_frame_finishes_turn_while_transport_stays_open() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    feed.delta("done");
    feed.raw("data: {\"stream_end\":true}\n\n");
    feed.delta(" and more");

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Completed);
    assert_eq!(bot_content(&session.snapshot()), "done");
    assert!(!session.is_streaming());
    drop(feed);
}

#[tokio::test]
async fn empty_reply_leaves_placeholder_empty() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    drop(feed);

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Completed);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(bot_content(&snapshot), "");
}

#[tokio::test]
async fn cancel_keeps_partial_content_and_ignores_later_frames() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("count to five").unwrap();
    feed.delta("one ");
    feed.delta("two ");
    wait_until(&session, |s| bot_content(s) == "one two ").await;

    assert!(session.cancel());
    assert!(!session.is_streaming());

    feed.delta("three ");
    feed.delta("four ");
    feed.delta("five");

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Cancelled);
    let snapshot = session.snapshot();
    assert_eq!(bot_content(&snapshot), "one two ");
    assert!(!snapshot.streaming);
}

#[tokio::test]
async fn cancel_without_active_turn_is_a_no_op() {
    let transport = ScriptedTransport::new();
    let session = ConversationSession::new(config(), transport.clone());

    assert!(!session.cancel());
    assert!(!session.cancel());
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn transport_failure_replaces_partial_content() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    feed.delta("partial answ");
    wait_until(&session, |s| bot_content(s) == "partial answ").await;
    feed.fail();

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Failed);
    let snapshot = session.snapshot();
    assert_eq!(bot_content(&snapshot), FAILURE_TEXT);
    assert_eq!(snapshot.messages[0].content, "hi");
    assert!(!snapshot.streaming);
}

#[tokio::test]
async fn relay_rejection_fails_turn_and_session_stays_usable() {
    let transport = ScriptedTransport::new();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Failed);
    assert_eq!(bot_content(&session.snapshot()), FAILURE_TEXT);

    let feed = transport.expect_stream();
    let handle = session.submit("again").unwrap();
    feed.delta("ok");
    drop(feed);
    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Completed);

    let messages = session.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3].content, "ok");
}

#[tokio::test]
async fn clear_resets_everything() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    feed.raw("data: {\"conversation_id\":\"c1\",\"message\":\"yo\"}\n\n");
    drop(feed);
    handle.wait().await.unwrap();
    assert_eq!(session.conversation_id().as_deref(), Some("c1"));

    session.clear();
    let snapshot = session.snapshot();
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.conversation_id.is_none());
    assert!(snapshot.continuity_token.is_none());
    assert!(!snapshot.streaming);
}

#[tokio::test]
async fn clear_mid_stream_discards_late_frames() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());

    let handle = session.submit("hi").unwrap();
    feed.delta("early");
    wait_until(&session, |s| bot_content(s) == "early").await;

    session.clear();
    feed.raw("data: {\"conversation_id\":\"late\",\"message\":\"late\"}\n\n");

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::Cancelled);
    let snapshot = session.snapshot();
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.conversation_id.is_none());
    assert!(!snapshot.streaming);
}

#[tokio::test]
async fn history_replay_sends_prior_transcript_and_conversation_id() {
    let transport = ScriptedTransport::new();
    let session = ConversationSession::new(config(), transport.clone());

    let feed = transport.expect_stream();
    let handle = session.submit("first question").unwrap();
    feed.raw("data: {\"conversation_id\":\"conv-1\",\"message\":\"first answer\"}\n\n");
    drop(feed);
    handle.wait().await.unwrap();

    let feed = transport.expect_stream();
    let handle = session.submit("second question").unwrap();
    drop(feed);
    handle.wait().await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);

    assert_eq!(requests[0].bot_id.as_deref(), Some("ext-bot"));
    assert_eq!(requests[0].query.as_deref(), Some("first question"));
    assert_eq!(requests[0].conv_id, None);
    assert_eq!(requests[0].chat_history, Some(Vec::new()));
    assert_eq!(requests[0].token, None);

    assert_eq!(requests[1].conv_id.as_deref(), Some("conv-1"));
    assert_eq!(
        requests[1].chat_history,
        Some(vec![
            HistoryEntry {
                role: HistoryRole::User,
                content: "first question".to_string(),
            },
            HistoryEntry {
                role: HistoryRole::Assistant,
                content: "first answer".to_string(),
            },
        ])
    );
    assert_eq!(requests[1].token, None);
}

#[tokio::test]
async fn history_replay_skips_replies_that_never_arrived() {
    let transport = ScriptedTransport::new();
    let session = ConversationSession::new(config(), transport.clone());

    let cancelled = session.submit("unanswered").unwrap();
    session.cancel();
    assert_eq!(cancelled.wait().await.unwrap(), TurnOutcome::Cancelled);

    let feed = transport.expect_stream();
    let handle = session.submit("next").unwrap();
    drop(feed);
    handle.wait().await.unwrap();

    let last = transport.requests().pop().unwrap();
    assert_eq!(
        last.chat_history,
        Some(vec![HistoryEntry {
            role: HistoryRole::User,
            content: "unanswered".to_string(),
        }])
    );
}

#[tokio::test]
async fn history_replay_leaves_out_failure_notices() {
    let transport = ScriptedTransport::new();
    let session = ConversationSession::new(config(), transport.clone());

    // Nothing queued: the relay answers 503 and the turn fails.
    let failed = session.submit("q1").unwrap();
    assert_eq!(failed.wait().await.unwrap(), TurnOutcome::Failed);
    assert_eq!(bot_content(&session.snapshot()), FAILURE_TEXT);

    let feed = transport.expect_stream();
    let handle = session.submit("q2").unwrap();
    drop(feed);
    handle.wait().await.unwrap();

    let last = transport.requests().pop().unwrap();
    assert_eq!(
        last.chat_history,
        Some(vec![HistoryEntry {
            role: HistoryRole::User,
            content: "q1".to_string(),
        }])
    );
}

#[tokio::test]
async fn config_for_bot_addresses_its_external_identity() {
    let bot = Bot::create(NewBot {
        name: Some("Helper".into()),
        bot_uuid: Some("ext-helper".into()),
        ..Default::default()
    })
    .unwrap();
    let transport = ScriptedTransport::new();
    let cfg = SessionConfig::for_bot("http://relay.test/api/chat", &bot);
    assert_eq!(cfg.continuity, ContinuityStrategy::HistoryReplay);
    let session = ConversationSession::new(cfg, transport.clone());

    let feed = transport.expect_stream();
    let handle = session.submit("hi").unwrap();
    drop(feed);
    handle.wait().await.unwrap();

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.bot_id.as_deref(), Some("ext-helper"));
    assert_eq!(request.query.as_deref(), Some("hi"));
}

#[tokio::test]
async fn header_token_strategy_uses_headers_only() {
    let transport = ScriptedTransport::new();
    let cfg = config().with_continuity(ContinuityStrategy::HeaderToken);
    let session = ConversationSession::new(cfg, transport.clone());

    let feed = transport.expect_stream_with_headers(Some("conv-h"), Some("tok-1"));
    let handle = session.submit("one").unwrap();
    feed.raw("data: {\"conversation_id\":\"in-band\",\"message\":\"hey\"}\n\n");
    drop(feed);
    handle.wait().await.unwrap();

    assert_eq!(session.conversation_id().as_deref(), Some("conv-h"));
    assert_eq!(session.continuity_token().as_deref(), Some("tok-1"));

    // A later response announcing different identifiers does not replace them.
    let feed = transport.expect_stream_with_headers(Some("conv-other"), Some("tok-2"));
    let handle = session.submit("two").unwrap();
    drop(feed);
    handle.wait().await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].token, None);
    assert_eq!(requests[0].chat_history, None);
    assert_eq!(requests[1].conv_id.as_deref(), Some("conv-h"));
    assert_eq!(requests[1].token.as_deref(), Some("tok-1"));
    assert_eq!(requests[1].chat_history, None);
    assert_eq!(session.continuity_token().as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn idle_timeout_keeps_partial_content() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let cfg = config().with_idle_timeout(Duration::from_millis(50));
    let session = ConversationSession::new(cfg, transport.clone());

    let handle = session.submit("hi").unwrap();
    feed.delta("half");

    assert_eq!(handle.wait().await.unwrap(), TurnOutcome::TimedOut);
    let snapshot = session.snapshot();
    assert_eq!(bot_content(&snapshot), "half");
    assert!(!snapshot.streaming);
    drop(feed);
}

#[tokio::test]
async fn subscribers_observe_progress() {
    let transport = ScriptedTransport::new();
    let feed = transport.expect_stream();
    let session = ConversationSession::new(config(), transport.clone());
    let mut revisions = session.subscribe();

    let handle = session.submit("hi").unwrap();
    assert!(revisions.has_changed().unwrap());
    revisions.borrow_and_update();

    feed.delta("x");
    revisions.changed().await.unwrap();
    drop(feed);
    handle.wait().await.unwrap();
}
