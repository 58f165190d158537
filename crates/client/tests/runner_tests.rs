//! End-to-end tests for the session runner over an in-memory transport.
//!
//! [`ChannelSource`] stands in for the WebSocket stream: closing the
//! sender is the transport closure the completion resolver has to
//! disambiguate.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use chatprint_client::events::ConvertEvent;
use chatprint_client::runner::drive_session;
use chatprint_client::stream::ProgressSource;
use chatprint_core::event::ProgressEvent;
use chatprint_core::session::{JobSession, Outcome};
use chatprint_core::steps::PAYMENT_REQUIRED;

struct ChannelSource {
    rx: mpsc::Receiver<ProgressEvent>,
}

#[async_trait]
impl ProgressSource for ChannelSource {
    async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }
}

/// Queue `events` on an in-memory channel; `close` drops the sender so
/// the source reports transport closure after the last event.
fn queued_source(events: Vec<ProgressEvent>, close: bool) -> (ChannelSource, Option<mpsc::Sender<ProgressEvent>>) {
    let (tx, rx) = mpsc::channel(32);
    for event in events {
        tx.try_send(event).expect("test channel capacity");
    }
    let tx = if close { None } else { Some(tx) };
    (ChannelSource { rx }, tx)
}

fn drain(rx: &mut broadcast::Receiver<ConvertEvent>) -> Vec<ConvertEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn success_run_completes_all_steps_and_records_artifact() {
    let (mut source, _keep) = queued_source(
        vec![
            ProgressEvent {
                progress: 20,
                step_index: Some(1),
                ..Default::default()
            },
            ProgressEvent {
                progress: 60,
                step_index: Some(3),
                ..Default::default()
            },
            ProgressEvent {
                progress: 100,
                done: Some(true),
                pdf_url: Some("out/chat.pdf".into()),
                chat_data: Some(serde_json::json!({})),
                ..Default::default()
            },
        ],
        false,
    );

    let (event_tx, mut event_rx) = broadcast::channel(64);
    let cancel = CancellationToken::new();
    let mut session = JobSession::new("client-1".into());

    let outcome = drive_session(&mut session, &mut source, &event_tx, &cancel).await;

    assert_eq!(outcome, Some(Outcome::Success));
    assert!(session.steps().all_done());
    assert!(session.is_file_processed());
    assert_eq!(session.artifact().unwrap().pdf_url, "out/chat.pdf");

    let events = drain(&mut event_rx);
    let completed_steps = events
        .iter()
        .filter(|e| matches!(e, ConvertEvent::StepCompleted { .. }))
        .count();
    assert_eq!(completed_steps, session.steps().len());
    assert!(
        matches!(events.last(), Some(ConvertEvent::Completed { pdf_url, .. }) if pdf_url == "out/chat.pdf")
    );
}

#[tokio::test]
async fn progress_events_are_broadcast_in_increasing_order() {
    let (mut source, _keep) = queued_source(
        vec![
            ProgressEvent {
                progress: 20,
                ..Default::default()
            },
            // Stale value: clamped, not re-broadcast.
            ProgressEvent {
                progress: 10,
                ..Default::default()
            },
            ProgressEvent {
                progress: 100,
                done: Some(true),
                pdf_url: Some("out/chat.pdf".into()),
                ..Default::default()
            },
        ],
        false,
    );

    let (event_tx, mut event_rx) = broadcast::channel(64);
    let mut session = JobSession::new("client-2".into());
    drive_session(&mut session, &mut source, &event_tx, &CancellationToken::new()).await;

    let percents: Vec<u8> = drain(&mut event_rx)
        .into_iter()
        .filter_map(|e| match e {
            ConvertEvent::Progress { percent, .. } => Some(percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![20, 100]);
}

#[tokio::test]
async fn paywall_then_closure_resolves_to_awaiting_payment() {
    // The backend announces the gate and then simply stops streaming.
    let (mut source, _keep) = queued_source(
        vec![ProgressEvent {
            progress: 50,
            step_index: Some(PAYMENT_REQUIRED),
            requires_payment: Some(true),
            message_count: Some(500),
            ..Default::default()
        }],
        true,
    );

    let (event_tx, mut event_rx) = broadcast::channel(64);
    let mut session = JobSession::new("client-3".into());

    let outcome =
        drive_session(&mut session, &mut source, &event_tx, &CancellationToken::new()).await;

    assert_eq!(outcome, Some(Outcome::AwaitingPayment));
    assert!(!session.is_processing());
    assert!(!session.is_file_processed());
    assert_eq!(session.payment().unwrap().message_count, Some(500));

    let events = drain(&mut event_rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, ConvertEvent::PaymentRequired { message_count: Some(500), .. })));
    assert!(matches!(
        events.last(),
        Some(ConvertEvent::AwaitingPayment { .. })
    ));
}

#[tokio::test]
async fn silent_closure_resolves_to_connection_lost() {
    // The channel drops before any notification arrives.
    let (mut source, _keep) = queued_source(vec![], true);

    let (event_tx, mut event_rx) = broadcast::channel(64);
    let mut session = JobSession::new("client-4".into());

    let outcome =
        drive_session(&mut session, &mut source, &event_tx, &CancellationToken::new()).await;

    assert_eq!(outcome, Some(Outcome::ConnectionLost));
    assert!(!session.is_processing());
    assert!(matches!(
        drain(&mut event_rx).last(),
        Some(ConvertEvent::ConnectionLost { .. })
    ));
}

#[tokio::test]
async fn cancellation_abandons_the_session_without_an_outcome() {
    // The sender stays alive, so the source pends until cancel fires.
    let (mut source, _keep) = queued_source(vec![], false);

    let (event_tx, _event_rx) = broadcast::channel(64);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut session = JobSession::new("client-5".into());
    let outcome = drive_session(&mut session, &mut source, &event_tx, &cancel).await;

    assert_eq!(outcome, None);
    assert_eq!(session.outcome(), None);
}
