//! Drives one conversion session end to end.
//!
//! [`SessionRunner`] owns the [`JobSession`] aggregate: it submits the
//! upload, opens the progress stream, feeds every notification through
//! the core reducer, and resolves the terminal outcome. State
//! transitions are re-broadcast as [`ConvertEvent`]s for live display.
//!
//! All session mutation happens inside [`drive_session`]'s event loop,
//! so one session never needs locking; independent sessions run on
//! independent runners.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use chatprint_core::options::{validate_options, ExportOptions};
use chatprint_core::session::{Applied, JobSession, Outcome};

use crate::api::{ApiError, ConvertApi};
use crate::events::ConvertEvent;
use crate::stream::{ProgressSource, StreamError, WsProgressSource};

/// Broadcast channel capacity for progress events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors that can occur while starting or running a session.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A session is still processing; finish or reset it first.
    #[error("A conversion is already in progress")]
    AlreadyProcessing,

    /// The submitted options are incoherent.
    #[error(transparent)]
    InvalidOptions(#[from] chatprint_core::error::CoreError),

    /// The upload was rejected or failed.
    #[error(transparent)]
    Submit(#[from] ApiError),

    /// The progress stream could not be opened.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Runs conversion sessions against one backend.
pub struct SessionRunner {
    api: ConvertApi,
    ws_url: String,
    session: Option<JobSession>,
    event_tx: broadcast::Sender<ConvertEvent>,
}

impl SessionRunner {
    /// Create a runner targeting a backend.
    ///
    /// * `ws_url` - WebSocket base URL, e.g. `ws://host:8080`.
    pub fn new(api: ConvertApi, ws_url: String) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            ws_url,
            session: None,
            event_tx,
        }
    }

    /// Subscribe to live progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConvertEvent> {
        self.event_tx.subscribe()
    }

    /// The current session, if one exists. Stays available after the
    /// terminal outcome so callers can read the artifact.
    pub fn session(&self) -> Option<&JobSession> {
        self.session.as_ref()
    }

    /// The API client this runner submits through.
    pub fn api(&self) -> &ConvertApi {
        &self.api
    }

    /// Discard the current session so a new upload can start.
    pub fn reset(&mut self) {
        self.session = None;
    }

    /// Convert one chat export end to end.
    ///
    /// Submits the upload, opens the notification stream, and consumes
    /// it until a terminal event or channel closure. Returns `Ok(None)`
    /// if `cancel` fired before the session resolved -- the session is
    /// abandoned and discarded, no outcome is recorded.
    pub async fn convert(
        &mut self,
        file_name: &str,
        file_bytes: Vec<u8>,
        options: &ExportOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Outcome>, RunnerError> {
        if self.session.as_ref().is_some_and(|s| s.is_processing()) {
            return Err(RunnerError::AlreadyProcessing);
        }
        validate_options(options)?;

        let response = self.api.submit_export(file_name, file_bytes, options).await?;
        let client_id = response.client_id;

        tracing::info!(client_id = %client_id, file_name = %file_name, "Conversion job accepted");

        self.session = Some(JobSession::new(client_id.clone()));

        let mut source = match WsProgressSource::connect(&self.ws_url, &client_id).await {
            Ok(source) => source,
            Err(e) => {
                // The job is running server-side but its notifications
                // are unreachable; the session is lost, not suspended.
                if let Some(session) = self.session.as_mut() {
                    session.resolve_close();
                }
                let _ = self.event_tx.send(ConvertEvent::ConnectionLost { client_id });
                return Err(e.into());
            }
        };

        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let outcome = drive_session(session, &mut source, &self.event_tx, cancel).await;

        if outcome.is_none() {
            // Cancelled mid-stream: dropping the source closed the
            // channel; the abandoned session is discarded.
            self.session = None;
        }

        Ok(outcome)
    }
}

/// Feed notifications from `source` into `session` until it resolves.
///
/// Returns the terminal outcome, or `None` if `cancel` fired first.
/// This is the only place session state mutates, so every emitted
/// [`ConvertEvent`] reflects the aggregate as it is *after* the
/// triggering notification.
pub async fn drive_session<S: ProgressSource>(
    session: &mut JobSession,
    source: &mut S,
    event_tx: &broadcast::Sender<ConvertEvent>,
    cancel: &CancellationToken,
) -> Option<Outcome> {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(client_id = %session.client_id(), "Session abandoned by caller");
                return None;
            }
            event = source.next_event() => event,
        };

        match next {
            Some(event) => {
                let before = Snapshot::of(session);
                let applied = session.apply(&event);

                if applied == Applied::Ignored {
                    tracing::debug!(
                        client_id = %session.client_id(),
                        "Notification after terminal state ignored",
                    );
                    continue;
                }

                emit_transitions(session, &before, event_tx);

                if applied == Applied::Terminal {
                    let outcome = session.outcome();
                    emit_terminal(session, event_tx);
                    return outcome;
                }
            }
            None => {
                let outcome = session.resolve_close();
                tracing::info!(
                    client_id = %session.client_id(),
                    ?outcome,
                    "Progress stream ended without a terminal notification",
                );
                emit_terminal(session, event_tx);
                return Some(outcome);
            }
        }
    }
}

/// Pre-apply view of the fields whose transitions are broadcast.
struct Snapshot {
    progress: u8,
    step_done: Vec<bool>,
    payment_populated: bool,
}

impl Snapshot {
    fn of(session: &JobSession) -> Self {
        Self {
            progress: session.progress(),
            step_done: session.steps().steps().iter().map(|s| s.done).collect(),
            payment_populated: session.payment().is_some(),
        }
    }
}

/// Broadcast the difference one notification made to the session.
fn emit_transitions(
    session: &JobSession,
    before: &Snapshot,
    event_tx: &broadcast::Sender<ConvertEvent>,
) {
    let client_id = session.client_id().to_string();

    for (index, step) in session.steps().steps().iter().enumerate() {
        if step.done && !before.step_done.get(index).copied().unwrap_or(false) {
            tracing::debug!(client_id = %client_id, index, step = %step.name, "Step completed");
            let _ = event_tx.send(ConvertEvent::StepCompleted {
                client_id: client_id.clone(),
                index,
                label: step.label.to_string(),
            });
        }
    }

    if session.progress() > before.progress {
        let _ = event_tx.send(ConvertEvent::Progress {
            client_id: client_id.clone(),
            percent: session.progress(),
        });
    }

    if !before.payment_populated {
        if let Some(due) = session.payment() {
            tracing::info!(
                client_id = %client_id,
                message_count = ?due.message_count,
                media_size_bytes = ?due.media_size_bytes,
                "Export is gated on payment",
            );
            let _ = event_tx.send(ConvertEvent::PaymentRequired {
                client_id,
                message_count: due.message_count,
                media_size_bytes: due.media_size_bytes,
                checkout_url: due.checkout_url.clone(),
            });
        }
    }
}

/// Broadcast the terminal outcome of a resolved session.
fn emit_terminal(session: &JobSession, event_tx: &broadcast::Sender<ConvertEvent>) {
    let client_id = session.client_id().to_string();
    let event = match session.outcome() {
        Some(Outcome::Success) => ConvertEvent::Completed {
            client_id,
            pdf_url: session
                .artifact()
                .map(|a| a.pdf_url.clone())
                .unwrap_or_default(),
        },
        Some(Outcome::AwaitingPayment) => ConvertEvent::AwaitingPayment { client_id },
        Some(Outcome::ConnectionLost) => ConvertEvent::ConnectionLost { client_id },
        None => return,
    };
    let _ = event_tx.send(event);
}
