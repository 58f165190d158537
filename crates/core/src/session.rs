//! The per-job session aggregate and its reducer.
//!
//! One [`JobSession`] covers one end-to-end attempt to convert one
//! uploaded chat export. All mutation funnels through two entry points:
//! [`JobSession::apply`] for each decoded notification, and
//! [`JobSession::resolve_close`] when the channel closes without a
//! terminal event. Once an [`Outcome`] is recorded the session never
//! mutates again.

use crate::event::ProgressEvent;
use crate::payment::PaymentDue;
use crate::steps::{StepRegistry, PAYMENT_REQUIRED, PAYMENT_REQUIRED_STEP};
use crate::types::{ClientId, Timestamp};

/// Terminal state of a session. Exactly one is ever reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The document was rendered; the artifact is available.
    Success,
    /// The pipeline halted at the payment gate. Resuming after checkout
    /// is a fresh session.
    AwaitingPayment,
    /// The channel closed before a terminal notification and the
    /// payment gate was never reached.
    ConnectionLost,
}

/// Rendered-document handle, set only on [`Outcome::Success`].
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Download URL of the rendered document.
    pub pdf_url: String,
    /// Parsed chat structure echoed back by the backend.
    pub chat_data: serde_json::Value,
}

/// What the caller should do after feeding one event to the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Keep consuming the stream.
    Continue,
    /// The event was terminal; the outcome is set, stop consuming.
    Terminal,
    /// The session had already reached a terminal state; event ignored.
    Ignored,
}

/// One end-to-end conversion attempt.
///
/// Created when the submit endpoint hands back a client ID; discarded
/// when the caller resets state or starts a new job.
#[derive(Debug, Clone)]
pub struct JobSession {
    client_id: ClientId,
    steps: StepRegistry,
    progress: u8,
    is_processing: bool,
    is_file_processed: bool,
    payment: Option<PaymentDue>,
    artifact: Option<Artifact>,
    outcome: Option<Outcome>,
    started_at: Timestamp,
}

impl JobSession {
    /// Start a session over the production conversion pipeline.
    pub fn new(client_id: ClientId) -> Self {
        Self::with_steps(client_id, StepRegistry::for_conversion())
    }

    /// Start a session over an explicit step registry.
    pub fn with_steps(client_id: ClientId, steps: StepRegistry) -> Self {
        Self {
            client_id,
            steps,
            progress: 0,
            is_processing: true,
            is_file_processed: false,
            payment: None,
            artifact: None,
            outcome: None,
            started_at: chrono::Utc::now(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn steps(&self) -> &StepRegistry {
        &self.steps
    }

    /// Highest progress value observed so far, 0-100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Whether the export was fully converted into a document.
    pub fn is_file_processed(&self) -> bool {
        self.is_file_processed
    }

    /// Billing metadata, populated once the payment gate has fired.
    pub fn payment(&self) -> Option<&PaymentDue> {
        self.payment.as_ref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Apply one progress notification.
    ///
    /// Progress only ever moves forward: a notification carrying a lower
    /// value than the recorded maximum leaves it unchanged. Step
    /// advancement, the payment gate, and completion are all derived
    /// from the same event, in that order.
    pub fn apply(&mut self, event: &ProgressEvent) -> Applied {
        if self.outcome.is_some() {
            return Applied::Ignored;
        }

        if event.progress > self.progress {
            self.progress = event.progress.min(100);
        }

        if let Some(step_index) = event.step_index {
            self.steps.apply_advancement(step_index);
            if step_index == PAYMENT_REQUIRED {
                // The gate step signals the moment it is reached; it
                // never blocks the steps behind it.
                self.steps.mark_done_by_name(PAYMENT_REQUIRED_STEP);
            }
        }

        if event.requires_payment == Some(true) {
            self.payment
                .get_or_insert_with(PaymentDue::default)
                .merge(&PaymentDue::from_event(event));
        }

        if event.done == Some(true) {
            self.resolve_done(event);
            return Applied::Terminal;
        }

        Applied::Continue
    }

    /// Resolve the session when the channel closed without a terminal
    /// notification.
    ///
    /// A closure after the payment gate fired is the *expected* way a
    /// payment interruption manifests -- the backend simply stops
    /// streaming. Only a closure before the gate is a real connection
    /// loss. Idempotent: an already-resolved session keeps its outcome.
    pub fn resolve_close(&mut self) -> Outcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        self.is_processing = false;
        let outcome = if self.steps.is_done_by_name(PAYMENT_REQUIRED_STEP) || self.payment.is_some()
        {
            Outcome::AwaitingPayment
        } else {
            Outcome::ConnectionLost
        };
        self.outcome = Some(outcome);
        outcome
    }

    // ---- private helpers ----

    /// Decide the terminal outcome for an event carrying `done = true`.
    ///
    /// A paywalled completion (payment flagged, no document URL) leaves
    /// the file unprocessed; anything else is a success and the artifact
    /// is recorded.
    fn resolve_done(&mut self, event: &ProgressEvent) {
        self.is_processing = false;

        let paywalled = event.requires_payment == Some(true) && event.pdf_url.is_none();
        if paywalled {
            self.outcome = Some(Outcome::AwaitingPayment);
            return;
        }

        self.steps.mark_all_done();
        self.artifact = Some(Artifact {
            pdf_url: event.pdf_url.clone().unwrap_or_default(),
            chat_data: event.chat_data.clone().unwrap_or(serde_json::Value::Null),
        });
        self.is_file_processed = true;
        self.outcome = Some(Outcome::Success);
    }
}
