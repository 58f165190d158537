//! Session events broadcast to progress listeners.
//!
//! Produced by the runner while it drives a session, so a UI can render
//! live progress without polling the aggregate. Subscribe via
//! [`SessionRunner::subscribe`](crate::runner::SessionRunner::subscribe).

use serde::Serialize;

use chatprint_core::types::ClientId;

/// A high-level progress event for one conversion session.
#[derive(Debug, Clone, Serialize)]
pub enum ConvertEvent {
    /// Overall progress moved forward.
    Progress {
        client_id: ClientId,
        /// Completion percentage (0-100).
        percent: u8,
    },

    /// A pipeline step finished.
    StepCompleted {
        client_id: ClientId,
        index: usize,
        label: String,
    },

    /// The export crossed the free tier and is gated on payment.
    PaymentRequired {
        client_id: ClientId,
        message_count: Option<u64>,
        media_size_bytes: Option<u64>,
        checkout_url: Option<String>,
    },

    /// The document was rendered.
    Completed {
        client_id: ClientId,
        /// Download URL of the rendered document.
        pdf_url: String,
    },

    /// The session suspended awaiting external checkout.
    AwaitingPayment { client_id: ClientId },

    /// The stream dropped before the pipeline finished.
    ConnectionLost { client_id: ClientId },
}
