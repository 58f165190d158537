//! Wire model for progress notifications.
//!
//! The backend pushes one JSON-encoded [`ProgressEvent`] per message on
//! the notification channel. Every field except `progress` is optional;
//! an absent field carries no new information on that axis.

use serde::Deserialize;

/// One decoded progress notification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Overall pipeline progress, 0-100.
    pub progress: u8,

    /// Index of the step the pipeline has reached.
    pub step_index: Option<usize>,

    /// Terminal marker -- the backend emits nothing further after this.
    pub done: Option<bool>,

    /// The export crossed the free tier and is gated on payment.
    pub requires_payment: Option<bool>,

    /// Number of chat messages counted so far (billing metadata).
    pub message_count: Option<u64>,

    /// Total size of referenced media in bytes (billing metadata).
    pub media_size_bytes: Option<u64>,

    /// Server-side bundle identifier used by checkout.
    pub bundle_id: Option<String>,

    /// URL the caller should open to complete payment.
    pub checkout_url: Option<String>,

    /// Download URL of the rendered document, present on success.
    pub pdf_url: Option<String>,

    /// Parsed chat structure echoed back on success.
    pub chat_data: Option<serde_json::Value>,
}
