//! Billing metadata captured at the payment gate.
//!
//! The gate itself is part of [`crate::session::JobSession`]: `None`
//! while the gate is open, `Some(PaymentDue)` once the first paywall
//! notification arrives. There is no way back -- resuming after checkout
//! is modeled as a fresh session.

use serde::Serialize;

use crate::event::ProgressEvent;

/// Billing metadata for a paywalled export.
///
/// Fields may arrive split across several notifications;
/// [`PaymentDue::merge`] is additive -- a present field overwrites, an
/// absent field never erases a previously captured value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentDue {
    /// Number of chat messages in the export.
    pub message_count: Option<u64>,
    /// Total size of referenced media in bytes.
    pub media_size_bytes: Option<u64>,
    /// Server-side bundle identifier used by checkout.
    pub bundle_id: Option<String>,
    /// URL the caller should open to complete payment.
    pub checkout_url: Option<String>,
}

impl PaymentDue {
    /// Extract the billing fields carried by one notification.
    pub fn from_event(event: &ProgressEvent) -> Self {
        Self {
            message_count: event.message_count,
            media_size_bytes: event.media_size_bytes,
            bundle_id: event.bundle_id.clone(),
            checkout_url: event.checkout_url.clone(),
        }
    }

    /// Fold another notification's billing fields into this one.
    pub fn merge(&mut self, other: &PaymentDue) {
        if other.message_count.is_some() {
            self.message_count = other.message_count;
        }
        if other.media_size_bytes.is_some() {
            self.media_size_bytes = other.media_size_bytes;
        }
        if other.bundle_id.is_some() {
            self.bundle_id = other.bundle_id.clone();
        }
        if other.checkout_url.is_some() {
            self.checkout_url = other.checkout_url.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_fields_absent_in_newer_event() {
        let mut due = PaymentDue {
            message_count: Some(500),
            bundle_id: Some("b-1".into()),
            ..Default::default()
        };
        due.merge(&PaymentDue {
            checkout_url: Some("https://pay.example/b-1".into()),
            ..Default::default()
        });

        assert_eq!(due.message_count, Some(500));
        assert_eq!(due.bundle_id.as_deref(), Some("b-1"));
        assert_eq!(due.checkout_url.as_deref(), Some("https://pay.example/b-1"));
    }

    #[test]
    fn merge_overwrites_present_fields() {
        let mut due = PaymentDue {
            message_count: Some(500),
            ..Default::default()
        };
        due.merge(&PaymentDue {
            message_count: Some(750),
            ..Default::default()
        });
        assert_eq!(due.message_count, Some(750));
    }

    #[test]
    fn merge_of_identical_events_is_idempotent() {
        // Applying the same billing fields twice equals applying the
        // union once.
        let fields = PaymentDue {
            message_count: Some(500),
            media_size_bytes: Some(1_048_576),
            bundle_id: Some("b-2".into()),
            checkout_url: Some("https://pay.example/b-2".into()),
        };

        let mut once = PaymentDue::default();
        once.merge(&fields);

        let mut twice = PaymentDue::default();
        twice.merge(&fields);
        twice.merge(&fields);

        assert_eq!(once, twice);
    }

    #[test]
    fn from_event_picks_only_billing_fields() {
        let event = ProgressEvent {
            progress: 50,
            step_index: Some(2),
            requires_payment: Some(true),
            message_count: Some(500),
            ..Default::default()
        };
        let due = PaymentDue::from_event(&event);
        assert_eq!(due.message_count, Some(500));
        assert_eq!(due.media_size_bytes, None);
        assert_eq!(due.bundle_id, None);
    }
}
