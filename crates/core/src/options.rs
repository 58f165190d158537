//! Processing options serialized into the submission request.
//!
//! The option set is owned by the configuration form on the caller's
//! side; this module only defines the wire shape and coherence checks
//! run before an upload is attempted.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::CoreError;

/// Options accompanying an uploaded chat export.
///
/// Serialized as a JSON part named `options` in the multipart submit
/// request, camelCase on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// BCP-47 locale used for headings and date formatting.
    pub locale: String,

    /// Only include messages on or after this date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,

    /// Only include messages on or before this date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,

    /// Embed media attachments into the document.
    pub include_media: bool,

    /// Include join/leave and other system messages.
    pub include_system_messages: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            date_from: None,
            date_to: None,
            include_media: true,
            include_system_messages: false,
        }
    }
}

/// Validate option coherence before submission.
///
/// The backend re-validates; this only catches requests that could
/// never succeed.
pub fn validate_options(options: &ExportOptions) -> Result<(), CoreError> {
    if options.locale.trim().is_empty() {
        return Err(CoreError::Validation(
            "locale must not be empty".to_string(),
        ));
    }
    if let (Some(from), Some(to)) = (options.date_from, options.date_to) {
        if from > to {
            return Err(CoreError::Validation(format!(
                "date range is inverted: {from} is after {to}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(validate_options(&ExportOptions::default()).is_ok());
    }

    #[test]
    fn empty_locale_is_rejected() {
        let options = ExportOptions {
            locale: "  ".into(),
            ..Default::default()
        };
        assert!(validate_options(&options).is_err());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let options = ExportOptions {
            date_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..Default::default()
        };
        assert!(validate_options(&options).is_err());
    }

    #[test]
    fn open_ended_date_range_is_valid() {
        let options = ExportOptions {
            date_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..Default::default()
        };
        assert!(validate_options(&options).is_ok());
    }

    #[test]
    fn serializes_with_camel_case_wire_names() {
        let options = ExportOptions {
            locale: "de".into(),
            date_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..Default::default()
        };
        let json: serde_json::Value = serde_json::to_value(&options).unwrap();
        assert_eq!(json["locale"], "de");
        assert_eq!(json["dateFrom"], "2026-01-01");
        assert_eq!(json["includeMedia"], true);
        assert_eq!(json["includeSystemMessages"], false);
        assert!(json.get("dateTo").is_none());
    }
}
