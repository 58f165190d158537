//! `chatprint` -- upload a chat export and watch the conversion.
//!
//! Submits the file given as the first argument, renders progress from
//! the session's broadcast events, and downloads the document on
//! success. Exit code 0 on success, 2 when the export is suspended
//! awaiting payment, 1 on any failure.
//!
//! # Environment variables
//!
//! | Variable                  | Required | Default        | Description                               |
//! |---------------------------|----------|----------------|-------------------------------------------|
//! | `CHATPRINT_API_URL`       | yes      | --             | HTTP endpoint, e.g. `http://host:8080`    |
//! | `CHATPRINT_WS_URL`        | yes      | --             | WebSocket endpoint, e.g. `ws://host:8080` |
//! | `CHATPRINT_LOCALE`        | no       | `en`           | Locale for headings and dates             |
//! | `CHATPRINT_DATE_FROM`     | no       | --             | Only messages on/after, `YYYY-MM-DD`      |
//! | `CHATPRINT_DATE_TO`       | no       | --             | Only messages on/before, `YYYY-MM-DD`     |
//! | `CHATPRINT_INCLUDE_MEDIA` | no       | `true`         | Embed media attachments                   |
//! | `CHATPRINT_OUTPUT`        | no       | `<export>.pdf` | Where to write the document               |

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatprint_client::api::ConvertApi;
use chatprint_client::events::ConvertEvent;
use chatprint_client::runner::SessionRunner;
use chatprint_core::options::ExportOptions;
use chatprint_core::session::Outcome;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatprint=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_url = std::env::var("CHATPRINT_API_URL").unwrap_or_else(|_| {
        tracing::error!("CHATPRINT_API_URL environment variable is required");
        std::process::exit(1);
    });

    let ws_url = std::env::var("CHATPRINT_WS_URL").unwrap_or_else(|_| {
        tracing::error!("CHATPRINT_WS_URL environment variable is required");
        std::process::exit(1);
    });

    let export_path: PathBuf = match std::env::args().nth(1) {
        Some(path) => path.into(),
        None => {
            tracing::error!("Usage: chatprint <chat-export-file>");
            std::process::exit(1);
        }
    };

    let file_bytes = match tokio::fs::read(&export_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(path = %export_path.display(), error = %e, "Failed to read chat export");
            std::process::exit(1);
        }
    };

    let file_name = export_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chat-export.txt".to_string());

    let options = options_from_env();
    let output_path = std::env::var("CHATPRINT_OUTPUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| export_path.with_extension("pdf"));

    tracing::info!(
        file = %export_path.display(),
        locale = %options.locale,
        include_media = options.include_media,
        "Starting conversion",
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, abandoning session");
                cancel.cancel();
            }
        });
    }

    let mut runner = SessionRunner::new(ConvertApi::new(api_url), ws_url);

    let events = runner.subscribe();
    tokio::spawn(render_events(events));

    match runner.convert(&file_name, file_bytes, &options, &cancel).await {
        Ok(Some(Outcome::Success)) => {
            download_artifact(&runner, &output_path).await;
        }
        Ok(Some(Outcome::AwaitingPayment)) => {
            if let Some(url) = runner
                .session()
                .and_then(|s| s.payment())
                .and_then(|p| p.checkout_url.clone())
            {
                tracing::warn!(checkout_url = %url, "Complete payment, then resubmit the export");
            } else {
                tracing::warn!("Export requires payment; resubmit after checkout");
            }
            std::process::exit(2);
        }
        Ok(Some(Outcome::ConnectionLost)) => {
            tracing::error!("Lost connection to the conversion backend");
            std::process::exit(1);
        }
        Ok(None) => {
            // Abandoned via Ctrl-C.
            std::process::exit(130);
        }
        Err(e) => {
            tracing::error!(error = %e, "Conversion failed");
            std::process::exit(1);
        }
    }
}

/// Build [`ExportOptions`] from the `CHATPRINT_*` environment variables.
fn options_from_env() -> ExportOptions {
    let defaults = ExportOptions::default();

    ExportOptions {
        locale: std::env::var("CHATPRINT_LOCALE").unwrap_or(defaults.locale),
        date_from: std::env::var("CHATPRINT_DATE_FROM")
            .ok()
            .and_then(|v| v.parse::<chrono::NaiveDate>().ok()),
        date_to: std::env::var("CHATPRINT_DATE_TO")
            .ok()
            .and_then(|v| v.parse::<chrono::NaiveDate>().ok()),
        include_media: std::env::var("CHATPRINT_INCLUDE_MEDIA")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.include_media),
        include_system_messages: defaults.include_system_messages,
    }
}

/// Print broadcast progress events until the channel closes.
async fn render_events(mut events: tokio::sync::broadcast::Receiver<ConvertEvent>) {
    loop {
        match events.recv().await {
            Ok(ConvertEvent::Progress { percent, .. }) => {
                tracing::info!(percent, "Converting");
            }
            Ok(ConvertEvent::StepCompleted { label, .. }) => {
                tracing::info!(step = %label, "Step finished");
            }
            Ok(ConvertEvent::PaymentRequired {
                message_count,
                media_size_bytes,
                ..
            }) => {
                tracing::warn!(?message_count, ?media_size_bytes, "Export exceeds the free tier");
            }
            Ok(ConvertEvent::Completed { pdf_url, .. }) => {
                tracing::info!(pdf_url = %pdf_url, "Document rendered");
            }
            Ok(ConvertEvent::AwaitingPayment { .. } | ConvertEvent::ConnectionLost { .. }) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress display lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Fetch the rendered document and write it next to the export.
async fn download_artifact(runner: &SessionRunner, output_path: &std::path::Path) {
    let Some(artifact) = runner.session().and_then(|s| s.artifact()) else {
        tracing::error!("Conversion succeeded but no artifact was recorded");
        std::process::exit(1);
    };

    match runner.api().download_document(&artifact.pdf_url).await {
        Ok(bytes) => {
            if let Err(e) = tokio::fs::write(output_path, bytes).await {
                tracing::error!(path = %output_path.display(), error = %e, "Failed to write document");
                std::process::exit(1);
            }
            tracing::info!(path = %output_path.display(), "Document saved");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to download document");
            std::process::exit(1);
        }
    }
}
