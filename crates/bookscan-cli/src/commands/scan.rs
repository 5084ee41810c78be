//! Scan session command
//!
//! Stands in for the camera: each input line is either a decode event
//!
//! ```json
//! {"symbology":"ean13","payload":"9784167158057","boundingBox":{"originY":0.2,"height":0.1}}
//! ```
//!
//! or a user action, `{"command":"arm"}` / `{"command":"again"}`. Blank lines
//! and lines starting with `#` are skipped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use bookscan_core::config::ScanConfig;
use bookscan_core::{
    decode_channel, Config, DecodeEvent, RakutenBooksClient, ScanSession, ScreenState,
    SessionHandle,
};

use super::with_suggestion;
use crate::output::Output;

/// Decode events buffered between the reader and the session
const DECODE_BUFFER: usize = 64;

/// Extra time allowed for a deferred arm beyond the cool-down
const ARM_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Command { command: UserCommand },
    Decode(DecodeEvent),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum UserCommand {
    Arm,
    Again,
}

/// Run a scan session over JSON-lines input
pub async fn scan(
    config: &Config,
    input: Option<PathBuf>,
    arm: bool,
    output: &Output,
) -> Result<()> {
    let client = RakutenBooksClient::from_config(&config.catalog).map_err(with_suggestion)?;

    let reader: Box<dyn AsyncRead + Unpin + Send> = match input {
        Some(ref path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(reader).lines();

    let (camera, decodes) = decode_channel(DECODE_BUFFER);
    let mut session = ScanSession::new(Arc::new(client), config.scan.gate_options());
    let handle = session.handle();
    let mut events = session
        .take_events()
        .context("Scan session events already taken")?;

    let printer = {
        let output = *output;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                output.print_scan_event(&event);
            }
        })
    };
    debug!(session = session.id(), "Starting scan session");
    let task = session.spawn(decodes);

    if arm {
        arm_and_wait(&handle, &config.scan).await;
    }

    let mut sent = 0u64;
    let mut line_no = 0usize;
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read scan input")?
    {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match serde_json::from_str::<InputLine>(line) {
            Ok(InputLine::Decode(event)) => {
                if camera.send(event).await.is_err() {
                    break;
                }
                sent += 1;
            }
            Ok(InputLine::Command { command }) => {
                // Actions apply after everything read before them
                handle.wait_processed(sent).await;
                wait_settled(&handle).await;
                match command {
                    UserCommand::Arm => arm_and_wait(&handle, &config.scan).await,
                    UserCommand::Again => {
                        handle.scan_again();
                        handle.wait_for_state(|s| !s.is_settled()).await;
                    }
                }
            }
            Err(e) => {
                debug!(line = line_no, "Unparseable scan input: {}", line);
                output.warning(&format!("Skipping line {}: {}", line_no, e));
            }
        }
    }

    drop(camera);
    handle.wait_processed(sent).await;
    wait_settled(&handle).await;
    handle.close();

    let summary = task.await.context("Scan session stopped unexpectedly")?;
    printer.await.context("Event printer stopped unexpectedly")?;

    output.message(&format!(
        "Processed {} barcode event(s), {} lookup(s)",
        summary.decoded, summary.lookups
    ));

    Ok(())
}

/// Arm and wait until the gate is scanning
///
/// An arm during cool-down is deferred, so allow for the whole cool-down.
async fn arm_and_wait(handle: &SessionHandle, scan: &ScanConfig) {
    handle.arm();
    let limit = Duration::from_millis(scan.cool_down_ms) + ARM_GRACE;
    let _ = tokio::time::timeout(
        limit,
        handle.wait_for_state(|s| *s == ScreenState::Scanning),
    )
    .await;
}

async fn wait_settled(handle: &SessionHandle) {
    handle.wait_for_state(|s| !s.is_resolving()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_line_command() {
        let line: InputLine = serde_json::from_str(r#"{"command":"arm"}"#).unwrap();
        assert!(matches!(
            line,
            InputLine::Command {
                command: UserCommand::Arm
            }
        ));

        let line: InputLine = serde_json::from_str(r#"{"command":"again"}"#).unwrap();
        assert!(matches!(
            line,
            InputLine::Command {
                command: UserCommand::Again
            }
        ));
    }

    #[test]
    fn test_input_line_decode() {
        let line: InputLine =
            serde_json::from_str(r#"{"symbology":"EAN-13","payload":"9784167158057"}"#).unwrap();
        match line {
            InputLine::Decode(event) => {
                assert!(event.symbology.is_book_barcode());
                assert_eq!(event.payload, "9784167158057");
            }
            other => panic!("expected decode event, got {:?}", other),
        }
    }

    #[test]
    fn test_input_line_keeps_event_with_bad_geometry() {
        let line: InputLine = serde_json::from_str(
            r#"{"symbology":"ean13","payload":"9784167158057","boundingBox":{"height":0.1}}"#,
        )
        .unwrap();
        match line {
            InputLine::Decode(event) => assert!(event.bounding_box.is_none()),
            other => panic!("expected decode event, got {:?}", other),
        }
    }

    #[test]
    fn test_input_line_rejects_garbage() {
        assert!(serde_json::from_str::<InputLine>(r#"{"command":"fly"}"#).is_err());
        assert!(serde_json::from_str::<InputLine>("9784167158057").is_err());
    }
}
