//! Decode command implementation.

use super::report::{print_store, ReconcileSummary, StoreSummary};
use fedisync_client::{Reconciler, ReconcilerConfig};
use fedisync_protocol::StreamEvent;
use fedisync_store::Store;
use serde::Serialize;
use std::io::BufRead;

/// One decoded input line.
#[derive(Debug, Serialize)]
pub struct DecodedFrame {
    /// Line number, starting at 1.
    pub line: usize,
    /// Event name, if the frame decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Decode error, if it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decode result.
#[derive(Debug, Serialize)]
pub struct DecodeResult {
    /// Every non-empty input line.
    pub frames: Vec<DecodedFrame>,
    /// Reconciler counters, when frames were applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled: Option<ReconcileSummary>,
    /// Store contents, when frames were applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSummary>,
}

/// Decodes every line of `input`, optionally applying it to a fresh store.
pub fn decode(input: impl BufRead, apply: bool) -> std::io::Result<DecodeResult> {
    let reconciler = apply.then(|| Reconciler::new(Store::new(), ReconcilerConfig::new()));
    let mut frames = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let decoded = match StreamEvent::parse(text) {
            Ok(event) => DecodedFrame {
                line: index + 1,
                event: Some(event.name().to_string()),
                error: None,
            },
            Err(error) => DecodedFrame {
                line: index + 1,
                event: None,
                error: Some(error.to_string()),
            },
        };
        frames.push(decoded);
        if let Some(reconciler) = &reconciler {
            reconciler.handle_frame(text);
        }
    }

    Ok(DecodeResult {
        frames,
        reconciled: reconciler.as_ref().map(|r| ReconcileSummary::from(&r.stats())),
        store: reconciler
            .as_ref()
            .map(|r| StoreSummary::from(&r.store().stats())),
    })
}

/// Runs the decode command.
pub fn run(
    input: impl BufRead,
    apply: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = decode(input, apply)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &DecodeResult) {
    for frame in &result.frames {
        match (&frame.event, &frame.error) {
            (Some(event), _) => println!("{:>4}  {}", frame.line, event),
            (None, Some(error)) => println!("{:>4}  error: {}", frame.line, error),
            (None, None) => {}
        }
    }
    if let Some(stats) = &result.reconciled {
        println!();
        println!(
            "Frames: {}  applied: {}  ignored: {}  malformed: {}",
            stats.frames, stats.applied, stats.ignored, stats.malformed
        );
    }
    if let Some(store) = &result.store {
        print_store(store);
    }
}
