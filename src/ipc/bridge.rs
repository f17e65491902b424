//! IPC bridge: stdin reader and stdout event emitter.
//!
//! A blocking stdin reader thread sends deserialized commands through an
//! mpsc channel; events go out as JSON lines on stdout.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{DetectorEvent, HostCommand};

/// Write a `DetectorEvent` as one JSON line.
pub fn write_event<W: Write>(writer: &mut W, event: &DetectorEvent) -> io::Result<()> {
    let json = serde_json::to_string(event).map_err(io::Error::other)?;
    writeln!(writer, "{}", json)?;
    writer.flush()
}

/// Emit a `DetectorEvent` as a JSON line on stdout and flush.
pub fn emit_event(event: &DetectorEvent) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Ignore write/flush errors: pipe may be closed.
    if let Err(e) = write_event(&mut handle, event) {
        debug!("Failed to emit event: {}", e);
    }
}

/// Convenience helper for emitting error events.
pub fn emit_error(message: &str) {
    emit_event(&DetectorEvent::Error {
        message: message.to_string(),
    });
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<HostCommand>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Spawn a blocking thread that reads JSON lines from stdin, deserializes
/// them into `HostCommand`, and forwards them through the returned channel.
///
/// The thread exits when stdin is closed (host process gone) or on
/// unrecoverable read error.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<HostCommand> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = io::stdin();
        let reader = stdin.lock();
        for line in reader.lines() {
            match line {
                Ok(text) => match parse_command(&text) {
                    Ok(Some(cmd)) => {
                        if tx.send(cmd).is_err() {
                            break; // Receiver dropped: main task is gone.
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(input = text.trim(), "Invalid JSON command: {}", e);
                        emit_error(&format!("Invalid JSON command: {}", e));
                    }
                },
                Err(e) => {
                    error!("stdin read error: {}", e);
                    break;
                }
            }
        }
        debug!("stdin reader thread exiting");
    });

    rx
}
