//! speech-gate: volume-threshold speech detector.
//!
//! Communicates with the host via JSON-line IPC on stdin/stdout. The host
//! feeds loudness ticks (or raw frames) and recorder chunks; the detector
//! answers with segment events and recorder/pipeline commands.

use base64::prelude::*;
use tracing::{info, warn};

use speech_gate::config::read_detector_config;
use speech_gate::ipc::bridge::{emit_error, emit_event, spawn_stdin_reader};
use speech_gate::ipc::{DetectorEvent, HostCommand};
use speech_gate::logging;
use speech_gate::sink::{IpcPipeline, IpcRecorder};
use speech_gate::vad::{Timestamp, VolumeMeter};
use speech_gate::{AudioPipeline, RecordedChunk, RecordingSink, SpeechDetector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = match logging::init(logging::resolve_log_dir().as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("File logging unavailable ({:#}), logging to stderr only", e);
            logging::init(None)?
        }
    };

    // Emit starting event immediately so the host knows we're alive.
    emit_event(&DetectorEvent::Starting {});

    let config = read_detector_config();
    info!(?config, max_silence_ticks = config.max_silence_ticks(), "Configuration loaded");

    let mut detector = SpeechDetector::new(
        config,
        IpcRecorder::new(emit_event),
        IpcPipeline::new(emit_event),
    );
    let mut meter = VolumeMeter::new();
    let mut cmd_rx = spawn_stdin_reader();

    emit_event(&DetectorEvent::Ready {
        config: detector.config().clone(),
    });
    info!("Speech detector ready");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(command) => {
                        if !handle_command(&mut detector, &mut meter, command) {
                            break; // Shutdown command received
                        }
                    }
                    None => {
                        // stdin closed: host process gone
                        info!("stdin closed, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    emit_all(detector.stop());
    info!("Speech detector shutting down");
    Ok(())
}

/// Handle a single command from the host.
/// Returns `false` if the main loop should exit.
fn handle_command<S: RecordingSink, P: AudioPipeline>(
    detector: &mut SpeechDetector<S, P>,
    meter: &mut VolumeMeter,
    cmd: HostCommand,
) -> bool {
    match cmd {
        HostCommand::Tick { volume, timestamp } => process_tick(detector, volume, timestamp),

        HostCommand::Samples { samples, timestamp } => {
            let volume = meter.update(&samples);
            process_tick(detector, volume, timestamp);
        }

        HostCommand::Chunk { segment_id, data } => match BASE64_STANDARD.decode(data.as_bytes()) {
            Ok(bytes) => emit_event(&detector.on_chunk(RecordedChunk {
                segment_id,
                data: bytes,
            })),
            Err(e) => {
                warn!(segment = %segment_id, "Undecodable chunk: {}", e);
                emit_error(&format!("Invalid chunk data for segment {}: {}", segment_id, e));
            }
        },

        HostCommand::Start {} => emit_all(detector.start()),
        HostCommand::Resume {} => emit_all(detector.resume()),
        HostCommand::Stop {} => emit_all(detector.stop()),

        HostCommand::SetRecordingEnabled { enabled } => detector.set_recording_enabled(enabled),

        HostCommand::Configure { config } => match detector.reconfigure(config) {
            Ok(()) => emit_event(&DetectorEvent::Configured {
                config: detector.config().clone(),
            }),
            Err(e) => emit_error(&e.to_string()),
        },

        HostCommand::Ping {} => emit_event(&DetectorEvent::Pong {}),

        HostCommand::Shutdown {} => {
            emit_event(&DetectorEvent::Stopping {});
            return false;
        }
    }

    true
}

fn process_tick<S: RecordingSink, P: AudioPipeline>(
    detector: &mut SpeechDetector<S, P>,
    volume: f32,
    timestamp: Option<Timestamp>,
) {
    let now = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    match detector.tick(volume, now) {
        Ok(events) => emit_all(events),
        Err(e) => emit_error(&e.to_string()),
    }
}

fn emit_all(events: Vec<DetectorEvent>) {
    for event in &events {
        emit_event(event);
    }
}
