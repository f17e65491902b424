//! IPC protocol types for communication with the host process.
//!
//! Events use `{"event": "<name>", "data": {...}}` format (detector -> host).
//! Commands use `{"command": "<name>", ...}` format (host -> detector).

pub mod bridge;

use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::vad::{SegmentId, Timestamp};

// ---------------------------------------------------------------------------
// Events: detector -> host (stdout)
// ---------------------------------------------------------------------------

/// Common payload of per-tick events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickDetail {
    pub volume: f32,
    pub timestamp: Timestamp,
    /// Milliseconds since the most recent segment opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Running count (consecutive signal/silence ticks, pre-roll window ticks).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TickDetail {
    pub fn new(volume: f32, timestamp: Timestamp, duration: Option<i64>) -> Self {
        Self {
            volume,
            timestamp,
            duration,
            items: None,
            reason: None,
        }
    }

    pub fn with_items(mut self, items: u32) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// All events emitted to the host via stdout as JSON lines.
///
/// Serialized as `{"event": "<variant>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum DetectorEvent {
    Starting {},
    Ready {
        config: DetectorConfig,
    },
    Configured {
        config: DetectorConfig,
    },
    /// Fired on every processed tick.
    Volume(TickDetail),
    Mute(TickDetail),
    MicOpened(TickDetail),
    MicClosed(TickDetail),
    SegmentStart {
        #[serde(rename = "segmentId")]
        segment_id: SegmentId,
        #[serde(flatten)]
        detail: TickDetail,
    },
    Signal(TickDetail),
    Silence(TickDetail),
    SegmentEnd {
        #[serde(rename = "segmentId")]
        segment_id: SegmentId,
        #[serde(flatten)]
        detail: TickDetail,
        #[serde(rename = "activeDurationMs")]
        active_duration_ms: i64,
        #[serde(rename = "averageVolume")]
        average_volume: f32,
    },
    SegmentAbort {
        #[serde(rename = "segmentId")]
        segment_id: SegmentId,
        #[serde(flatten)]
        detail: TickDetail,
        #[serde(rename = "activeDurationMs")]
        active_duration_ms: i64,
        #[serde(rename = "averageVolume")]
        average_volume: f32,
    },
    PreRoll(TickDetail),
    DetectorStart {},
    DetectorResume {},
    DetectorStop {
        /// Segment that was open when the detector stopped, if any.
        #[serde(rename = "cutSegment", skip_serializing_if = "Option::is_none")]
        cut_segment: Option<SegmentId>,
    },
    RecorderStart {
        #[serde(rename = "segmentId")]
        segment_id: SegmentId,
    },
    RecorderStop {
        #[serde(rename = "segmentId")]
        segment_id: SegmentId,
    },
    PipelineResume {},
    PipelineSuspend {},
    /// A recorded chunk accepted as speech. `data` is base64.
    Speech {
        #[serde(rename = "segmentId")]
        segment_id: SegmentId,
        data: String,
    },
    ChunkDropped {
        #[serde(rename = "segmentId")]
        segment_id: SegmentId,
        bytes: usize,
    },
    Error {
        message: String,
    },
    Pong {},
    Stopping {},
}

// ---------------------------------------------------------------------------
// Commands: host -> detector (stdin)
// ---------------------------------------------------------------------------

/// All commands received from the host via stdin as JSON lines.
///
/// Deserialized from `{"command": "<variant>", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    /// One loudness sample from the host's meter.
    Tick {
        volume: f32,
        #[serde(default)]
        timestamp: Option<Timestamp>,
    },
    /// Raw mono PCM frame; loudness is computed here.
    Samples {
        samples: Vec<f32>,
        #[serde(default)]
        timestamp: Option<Timestamp>,
    },
    /// Data produced by the host's recorder for a segment. `data` is base64.
    Chunk {
        #[serde(alias = "segmentId")]
        segment_id: SegmentId,
        data: String,
    },
    Start {},
    Resume {},
    Stop {},
    SetRecordingEnabled {
        enabled: bool,
    },
    Configure {
        config: DetectorConfig,
    },
    Ping {},
    Shutdown {},
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_event_shape() {
        let event = DetectorEvent::Signal(TickDetail::new(0.05, 1_000, Some(50)).with_items(2));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "signal");
        assert_eq!(json["data"]["timestamp"], 1_000);
        assert_eq!(json["data"]["duration"], 50);
        assert_eq!(json["data"]["items"], 2);
        assert!(json["data"].get("reason").is_none());
    }

    #[test]
    fn test_abort_event_flattens_detail() {
        let event = DetectorEvent::SegmentAbort {
            segment_id: SegmentId(3),
            detail: TickDetail::new(0.01, 2_000, Some(700)).with_reason("too short"),
            active_duration_ms: 100,
            average_volume: 0.05,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "segment_abort");
        assert_eq!(json["data"]["segmentId"], 3);
        assert_eq!(json["data"]["reason"], "too short");
        assert_eq!(json["data"]["activeDurationMs"], 100);
    }

    #[test]
    fn test_parse_commands() {
        let cmd: HostCommand = serde_json::from_str(r#"{"command":"tick","volume":0.3}"#).unwrap();
        assert!(matches!(cmd, HostCommand::Tick { timestamp: None, .. }));

        let cmd: HostCommand =
            serde_json::from_str(r#"{"command":"chunk","segmentId":4,"data":"AAEC"}"#).unwrap();
        assert!(matches!(cmd, HostCommand::Chunk { segment_id: SegmentId(4), .. }));

        let cmd: HostCommand =
            serde_json::from_str(r#"{"command":"set_recording_enabled","enabled":false}"#).unwrap();
        assert!(matches!(cmd, HostCommand::SetRecordingEnabled { enabled: false }));

        let cmd: HostCommand =
            serde_json::from_str(r#"{"command":"configure","config":{"minSegmentDurationMs":250}}"#)
                .unwrap();
        match cmd {
            HostCommand::Configure { config } => assert_eq!(config.min_segment_duration_ms, 250),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
