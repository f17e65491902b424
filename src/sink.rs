//! Recording sink and audio pipeline seams.
//!
//! The detector never touches audio devices. It issues start/stop commands to
//! a `RecordingSink` and resume/suspend to an `AudioPipeline`; the host owns
//! the real recorder and reports the recorded chunks back.

use tracing::debug;

use crate::ipc::DetectorEvent;
use crate::vad::SegmentId;

/// Captures raw audio for one segment at a time.
pub trait RecordingSink {
    fn start(&mut self, segment: SegmentId) -> anyhow::Result<()>;
    fn stop(&mut self, segment: SegmentId) -> anyhow::Result<()>;
}

/// The audio graph feeding both the meter and the recorder.
pub trait AudioPipeline {
    fn resume(&mut self) -> anyhow::Result<()>;
    fn suspend(&mut self) -> anyhow::Result<()>;
}

/// Data the recorder produced for a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedChunk {
    pub segment_id: SegmentId,
    pub data: Vec<u8>,
}

type Emit = Box<dyn FnMut(&DetectorEvent) + Send>;

/// Recorder driven by the host: commands go out as `recorder_start` /
/// `recorder_stop` events.
pub struct IpcRecorder {
    emit: Emit,
    active: Option<SegmentId>,
}

impl IpcRecorder {
    pub fn new(emit: impl FnMut(&DetectorEvent) + Send + 'static) -> Self {
        Self {
            emit: Box::new(emit),
            active: None,
        }
    }
}

impl RecordingSink for IpcRecorder {
    fn start(&mut self, segment: SegmentId) -> anyhow::Result<()> {
        if let Some(active) = self.active {
            anyhow::bail!("recorder already started for segment {}", active);
        }
        self.active = Some(segment);
        (self.emit)(&DetectorEvent::RecorderStart {
            segment_id: segment,
        });
        Ok(())
    }

    fn stop(&mut self, segment: SegmentId) -> anyhow::Result<()> {
        if self.active.take().is_none() {
            debug!(%segment, "Recorder stop without an active recording");
            return Ok(());
        }
        (self.emit)(&DetectorEvent::RecorderStop {
            segment_id: segment,
        });
        Ok(())
    }
}

/// Host-side audio pipeline, toggled via `pipeline_resume` /
/// `pipeline_suspend` events.
pub struct IpcPipeline {
    emit: Emit,
}

impl IpcPipeline {
    pub fn new(emit: impl FnMut(&DetectorEvent) + Send + 'static) -> Self {
        Self {
            emit: Box::new(emit),
        }
    }
}

impl AudioPipeline for IpcPipeline {
    fn resume(&mut self) -> anyhow::Result<()> {
        (self.emit)(&DetectorEvent::PipelineResume {});
        Ok(())
    }

    fn suspend(&mut self) -> anyhow::Result<()> {
        (self.emit)(&DetectorEvent::PipelineSuspend {});
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn capture() -> (Arc<Mutex<Vec<DetectorEvent>>>, impl FnMut(&DetectorEvent) + Send) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |e: &DetectorEvent| sink.lock().unwrap().push(e.clone()))
    }

    #[test]
    fn test_ipc_recorder_emits_commands() {
        let (events, emit) = capture();
        let mut recorder = IpcRecorder::new(emit);
        recorder.start(SegmentId(1)).unwrap();
        recorder.stop(SegmentId(1)).unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                DetectorEvent::RecorderStart {
                    segment_id: SegmentId(1)
                },
                DetectorEvent::RecorderStop {
                    segment_id: SegmentId(1)
                },
            ]
        );
    }

    #[test]
    fn test_ipc_recorder_rejects_double_start() {
        let (events, emit) = capture();
        let mut recorder = IpcRecorder::new(emit);
        recorder.start(SegmentId(1)).unwrap();
        let err = recorder.start(SegmentId(2)).unwrap_err();
        assert!(err.to_string().contains("already started"));
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_ipc_recorder_stop_without_start_is_noop() {
        let (events, emit) = capture();
        let mut recorder = IpcRecorder::new(emit);
        recorder.stop(SegmentId(7)).unwrap();
        assert!(events.lock().unwrap().is_empty());
    }
}
