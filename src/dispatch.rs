//! Turns segment lifecycle decisions into sink commands and gates the chunks
//! the sink produces.
//!
//! Every recorder command carries the id of its segment, and so does every
//! chunk coming back. A chunk is dropped when its segment was aborted, no
//! matter how late it arrives.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::DetectorError;
use crate::sink::{AudioPipeline, RecordedChunk, RecordingSink};
use crate::vad::SegmentId;

/// How many aborted segment ids are remembered for chunk suppression.
const ABORTED_HISTORY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkDecision {
    Forward,
    Suppress,
}

pub struct Dispatcher<S, P> {
    sink: S,
    pipeline: P,
    aborted: VecDeque<SegmentId>,
}

impl<S: RecordingSink, P: AudioPipeline> Dispatcher<S, P> {
    pub fn new(sink: S, pipeline: P) -> Self {
        Self {
            sink,
            pipeline,
            aborted: VecDeque::with_capacity(ABORTED_HISTORY),
        }
    }

    /// Segment opened: start recording and make sure audio flows.
    pub fn segment_started(&mut self, id: SegmentId) -> Vec<DetectorError> {
        let mut faults = Vec::new();
        if let Err(e) = self.sink.start(id) {
            faults.push(DetectorError::sink("recorder start", e));
        }
        if let Err(e) = self.pipeline.resume() {
            faults.push(DetectorError::sink("pipeline resume", e));
        }
        report(faults)
    }

    /// Segment judged valid: stop recording, keep its chunks.
    pub fn segment_ended(&mut self, id: SegmentId) -> Vec<DetectorError> {
        outcome("recorder stop", self.sink.stop(id))
    }

    /// Segment aborted, or cut short by a detector stop: stop recording and
    /// drop its chunks.
    pub fn segment_aborted(&mut self, id: SegmentId) -> Vec<DetectorError> {
        self.mark_aborted(id);
        outcome("recorder stop", self.sink.stop(id))
    }

    pub fn resume_pipeline(&mut self) -> Vec<DetectorError> {
        outcome("pipeline resume", self.pipeline.resume())
    }

    pub fn suspend_pipeline(&mut self) -> Vec<DetectorError> {
        outcome("pipeline suspend", self.pipeline.suspend())
    }

    pub fn accept_chunk(&self, chunk: &RecordedChunk) -> ChunkDecision {
        if self.aborted.contains(&chunk.segment_id) {
            debug!(
                segment = %chunk.segment_id,
                bytes = chunk.data.len(),
                "Dropping chunk of aborted segment"
            );
            ChunkDecision::Suppress
        } else {
            ChunkDecision::Forward
        }
    }

    fn mark_aborted(&mut self, id: SegmentId) {
        if self.aborted.len() == ABORTED_HISTORY {
            self.aborted.pop_front();
        }
        self.aborted.push_back(id);
    }
}

fn outcome(command: &'static str, result: anyhow::Result<()>) -> Vec<DetectorError> {
    let faults = result
        .err()
        .map(|e| DetectorError::sink(command, e))
        .into_iter()
        .collect();
    report(faults)
}

fn report(faults: Vec<DetectorError>) -> Vec<DetectorError> {
    for fault in &faults {
        warn!("Sink command failed: {}", fault);
    }
    faults
}
