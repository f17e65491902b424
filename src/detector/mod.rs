//! The speech detector session.
//!
//! One `SpeechDetector` consumes one volume sample per tick, runs it through
//! the classifier, the transition tracker, the pre-roll notifier and the
//! segment tracker, and returns the events the host should see. Recorder and
//! pipeline commands are issued through the dispatcher as a side effect of
//! segment boundaries and session controls.

mod state;

pub use state::RuntimeState;

use base64::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::config::DetectorConfig;
use crate::dispatch::{ChunkDecision, Dispatcher};
use crate::error::DetectorError;
use crate::ipc::{DetectorEvent, TickDetail};
use crate::sink::{AudioPipeline, RecordedChunk, RecordingSink};
use crate::vad::{
    classify, MicTransition, SegmentId, SegmentVerdict, Timestamp, Verdict, VolumeLevel,
};

pub struct SpeechDetector<S, P> {
    config: DetectorConfig,
    state: RuntimeState,
    dispatcher: Dispatcher<S, P>,
}

impl<S: RecordingSink, P: AudioPipeline> SpeechDetector<S, P> {
    pub fn new(config: DetectorConfig, sink: S, pipeline: P) -> Self {
        for warning in config.threshold_warnings() {
            warn!("{}", warning);
        }
        Self {
            state: RuntimeState::new(&config),
            dispatcher: Dispatcher::new(sink, pipeline),
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn is_recording_enabled(&self) -> bool {
        self.state.recording_enabled
    }

    pub fn open_segment(&self) -> Option<SegmentId> {
        self.state.segments.open_segment()
    }

    pub fn current_volume(&self) -> f32 {
        self.state.current_volume
    }

    /// Last classified level.
    pub fn level(&self) -> VolumeLevel {
        self.state.transitions.level()
    }

    /// Replace the configuration. Only allowed before the first tick.
    ///
    /// The recording gate and pipeline state carry over: once the host has
    /// started, stopped or overridden the gate, `recordingEnabled` from the
    /// new config does not undo it.
    pub fn reconfigure(&mut self, config: DetectorConfig) -> Result<(), DetectorError> {
        if self.state.ticks_processed > 0 {
            return Err(DetectorError::ConfigLocked);
        }
        for warning in config.threshold_warnings() {
            warn!("{}", warning);
        }
        let previous = std::mem::replace(&mut self.state, RuntimeState::new(&config));
        if previous.gate_overridden {
            self.state.recording_enabled = previous.recording_enabled;
            self.state.gate_overridden = true;
        }
        self.state.pipeline_running = previous.pipeline_running;
        self.config = config;
        info!(config = ?self.config, "Detector reconfigured");
        Ok(())
    }

    /// Process one volume sample taken at `now` (epoch milliseconds).
    ///
    /// Ticks are ignored while recording is disabled. Invalid samples are
    /// rejected without touching any state.
    pub fn tick(
        &mut self,
        volume: f32,
        now: Timestamp,
    ) -> Result<Vec<DetectorEvent>, DetectorError> {
        if !self.state.recording_enabled {
            trace!(volume, "Recording disabled, tick ignored");
            return Ok(Vec::new());
        }
        if !volume.is_finite() || volume < 0.0 {
            warn!(volume, "Rejecting invalid volume sample");
            return Err(DetectorError::InvalidVolume(volume));
        }

        self.state.current_volume = volume;
        self.state.ticks_processed += 1;
        let mut events = Vec::new();

        if let Some(items) = self.state.pre_roll.tick(self.state.segments.is_open()) {
            debug!(items, "Pre-roll hint");
            events.push(DetectorEvent::PreRoll(self.detail(now).with_items(items)));
        }

        let level = classify(volume, &self.config);
        events.push(DetectorEvent::Volume(self.detail(now)));
        let transition = self.state.transitions.observe(level);

        match level {
            VolumeLevel::Mute => {
                events.push(DetectorEvent::Mute(self.detail(now)));
                if transition == Some(MicTransition::Closed) {
                    debug!("Mic closed");
                    events.push(DetectorEvent::MicClosed(self.detail(now)));
                }
            }
            VolumeLevel::Signal | VolumeLevel::Silence => {
                if transition == Some(MicTransition::Opened) {
                    debug!(%level, "Mic opened");
                    events.push(DetectorEvent::MicOpened(self.detail(now)));
                }
                if level == VolumeLevel::Signal {
                    self.on_signal(volume, now, &mut events);
                } else {
                    self.on_silence(now, &mut events);
                }
            }
        }

        Ok(events)
    }

    fn detail(&self, now: Timestamp) -> TickDetail {
        TickDetail::new(
            self.state.current_volume,
            now,
            self.state.segments.elapsed_since_start(now),
        )
    }

    fn on_signal(&mut self, volume: f32, now: Timestamp, events: &mut Vec<DetectorEvent>) {
        let step = self.state.segments.on_signal(volume, now);
        if let Some(id) = step.opened {
            info!(segment = %id, volume, "Segment started");
            let faults = self.dispatcher.segment_started(id);
            self.state.pipeline_running = true;
            events.push(DetectorEvent::SegmentStart {
                segment_id: id,
                detail: self.detail(now).with_items(step.items),
            });
            push_faults(events, faults);
        }
        events.push(DetectorEvent::Signal(self.detail(now).with_items(step.items)));
    }

    fn on_silence(&mut self, now: Timestamp, events: &mut Vec<DetectorEvent>) {
        let step = self.state.segments.on_silence(now);
        events.push(DetectorEvent::Silence(self.detail(now).with_items(step.items)));
        if let Some(verdict) = step.verdict {
            self.conclude(verdict, now, events);
        }
    }

    fn conclude(&mut self, v: SegmentVerdict, now: Timestamp, events: &mut Vec<DetectorEvent>) {
        let detail = self.detail(now);
        match v.verdict {
            Verdict::Valid => {
                info!(
                    segment = %v.id,
                    active_duration_ms = v.active_duration_ms,
                    average_volume = v.average_volume,
                    "Segment ended"
                );
                let faults = self.dispatcher.segment_ended(v.id);
                events.push(DetectorEvent::SegmentEnd {
                    segment_id: v.id,
                    detail,
                    active_duration_ms: v.active_duration_ms,
                    average_volume: v.average_volume,
                });
                push_faults(events, faults);
            }
            Verdict::Abort(reason) => {
                info!(
                    segment = %v.id,
                    %reason,
                    active_duration_ms = v.active_duration_ms,
                    average_volume = v.average_volume,
                    "Segment aborted"
                );
                let faults = self.dispatcher.segment_aborted(v.id);
                events.push(DetectorEvent::SegmentAbort {
                    segment_id: v.id,
                    detail: detail.with_reason(reason.to_string()),
                    active_duration_ms: v.active_duration_ms,
                    average_volume: v.average_volume,
                });
                push_faults(events, faults);
            }
        }
    }

    /// Enable ticks and resume the audio pipeline. No-op when already running.
    pub fn start(&mut self) -> Vec<DetectorEvent> {
        self.enable("start", DetectorEvent::DetectorStart {})
    }

    /// Same effect as `start`, announced as a resume.
    pub fn resume(&mut self) -> Vec<DetectorEvent> {
        self.enable("resume", DetectorEvent::DetectorResume {})
    }

    fn enable(&mut self, control: &'static str, announce: DetectorEvent) -> Vec<DetectorEvent> {
        if self.state.recording_enabled && self.state.pipeline_running {
            debug!(control, "Detector already running");
            return Vec::new();
        }
        self.state.recording_enabled = true;
        self.state.gate_overridden = true;
        let faults = self.dispatcher.resume_pipeline();
        self.state.pipeline_running = true;
        info!(control, "Detector running");

        let mut events = vec![announce];
        push_faults(&mut events, faults);
        events
    }

    /// Disable ticks and suspend the pipeline. An open segment is cut without
    /// a verdict and its chunks are dropped.
    pub fn stop(&mut self) -> Vec<DetectorEvent> {
        if !self.state.recording_enabled
            && !self.state.pipeline_running
            && !self.state.segments.is_open()
        {
            debug!("Detector already stopped");
            return Vec::new();
        }
        self.state.recording_enabled = false;
        self.state.gate_overridden = true;
        let mut faults = self.dispatcher.suspend_pipeline();
        self.state.pipeline_running = false;

        let cut_segment = self.state.segments.close_without_verdict();
        if let Some(id) = cut_segment {
            info!(segment = %id, "Segment cut by detector stop");
            faults.extend(self.dispatcher.segment_aborted(id));
        }
        info!("Detector stopped");

        let mut events = vec![DetectorEvent::DetectorStop { cut_segment }];
        push_faults(&mut events, faults);
        events
    }

    /// Host override of the recording gate. Takes effect on the next tick.
    pub fn set_recording_enabled(&mut self, enabled: bool) {
        debug!(enabled, "Recording gate set");
        self.state.recording_enabled = enabled;
        self.state.gate_overridden = true;
    }

    /// Gate a chunk produced by the recorder.
    pub fn on_chunk(&mut self, chunk: RecordedChunk) -> DetectorEvent {
        match self.dispatcher.accept_chunk(&chunk) {
            ChunkDecision::Forward => DetectorEvent::Speech {
                segment_id: chunk.segment_id,
                data: BASE64_STANDARD.encode(&chunk.data),
            },
            ChunkDecision::Suppress => DetectorEvent::ChunkDropped {
                segment_id: chunk.segment_id,
                bytes: chunk.data.len(),
            },
        }
    }
}

fn push_faults(events: &mut Vec<DetectorEvent>, faults: Vec<DetectorError>) {
    events.extend(faults.into_iter().map(|fault| DetectorEvent::Error {
        message: fault.to_string(),
    }));
}
