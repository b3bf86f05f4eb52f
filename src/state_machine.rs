//! Four-state speech-presence state machine.
//!
//! Consumes one `AnalyzedSegment` per pipeline step and decides whether a
//! speech recording should start, continue, merge across a brief gap, or
//! finalize. Long-term and short-term rolling averages of the speech-band
//! energy decide "loud enough"; a channel-volume-ratio rolling average
//! gates out segments where one channel is far louder than the others
//! (engine noise bleeding into a single mic rather than someone talking).

use crate::constants::{
    DEFAULT_CHANNEL_VOL_RATIO_AVG_SEC, DEFAULT_CHANNEL_VOL_RATIO_THRESHOLD,
    DEFAULT_INITIAL_LONG_TERM_AVG, DEFAULT_LONG_TERM_SPEECH_AVG_SEC, DEFAULT_MAX_SPEECH_GAP_SEC,
    DEFAULT_MIN_CONSECUTIVE_SEC_TO_OPEN, DEFAULT_MIN_VAD_DURATION_SEC,
    DEFAULT_SHORT_TERM_SPEECH_AVG_SEC, DEFAULT_SPEECH_MAX_FREQ, DEFAULT_SPEECH_MIN_FREQ,
    DEFAULT_SPEECH_THRESHOLD_FACTOR,
};
use crate::error::VadError;
use crate::rolling_average::RollingAverage;

/// One window's worth of pre-analysis the pipeline orchestrator hands to the
/// state machine: everything needed to decide speech presence, already
/// reduced across channels.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzedSegment {
    pub start_index: u64,
    pub end_index: u64,
    pub speech_band_energy: f64,
    pub volume_ratio: f64,
    /// Multichannel-minimum RNNoise VAD likelihood, if the denoiser is enabled.
    pub rnn_vad: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// A finalized speech recording decision, with the bookkeeping averages
/// accumulated across its lifetime (spec.md §9: useful for offline tuning,
/// not something the recorder itself needs).
#[derive(Debug, Clone, Copy)]
pub struct VadSegment {
    pub start_index: u64,
    pub end_index: u64,
    pub avg_rnn_vad: Option<f64>,
    pub avg_volume_ratio: f64,
}

/// What the state machine wants the recorder to do as a result of this
/// evaluation. `None` means "no change".
#[derive(Debug, Clone, Copy)]
pub enum RecordingDecision {
    None,
    Started { at_index: u64 },
    Completed(VadSegment),
    Aborted,
}

#[derive(Debug, Clone)]
pub struct VadMachineConfig {
    pub speech_min_freq: f32,
    pub speech_max_freq: f32,
    pub long_term_speech_avg_sec: f64,
    pub initial_long_term_avg: f64,
    pub short_term_speech_avg_sec: f64,
    pub speech_threshold_factor: f64,
    pub channel_vol_ratio_avg_sec: f64,
    pub channel_vol_ratio_threshold: f64,
    pub min_consecutive_sec_to_open: f64,
    pub max_speech_gap_sec: f64,
    pub min_vad_duration_sec: f64,
}

impl Default for VadMachineConfig {
    fn default() -> Self {
        VadMachineConfig {
            speech_min_freq: DEFAULT_SPEECH_MIN_FREQ,
            speech_max_freq: DEFAULT_SPEECH_MAX_FREQ,
            long_term_speech_avg_sec: DEFAULT_LONG_TERM_SPEECH_AVG_SEC,
            initial_long_term_avg: DEFAULT_INITIAL_LONG_TERM_AVG,
            short_term_speech_avg_sec: DEFAULT_SHORT_TERM_SPEECH_AVG_SEC,
            speech_threshold_factor: DEFAULT_SPEECH_THRESHOLD_FACTOR,
            channel_vol_ratio_avg_sec: DEFAULT_CHANNEL_VOL_RATIO_AVG_SEC,
            channel_vol_ratio_threshold: DEFAULT_CHANNEL_VOL_RATIO_THRESHOLD,
            min_consecutive_sec_to_open: DEFAULT_MIN_CONSECUTIVE_SEC_TO_OPEN,
            max_speech_gap_sec: DEFAULT_MAX_SPEECH_GAP_SEC,
            min_vad_duration_sec: DEFAULT_MIN_VAD_DURATION_SEC,
        }
    }
}

impl VadMachineConfig {
    fn validate(&self) -> Result<(), VadError> {
        if self.speech_min_freq < 0.0 || self.speech_max_freq <= self.speech_min_freq {
            return Err(VadError::ConfigInvalid(
                "speech_min_freq must be non-negative and less than speech_max_freq".into(),
            ));
        }
        if self.speech_threshold_factor <= 0.0 {
            return Err(VadError::ConfigInvalid(
                "speech_threshold_factor must be positive".into(),
            ));
        }
        Ok(())
    }
}

struct Segments {
    /// How many samples a segment (one pipeline step) spans, for converting
    /// second-denominated config values into sample counts.
    segment_samples: u64,
}

impl Segments {
    fn to_samples(&self, sec: f64) -> u64 {
        (sec * self.segment_samples as f64).max(0.0) as u64
    }
}

pub struct VadStateMachine {
    config: VadMachineConfig,
    segments: Segments,
    long_term: RollingAverage,
    short_term: RollingAverage,
    channel_ratio: RollingAverage,

    state: SpeechState,
    opening_since: u64,
    consecutive_since_opening: u64,
    speech_start: u64,
    last_active_end: u64,
    gap_start: u64,

    rnn_vad_sum: f64,
    rnn_vad_count: u64,
    volume_ratio_sum: f64,
    volume_ratio_count: u64,
}

impl VadStateMachine {
    /// `samples_per_segment` is how many samples one `AnalyzedSegment` spans
    /// (typically the FFT size); it is used to translate the config's
    /// second-denominated windows into rolling-average window lengths.
    pub fn new(
        config: VadMachineConfig,
        sample_rate: u32,
        samples_per_segment: usize,
    ) -> Result<Self, VadError> {
        config.validate()?;
        if samples_per_segment == 0 {
            return Err(VadError::ConfigInvalid(
                "samples_per_segment must be non-zero".into(),
            ));
        }

        let segment_duration_sec = samples_per_segment as f64 / sample_rate as f64;
        let window_segments =
            |sec: f64| ((sec / segment_duration_sec).round() as usize).max(1);

        let long_window = window_segments(config.long_term_speech_avg_sec);
        let short_window = window_segments(config.short_term_speech_avg_sec);
        let ratio_window = window_segments(config.channel_vol_ratio_avg_sec);

        Ok(VadStateMachine {
            long_term: RollingAverage::with_seed(long_window, config.initial_long_term_avg),
            short_term: RollingAverage::new(short_window),
            channel_ratio: RollingAverage::new(ratio_window),
            segments: Segments { segment_samples: samples_per_segment as u64 },
            config,
            state: SpeechState::Closed,
            opening_since: 0,
            consecutive_since_opening: 0,
            speech_start: 0,
            last_active_end: 0,
            gap_start: 0,
            rnn_vad_sum: 0.0,
            rnn_vad_count: 0,
            volume_ratio_sum: 0.0,
            volume_ratio_count: 0,
        })
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    pub fn evaluate(&mut self, analyzed: &AnalyzedSegment) -> RecordingDecision {
        let long_avg = self.long_term.push(analyzed.speech_band_energy);
        let short_avg = self.short_term.push(analyzed.speech_band_energy);
        let ratio_avg = self.channel_ratio.push(analyzed.volume_ratio);

        let is_loud = short_avg > long_avg * self.config.speech_threshold_factor;
        let is_channel_consistent = ratio_avg >= self.config.channel_vol_ratio_threshold;
        let is_rnn_speech = analyzed.rnn_vad.map_or(true, |v| v >= 0.5);
        let candidate = is_loud && is_channel_consistent && is_rnn_speech;

        let min_open_samples = self.segments.to_samples(self.config.min_consecutive_sec_to_open);
        let max_gap_samples = self.segments.to_samples(self.config.max_speech_gap_sec);
        let min_duration_samples = self.segments.to_samples(self.config.min_vad_duration_sec);

        match self.state {
            SpeechState::Closed => {
                if candidate {
                    self.state = SpeechState::Opening;
                    self.opening_since = analyzed.start_index;
                    self.consecutive_since_opening = analyzed.end_index - analyzed.start_index;
                    self.reset_bookkeeping();
                    self.accumulate_bookkeeping(analyzed);

                    if self.consecutive_since_opening >= min_open_samples {
                        self.state = SpeechState::Open;
                        self.speech_start = self.opening_since;
                        self.last_active_end = analyzed.end_index;
                        return RecordingDecision::Started { at_index: self.speech_start };
                    }
                }
                RecordingDecision::None
            }

            SpeechState::Opening => {
                if candidate {
                    self.consecutive_since_opening += analyzed.end_index - analyzed.start_index;
                    self.accumulate_bookkeeping(analyzed);

                    if self.consecutive_since_opening >= min_open_samples {
                        self.state = SpeechState::Open;
                        self.speech_start = self.opening_since;
                        self.last_active_end = analyzed.end_index;
                        return RecordingDecision::Started { at_index: self.speech_start };
                    }
                    RecordingDecision::None
                } else {
                    self.state = SpeechState::Closed;
                    RecordingDecision::None
                }
            }

            SpeechState::Open => {
                self.accumulate_bookkeeping(analyzed);
                if candidate {
                    self.last_active_end = analyzed.end_index;
                    RecordingDecision::None
                } else {
                    self.state = SpeechState::Closing;
                    self.gap_start = analyzed.start_index;
                    RecordingDecision::None
                }
            }

            SpeechState::Closing => {
                self.accumulate_bookkeeping(analyzed);
                if candidate {
                    self.state = SpeechState::Open;
                    self.last_active_end = analyzed.end_index;
                    RecordingDecision::None
                } else if analyzed.end_index - self.gap_start >= max_gap_samples {
                    self.state = SpeechState::Closed;
                    let duration = self.last_active_end - self.speech_start;
                    if duration >= min_duration_samples {
                        let segment = self.finalize_segment();
                        RecordingDecision::Completed(segment)
                    } else {
                        RecordingDecision::Aborted
                    }
                } else {
                    RecordingDecision::None
                }
            }
        }
    }

    fn reset_bookkeeping(&mut self) {
        self.rnn_vad_sum = 0.0;
        self.rnn_vad_count = 0;
        self.volume_ratio_sum = 0.0;
        self.volume_ratio_count = 0;
    }

    fn accumulate_bookkeeping(&mut self, analyzed: &AnalyzedSegment) {
        if let Some(v) = analyzed.rnn_vad {
            self.rnn_vad_sum += v;
            self.rnn_vad_count += 1;
        }
        self.volume_ratio_sum += analyzed.volume_ratio;
        self.volume_ratio_count += 1;
    }

    fn finalize_segment(&mut self) -> VadSegment {
        let avg_rnn_vad = if self.rnn_vad_count > 0 {
            Some(self.rnn_vad_sum / self.rnn_vad_count as f64)
        } else {
            None
        };
        let avg_volume_ratio = if self.volume_ratio_count > 0 {
            self.volume_ratio_sum / self.volume_ratio_count as f64
        } else {
            0.0
        };

        VadSegment {
            start_index: self.speech_start,
            end_index: self.last_active_end,
            avg_rnn_vad,
            avg_volume_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_segment(start: u64, len: u64) -> AnalyzedSegment {
        AnalyzedSegment {
            start_index: start,
            end_index: start + len,
            speech_band_energy: 1.0,
            volume_ratio: 1.0,
            rnn_vad: Some(0.9),
        }
    }

    fn quiet_segment(start: u64, len: u64) -> AnalyzedSegment {
        AnalyzedSegment {
            start_index: start,
            end_index: start + len,
            speech_band_energy: 0.0001,
            volume_ratio: 1.0,
            rnn_vad: Some(0.0),
        }
    }

    fn test_machine() -> VadStateMachine {
        let config = VadMachineConfig {
            min_consecutive_sec_to_open: 0.01,
            max_speech_gap_sec: 0.05,
            min_vad_duration_sec: 0.02,
            initial_long_term_avg: 0.0001,
            long_term_speech_avg_sec: 1.0,
            short_term_speech_avg_sec: 0.01,
            channel_vol_ratio_avg_sec: 0.01,
            ..VadMachineConfig::default()
        };
        // 480 samples/segment at 48kHz == 0.01s per segment.
        VadStateMachine::new(config, 48_000, 480).unwrap()
    }

    #[test]
    fn silence_only_produces_no_decision() {
        let mut machine = test_machine();
        for i in 0..20 {
            let decision = machine.evaluate(&quiet_segment(i * 480, 480));
            assert!(matches!(decision, RecordingDecision::None));
        }
        assert_eq!(machine.state(), SpeechState::Closed);
    }

    #[test]
    fn sustained_speech_opens_and_then_completes_after_gap() {
        let mut machine = test_machine();
        let mut started = false;
        for i in 0..5 {
            if let RecordingDecision::Started { .. } = machine.evaluate(&loud_segment(i * 480, 480)) {
                started = true;
            }
        }
        assert!(started, "sustained loud segments should open a recording");
        assert_eq!(machine.state(), SpeechState::Open);

        // A gap long enough to exceed max_speech_gap_sec should complete it.
        let mut completed = false;
        for i in 5..20 {
            if let RecordingDecision::Completed(_) = machine.evaluate(&quiet_segment(i * 480, 480)) {
                completed = true;
                break;
            }
        }
        assert!(completed, "gap beyond max_speech_gap_sec should finalize the segment");
        assert_eq!(machine.state(), SpeechState::Closed);
    }

    #[test]
    fn brief_dropout_merges_rather_than_closes() {
        let mut machine = test_machine();
        for i in 0..5 {
            machine.evaluate(&loud_segment(i * 480, 480));
        }
        assert_eq!(machine.state(), SpeechState::Open);

        // One quiet segment, well under max_speech_gap_sec, should move to
        // Closing without finalizing.
        let decision = machine.evaluate(&quiet_segment(5 * 480, 480));
        assert!(matches!(decision, RecordingDecision::None));
        assert_eq!(machine.state(), SpeechState::Closing);

        // Speech resumes before the gap threshold — merges back to Open.
        machine.evaluate(&loud_segment(6 * 480, 480));
        assert_eq!(machine.state(), SpeechState::Open);
    }

    #[test]
    fn too_short_burst_is_discarded() {
        let config = VadMachineConfig {
            min_consecutive_sec_to_open: 0.001,
            max_speech_gap_sec: 0.01,
            min_vad_duration_sec: 1.0,
            initial_long_term_avg: 0.0001,
            long_term_speech_avg_sec: 1.0,
            short_term_speech_avg_sec: 0.01,
            channel_vol_ratio_avg_sec: 0.01,
            ..VadMachineConfig::default()
        };
        let mut machine = VadStateMachine::new(config, 48_000, 480).unwrap();

        machine.evaluate(&loud_segment(0, 480));
        assert_eq!(machine.state(), SpeechState::Open);

        let mut aborted = false;
        for i in 1..10 {
            if let RecordingDecision::Aborted = machine.evaluate(&quiet_segment(i * 480, 480)) {
                aborted = true;
                break;
            }
        }
        assert!(aborted, "a burst shorter than min_vad_duration_sec should abort, not complete");
    }
}
