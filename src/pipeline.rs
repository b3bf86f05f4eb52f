//! Per-window VAD orchestration: pulls one analysis window out of the ring
//! buffer, reduces it to the handful of numbers the state machine needs, and
//! feeds the resulting decision to the recorder.
//!
//! Steps per spec.md §4.6:
//!   A. read the next fixed-size window from the ring buffer
//!   B. per-channel RMS, reduced to a channel-volume ratio
//!   C. per-channel FFT, reduced to a speech-band energy average
//!   D. optional per-channel denoising, reduced to a multichannel-minimum
//!      VAD likelihood
//!   E. feed the reduced `AnalyzedSegment` to the primary state machine and
//!      any alternates (alternates affect only their own recorded segment
//!      lists, never the recorder — SPEC_FULL.md §9)
//!   F. drive the recorder from the primary machine's decision, respecting
//!      lookbehind/lookahead padding

use crate::denoiser::Denoiser;
use crate::error::VadError;
use crate::fft::{average_volume_in_band, FftProcessor};
use crate::recorder::{AudioBuffer, Recorder};
use crate::ring_buffer::MultiRingBuffer;
use crate::segment::Segment;
use crate::state_machine::{AnalyzedSegment, RecordingDecision, VadMachineConfig, VadSegment, VadStateMachine};

use log::{trace, warn};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sample_rate: u32,
    pub n_channels: usize,
    pub fft_size: usize,
    pub use_denoiser: bool,
    pub vad_machine_config: VadMachineConfig,
    pub alt_vad_machine_configs: Vec<VadMachineConfig>,
    pub lookbehind_sec: f64,
    pub lookahead_sec: f64,
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), VadError> {
        if self.n_channels == 0 {
            return Err(VadError::ConfigInvalid("n_channels must be non-zero".into()));
        }
        if self.fft_size < crate::constants::DENOISER_FRAME_SIZE && self.use_denoiser {
            return Err(VadError::ConfigInvalid(
                "fft_size must be at least one denoiser frame when the denoiser is enabled".into(),
            ));
        }
        Ok(())
    }
}

pub struct VadPipeline {
    config: PipelineConfig,
    fft_procs: Vec<FftProcessor>,
    denoiser: Option<Denoiser>,
    machine: VadStateMachine,
    alt_machines: Vec<VadStateMachine>,
    alt_segments: Vec<Vec<VadSegment>>,
    recorder: Recorder,
    lookbehind_samples: u64,
    lookahead_samples: u64,
    pending_finalize_at: Option<u64>,
    pending_segment: Option<VadSegment>,
}

impl VadPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, VadError> {
        config.validate()?;

        let fft_procs = (0..config.n_channels)
            .map(|_| FftProcessor::new(config.fft_size, config.sample_rate))
            .collect::<Result<Vec<_>, _>>()?;

        let denoiser = if config.use_denoiser {
            Some(Denoiser::new(config.n_channels)?)
        } else {
            None
        };

        let machine = VadStateMachine::new(
            config.vad_machine_config.clone(),
            config.sample_rate,
            config.fft_size,
        )?;
        let alt_machines = config
            .alt_vad_machine_configs
            .iter()
            .map(|c| VadStateMachine::new(c.clone(), config.sample_rate, config.fft_size))
            .collect::<Result<Vec<_>, _>>()?;
        let alt_segments = vec![Vec::new(); alt_machines.len()];

        let recorder = Recorder::new(config.n_channels, config.sample_rate)?;

        let lookbehind_samples = (config.lookbehind_sec * config.sample_rate as f64) as u64;
        let lookahead_samples = (config.lookahead_sec * config.sample_rate as f64) as u64;

        Ok(VadPipeline {
            config,
            fft_procs,
            denoiser,
            machine,
            alt_machines,
            alt_segments,
            recorder,
            lookbehind_samples,
            lookahead_samples,
            pending_finalize_at: None,
            pending_segment: None,
        })
    }

    pub fn alt_segments(&self, i: usize) -> &[VadSegment] {
        &self.alt_segments[i]
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    /// Process the fixed-size window starting at `window_start`. Returns the
    /// finalized `(AudioBuffer, VadSegment)` once the recorder's lookahead
    /// padding has been satisfied, if one just completed.
    pub fn process_window(
        &mut self,
        ring: &MultiRingBuffer,
        window_start: u64,
    ) -> Result<Option<(AudioBuffer, VadSegment)>, VadError> {
        let window_end = window_start + self.config.fft_size as u64;
        let segment = ring.read_slice(window_start, window_end)?;

        let volume_ratio = self.channel_volume_ratio(&segment);
        let speech_band_energy = self.speech_band_energy(&segment)?;
        let rnn_vad = self.denoised_vad(&segment);

        let analyzed = AnalyzedSegment {
            start_index: window_start,
            end_index: window_end,
            speech_band_energy,
            volume_ratio,
            rnn_vad,
        };

        for (alt, history) in self.alt_machines.iter_mut().zip(self.alt_segments.iter_mut()) {
            if let RecordingDecision::Completed(seg) = alt.evaluate(&analyzed) {
                history.push(seg);
            }
        }

        let decision = self.machine.evaluate(&analyzed);
        self.drive_recorder(decision, ring, &segment, window_start, window_end)?;

        if let Some(target) = self.pending_finalize_at {
            if ring.write_pos() >= target {
                let buf = self.recorder.finalize(true)?;
                self.pending_finalize_at = None;
                if let (Some(buf), Some(seg)) = (buf, self.pending_segment.take()) {
                    return Ok(Some((buf, seg)));
                }
            }
        }

        Ok(None)
    }

    fn drive_recorder(
        &mut self,
        decision: RecordingDecision,
        ring: &MultiRingBuffer,
        segment: &Segment<'_, f32>,
        window_start: u64,
        window_end: u64,
    ) -> Result<(), VadError> {
        match decision {
            RecordingDecision::Started { at_index } => {
                if self.recorder.is_recording() {
                    trace!("speech re-opened while recorder already capturing; extending current capture");
                    self.recorder.write(segment)?;
                    return Ok(());
                }

                let capture_start = at_index
                    .saturating_sub(self.lookbehind_samples)
                    .max(ring.oldest_available());
                self.recorder.start(capture_start)?;

                if capture_start < window_start {
                    let catchup = ring.read_slice(capture_start, window_start)?;
                    self.recorder.write(&catchup)?;
                }
                self.recorder.write(segment)?;
            }
            RecordingDecision::Completed(seg) => {
                if self.recorder.is_recording() {
                    self.recorder.write(segment)?;
                }
                self.pending_finalize_at = Some(window_end + self.lookahead_samples);
                self.pending_segment = Some(seg);
            }
            RecordingDecision::Aborted => {
                if self.recorder.is_recording() {
                    let _ = self.recorder.finalize(false);
                }
            }
            RecordingDecision::None => {
                if self.recorder.is_recording() {
                    self.recorder.write(segment)?;
                }
            }
        }
        Ok(())
    }

    fn channel_volume_ratio(&self, segment: &Segment<'_, f32>) -> f64 {
        let rms: Vec<f64> = (0..segment.n_channels())
            .map(|c| {
                let ch = segment.channel(c);
                let sum_sq: f64 = (0..ch.len())
                    .map(|i| {
                        let s = *ch.get(i).unwrap_or(&0.0) as f64;
                        s * s
                    })
                    .sum();
                (sum_sq / ch.len().max(1) as f64).sqrt()
            })
            .collect();

        let max_rms = rms.iter().cloned().fold(0.0_f64, f64::max);
        if max_rms <= 0.0 {
            return 1.0;
        }
        let min_rms = rms.iter().cloned().fold(f64::INFINITY, f64::min);
        min_rms / max_rms
    }

    fn speech_band_energy(&mut self, segment: &Segment<'_, f32>) -> Result<f64, VadError> {
        let mut sum = 0.0_f64;
        for (c, proc) in self.fft_procs.iter_mut().enumerate() {
            let result = proc.analyze(segment.channel(c))?;
            let band = average_volume_in_band(
                &result,
                self.config.vad_machine_config.speech_min_freq,
                self.config.vad_machine_config.speech_max_freq,
            )?;
            sum += band as f64;
        }
        Ok(sum / self.fft_procs.len() as f64)
    }

    fn denoised_vad(&mut self, segment: &Segment<'_, f32>) -> Option<f64> {
        let denoiser = self.denoiser.as_mut()?;
        let frame_size = crate::constants::DENOISER_FRAME_SIZE;
        let n_frames = segment.length / frame_size;
        if n_frames == 0 {
            warn!("window shorter than one denoiser frame; skipping VAD estimate for this window");
            return None;
        }

        let mut min_sum = 0.0_f64;
        for f in 0..n_frames {
            let offset = f * frame_size;
            let mut scratch: Vec<Vec<f32>> = (0..segment.n_channels())
                .map(|c| {
                    let mut buf = vec![0.0_f32; frame_size];
                    segment.channel(c).copy_range_into(offset, frame_size, &mut buf);
                    buf
                })
                .collect();
            let mut refs: Vec<&mut [f32]> = scratch.iter_mut().map(Vec::as_mut_slice).collect();
            match denoiser.process_frame(&mut refs) {
                Ok((_, min_vad)) => min_sum += min_vad as f64,
                Err(e) => {
                    warn!("denoiser frame failed: {e}");
                    return None;
                }
            }
        }
        Some(min_sum / n_frames as f64)
    }
}
