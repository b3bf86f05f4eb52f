//! Top-level facade: owns the ring buffer and the VAD pipeline, accepts
//! pushed PCM, and invokes a caller-supplied callback with each finalized
//! speech recording. This is the only type most callers need to touch.

use log::info;

use crate::error::VadError;
use crate::pipeline::{PipelineConfig, VadPipeline};
use crate::recorder::AudioBuffer;
use crate::ring_buffer::MultiRingBuffer;
use crate::state_machine::VadSegment;

/// Configuration for one `AudioPipeline` instance, translated from
/// `PipelineSettings` (the env/TOML-loadable ambient config) plus the lower
/// level `PipelineConfig`/`VadMachineConfig` the core components consume.
pub struct AudioPipelineConfig {
    pub sample_rate: u32,
    pub n_channels: usize,
    pub ring_buffer_seconds: usize,
    pub pipeline: PipelineConfig,
}

/// Single-threaded, cooperative VAD pipeline over streaming PCM. One
/// instance is meant to be driven from one OS thread; it is `Send` so it can
/// be handed off between threads, but is never accessed concurrently from
/// more than one at a time (spec.md §5).
pub struct AudioPipeline {
    ring: MultiRingBuffer,
    pipeline: VadPipeline,
    fft_size: usize,
    next_window_start: u64,
    callback: Option<Box<dyn FnMut(AudioBuffer, VadSegment) + Send>>,
}

impl AudioPipeline {
    pub fn new(config: AudioPipelineConfig) -> Result<Self, VadError> {
        if config.sample_rate != crate::constants::SAMPLE_RATE {
            return Err(VadError::ConfigInvalid(format!(
                "sample_rate must be {}, got {}",
                crate::constants::SAMPLE_RATE,
                config.sample_rate
            )));
        }

        let capacity = config.ring_buffer_seconds * config.sample_rate as usize;
        let ring = MultiRingBuffer::new(config.n_channels, capacity)?;
        let fft_size = config.pipeline.fft_size;
        let pipeline = VadPipeline::new(config.pipeline)?;

        info!(
            "AudioPipeline ready: {} channels, {}s ring buffer, fft_size={}",
            config.n_channels, config.ring_buffer_seconds, fft_size
        );

        Ok(AudioPipeline {
            ring,
            pipeline,
            fft_size,
            next_window_start: 0,
            callback: None,
        })
    }

    pub fn set_recording_callback<F>(&mut self, callback: F)
    where
        F: FnMut(AudioBuffer, VadSegment) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Push one frame of interleaved-by-channel PCM (`frame[c]` is channel
    /// `c`'s samples, all equal length) into the pipeline. Runs every
    /// complete analysis window that became available as a result,
    /// synchronously, before returning. Returns the absolute sample index
    /// the frame was written at.
    pub fn push(&mut self, frame: &[&[f32]]) -> Result<u64, VadError> {
        let written_at = self.ring.write(frame)?;

        while self.next_window_start + self.fft_size as u64 <= self.ring.write_pos() {
            let window_start = self.next_window_start;
            if let Some((buf, seg)) = self.pipeline.process_window(&self.ring, window_start)? {
                if let Some(cb) = &mut self.callback {
                    cb(buf, seg);
                }
            }
            self.next_window_start += self.fft_size as u64;
        }

        Ok(written_at)
    }

    /// Manually force capture to begin at `at_index`, bypassing VAD
    /// detection. Fails if a capture (automatic or manual) is already in
    /// progress.
    pub fn begin_capture(&mut self, at_index: u64) -> Result<(), VadError> {
        self.pipeline.recorder_mut().start(at_index)
    }

    /// Manually end the current capture, automatic or manual.
    pub fn end_capture(&mut self, keep: bool) -> Result<Option<AudioBuffer>, VadError> {
        self.pipeline.recorder_mut().finalize(keep)
    }

    /// Read-only access to one alternate state machine's finalized segments,
    /// for offline threshold tuning (SPEC_FULL.md §9).
    pub fn alt_segments(&self, i: usize) -> &[VadSegment] {
        self.pipeline.alt_segments(i)
    }

    pub fn sample_rate(&self) -> u32 {
        crate::constants::SAMPLE_RATE
    }

    pub fn n_channels(&self) -> usize {
        self.ring.n_channels()
    }

    /// Explicit shutdown: finalize any in-progress recording (discarding it,
    /// since there is no more audio coming to satisfy lookahead padding) and
    /// stop accepting further pushes. No further `push` calls should be made
    /// on this instance afterward.
    pub fn shutdown(&mut self) {
        if self.pipeline.recorder_mut().is_recording() {
            let _ = self.pipeline.recorder_mut().finalize(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::VadMachineConfig;
    use std::f32::consts::PI;
    use std::sync::{Arc, Mutex};

    fn test_config(use_denoiser: bool) -> AudioPipelineConfig {
        AudioPipelineConfig {
            sample_rate: crate::constants::SAMPLE_RATE,
            n_channels: 2,
            ring_buffer_seconds: 5,
            pipeline: crate::pipeline::PipelineConfig {
                sample_rate: crate::constants::SAMPLE_RATE,
                n_channels: 2,
                fft_size: 512,
                use_denoiser,
                vad_machine_config: VadMachineConfig {
                    initial_long_term_avg: 0.0001,
                    long_term_speech_avg_sec: 1.0,
                    short_term_speech_avg_sec: 0.02,
                    channel_vol_ratio_avg_sec: 0.02,
                    min_consecutive_sec_to_open: 0.02,
                    max_speech_gap_sec: 0.05,
                    min_vad_duration_sec: 0.03,
                    channel_vol_ratio_threshold: 0.0,
                    ..VadMachineConfig::default()
                },
                alt_vad_machine_configs: Vec::new(),
                lookbehind_sec: 0.05,
                lookahead_sec: 0.05,
            },
        }
    }

    fn tone_frame(len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * 300.0 * n as f32 / crate::constants::SAMPLE_RATE as f32).sin() * amp)
            .collect()
    }

    fn silence_frame(len: usize) -> Vec<f32> {
        vec![0.0_f32; len]
    }

    #[test]
    fn rejects_wrong_sample_rate() {
        let mut config = test_config(false);
        config.sample_rate = 44_100;
        assert!(AudioPipeline::new(config).is_err());
    }

    #[test]
    fn pushing_loud_tone_eventually_emits_a_recording() {
        let mut pipeline = AudioPipeline::new(test_config(false)).unwrap();
        let captured: Arc<Mutex<Vec<VadSegment>>> = Arc::new(Mutex::new(Vec::new()));
        let captured_cb = captured.clone();
        pipeline.set_recording_callback(move |_buf, seg| {
            captured_cb.lock().unwrap().push(seg);
        });

        let chunk = 512;
        for _ in 0..40 {
            let ch0 = tone_frame(chunk, 0.8);
            let ch1 = tone_frame(chunk, 0.8);
            pipeline.push(&[&ch0, &ch1]).unwrap();
        }
        for _ in 0..40 {
            let ch0 = silence_frame(chunk);
            let ch1 = silence_frame(chunk);
            pipeline.push(&[&ch0, &ch1]).unwrap();
        }

        assert!(!captured.lock().unwrap().is_empty(), "expected at least one finalized speech segment");
    }

    #[test]
    fn silence_only_emits_nothing() {
        let mut pipeline = AudioPipeline::new(test_config(false)).unwrap();
        let captured: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
        let captured_cb = captured.clone();
        pipeline.set_recording_callback(move |_buf, _seg| {
            *captured_cb.lock().unwrap() += 1;
        });

        let chunk = 512;
        for _ in 0..60 {
            let ch0 = silence_frame(chunk);
            let ch1 = silence_frame(chunk);
            pipeline.push(&[&ch0, &ch1]).unwrap();
        }

        assert_eq!(*captured.lock().unwrap(), 0);
    }

    #[test]
    fn manual_capture_round_trips() {
        let mut pipeline = AudioPipeline::new(test_config(false)).unwrap();
        let ch0 = silence_frame(256);
        let ch1 = silence_frame(256);
        pipeline.push(&[&ch0, &ch1]).unwrap();

        pipeline.begin_capture(0).unwrap();
        let ch0 = tone_frame(256, 0.5);
        let ch1 = tone_frame(256, 0.5);
        pipeline.push(&[&ch0, &ch1]).unwrap();

        let buf = pipeline.end_capture(true).unwrap();
        assert!(buf.is_some());
    }
}
