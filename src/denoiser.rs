//! Per-channel RNN-based noise suppression.
//!
//! Grounded on `velesar-s2t/src/denoise.rs`'s `nnnoiseless::DenoiseState`
//! wrapper: one state machine per channel, fixed 480-sample frames at 48kHz,
//! `process_frame` returning the frame's speech likelihood directly. Extended
//! here to multichannel: each channel gets its own independent `DenoiseState`
//! (noise profiles differ per microphone), and the segment's overall VAD
//! likelihood is the minimum across channels — spec.md §4.4's rule that the
//! quietest channel gates whether the segment counts as speech at all.

use nnnoiseless::DenoiseState;

use crate::constants::{DENOISER_FRAME_SIZE, DENOISER_SAMPLE_SCALE};
use crate::error::VadError;

pub struct Denoiser {
    states: Vec<Box<DenoiseState<'static>>>,
}

impl Denoiser {
    pub fn new(n_channels: usize) -> Result<Self, VadError> {
        if n_channels == 0 {
            return Err(VadError::ConfigInvalid(
                "denoiser needs at least one channel".into(),
            ));
        }
        Ok(Denoiser {
            states: (0..n_channels).map(|_| DenoiseState::new()).collect(),
        })
    }

    pub fn n_channels(&self) -> usize {
        self.states.len()
    }

    /// Denoise one 480-sample frame per channel in place and return each
    /// channel's VAD likelihood alongside the multichannel minimum.
    ///
    /// `frames[c].len()` must equal `DENOISER_FRAME_SIZE`; a mismatch is a
    /// pipeline orchestrator bug, not a caller-recoverable condition, so it
    /// is asserted rather than returned as an error (spec.md §7).
    pub fn process_frame(&mut self, frames: &mut [&mut [f32]]) -> Result<(Vec<f32>, f32), VadError> {
        if frames.len() != self.states.len() {
            return Err(VadError::ConfigInvalid(format!(
                "expected {} channels, got {}",
                self.states.len(),
                frames.len()
            )));
        }

        let mut vads = Vec::with_capacity(frames.len());
        let mut scaled_in = vec![0.0_f32; DENOISER_FRAME_SIZE];
        let mut scaled_out = vec![0.0_f32; DENOISER_FRAME_SIZE];

        for (state, frame) in self.states.iter_mut().zip(frames.iter_mut()) {
            debug_assert_eq!(
                frame.len(),
                DENOISER_FRAME_SIZE,
                "denoiser frame size mismatch"
            );

            for (dst, src) in scaled_in.iter_mut().zip(frame.iter()) {
                *dst = src * DENOISER_SAMPLE_SCALE;
            }

            let vad = state.process_frame(&mut scaled_out, &scaled_in);

            for (dst, src) in frame.iter_mut().zip(scaled_out.iter()) {
                *dst = src / DENOISER_SAMPLE_SCALE;
            }

            vads.push(vad);
        }

        let min_vad = vads.iter().copied().fold(f32::INFINITY, f32::min);
        Ok((vads, min_vad))
    }
}
