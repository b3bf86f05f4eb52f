//! Multichannel ring buffer addressed by absolute sample index.
//!
//! Generalizes the teacher's single interleaved `rtrb::RingBuffer<f32>`
//! device buffer (see `writer_thread.rs`'s `read_available`, which drained an
//! `rtrb::Consumer` in `(first, second)` split-slice pairs) into a
//! multi-channel, absolute-indexed store: every sample ever written has a
//! stable `u64` index, reads name an absolute range rather than "whatever is
//! available right now", and wrap-around is exposed to the caller as a
//! `Segment` of `SplitSlice`s rather than hidden.

use crate::error::VadError;
use crate::segment::{Segment, SplitSlice};

use log::debug;

/// Fixed-capacity, per-channel ring buffer. Writes beyond capacity overwrite
/// the oldest still-resident samples; reads into already-overwritten ranges
/// fail with `VadError::RangeInvalid`.
pub struct MultiRingBuffer {
    capacity: usize,
    channels: Vec<Vec<f32>>,
    /// Absolute index of the next sample that will be written.
    write_pos: u64,
}

impl MultiRingBuffer {
    pub fn new(n_channels: usize, capacity: usize) -> Result<Self, VadError> {
        if n_channels == 0 {
            return Err(VadError::ConfigInvalid(
                "ring buffer needs at least one channel".into(),
            ));
        }
        if capacity == 0 {
            return Err(VadError::ConfigInvalid(
                "ring buffer capacity must be non-zero".into(),
            ));
        }

        debug!(
            "allocating MultiRingBuffer: {} channels x {} samples",
            n_channels, capacity
        );

        Ok(MultiRingBuffer {
            capacity,
            channels: (0..n_channels).map(|_| vec![0.0_f32; capacity]).collect(),
            write_pos: 0,
        })
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Absolute index of the next sample that will be written.
    pub fn write_pos(&self) -> u64 {
        self.write_pos
    }

    /// The oldest absolute index still resident in the buffer.
    pub fn oldest_available(&self) -> u64 {
        self.write_pos.saturating_sub(self.capacity as u64)
    }

    /// Write one frame (`src[c]` is channel `c`'s samples, all slices the
    /// same length) into the buffer, wrapping as needed. Returns the absolute
    /// index the frame was written at.
    pub fn write(&mut self, src: &[&[f32]]) -> Result<u64, VadError> {
        if src.len() != self.channels.len() {
            return Err(VadError::ConfigInvalid(format!(
                "expected {} channels, got {}",
                self.channels.len(),
                src.len()
            )));
        }

        let frame_len = src[0].len();
        if src.iter().any(|s| s.len() != frame_len) {
            return Err(VadError::ConfigInvalid(
                "all channel slices must be the same length".into(),
            ));
        }
        if frame_len > self.capacity {
            return Err(VadError::CapacityExceeded(format!(
                "frame of {frame_len} samples exceeds ring buffer capacity {}",
                self.capacity
            )));
        }

        let start_index = self.write_pos;
        let start_phys = (start_index as usize) % self.capacity;

        for (ch, samples) in self.channels.iter_mut().zip(src.iter()) {
            if start_phys + frame_len <= self.capacity {
                ch[start_phys..start_phys + frame_len].copy_from_slice(samples);
            } else {
                let first_len = self.capacity - start_phys;
                ch[start_phys..].copy_from_slice(&samples[..first_len]);
                ch[..frame_len - first_len].copy_from_slice(&samples[first_len..]);
            }
        }

        self.write_pos += frame_len as u64;
        Ok(start_index)
    }

    /// Read the absolute range `[from, to)` as a `Segment` of non-owning
    /// `SplitSlice`s, splitting at the physical wrap point if the range
    /// straddles it.
    pub fn read_slice(&self, from: u64, to: u64) -> Result<Segment<'_, f32>, VadError> {
        if to < from {
            return Err(VadError::RangeInvalid(format!(
                "read range end {to} precedes start {from}"
            )));
        }
        if to > self.write_pos {
            return Err(VadError::RangeInvalid(format!(
                "read range end {to} is beyond the written position {}",
                self.write_pos
            )));
        }
        let len = (to - from) as usize;
        if len > self.capacity {
            return Err(VadError::RangeInvalid(format!(
                "read range of {len} samples exceeds ring buffer capacity {}",
                self.capacity
            )));
        }
        if from < self.oldest_available() {
            return Err(VadError::RangeInvalid(format!(
                "read range start {from} has already been overwritten (oldest available {})",
                self.oldest_available()
            )));
        }

        let start_phys = (from as usize) % self.capacity;
        let channels = self
            .channels
            .iter()
            .map(|ch| {
                if len == 0 {
                    SplitSlice { first: &[], second: &[] }
                } else if start_phys + len <= self.capacity {
                    SplitSlice { first: &ch[start_phys..start_phys + len], second: &[] }
                } else {
                    let first_len = self.capacity - start_phys;
                    SplitSlice {
                        first: &ch[start_phys..],
                        second: &ch[..len - first_len],
                    }
                }
            })
            .collect();

        Ok(Segment { index: from, length: len, channels })
    }
}
