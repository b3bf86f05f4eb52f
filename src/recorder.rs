//! Captures a padded window of multichannel audio around a detected speech
//! segment, growing its backing storage on demand since the final length
//! isn't known until the state machine decides to finalize.
//!
//! Reuses `SegmentWriter` (see `segment.rs`) as the accumulator, the same
//! component the FFT window uses for its fixed-length case — here exercised
//! through its `grow` operation instead, per spec.md §4.8 and Design Notes §9.

use crate::constants::RECORDER_GROWTH_CHUNK_SECONDS;
use crate::error::VadError;
use crate::segment::{Segment, SegmentWriter};

/// Fully captured, owned multichannel audio handed to the recording
/// callback once a speech segment is finalized.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub start_index: u64,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn length(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

pub struct Recorder {
    n_channels: usize,
    sample_rate: u32,
    growth_chunk: usize,
    writer: Option<SegmentWriter<f32>>,
}

impl Recorder {
    pub fn new(n_channels: usize, sample_rate: u32) -> Result<Self, VadError> {
        if n_channels == 0 {
            return Err(VadError::ConfigInvalid(
                "recorder needs at least one channel".into(),
            ));
        }
        Ok(Recorder {
            n_channels,
            sample_rate,
            growth_chunk: RECORDER_GROWTH_CHUNK_SECONDS * sample_rate as usize,
            writer: None,
        })
    }

    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }

    /// Begin capturing at absolute sample index `from`. The backing store
    /// starts at one growth chunk and grows from there as `write` is called.
    pub fn start(&mut self, from: u64) -> Result<(), VadError> {
        if self.writer.is_some() {
            return Err(VadError::ConfigInvalid(
                "recorder is already capturing a segment".into(),
            ));
        }
        self.writer = Some(SegmentWriter::new(self.n_channels, self.growth_chunk, from));
        Ok(())
    }

    /// Append a segment of samples, growing the backing store in
    /// `growth_chunk`-sized steps until there's room.
    pub fn write(&mut self, segment: &Segment<'_, f32>) -> Result<(), VadError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| VadError::RecorderMissingData("recorder is not capturing".into()))?;

        while writer.remaining() < segment.length {
            writer.grow(self.growth_chunk);
        }
        writer.write(segment, 0)?;
        Ok(())
    }

    /// Stop capturing. If `keep` is true, returns the captured audio as an
    /// `AudioBuffer`; if false, discards it. Errors if `keep` is true but no
    /// samples were ever written.
    pub fn finalize(&mut self, keep: bool) -> Result<Option<AudioBuffer>, VadError> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| VadError::RecorderMissingData("recorder is not capturing".into()))?;

        if !keep {
            return Ok(None);
        }

        let (owned, filled) = writer.into_owned();
        if filled == 0 {
            return Err(VadError::RecorderMissingData(
                "recorder finalized with no samples written".into(),
            ));
        }

        let start_index = owned.index;
        let channels = owned.into_truncated_channels(filled);

        Ok(Some(AudioBuffer { sample_rate: self.sample_rate, start_index, channels }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SplitSlice;

    fn segment_of(start: u64, samples: &[f32]) -> Segment<'_, f32> {
        Segment {
            index: start,
            length: samples.len(),
            channels: vec![SplitSlice::whole(samples)],
        }
    }

    #[test]
    fn capture_and_finalize_round_trips_samples() {
        let mut recorder = Recorder::new(1, 48_000).unwrap();
        recorder.start(100).unwrap();

        let chunk = [1.0f32, 2.0, 3.0];
        recorder.write(&segment_of(100, &chunk)).unwrap();

        let buf = recorder.finalize(true).unwrap().unwrap();
        assert_eq!(buf.start_index, 100);
        assert_eq!(buf.channels[0], vec![1.0, 2.0, 3.0]);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn discarding_does_not_require_prior_writes() {
        let mut recorder = Recorder::new(1, 48_000).unwrap();
        recorder.start(0).unwrap();
        let result = recorder.finalize(false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn finalize_keep_with_no_writes_errors() {
        let mut recorder = Recorder::new(1, 48_000).unwrap();
        recorder.start(0).unwrap();
        assert!(recorder.finalize(true).is_err());
    }

    #[test]
    fn writing_without_starting_errors() {
        let mut recorder = Recorder::new(1, 48_000).unwrap();
        let chunk = [1.0f32];
        assert!(recorder.write(&segment_of(0, &chunk)).is_err());
    }

    #[test]
    fn grows_backing_store_beyond_initial_chunk() {
        let mut recorder = Recorder::new(1, 10).unwrap(); // growth_chunk = 100 samples
        recorder.start(0).unwrap();

        let big_chunk = vec![1.0f32; 250];
        recorder.write(&segment_of(0, &big_chunk)).unwrap();

        let buf = recorder.finalize(true).unwrap().unwrap();
        assert_eq!(buf.length(), 250);
    }

    #[test]
    fn starting_twice_errors() {
        let mut recorder = Recorder::new(1, 48_000).unwrap();
        recorder.start(0).unwrap();
        assert!(recorder.start(10).is_err());
    }
}
