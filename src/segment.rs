//! Non-owning and owning views over multichannel sample windows.
//!
//! `SplitSlice` is the shape a ring buffer read produces when the requested
//! range straddles the wrap point: a `first` run and a (possibly empty)
//! `second` run that together form one logical contiguous range. `Segment`
//! pairs one `SplitSlice` per channel with an absolute sample index.
//! `SegmentWriter` is the only thing that turns a borrowed `Segment` into an
//! owned one, copying sample-by-channel into its own backing storage.

use crate::error::VadError;

/// A logical contiguous run of samples that may be split across two
/// physically separate slices, as produced by a ring buffer read that wraps.
#[derive(Debug, Clone, Copy)]
pub struct SplitSlice<'a, T> {
    pub first: &'a [T],
    pub second: &'a [T],
}

impl<'a, T> SplitSlice<'a, T> {
    pub fn whole(slice: &'a [T]) -> Self {
        SplitSlice {
            first: slice,
            second: &[],
        }
    }

    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<&'a T> {
        if i < self.first.len() {
            self.first.get(i)
        } else {
            self.second.get(i - self.first.len())
        }
    }
}

impl<'a, T: Copy> SplitSlice<'a, T> {
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.first);
        out.extend_from_slice(self.second);
        out
    }

    /// Copy `count` samples starting at `offset` into `dst`, which must be at
    /// least `count` long. Handles the case where `offset..offset+count`
    /// straddles the `first`/`second` boundary.
    pub fn copy_range_into(&self, offset: usize, count: usize, dst: &mut [T]) {
        debug_assert!(dst.len() >= count);
        debug_assert!(offset + count <= self.len());

        let first_len = self.first.len();
        if offset >= first_len {
            dst[..count].copy_from_slice(&self.second[offset - first_len..offset - first_len + count]);
            return;
        }

        let from_first = (first_len - offset).min(count);
        dst[..from_first].copy_from_slice(&self.first[offset..offset + from_first]);
        if from_first < count {
            let remaining = count - from_first;
            dst[from_first..count].copy_from_slice(&self.second[..remaining]);
        }
    }
}

/// One window of samples across every channel, each as a `SplitSlice`, tagged
/// with the absolute sample index the window starts at.
#[derive(Debug, Clone)]
pub struct Segment<'a, T> {
    pub index: u64,
    pub length: usize,
    pub channels: Vec<SplitSlice<'a, T>>,
}

impl<'a, T> Segment<'a, T> {
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, i: usize) -> &SplitSlice<'a, T> {
        &self.channels[i]
    }
}

/// A multichannel buffer that owns its storage, used both as the fixed-length
/// accumulator for FFT/denoiser windowing and, via `grow`, as the backing
/// store for `Recorder`'s captured audio.
#[derive(Debug, Clone)]
pub struct OwnedSegment<T> {
    pub index: u64,
    channels: Vec<Vec<T>>,
}

impl<T: Copy + Default> OwnedSegment<T> {
    pub fn new(n_channels: usize, capacity: usize, index: u64) -> Self {
        OwnedSegment {
            index,
            channels: (0..n_channels).map(|_| vec![T::default(); capacity]).collect(),
        }
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn grow(&mut self, additional: usize) {
        for ch in &mut self.channels {
            ch.resize(ch.len() + additional, T::default());
        }
    }

    pub fn channel_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.channels[i]
    }

    /// Consume the buffer, truncating every channel to `length` samples.
    pub fn into_truncated_channels(mut self, length: usize) -> Vec<Vec<T>> {
        for ch in &mut self.channels {
            ch.truncate(length);
        }
        self.channels
    }

    /// Borrow the first `length` samples of every channel as a `Segment`.
    pub fn as_segment(&self, length: usize) -> Segment<'_, T> {
        Segment {
            index: self.index,
            length,
            channels: self
                .channels
                .iter()
                .map(|ch| SplitSlice::whole(&ch[..length]))
                .collect(),
        }
    }
}

/// Accumulates samples copied out of borrowed `Segment`s into an owned,
/// fixed- or growable-length target, tracking how much of the target has
/// been filled so far.
#[derive(Debug, Clone)]
pub struct SegmentWriter<T> {
    target: OwnedSegment<T>,
    write_index: usize,
}

impl<T: Copy + Default> SegmentWriter<T> {
    pub fn new(n_channels: usize, length: usize, index: u64) -> Self {
        SegmentWriter {
            target: OwnedSegment::new(n_channels, length, index),
            write_index: 0,
        }
    }

    pub fn reset(&mut self, index: u64) {
        self.write_index = 0;
        self.target.index = index;
    }

    /// Extend the target's capacity by `additional` samples per channel. Used
    /// by the recorder, which does not know its final length up front.
    pub fn grow(&mut self, additional: usize) {
        self.target.grow(additional);
    }

    pub fn capacity(&self) -> usize {
        self.target.capacity()
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn is_full(&self) -> bool {
        self.write_index >= self.target.capacity()
    }

    pub fn remaining(&self) -> usize {
        self.target.capacity() - self.write_index
    }

    /// Copy as many samples as will fit from `src` (starting at `src_offset`)
    /// into the target, advancing the internal write cursor. Returns the
    /// number of samples actually copied per channel.
    pub fn write(&mut self, src: &Segment<'_, T>, src_offset: usize) -> Result<usize, VadError> {
        if src.n_channels() != self.target.n_channels() {
            return Err(VadError::ConfigInvalid(format!(
                "segment writer expected {} channels, got {}",
                self.target.n_channels(),
                src.n_channels()
            )));
        }

        let available_src = src.length.saturating_sub(src_offset);
        let count = available_src.min(self.remaining());
        if count == 0 {
            return Ok(0);
        }

        for c in 0..self.target.n_channels() {
            let dst = &mut self.target.channel_mut(c)[self.write_index..self.write_index + count];
            src.channel(c).copy_range_into(src_offset, count, dst);
        }

        self.write_index += count;
        Ok(count)
    }

    /// Borrow the filled portion of the target as a `Segment`.
    pub fn filled_segment(&self) -> Segment<'_, T> {
        self.target.as_segment(self.write_index)
    }

    pub fn into_owned(self) -> (OwnedSegment<T>, usize) {
        (self.target, self.write_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_slice_copy_range_straddling_boundary() {
        let first = [1.0f32, 2.0, 3.0];
        let second = [4.0f32, 5.0];
        let split = SplitSlice { first: &first, second: &second };
        let mut dst = [0.0f32; 3];
        split.copy_range_into(2, 3, &mut dst);
        assert_eq!(dst, [3.0, 4.0, 5.0]);
    }

    #[test]
    fn split_slice_to_vec_concatenates() {
        let first = [1, 2];
        let second = [3, 4, 5];
        let split = SplitSlice { first: &first, second: &second };
        assert_eq!(split.to_vec(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn segment_writer_fills_and_reports_full() {
        let mut writer: SegmentWriter<f32> = SegmentWriter::new(2, 4, 0);
        let src_ch0 = [1.0f32, 2.0, 3.0];
        let src_ch1 = [10.0f32, 20.0, 30.0];
        let src = Segment {
            index: 0,
            length: 3,
            channels: vec![SplitSlice::whole(&src_ch0), SplitSlice::whole(&src_ch1)],
        };

        let written = writer.write(&src, 0).unwrap();
        assert_eq!(written, 3);
        assert!(!writer.is_full());
        assert_eq!(writer.remaining(), 1);

        let filled = writer.filled_segment();
        assert_eq!(filled.channel(0).to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(filled.channel(1).to_vec(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn segment_writer_grow_extends_capacity() {
        let mut writer: SegmentWriter<f32> = SegmentWriter::new(1, 2, 0);
        writer.grow(2);
        assert_eq!(writer.capacity(), 4);
    }

    #[test]
    fn segment_writer_rejects_channel_mismatch() {
        let mut writer: SegmentWriter<f32> = SegmentWriter::new(2, 4, 0);
        let src_ch0 = [1.0f32];
        let src = Segment {
            index: 0,
            length: 1,
            channels: vec![SplitSlice::whole(&src_ch0)],
        };
        assert!(writer.write(&src, 0).is_err());
    }
}
