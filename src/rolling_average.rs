//! Fixed-window rolling average over `f64` samples.
//!
//! The DSP path (ring buffer, FFT, denoiser) runs in `f32`; the VAD state
//! machine's statistics run in `f64`, per spec.md §9's note that averages
//! accumulated over minutes of audio need the extra precision `f32` can't
//! hold without drifting. `RollingAverage` is the one place that split
//! happens.

/// O(W) push, O(1) amortized average: a fixed-size circular buffer of the
/// last `W` pushed values plus a running sum, avoiding a full rescan on
/// every push once the window is full.
pub struct RollingAverage {
    window: Vec<f64>,
    write_index: usize,
    written_count: usize,
    sum: f64,
    last_avg: Option<f64>,
}

impl RollingAverage {
    pub fn new(window_size: usize) -> Self {
        RollingAverage {
            window: vec![0.0; window_size.max(1)],
            write_index: 0,
            written_count: 0,
            sum: 0.0,
            last_avg: None,
        }
    }

    /// Construct with the window pre-filled with `seed`, so `last_avg` is
    /// immediately defined as `seed` rather than requiring a full window of
    /// real pushes before the average means anything.
    pub fn with_seed(window_size: usize, seed: f64) -> Self {
        let window_size = window_size.max(1);
        RollingAverage {
            window: vec![seed; window_size],
            write_index: 0,
            written_count: window_size,
            sum: seed * window_size as f64,
            last_avg: Some(seed),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    pub fn last_avg(&self) -> Option<f64> {
        self.last_avg
    }

    /// Push a new value, evict the oldest if the window is full, and return
    /// the updated average over the valid prefix.
    pub fn push(&mut self, value: f64) -> f64 {
        let window_size = self.window.len();

        if self.written_count < window_size {
            self.window[self.write_index] = value;
            self.sum += value;
            self.written_count += 1;
        } else {
            let oldest = self.window[self.write_index];
            self.sum += value - oldest;
            self.window[self.write_index] = value;
        }

        self.write_index = (self.write_index + 1) % window_size;

        let avg = self.sum / self.written_count as f64;
        self.last_avg = Some(avg);
        avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_over_partial_window() {
        let mut ra = RollingAverage::new(4);
        assert_eq!(ra.push(1.0), 1.0);
        assert_eq!(ra.push(2.0), 1.5);
        assert_eq!(ra.push(3.0), 2.0);
    }

    #[test]
    fn average_evicts_oldest_once_full() {
        let mut ra = RollingAverage::new(3);
        ra.push(1.0);
        ra.push(2.0);
        ra.push(3.0);
        assert_eq!(ra.last_avg(), Some(2.0));

        // 1.0 falls out of the window; average over [2,3,4] == 3.0
        let avg = ra.push(4.0);
        assert_eq!(avg, 3.0);
    }

    #[test]
    fn seeded_average_is_immediately_defined() {
        let ra = RollingAverage::with_seed(10, 0.005);
        assert_eq!(ra.last_avg(), Some(0.005));
    }

    #[test]
    fn seeded_average_absorbs_new_pushes_gradually() {
        let mut ra = RollingAverage::with_seed(4, 0.0);
        let avg = ra.push(1.0);
        // One real push into a seeded window of zeros: (0+0+0+1)/4
        assert!((avg - 0.25).abs() < 1e-12);
    }
}
