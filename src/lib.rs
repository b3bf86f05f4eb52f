// Lint configuration: keep pedantic/nursery suppressions that match codebase patterns.
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cognitive_complexity)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::significant_drop_in_scrutinee)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::use_self)]
#![allow(clippy::redundant_else)]

// Modular organization of code
pub mod audio_pipeline;
#[cfg(feature = "benchmarking")]
pub mod benchmarking;
pub mod config;
pub mod constants;
pub mod denoiser;
pub mod error;
pub mod fft;
pub mod pipeline;
pub mod recorder;
pub mod ring_buffer;
pub mod rolling_average;
pub mod segment;
pub mod state_machine;

// Re-exports for public API
pub use audio_pipeline::{AudioPipeline, AudioPipelineConfig};
#[cfg(feature = "benchmarking")]
pub use benchmarking::{measure_execution_time, PerformanceMetrics, PerformanceTracker};
pub use config::PipelineSettings;
pub use constants::*;
pub use denoiser::Denoiser;
pub use error::VadError;
pub use fft::{FftProcessor, FftResult};
pub use pipeline::{PipelineConfig, VadPipeline};
pub use recorder::{AudioBuffer, Recorder};
pub use ring_buffer::MultiRingBuffer;
pub use rolling_average::RollingAverage;
pub use segment::{OwnedSegment, Segment, SegmentWriter, SplitSlice};
pub use state_machine::{AnalyzedSegment, RecordingDecision, SpeechState, VadMachineConfig, VadSegment, VadStateMachine};

#[cfg(test)]
mod tests {
    #[cfg(feature = "benchmarking")]
    mod performance_tests;
}
