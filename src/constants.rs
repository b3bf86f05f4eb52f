/// The pipeline ingests PCM at a single fixed rate; nothing downstream resamples.
pub const SAMPLE_RATE: u32 = 48_000;

/// Default number of seconds of audio the `MultiRingBuffer` can hold per
/// channel. The default buffer length is `RING_BUFFER_SECONDS * SAMPLE_RATE`
/// samples, leaving headroom behind and ahead of the live write position for
/// the recorder's lookbehind/lookahead padding.
pub const RING_BUFFER_SECONDS: usize = 10;

/// Default analysis window size for the FFT wrapper, in samples.
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// The RNNoise-style denoiser operates on fixed 10ms frames at 48kHz.
pub const DENOISER_FRAME_SIZE: usize = 480;

/// Internal scale applied before handing samples to the denoiser, and undone
/// on the way back out. RNNoise-derived models are trained on 16-bit PCM.
pub const DENOISER_SAMPLE_SCALE: f32 = 32_767.0;

/// Maximum number of channels a single pipeline instance will address.
pub const MAX_CHANNELS: usize = 64;

/// How many seconds the recorder's backing buffer grows by at a time, so
/// reallocation during a long recording stays rare.
pub const RECORDER_GROWTH_CHUNK_SECONDS: usize = 10;

// --- VAD state machine defaults (spec.md §4.7) ---

pub const DEFAULT_SPEECH_MIN_FREQ: f32 = 100.0;
pub const DEFAULT_SPEECH_MAX_FREQ: f32 = 1500.0;
pub const DEFAULT_LONG_TERM_SPEECH_AVG_SEC: f64 = 180.0;
pub const DEFAULT_INITIAL_LONG_TERM_AVG: f64 = 0.005;
pub const DEFAULT_SHORT_TERM_SPEECH_AVG_SEC: f64 = 0.2;
pub const DEFAULT_SPEECH_THRESHOLD_FACTOR: f64 = 18.0;
pub const DEFAULT_CHANNEL_VOL_RATIO_AVG_SEC: f64 = 0.5;
pub const DEFAULT_CHANNEL_VOL_RATIO_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MIN_CONSECUTIVE_SEC_TO_OPEN: f64 = 0.2;
pub const DEFAULT_MAX_SPEECH_GAP_SEC: f64 = 2.0;
pub const DEFAULT_MIN_VAD_DURATION_SEC: f64 = 0.7;

// --- Ambient config defaults ---

pub const DEFAULT_USE_DENOISER: bool = true;
pub const DEFAULT_CHANNELS: usize = 1;
pub const DEFAULT_DEBUG: bool = false;
pub const DEFAULT_PERFORMANCE_LOGGING: bool = false;
