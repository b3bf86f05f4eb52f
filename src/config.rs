use log::{error, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_CHANNELS, DEFAULT_DEBUG, DEFAULT_FFT_SIZE, DEFAULT_PERFORMANCE_LOGGING,
    DEFAULT_USE_DENOISER, SAMPLE_RATE,
};
use crate::error::VadError;
use crate::pipeline::PipelineConfig;
use crate::state_machine::VadMachineConfig;

/// Ambient, env/TOML-loadable settings for one pipeline instance. Resolved
/// with the same three-tier precedence the teacher's `AppConfig` uses:
/// environment variables override the config file, which overrides built-in
/// defaults.
///
/// `PipelineSettings` deliberately stays small: only the knobs an operator
/// plausibly wants to flip from a deploy environment. The full
/// `VadMachineConfig` thresholds are set programmatically via
/// [`PipelineSettings::build_pipeline_config`] rather than one env var each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Number of audio channels the pipeline will address.
    pub channels: Option<usize>,
    /// Enable verbose debug logging.
    pub debug: Option<bool>,
    /// FFT analysis window size, in samples.
    pub fft_size: Option<usize>,
    /// Whether to run the RNN denoiser alongside FFT analysis.
    pub use_denoiser: Option<bool>,
    /// Sample rate the pipeline expects incoming PCM at. Must be 48000.
    pub sample_rate: Option<u32>,
    /// Enable performance metrics collection via `PerformanceTracker`.
    pub performance_logging: Option<bool>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            channels: Some(DEFAULT_CHANNELS),
            debug: Some(DEFAULT_DEBUG),
            fft_size: Some(DEFAULT_FFT_SIZE),
            use_denoiser: Some(DEFAULT_USE_DENOISER),
            sample_rate: Some(SAMPLE_RATE),
            performance_logging: Some(DEFAULT_PERFORMANCE_LOGGING),
        }
    }
}

impl PipelineSettings {
    pub fn new() -> Self {
        PipelineSettings::default()
    }

    fn find_config_file() -> Option<PathBuf> {
        if let Ok(config_path) = env::var("VAD_CONFIG") {
            let path = Path::new(&config_path);
            if path.exists() {
                return Some(path.to_path_buf());
            }
        }

        let current_dir = Path::new("trackside-vad.toml");
        if current_dir.exists() {
            return Some(current_dir.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_config = Path::new(&home).join(".config/trackside-vad/config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            let xdg_config_path = Path::new(&xdg_config).join("trackside-vad/config.toml");
            if xdg_config_path.exists() {
                return Some(xdg_config_path);
            }
        }

        let system_config = Path::new("/etc/trackside-vad/config.toml");
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    pub fn load() -> Self {
        let mut config = PipelineSettings::default();

        if let Some(config_path) = Self::find_config_file() {
            match fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str::<PipelineSettings>(&content) {
                    Ok(file_config) => {
                        info!("Loaded configuration from {}", config_path.display());
                        config.merge(file_config);
                    }
                    Err(e) => error!("Error parsing config file: {e}"),
                },
                Err(e) => error!("Error reading config file: {e}"),
            }
        }

        config.apply_env_vars();
        config
    }

    pub fn merge(&mut self, other: PipelineSettings) {
        if other.channels.is_some() {
            self.channels = other.channels;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
        if other.fft_size.is_some() {
            self.fft_size = other.fft_size;
        }
        if other.use_denoiser.is_some() {
            self.use_denoiser = other.use_denoiser;
        }
        if other.sample_rate.is_some() {
            self.sample_rate = other.sample_rate;
        }
        if other.performance_logging.is_some() {
            self.performance_logging = other.performance_logging;
        }
    }

    fn parse_bool(val: &str) -> Option<bool> {
        match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    fn apply_env_vars(&mut self) {
        if let Some(val) = env::var("VAD_CHANNELS").ok().and_then(|s| s.parse().ok()) {
            self.channels = Some(val);
        }
        if let Some(val) = env::var("VAD_DEBUG").ok().and_then(|s| Self::parse_bool(&s)) {
            self.debug = Some(val);
        }
        if let Some(val) = env::var("VAD_FFT_SIZE").ok().and_then(|s| s.parse().ok()) {
            self.fft_size = Some(val);
        }
        if let Some(val) = env::var("VAD_USE_DENOISER").ok().and_then(|s| Self::parse_bool(&s)) {
            self.use_denoiser = Some(val);
        }
        if let Some(val) = env::var("VAD_SAMPLE_RATE").ok().and_then(|s| s.parse().ok()) {
            self.sample_rate = Some(val);
        }
        if let Some(val) = env::var("VAD_PERFORMANCE_LOGGING")
            .ok()
            .and_then(|s| Self::parse_bool(&s))
        {
            self.performance_logging = Some(val);
        }
    }

    pub fn generate_sample_config() -> String {
        let default_config = PipelineSettings::default();
        format!(
            r#"# Trackside VAD pipeline configuration.
# Values set here can be overridden by VAD_* environment variables.

# Number of audio channels to address.
# Default: {}
channels = {}

# Enable debug logging (true/false)
# Default: {}
debug = {}

# FFT analysis window size, in samples.
# Default: {}
fft_size = {}

# Run the RNN denoiser alongside FFT analysis (true/false)
# Default: {}
use_denoiser = {}

# PCM sample rate. Must be 48000.
# Default: {}
sample_rate = {}

# Enable performance metrics collection (true/false)
# Default: {}
performance_logging = {}
"#,
            DEFAULT_CHANNELS,
            default_config.get_channels(),
            DEFAULT_DEBUG,
            default_config.get_debug(),
            DEFAULT_FFT_SIZE,
            default_config.get_fft_size(),
            DEFAULT_USE_DENOISER,
            default_config.get_use_denoiser(),
            SAMPLE_RATE,
            default_config.get_sample_rate(),
            DEFAULT_PERFORMANCE_LOGGING,
            default_config.get_performance_logging(),
        )
    }

    pub fn create_config_file(&self, path: &str) -> Result<(), VadError> {
        let content = Self::generate_sample_config();
        if let Some(parent) = Path::new(path).parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get_channels(&self) -> usize {
        self.channels.unwrap_or(DEFAULT_CHANNELS)
    }

    pub fn get_debug(&self) -> bool {
        self.debug.unwrap_or(DEFAULT_DEBUG)
    }

    pub fn get_fft_size(&self) -> usize {
        self.fft_size.unwrap_or(DEFAULT_FFT_SIZE)
    }

    pub fn get_use_denoiser(&self) -> bool {
        self.use_denoiser.unwrap_or(DEFAULT_USE_DENOISER)
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(SAMPLE_RATE)
    }

    pub fn get_performance_logging(&self) -> bool {
        self.performance_logging.unwrap_or(DEFAULT_PERFORMANCE_LOGGING)
    }

    /// Translate these ambient settings into the `PipelineConfig` the core
    /// components consume, using default VAD machine thresholds. Callers
    /// needing non-default thresholds should construct `PipelineConfig`
    /// directly instead.
    pub fn build_pipeline_config(&self) -> Result<PipelineConfig, VadError> {
        if self.get_sample_rate() != SAMPLE_RATE {
            return Err(VadError::ConfigInvalid(format!(
                "sample_rate must be {SAMPLE_RATE}, got {}",
                self.get_sample_rate()
            )));
        }

        Ok(PipelineConfig {
            sample_rate: self.get_sample_rate(),
            n_channels: self.get_channels(),
            fft_size: self.get_fft_size(),
            use_denoiser: self.get_use_denoiser(),
            vad_machine_config: VadMachineConfig::default(),
            alt_vad_machine_configs: Vec::new(),
            lookbehind_sec: 2.0,
            lookahead_sec: 2.0,
        })
    }
}
