//! Thin demo binary: loads configuration, feeds synthetic PCM through
//! `AudioPipeline`, and writes out finalized recordings. A real deployment
//! would replace `next_frame` with a live capture source; everything else
//! stays the same.

use std::env;
use std::f32::consts::PI;
use std::path::Path;

use log::info;
use trackside_vad::{AudioPipeline, AudioPipelineConfig, PipelineSettings};

/// Generate one frame of synthetic PCM: silence, except for a simulated
/// burst of speech-band tone roughly in the middle of the run.
fn next_frame(n_channels: usize, frame_len: usize, sample_index: u64, sample_rate: u32) -> Vec<Vec<f32>> {
    let speech_start = sample_rate as u64 * 3;
    let speech_end = sample_rate as u64 * 5;

    (0..n_channels)
        .map(|ch| {
            (0..frame_len)
                .map(|i| {
                    let idx = sample_index + i as u64;
                    if idx >= speech_start && idx < speech_end {
                        let t = idx as f32 / sample_rate as f32;
                        let amp = 0.6 - (ch as f32 * 0.1);
                        (2.0 * PI * 220.0 * t).sin() * amp
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

fn main() {
    env_logger::init();

    let config_path = Path::new("trackside-vad.toml");
    if !config_path.exists() {
        info!("no config file found, writing defaults to {}", config_path.display());
        let settings = PipelineSettings::default();
        if let Err(e) = settings.create_config_file("trackside-vad.toml") {
            eprintln!("failed to write default config: {e}");
        }
    }

    let settings = PipelineSettings::load();
    let pipeline_config = match settings.build_pipeline_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let n_channels = settings.get_channels();
    let sample_rate = settings.get_sample_rate();

    let mut audio_pipeline = match AudioPipeline::new(AudioPipelineConfig {
        sample_rate,
        n_channels,
        ring_buffer_seconds: trackside_vad::RING_BUFFER_SECONDS,
        pipeline: pipeline_config,
    }) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("failed to build audio pipeline: {e}");
            std::process::exit(1);
        }
    };

    audio_pipeline.set_recording_callback(|buf, seg| {
        info!(
            "captured speech segment: {} samples starting at index {} (vad window {}..{})",
            buf.length(),
            buf.start_index,
            seg.start_index,
            seg.end_index
        );
    });

    let demo_seconds: u64 = env::args()
        .nth(1)
        .and_then(|a| a.parse().ok())
        .unwrap_or(8);
    let frame_len = 480;
    let total_frames = (demo_seconds * u64::from(sample_rate)) / frame_len as u64;

    let mut sample_index: u64 = 0;
    for _ in 0..total_frames {
        let frame = next_frame(n_channels, frame_len, sample_index, sample_rate);
        let refs: Vec<&[f32]> = frame.iter().map(Vec::as_slice).collect();
        if let Err(e) = audio_pipeline.push(&refs) {
            eprintln!("push failed: {e}");
            break;
        }
        sample_index += frame_len as u64;
    }

    audio_pipeline.shutdown();
}
