//! Synthesized tone sink on the default output device.
//!
//! cpal streams are not `Send`, so a dedicated audio thread owns the
//! device and the active stream and is driven over a channel. Playback
//! problems are logged; the sink API stays fire-and-forget.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig, SupportedStreamConfigRange};
use thiserror::Error;

use super::player::{AudioSink, SoundClip};
use super::tone::ToneGen;

/// Preferred output sample rate.
const SAMPLE_RATE: u32 = 48_000;

/// Grace period added to one-shot clips before the stream is dropped.
const ONE_SHOT_TAIL: Duration = Duration::from_millis(100);

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("unsupported audio configuration: {0}")]
    UnsupportedConfig(String),

    #[error("failed to build audio stream: {0}")]
    StreamBuild(String),

    #[error("failed to start audio stream: {0}")]
    StreamPlay(String),

    #[error("failed to spawn audio thread: {0}")]
    Thread(#[from] std::io::Error),
}

// ============================================================================
// TONE SINK
// ============================================================================

enum SinkCommand {
    Play { clip: SoundClip, looping: bool },
    Stop,
}

/// [`AudioSink`] that synthesizes each clip as a tone cadence.
pub struct ToneSink {
    tx: mpsc::Sender<SinkCommand>,
}

impl ToneSink {
    pub fn new() -> Result<Self, SoundError> {
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("softphone-tones".to_string())
            .spawn(move || worker(rx))?;

        Ok(Self { tx })
    }
}

impl AudioSink for ToneSink {
    fn play(&self, clip: SoundClip, looping: bool) {
        let _ = self.tx.send(SinkCommand::Play { clip, looping });
    }

    fn stop(&self) {
        let _ = self.tx.send(SinkCommand::Stop);
    }
}

// ============================================================================
// AUDIO THREAD
// ============================================================================

fn worker(rx: mpsc::Receiver<SinkCommand>) {
    let host = cpal::default_host();
    // the stream must stay alive while a clip plays; dropping it stops output
    let mut stream: Option<Stream> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(d) => match rx.recv_timeout(d.saturating_duration_since(Instant::now())) {
                Ok(cmd) => cmd,
                Err(RecvTimeoutError::Timeout) => {
                    // one-shot clip finished
                    stream = None;
                    deadline = None;
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => break,
            },
        };

        match command {
            SinkCommand::Play { clip, looping } => {
                stream = None;
                deadline = None;
                match build_stream(&host, clip, looping) {
                    Ok((new_stream, pattern_secs)) => {
                        stream = Some(new_stream);
                        if !looping {
                            deadline = Some(
                                Instant::now()
                                    + Duration::from_secs_f32(pattern_secs)
                                    + ONE_SHOT_TAIL,
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(clip = clip.asset_name(), "tone playback failed: {}", e);
                    }
                }
            }
            SinkCommand::Stop => {
                stream = None;
                deadline = None;
            }
        }
    }

    drop(stream);
}

fn build_stream(
    host: &cpal::Host,
    clip: SoundClip,
    looping: bool,
) -> Result<(Stream, f32), SoundError> {
    let device = host
        .default_output_device()
        .ok_or(SoundError::NoOutputDevice)?;

    let config = find_output_config(&device)?;
    let channels = config.channels as usize;

    let mut tones = ToneGen::new(clip, config.sample_rate.0 as f32, looping);
    let pattern_secs = tones.spec().pattern_secs();

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = tones.next_sample();
                    for slot in frame {
                        *slot = sample;
                    }
                }
            },
            |err| {
                tracing::error!("tone output error: {}", err);
            },
            None,
        )
        .map_err(|e| SoundError::StreamBuild(e.to_string()))?;

    stream
        .play()
        .map_err(|e| SoundError::StreamPlay(e.to_string()))?;

    Ok((stream, pattern_secs))
}

/// Picks an f32 output configuration, preferring 48kHz.
fn find_output_config(device: &cpal::Device) -> Result<StreamConfig, SoundError> {
    let configs: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(|e| SoundError::UnsupportedConfig(e.to_string()))?
        .collect();

    let target_rate = cpal::SampleRate(SAMPLE_RATE);

    for config in &configs {
        if config.sample_format() == SampleFormat::F32
            && config.min_sample_rate() <= target_rate
            && config.max_sample_rate() >= target_rate
        {
            return Ok(config.with_sample_rate(target_rate).into());
        }
    }

    for config in &configs {
        if config.sample_format() == SampleFormat::F32 {
            return Ok(config.with_max_sample_rate().into());
        }
    }

    Err(SoundError::UnsupportedConfig(
        "no f32 output configuration available".to_string(),
    ))
}
