//! Sound module - notification clips and audio output seams.
//!
//! The player drives one notification sink; remote-party audio goes
//! through its own seam. With the `tones` feature enabled, a cpal-backed
//! sink synthesizes the clips on the default output device.
//!

mod player;
mod tone;

#[cfg(feature = "tones")]
mod cpal_sink;

pub use player::{AudioSink, NullSink, RemoteAudioSink, SoundClip, SoundPlayer};
pub use tone::{CadenceSeg, ToneGen, ToneSpec};

#[cfg(feature = "tones")]
pub use cpal_sink::{SoundError, ToneSink};
