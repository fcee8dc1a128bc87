//! Sound Player - notification clips and audio sink seams.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::signaling::MediaStream;

// ============================================================================
// CLIPS
// ============================================================================

/// The four fixed notification clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundClip {
    /// Incoming call alert, looped while ringing.
    Ringing,
    /// Played once when a call ends.
    Rejected,
    /// Outgoing call progress tone, looped while dialing.
    Ringback,
    /// Played once when a call is answered.
    Answered,
}

impl SoundClip {
    /// Static asset filename for sinks that play files.
    pub fn asset_name(self) -> &'static str {
        match self {
            SoundClip::Ringing => "ringing.ogg",
            SoundClip::Rejected => "rejected.mp3",
            SoundClip::Ringback => "ringback.ogg",
            SoundClip::Answered => "answered.mp3",
        }
    }

    pub fn asset_path(self) -> String {
        format!("assets/sounds/{}", self.asset_name())
    }
}

// ============================================================================
// SINK SEAMS
// ============================================================================

/// The notification audio element.
///
/// `play` always interrupts whatever is currently audible; both calls are
/// fire-and-forget, playback problems stay inside the sink.
pub trait AudioSink: Send + Sync {
    fn play(&self, clip: SoundClip, looping: bool);
    fn stop(&self);
}

/// The remote-party audio element, fed by the library's media stream.
pub trait RemoteAudioSink: Send + Sync {
    fn attach(&self, stream: &MediaStream);
    fn detach(&self);
}

/// Sink that only logs. Default when the host wires no audio output.
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, clip: SoundClip, looping: bool) {
        tracing::debug!(clip = clip.asset_name(), looping, "play (no audio sink)");
    }

    fn stop(&self) {
        tracing::debug!("stop (no audio sink)");
    }
}

impl RemoteAudioSink for NullSink {
    fn attach(&self, stream: &MediaStream) {
        tracing::debug!(stream = stream.id(), "remote stream discarded (no audio sink)");
    }

    fn detach(&self) {}
}

// ============================================================================
// PLAYER
// ============================================================================

/// Drives one [`AudioSink`] and tracks what is currently playing.
///
/// No queuing: a new play request always interrupts the previous one.
pub struct SoundPlayer {
    sink: Arc<dyn AudioSink>,
    current: Mutex<Option<(SoundClip, bool)>>,
}

impl SoundPlayer {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            current: Mutex::new(None),
        }
    }

    pub fn play(&self, clip: SoundClip, looping: bool) {
        self.sink.stop();
        *self.current.lock() = Some((clip, looping));
        self.sink.play(clip, looping);
    }

    pub fn stop(&self) {
        self.sink.stop();
        *self.current.lock() = None;
    }

    /// The clip currently playing and its loop flag, if any.
    pub fn current(&self) -> Option<(SoundClip, bool)> {
        *self.current.lock()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        log: Mutex<Vec<String>>,
    }

    impl AudioSink for RecordingSink {
        fn play(&self, clip: SoundClip, looping: bool) {
            self.log
                .lock()
                .push(format!("play {} loop={}", clip.asset_name(), looping));
        }

        fn stop(&self) {
            self.log.lock().push("stop".to_string());
        }
    }

    #[test]
    fn play_interrupts_previous_clip() {
        let sink = Arc::new(RecordingSink::default());
        let player = SoundPlayer::new(Arc::clone(&sink) as Arc<dyn AudioSink>);

        player.play(SoundClip::Ringback, true);
        player.play(SoundClip::Answered, false);

        let log = sink.log.lock().clone();
        assert_eq!(
            log,
            vec![
                "stop",
                "play ringback.ogg loop=true",
                "stop",
                "play answered.mp3 loop=false",
            ]
        );
        assert_eq!(player.current(), Some((SoundClip::Answered, false)));
    }

    #[test]
    fn stop_clears_current_clip() {
        let player = SoundPlayer::new(Arc::new(NullSink));

        player.play(SoundClip::Ringing, true);
        player.stop();

        assert_eq!(player.current(), None);
    }

    #[test]
    fn clip_asset_names_are_fixed() {
        assert_eq!(SoundClip::Ringing.asset_name(), "ringing.ogg");
        assert_eq!(SoundClip::Rejected.asset_name(), "rejected.mp3");
        assert_eq!(SoundClip::Ringback.asset_name(), "ringback.ogg");
        assert_eq!(SoundClip::Answered.asset_name(), "answered.mp3");
        assert_eq!(SoundClip::Ringing.asset_path(), "assets/sounds/ringing.ogg");
    }
}
