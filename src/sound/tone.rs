//! Tone patterns for the synthesized notification clips.
//!
//! Each clip is a set of sine frequencies gated by an on/off cadence. The
//! generator is pure sample math so it can be tested without an audio
//! device; the cpal sink feeds it into an output stream.

use std::f32::consts::TAU;

use super::player::SoundClip;

/// Output amplitude of a single tone segment.
const AMPLITUDE: f32 = 0.2;

/// One on/off segment of a cadence, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct CadenceSeg {
    pub on: bool,
    pub secs: f32,
}

const fn on(secs: f32) -> CadenceSeg {
    CadenceSeg { on: true, secs }
}

const fn off(secs: f32) -> CadenceSeg {
    CadenceSeg { on: false, secs }
}

/// Frequencies and cadence of one notification clip.
#[derive(Debug, Clone, Copy)]
pub struct ToneSpec {
    pub freqs: &'static [f32],
    pub cadence: &'static [CadenceSeg],
}

/// Dual-frequency ring cadence, 2s on / 4s off.
static RINGING: ToneSpec = ToneSpec {
    freqs: &[440.0, 480.0],
    cadence: &[on(2.0), off(4.0)],
};

/// Single-frequency ringback, 1s on / 4s off.
static RINGBACK: ToneSpec = ToneSpec {
    freqs: &[425.0],
    cadence: &[on(1.0), off(4.0)],
};

/// Three busy-tone bursts.
static REJECTED: ToneSpec = ToneSpec {
    freqs: &[480.0, 620.0],
    cadence: &[on(0.5), off(0.5), on(0.5), off(0.5), on(0.5)],
};

/// Short double beep.
static ANSWERED: ToneSpec = ToneSpec {
    freqs: &[800.0],
    cadence: &[on(0.15), off(0.1), on(0.15)],
};

impl ToneSpec {
    pub fn for_clip(clip: SoundClip) -> &'static ToneSpec {
        match clip {
            SoundClip::Ringing => &RINGING,
            SoundClip::Ringback => &RINGBACK,
            SoundClip::Rejected => &REJECTED,
            SoundClip::Answered => &ANSWERED,
        }
    }

    /// Duration of one full pass over the cadence.
    pub fn pattern_secs(&self) -> f32 {
        self.cadence.iter().map(|seg| seg.secs).sum()
    }

    fn is_on_at(&self, t: f32) -> bool {
        let mut rem = t % self.pattern_secs();
        for seg in self.cadence {
            if rem < seg.secs {
                return seg.on;
            }
            rem -= seg.secs;
        }
        false
    }
}

/// Sample-by-sample generator for one clip.
pub struct ToneGen {
    spec: &'static ToneSpec,
    sample_rate: f32,
    looping: bool,
    pos: u64,
    done: bool,
}

impl ToneGen {
    pub fn new(clip: SoundClip, sample_rate: f32, looping: bool) -> Self {
        Self {
            spec: ToneSpec::for_clip(clip),
            sample_rate,
            looping,
            pos: 0,
            done: false,
        }
    }

    pub fn spec(&self) -> &'static ToneSpec {
        self.spec
    }

    /// True once a non-looping clip has played its full pattern.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Produces the next mono sample; silence after a one-shot finishes.
    pub fn next_sample(&mut self) -> f32 {
        let t = self.pos as f32 / self.sample_rate;
        if !self.looping && t >= self.spec.pattern_secs() {
            self.done = true;
            return 0.0;
        }
        self.pos += 1;

        if !self.spec.is_on_at(t) {
            return 0.0;
        }

        let per_freq = AMPLITUDE / self.spec.freqs.len() as f32;
        self.spec
            .freqs
            .iter()
            .map(|f| (TAU * f * t).sin() * per_freq)
            .sum()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f32 = 48000.0;

    #[test]
    fn one_shot_finishes_after_its_pattern() {
        let mut gen = ToneGen::new(SoundClip::Answered, RATE, false);
        let pattern_samples = (gen.spec().pattern_secs() * RATE) as usize;

        for _ in 0..pattern_samples {
            gen.next_sample();
        }
        assert!(!gen.is_done());

        gen.next_sample();
        assert!(gen.is_done());
        assert_eq!(gen.next_sample(), 0.0);
    }

    #[test]
    fn looping_clip_never_finishes() {
        let mut gen = ToneGen::new(SoundClip::Ringback, RATE, true);
        let two_patterns = (gen.spec().pattern_secs() * RATE * 2.0) as usize;

        for _ in 0..two_patterns {
            gen.next_sample();
        }
        assert!(!gen.is_done());
    }

    #[test]
    fn off_segments_are_silent() {
        // ringback is on for 1s, off for 4s
        let mut gen = ToneGen::new(SoundClip::Ringback, RATE, true);
        let mut heard_tone = false;

        for i in 0..(5.0 * RATE) as usize {
            let sample = gen.next_sample();
            let t = i as f32 / RATE;
            if t < 0.999 {
                heard_tone |= sample.abs() > 0.0;
            } else if t > 1.001 {
                assert_eq!(sample, 0.0, "expected silence at t={}", t);
            }
        }
        assert!(heard_tone);
    }

    #[test]
    fn samples_stay_within_amplitude() {
        let mut gen = ToneGen::new(SoundClip::Ringing, RATE, true);
        for _ in 0..RATE as usize {
            assert!(gen.next_sample().abs() <= AMPLITUDE + f32::EPSILON);
        }
    }
}
