use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic audio clock: frames rendered so far, shared between the audio
/// thread (which advances it) and the control thread (which reads it).
#[derive(Debug, Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: f32,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Seconds since the first rendered frame.
    pub fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub(crate) fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_counter() {
        let clock = AudioClock::new(1_000.0);
        let reader = clock.clone();
        clock.advance(500);
        assert_eq!(reader.frames(), 500);
        assert_eq!(reader.now(), 0.5);
    }
}
