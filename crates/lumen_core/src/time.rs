use std::time::{Duration, Instant};

/// Number of frames averaged by [`FrameStats`].
pub const AVERAGED_FRAMES: usize = 25;

pub struct Time {
    last_update: Instant,
    delta: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            last_update: Instant::now(),
            delta: Duration::ZERO,
        }
    }
}

impl Time {
    /// Called by the engine loop once per frame
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_update;
        self.last_update = now;
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }
}

/// Rolling average over the last [`AVERAGED_FRAMES`] frame lengths.
#[derive(Debug, Clone)]
pub struct FrameStats {
    lengths: [f64; AVERAGED_FRAMES],
    next: usize,
    frames: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            lengths: [0.0; AVERAGED_FRAMES],
            next: 0,
            frames: 0,
        }
    }
}

impl FrameStats {
    pub fn record(&mut self, frame_length: Duration) {
        self.lengths[self.next] = frame_length.as_secs_f64();
        self.next = (self.next + 1) % AVERAGED_FRAMES;
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// `(average frame seconds, average fps)`, once the window is full.
    pub fn average(&self) -> Option<(f64, f64)> {
        if self.frames < AVERAGED_FRAMES as u64 {
            return None;
        }
        let average = self.lengths.iter().sum::<f64>() / AVERAGED_FRAMES as f64;
        if average <= 0.0 {
            return None;
        }
        Some((average, 1.0 / average))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_needs_a_full_window() {
        let mut stats = FrameStats::default();
        for _ in 0..AVERAGED_FRAMES - 1 {
            stats.record(Duration::from_millis(10));
        }
        assert!(stats.average().is_none());

        stats.record(Duration::from_millis(10));
        let (seconds, fps) = stats.average().unwrap();
        assert!((seconds - 0.010).abs() < 1e-9);
        assert!((fps - 100.0).abs() < 1e-6);
    }

    #[test]
    fn oldest_frames_fall_out_of_the_window() {
        let mut stats = FrameStats::default();
        for _ in 0..AVERAGED_FRAMES {
            stats.record(Duration::from_millis(40));
        }
        for _ in 0..AVERAGED_FRAMES {
            stats.record(Duration::from_millis(20));
        }
        let (seconds, _) = stats.average().unwrap();
        assert!((seconds - 0.020).abs() < 1e-9);
    }
}
