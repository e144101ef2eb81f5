use web_time::{Duration, Instant};

/// Counts frames over fixed sampling windows.
#[derive(Clone, Debug)]
pub struct FrameSampler {
    window: Duration,
    window_start: Instant,
    frames: u32,
}

impl FrameSampler {
    pub fn new(start: Instant, window: Duration) -> Self {
        Self {
            window,
            window_start: start,
            frames: 0,
        }
    }

    /// Records one frame. Once a full window has elapsed, returns the frame
    /// rate over it and starts a new window at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        let fps = (self.frames as f64 / elapsed.as_secs_f64()).round() as u32;
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Disable,
}

/// Consecutive-low-window policy. Only mobile devices can trip it.
#[derive(Clone, Debug)]
pub struct FpsWatchdog {
    threshold: u32,
    limit: u32,
    streak: u32,
}

impl FpsWatchdog {
    pub fn new(threshold: u32, limit: u32) -> Self {
        Self {
            threshold,
            limit,
            streak: 0,
        }
    }

    pub fn observe(&mut self, fps: u32, is_mobile: bool) -> Verdict {
        if is_mobile && fps < self.threshold {
            self.streak += 1;
            if self.streak >= self.limit {
                return Verdict::Disable;
            }
        } else {
            self.streak = 0;
        }
        Verdict::Keep
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_reports_once_per_window() {
        let t0 = Instant::now();
        let mut s = FrameSampler::new(t0, Duration::from_secs(1));
        let mut reports = Vec::new();
        for i in 1..=40u32 {
            if let Some(fps) = s.tick(t0 + Duration::from_millis(50) * i) {
                reports.push(fps);
            }
        }
        assert_eq!(reports, vec![20, 20]);
    }

    #[test]
    fn sampler_scales_by_elapsed_time() {
        let t0 = Instant::now();
        let mut s = FrameSampler::new(t0, Duration::from_secs(1));
        for _ in 0..29 {
            assert_eq!(s.tick(t0 + Duration::from_millis(10)), None);
        }
        // 30 frames over two seconds.
        assert_eq!(s.tick(t0 + Duration::from_secs(2)), Some(15));
    }

    #[test]
    fn three_low_windows_disable_on_mobile() {
        let mut w = FpsWatchdog::new(30, 3);
        assert_eq!(w.observe(20, true), Verdict::Keep);
        assert_eq!(w.observe(20, true), Verdict::Keep);
        assert_eq!(w.observe(20, true), Verdict::Disable);
    }

    #[test]
    fn good_window_resets_streak() {
        let mut w = FpsWatchdog::new(30, 3);
        w.observe(20, true);
        w.observe(20, true);
        assert_eq!(w.observe(45, true), Verdict::Keep);
        assert_eq!(w.streak(), 0);
        assert_eq!(w.observe(20, true), Verdict::Keep);
        assert_eq!(w.observe(30, true), Verdict::Keep);
        assert_eq!(w.streak(), 0);
    }

    #[test]
    fn desktop_never_trips() {
        let mut w = FpsWatchdog::new(30, 3);
        for _ in 0..10 {
            assert_eq!(w.observe(5, false), Verdict::Keep);
        }
        assert_eq!(w.streak(), 0);
    }
}
