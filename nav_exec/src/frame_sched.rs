//! # Frame Scheduling
//!
//! Detection dominates the cost of a cycle, so only every `skip_factor`-th frame is fully
//! processed. The remaining frames only update the frame rate counter.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length of the window over which the frame rate is measured.
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decides which frames get full processing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameScheduler {
    skip_factor: u64,
}

/// Rolling frame rate counter.
///
/// Counts frames over a window of `FPS_WINDOW`, publishing the count when the window closes.
#[derive(Debug, Copy, Clone)]
pub struct FpsCounter {
    window_start: Instant,

    frames_in_window: u32,

    fps: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameAction {
    /// Run detection and steering on this frame
    Process,

    /// Only update the frame rate counters
    DisplayOnly,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameScheduler {
    /// Create a new scheduler, clamping `skip_factor` to at least 1.
    pub fn new(skip_factor: u32) -> Self {
        Self {
            skip_factor: skip_factor.max(1) as u64,
        }
    }

    pub fn skip_factor(&self) -> u64 {
        self.skip_factor
    }

    /// Decide what to do with the frame at `frame_index`.
    pub fn action(&self, frame_index: u64) -> FrameAction {
        if frame_index % self.skip_factor == 0 {
            FrameAction::Process
        } else {
            FrameAction::DisplayOnly
        }
    }
}

impl FpsCounter {
    /// Start counting from `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames_in_window: 0,
            fps: 0,
        }
    }

    /// Count one frame captured at `now`, returning the current frame rate.
    pub fn tick(&mut self, now: Instant) -> u32 {
        self.frames_in_window += 1;

        if now.saturating_duration_since(self.window_start) >= FPS_WINDOW {
            self.fps = self.frames_in_window;
            self.frames_in_window = 0;
            self.window_start = now;
        }

        self.fps
    }

    /// Frame rate over the last completed window.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_skip_factor_three() {
        let sched = FrameScheduler::new(3);

        let processed: Vec<u64> = (0..12)
            .filter(|&i| sched.action(i) == FrameAction::Process)
            .collect();

        assert_eq!(processed, vec![0, 3, 6, 9]);
        assert_eq!(sched.action(10), FrameAction::DisplayOnly);
    }

    #[test]
    fn test_skip_factor_clamped() {
        let sched = FrameScheduler::new(0);

        assert_eq!(sched.skip_factor(), 1);
        assert!((0..10).all(|i| sched.action(i) == FrameAction::Process));
    }

    #[test]
    fn test_fps_window() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);

        // 25 frames spread over the first second
        for i in 0..24 {
            assert_eq!(fps.tick(start + Duration::from_millis(i * 40)), 0);
        }
        assert_eq!(fps.tick(start + Duration::from_millis(1000)), 25);

        // Published value holds until the next window closes
        assert_eq!(fps.tick(start + Duration::from_millis(1500)), 25);
        assert_eq!(fps.tick(start + Duration::from_millis(2000)), 2);
        assert_eq!(fps.fps(), 2);
    }
}
