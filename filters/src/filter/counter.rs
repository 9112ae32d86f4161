use std::num::NonZeroU32;

/// Per-instance frame counter gating a periodic side effect.
///
/// Starts one short of the interval so the very first frame fires, then
/// fires again every `interval` frames: with an interval of 100 that is
/// frames 1, 101, 201, ...
#[derive(Debug, Clone)]
pub struct FrameCounter {
    count: u32,
    interval: u32,
}

impl FrameCounter {
    pub fn new(interval: NonZeroU32) -> Self {
        let interval = interval.get();
        Self {
            count: interval - 1,
            interval,
        }
    }

    /// Count one frame. Returns `true` when the side effect should run.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.interval {
            self.count = 0;
            true
        } else {
            false
        }
    }
}
