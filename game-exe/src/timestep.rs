//! Frame timing. The demo runs tics as fast as the renderer allows, so this
//! only measures how fast that is.

use std::{fmt, time::Instant};

#[derive(Debug)]
pub struct TimeStep {
    start: Instant,
    last_time: Instant,
    delta_time: f32,
    frame_count: u32,
    frame_time: f32,
    total_frames: u32,
}

#[derive(Debug)]
pub struct FrameData {
    pub frames: u32,
    /// Average milliseconds per frame over the period
    pub avg_ms: f32,
}

impl fmt::Display for FrameData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "FrameData:\n  - frames: {}\n  - ms per frame: {:.2}",
            self.frames, self.avg_ms
        ))
    }
}

impl TimeStep {
    pub fn new() -> TimeStep {
        let now = Instant::now();
        TimeStep {
            start: now,
            last_time: now,
            delta_time: 0.0,
            frame_count: 0,
            frame_time: 0.0,
            total_frames: 0,
        }
    }

    /// Milliseconds since the last call
    pub fn delta(&mut self) -> f32 {
        let current_time = Instant::now();
        let delta = current_time.duration_since(self.last_time).as_micros() as f32 * 0.001;
        self.last_time = current_time;
        self.delta_time = delta;
        delta
    }

    /// Call once per finished frame. Returns the counts once a second.
    pub fn frame_rate(&mut self) -> Option<FrameData> {
        self.delta();
        self.frame_count += 1;
        self.total_frames += 1;
        self.frame_time += self.delta_time;
        // per second
        if self.frame_time >= 1000.0 {
            let data = FrameData {
                frames: self.frame_count,
                avg_ms: self.frame_time / self.frame_count as f32,
            };
            self.frame_count = 0;
            self.frame_time = 0.0;
            return Some(data);
        }
        None
    }

    /// Everything since `new`
    pub fn summary(&self) -> FrameData {
        let ms = self.last_time.duration_since(self.start).as_micros() as f32 * 0.001;
        FrameData {
            frames: self.total_frames,
            avg_ms: if self.total_frames == 0 {
                0.0
            } else {
                ms / self.total_frames as f32
            },
        }
    }
}

impl Default for TimeStep {
    // shutup clippy!
    fn default() -> Self {
        Self::new()
    }
}
