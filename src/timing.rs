use std::time::{Duration, Instant};

/// Frame clock for the render loop.
///
/// The first [`tick`](Self::tick) after construction reports a zero delta so
/// nothing moves before a real frame interval has been measured.
#[derive(Clone, Copy, Debug)]
pub struct FrameTiming {
    start: Instant,
    last_frame: Option<Instant>,
    delta_time: f32,
}

impl FrameTiming {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            last_frame: None,
            delta_time: 0.0,
        }
    }

    /// Advance to `now` and return the seconds since the previous tick.
    ///
    /// A timestamp earlier than the previous one yields zero instead of a
    /// negative delta.
    pub fn tick(&mut self, now: Instant) -> f32 {
        self.delta_time = match self.last_frame {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last_frame = Some(self.last_frame.map_or(now, |last| last.max(now)));
        self.delta_time
    }

    /// Seconds between the last two ticks.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Seconds from start to the most recent tick.
    pub fn elapsed(&self) -> f32 {
        self.last_frame
            .map_or(Duration::ZERO, |last| last.saturating_duration_since(self.start))
            .as_secs_f32()
    }
}
