//! Fixed-rate polling for hosts without their own scheduler.

use std::task::Poll;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::driver::{PipelineRun, PipelineTask};
use crate::error::PipelineResult;

/// Polls a task once per frame, the way a game loop would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLoop {
    frame: Duration,
    max_frames: Option<u64>,
}

/// Result of [`FrameLoop::drive`].
#[derive(Debug)]
pub struct FrameReport {
    /// Frames that ended with the task still pending.
    pub frames: u64,
    pub output: PipelineResult<PipelineRun>,
}

impl Default for FrameLoop {
    /// 60 frames per second, unbounded.
    fn default() -> Self {
        Self::new(Duration::from_micros(16_667))
    }
}

impl FrameLoop {
    #[must_use]
    pub const fn new(frame: Duration) -> Self {
        Self {
            frame,
            max_frames: None,
        }
    }

    /// Cancels the task once it has been pending for `max_frames` frames.
    /// The loop keeps polling until the cancelled run settles.
    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    #[must_use]
    pub const fn frame(&self) -> Duration {
        self.frame
    }

    /// Polls `task` until it completes.
    pub fn drive(&self, task: &mut PipelineTask) -> FrameReport {
        self.drive_with(task, |_| {})
    }

    /// Like [`drive`](Self::drive), calling `on_frame` with the frame number
    /// after every frame the task stayed pending.
    pub fn drive_with(
        &self,
        task: &mut PipelineTask,
        mut on_frame: impl FnMut(u64),
    ) -> FrameReport {
        let mut frames = 0;
        let mut next = Instant::now();
        loop {
            if let Poll::Ready(output) = task.advance() {
                return FrameReport { frames, output };
            }
            frames += 1;
            on_frame(frames);

            if self.max_frames.is_some_and(|max| frames >= max)
                && !task.cancel_token().is_cancelled()
            {
                debug!(frames, "frame limit reached, cancelling");
                task.cancel();
            }

            next += self.frame;
            match next.checked_duration_since(Instant::now()) {
                Some(wait) if !wait.is_zero() => thread::sleep(wait),
                _ => thread::yield_now(),
            }
        }
    }
}
