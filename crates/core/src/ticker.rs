//! Frame pacing for hosts without a native per-frame callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::FieldError;

/// Returned by the per-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Stops a running [`FixedRateTicker`] from anywhere, including another
/// thread. Stopping is permanent.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Calls a frame callback at a fixed rate until it asks to stop, the frame
/// limit is reached, or the stop handle fires.
///
/// Deadlines advance by whole frame periods from the start instant, so a
/// slow frame shortens the next wait instead of shifting the whole schedule.
/// A frame that overruns by more than one period resets the schedule.
#[derive(Debug, Clone)]
pub struct FixedRateTicker {
    period: Option<Duration>,
    frame_limit: Option<u64>,
    stop: StopHandle,
}

impl FixedRateTicker {
    /// Returns `FieldError::InvalidConfig` unless `target_fps` is finite and
    /// positive.
    pub fn new(target_fps: f64) -> Result<Self, FieldError> {
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(FieldError::InvalidConfig(format!(
                "target_fps must be finite and positive, got {target_fps}"
            )));
        }
        Ok(Self {
            period: Some(Duration::from_secs_f64(1.0 / target_fps)),
            frame_limit: None,
            stop: StopHandle::default(),
        })
    }

    /// Runs frames back to back without sleeping. For headless rendering.
    pub fn unpaced() -> Self {
        Self {
            period: None,
            frame_limit: None,
            stop: StopHandle::default(),
        }
    }

    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Calls `frame` with the zero-based frame index and returns how many
    /// frames ran.
    pub fn run<F>(&self, mut frame: F) -> u64
    where
        F: FnMut(u64) -> TickControl,
    {
        let mut ran = 0u64;
        let mut deadline = Instant::now();
        loop {
            if self.stop.is_stopped() || self.frame_limit.is_some_and(|limit| ran >= limit) {
                break;
            }
            let control = frame(ran);
            ran += 1;
            if control == TickControl::Stop {
                break;
            }
            if let Some(period) = self.period {
                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                } else if now - deadline > period {
                    deadline = now;
                }
            }
        }
        log::debug!("ticker ran {ran} frames");
        ran
    }
}
