//! Scripted host events for headless runs, and the summary printed after.
//!
//! A script is a JSON array of events keyed by the frame they fire before:
//!
//! ```json
//! [
//!   {"frame": 0,  "type": "move",   "x": 640, "y": 240},
//!   {"frame": 30, "type": "click",  "x": 640, "y": 240},
//!   {"frame": 90, "type": "leave"},
//!   {"frame": 120, "type": "resize", "width": 800, "height": 600}
//! ]
//! ```

use serde::{Deserialize, Serialize};
use starfield_core::{Field, FixedContainer, FixedRateTicker, Surface, TickControl};

/// Something the host would report to the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Move { x: f64, y: f64 },
    Leave,
    Click { x: f64, y: f64 },
    Resize { width: f64, height: f64 },
}

/// An event and the frame it is delivered before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub frame: u64,
    #[serde(flatten)]
    pub event: HostEvent,
}

/// Events ordered by frame. Events sharing a frame keep their file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    events: Vec<ScheduledEvent>,
}

impl Script {
    pub fn new(mut events: Vec<ScheduledEvent>) -> Self {
        events.sort_by_key(|e| e.frame);
        Self { events }
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events scheduled for exactly `frame`.
    pub fn due(&self, frame: u64) -> impl Iterator<Item = &HostEvent> {
        let start = self.events.partition_point(|e| e.frame < frame);
        self.events[start..]
            .iter()
            .take_while(move |e| e.frame == frame)
            .map(|e| &e.event)
    }
}

/// Counters gathered while a script plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Playback {
    pub frames: u64,
    pub events: usize,
    pub kicked: usize,
}

/// Delivers one event to the field.
pub fn apply<S: Surface>(field: &mut Field<FixedContainer, S>, event: &HostEvent) -> usize {
    match *event {
        HostEvent::Move { x, y } => field.handle_pointer_move(x, y),
        HostEvent::Leave => field.handle_pointer_leave(),
        HostEvent::Click { x, y } => return field.handle_click(x, y).kicked,
        HostEvent::Resize { width, height } => {
            *field.container_mut() = FixedContainer::new(width, height);
            field.handle_resize();
        }
    }
    0
}

/// Runs the ticker, delivering each frame's events and then ticking.
/// `before_tick` sees the surface right before each tick.
pub fn play<S: Surface>(
    field: &mut Field<FixedContainer, S>,
    script: &Script,
    ticker: &FixedRateTicker,
    mut before_tick: impl FnMut(&mut S),
) -> Playback {
    let mut events = 0;
    let mut kicked = 0;
    let frames = ticker.run(|frame| {
        for event in script.due(frame) {
            log::trace!("frame {frame}: {event:?}");
            kicked += apply(field, event);
            events += 1;
        }
        before_tick(field.surface_mut());
        field.tick();
        TickControl::Continue
    });
    Playback {
        frames,
        events,
        kicked,
    }
}

/// End-of-run state of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub particles: usize,
    pub width: f64,
    pub height: f64,
    pub events: usize,
    pub kicked: usize,
    pub mean_speed: f64,
    pub mean_offset: f64,
    pub pointer: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_commands: Option<usize>,
}

impl RunSummary {
    pub fn new<S>(field: &Field<FixedContainer, S>, playback: Playback) -> Self {
        let particles = field.particles();
        let n = particles.len().max(1) as f64;
        let mean_speed = particles.iter().map(|p| p.velocity().length()).sum::<f64>() / n;
        let mean_offset = particles
            .iter()
            .map(|p| (p.position() - p.base_position()).length())
            .sum::<f64>()
            / n;
        Self {
            frames: playback.frames,
            particles: particles.len(),
            width: field.extent().width(),
            height: field.extent().height(),
            events: playback.events,
            kicked: playback.kicked,
            mean_speed,
            mean_offset,
            pointer: field.pointer().position().map(|p| [p.x, p.y]),
            draw_commands: None,
        }
    }

    pub fn with_draw_commands(mut self, count: usize) -> Self {
        self.draw_commands = Some(count);
        self
    }
}
