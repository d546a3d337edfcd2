// Microgame contract: construct, start, receive frames, report once, clean up.
// Each built-in game type lives in its own module and shares the small mechanics kit below.

mod avoid;
mod catch;
mod collect;
#[cfg(test)]
pub(crate) mod scripted;

use std::cell::Cell;
use std::rc::Rc;

use crate::campaign::SkinConfig;
use crate::error::EngineError;
use crate::surface::Surface;
use crate::types::{InputState, NormalizedCoord, Outcome, Timestamp};

pub use avoid::Avoid;
pub use catch::Catch;
pub use collect::Collect;

/// A playable unit. The engine holds at most one at a time.
///
/// A unit must report through its [`ResultReporter`] exactly once, and must not touch the
/// surface after reporting. `cleanup` cancels everything the unit scheduled; it may be called
/// before `start` and more than once, and never reports.
pub trait Microgame {
    /// Begin play. The surface is empty on entry.
    fn start(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), EngineError>;

    /// Advance one animation frame.
    fn update(&mut self, ctx: &mut FrameContext<'_>);

    fn cleanup(&mut self);
}

/// Per-call access to the clock, pointer and surface. The surface borrow ends with the call.
pub struct FrameContext<'a> {
    pub now: Timestamp,
    pub input: InputState,
    pub surface: &'a mut Surface,
}

/// Everything a factory receives when the engine instantiates a unit.
pub struct MicrogameSetup {
    pub reporter: ResultReporter,
    pub skin: SkinConfig,
    pub variant: Option<String>,
    pub seed: u64,
}

/// Single-shot completion handle. Reporting consumes it.
#[derive(Debug)]
pub struct ResultReporter {
    slot: Rc<Cell<Option<Outcome>>>,
}

impl ResultReporter {
    pub fn report(self, outcome: Outcome) {
        self.slot.set(Some(outcome));
    }
}

/// Engine side of a [`ResultReporter`].
#[derive(Debug)]
pub(crate) struct ResultSlot {
    slot: Rc<Cell<Option<Outcome>>>,
}

impl ResultSlot {
    pub(crate) fn take(&self) -> Option<Outcome> {
        self.slot.take()
    }
}

/// A fresh reporter/slot pair. Each unit gets its own, so late reports from discarded units land
/// in a slot nobody reads.
pub(crate) fn result_channel() -> (ResultReporter, ResultSlot) {
    let slot = Rc::new(Cell::new(None));
    (
        ResultReporter { slot: slot.clone() },
        ResultSlot { slot },
    )
}

// =============================================================================
// Mechanics shared by the built-in games
// =============================================================================

/// Difficulty derived from the flow entry's variant id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub fn from_variant(variant: Option<&str>) -> Self {
        match variant {
            Some("easy") => Difficulty::Easy,
            Some("hard") => Difficulty::Hard,
            _ => Difficulty::Normal,
        }
    }

    /// Multiplier applied to speeds and spawn rates.
    pub fn pace(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.35,
        }
    }
}

/// The unit's own round timer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Countdown {
    started_at: Timestamp,
    duration_ms: u64,
}

impl Countdown {
    pub(crate) fn new(started_at: Timestamp, duration_ms: u64) -> Self {
        Countdown {
            started_at,
            duration_ms,
        }
    }

    pub(crate) fn remaining_ms(&self, now: Timestamp) -> u64 {
        self.duration_ms
            .saturating_sub(now.saturating_since(self.started_at))
    }

    pub(crate) fn expired(&self, now: Timestamp) -> bool {
        self.remaining_ms(now) == 0
    }

    /// Whole seconds left, rounded up, for the on-screen counter.
    pub(crate) fn display_secs(&self, now: Timestamp) -> u64 {
        self.remaining_ms(now).div_ceil(1000)
    }
}

/// Something moving straight down the surface.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Falling {
    pub id: u32,
    pub position: NormalizedCoord,
    /// Normalized units per second.
    pub speed: f32,
}

impl Falling {
    pub(crate) fn step(&mut self, dt_secs: f32) {
        // Not clamped: objects leave through the bottom edge.
        self.position.y += self.speed * dt_secs;
    }

    pub(crate) fn off_screen(&self) -> bool {
        self.position.y > 1.05
    }
}

/// Move `current` horizontally toward the pointer, limited to `max_step`.
pub(crate) fn follow_pointer(current: NormalizedCoord, input: &InputState, max_step: f32) -> NormalizedCoord {
    match input.pointer {
        Some(target) => {
            let dx = (target.x - current.x).clamp(-max_step, max_step);
            NormalizedCoord::new(current.x + dx, current.y)
        }
        None => current,
    }
}

pub(crate) fn touching(a: &NormalizedCoord, a_size: f32, b: &NormalizedCoord, b_size: f32) -> bool {
    a.distance(b) < (a_size + b_size) / 2.0
}

/// Skin lookup with the game's built-in asset as fallback.
pub(crate) fn skin_key<'a>(skin: &'a SkinConfig, name: &str, fallback: &'a str) -> &'a str {
    skin.get(name).map(String::as_str).unwrap_or(fallback)
}

pub(crate) fn elapsed_secs(now: Timestamp, last_frame: Timestamp) -> f32 {
    // Long stalls (tab in background) are capped so objects do not teleport.
    (now.saturating_since(last_frame).min(100)) as f32 / 1000.0
}
