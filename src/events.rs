// Event stream queued for the host. Drained in batches to minimize JS↔WASM crossings.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::types::{MicrogameId, Outcome};

/// Something the renderer may want to react to. Raw errors never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Re-read the view after this.
    PhaseChanged { phase: Phase, index: usize },
    #[serde(rename_all = "camelCase")]
    UnitStarted { index: usize, microgame_id: MicrogameId },
    /// The entry could not be played and will be passed over.
    #[serde(rename_all = "camelCase")]
    UnitSkipped {
        index: usize,
        microgame_id: MicrogameId,
        reason: String,
    },
    UnitFinished {
        index: usize,
        outcome: Outcome,
        points: i64,
    },
    /// The unit never reported and the watchdog forced a loss.
    UnitStalled { index: usize },
    ScoreChanged { score: i64 },
    MuteChanged { muted: bool },
}
