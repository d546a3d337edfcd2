// macrogame_core: Rust/WASM playback engine for macrogame campaigns.
// Sequencing, scoring and the microgames live here; the JS host paints views and plays sound.

mod audio;
mod campaign;
mod engine;
mod error;
mod events;
mod microgame;
mod phase;
mod registry;
mod surface;
mod types;

use std::rc::Rc;

use wasm_bindgen::prelude::*;

pub use audio::{AudioBackend, AudioDirector, JsAudioBackend, NullAudio, SoundEffect};
pub use campaign::{
    CampaignDefinition, MicrogameReference, PerGameConfig, PointRule, ScreenAudio, ScreenConfig,
    SkinConfig,
};
pub use engine::{MicrogameView, PlaybackEngine, ScreenView, ViewState};
pub use error::{AudioError, EngineError};
pub use events::EngineEvent;
pub use microgame::{
    Avoid, Catch, Collect, Difficulty, FrameContext, Microgame, MicrogameSetup, ResultReporter,
};
pub use phase::{transition, FlowPlan, Phase, ScreenKey, Step, Trigger};
pub use registry::{MicrogameFactory, MicrogameRegistry, RegistryBuilder};
pub use surface::{NodeKind, Surface, SurfaceNode};
pub use types::*;

thread_local! {
    // Built once per thread (the browser main thread) and shared by every player.
    static BUILTIN_REGISTRY: Rc<MicrogameRegistry> = Rc::new(MicrogameRegistry::with_builtins());
}

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Playback engine exposed to JavaScript.
/// Times are the host's `performance.now()` milliseconds. State crosses the boundary as JSON.
#[wasm_bindgen]
pub struct MacrogamePlayer {
    engine: PlaybackEngine,
}

#[wasm_bindgen]
impl MacrogamePlayer {
    #[wasm_bindgen(constructor)]
    pub fn new(campaign_json: &str) -> Result<MacrogamePlayer, JsValue> {
        let campaign = CampaignDefinition::from_json(campaign_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid campaign: {}", e)))?;
        let registry = BUILTIN_REGISTRY.with(Rc::clone);

        let engine = PlaybackEngine::new(campaign, registry, Box::new(NullAudio))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(MacrogamePlayer { engine })
    }

    /// Route sound through a host object with `playLoop`, `stopLoop`, `playEffect`, `setMuted`.
    #[wasm_bindgen(js_name = setAudio)]
    pub fn set_audio(&mut self, target: JsValue) {
        self.engine
            .set_audio_backend(Box::new(JsAudioBackend::new(target)));
    }

    pub fn start(&mut self, now_ms: f64) {
        self.engine.start(Timestamp::from_host_millis(now_ms));
    }

    /// Animation frame with the pointer in normalized surface coordinates.
    /// Pass `NaN` coordinates when the pointer is outside the surface.
    pub fn frame(&mut self, now_ms: f64, pointer_x: f32, pointer_y: f32, pressed: bool) {
        let pointer = if pointer_x.is_nan() || pointer_y.is_nan() {
            None
        } else {
            Some(NormalizedCoord::new(pointer_x, pointer_y))
        };
        self.engine.update(
            Timestamp::from_host_millis(now_ms),
            &InputState { pointer, pressed },
        );
    }

    pub fn tick(&mut self, now_ms: f64) {
        self.engine.tick(Timestamp::from_host_millis(now_ms));
    }

    /// Click-to-continue. Returns whether the click advanced the sequence.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        self.engine.advance(Timestamp::from_host_millis(now_ms))
    }

    pub fn restart(&mut self, now_ms: f64) -> Result<(), JsValue> {
        self.engine
            .restart(Timestamp::from_host_millis(now_ms))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&mut self) -> bool {
        self.engine.toggle_mute()
    }

    pub fn teardown(&mut self) {
        self.engine.teardown();
    }

    /// Milliseconds timestamp of the next scheduled transition, if any.
    #[wasm_bindgen(js_name = nextDeadline)]
    pub fn next_deadline(&self) -> Option<f64> {
        self.engine
            .next_deadline()
            .map(|t| t.as_millis() as f64)
    }

    #[wasm_bindgen(js_name = viewJson)]
    pub fn view_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.view())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = surfaceJson)]
    pub fn surface_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.engine.surface())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Events since the last call, oldest first.
    #[wasm_bindgen(js_name = drainEventsJson)]
    pub fn drain_events_json(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.drain_events())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPAIGN: &str = r#"{
        "perGameConfig": { "titleDurationMs": 0, "controlsDurationMs": 0 },
        "flow": [{ "microgameId": "collect", "pointRules": { "win": 50 } }]
    }"#;

    #[test]
    fn player_creation_works() {
        let player = MacrogamePlayer::new(CAMPAIGN);
        assert!(player.is_ok());
    }

    #[test]
    fn player_reports_view_and_events_as_json() {
        let mut player = MacrogamePlayer::new(CAMPAIGN).unwrap();
        player.start(0.0);
        player.frame(16.0, f32::NAN, f32::NAN, false);

        let view: serde_json::Value = serde_json::from_str(&player.view_json().unwrap()).unwrap();
        assert_eq!(view["phase"], "playing");
        assert_eq!(view["microgame"]["microgameId"], "collect");

        let surface: serde_json::Value =
            serde_json::from_str(&player.surface_json().unwrap()).unwrap();
        assert!(!surface["nodes"].as_array().unwrap().is_empty());

        let events: Vec<EngineEvent> =
            serde_json::from_str(&player.drain_events_json().unwrap()).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::UnitStarted { index: 0, .. })));
        assert_eq!(player.next_deadline(), None);
    }

    #[test]
    fn player_teardown_stops_everything() {
        let mut player = MacrogamePlayer::new(CAMPAIGN).unwrap();
        player.start(0.0);
        player.teardown();
        player.tick(60_000.0);
        let view: serde_json::Value = serde_json::from_str(&player.view_json().unwrap()).unwrap();
        assert_eq!(view["phase"], "playing");
    }
}
