// Background track and one-shot effects. Sound is best effort: every failure is logged and
// dropped, and nothing in sequencing waits on audio.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::AudioError;
use crate::types::TrackId;

/// Short non-looping cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundEffect {
    Win,
    Lose,
}

impl SoundEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundEffect::Win => "win",
            SoundEffect::Lose => "lose",
        }
    }
}

/// Whatever actually makes sound.
pub trait AudioBackend {
    /// Start looping `track`, replacing nothing; the director stops the old loop first.
    fn play_loop(&mut self, track: &TrackId) -> Result<(), AudioError>;
    fn stop_loop(&mut self) -> Result<(), AudioError>;
    fn play_effect(&mut self, effect: SoundEffect) -> Result<(), AudioError>;
    fn set_muted(&mut self, muted: bool) -> Result<(), AudioError>;
}

/// Backend for hosts without sound.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioBackend for NullAudio {
    fn play_loop(&mut self, _track: &TrackId) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop_loop(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn play_effect(&mut self, _effect: SoundEffect) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_muted(&mut self, _muted: bool) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Tracks which loop is playing so it is only swapped when the resolved track changes.
pub struct AudioDirector {
    backend: Box<dyn AudioBackend>,
    current: Option<TrackId>,
    muted: bool,
}

impl AudioDirector {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        AudioDirector {
            backend,
            current: None,
            muted: false,
        }
    }

    pub fn replace_backend(&mut self, backend: Box<dyn AudioBackend>) {
        self.stop();
        self.backend = backend;
        if self.muted {
            swallow("set_muted", self.backend.set_muted(true));
        }
    }

    /// Make `desired` the looping track. No-op when it is already playing.
    pub fn enter(&mut self, desired: Option<&TrackId>) {
        if self.current.as_ref() == desired {
            return;
        }
        if self.current.take().is_some() {
            swallow("stop_loop", self.backend.stop_loop());
        }
        if let Some(track) = desired {
            tracing::debug!(track = %track, "starting background loop");
            swallow("play_loop", self.backend.play_loop(track));
            // Recorded even on failure so a rejected track is not retried every phase.
            self.current = Some(track.clone());
        }
    }

    /// Play a cue. Suppressed while muted.
    pub fn effect(&mut self, effect: SoundEffect) {
        if self.muted {
            return;
        }
        swallow("play_effect", self.backend.play_effect(effect));
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        swallow("set_muted", self.backend.set_muted(self.muted));
        self.muted
    }

    pub fn stop(&mut self) {
        if self.current.take().is_some() {
            swallow("stop_loop", self.backend.stop_loop());
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn current_track(&self) -> Option<&TrackId> {
        self.current.as_ref()
    }
}

fn swallow(operation: &'static str, result: Result<(), AudioError>) {
    if let Err(err) = result {
        tracing::warn!(operation, error = %err, "audio failure ignored");
    }
}

// =============================================================================
// JS Bridge
// =============================================================================

/// Forwards audio calls to a host object exposing `playLoop(track)`, `stopLoop()`,
/// `playEffect(name)` and `setMuted(flag)`. Missing methods are reported as unavailable.
/// A returned promise that rejects (autoplay policy) is caught and logged.
pub struct JsAudioBackend {
    target: JsValue,
}

impl JsAudioBackend {
    pub fn new(target: JsValue) -> Self {
        JsAudioBackend { target }
    }

    fn call(&self, method: &'static str, arg: Option<JsValue>) -> Result<(), AudioError> {
        let func = js_sys::Reflect::get(&self.target, &JsValue::from_str(method))
            .map_err(|e| AudioError::Unavailable(format!("{}: {:?}", method, e)))?;
        let func: js_sys::Function = func
            .dyn_into()
            .map_err(|_| AudioError::Unavailable(format!("{} is not a function", method)))?;

        let returned = match arg {
            Some(arg) => func.call1(&self.target, &arg),
            None => func.call0(&self.target),
        }
        .map_err(|e| AudioError::Rejected(format!("{}: {:?}", method, e)))?;

        if let Ok(promise) = returned.dyn_into::<js_sys::Promise>() {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    tracing::warn!(method, error = ?e, "audio promise rejected");
                }
            });
        }
        Ok(())
    }
}

impl AudioBackend for JsAudioBackend {
    fn play_loop(&mut self, track: &TrackId) -> Result<(), AudioError> {
        self.call("playLoop", Some(JsValue::from_str(track.as_str())))
    }

    fn stop_loop(&mut self) -> Result<(), AudioError> {
        self.call("stopLoop", None)
    }

    fn play_effect(&mut self, effect: SoundEffect) -> Result<(), AudioError> {
        self.call("playEffect", Some(JsValue::from_str(effect.as_str())))
    }

    fn set_muted(&mut self, muted: bool) -> Result<(), AudioError> {
        self.call("setMuted", Some(JsValue::from_bool(muted)))
    }
}
