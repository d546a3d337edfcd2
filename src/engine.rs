// Playback engine: applies the phase machine to a campaign, owns the timer, the surface,
// the active microgame and the audio director.
// Single-threaded and host-clocked. Every public entry point ends by draining due work.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::audio::{AudioBackend, AudioDirector, SoundEffect};
use crate::campaign::CampaignDefinition;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::microgame::{result_channel, FrameContext, Microgame, MicrogameSetup, ResultSlot};
use crate::phase::{transition, FlowPlan, Phase, Step, Trigger};
use crate::registry::MicrogameRegistry;
use crate::surface::Surface;
use crate::types::{InputState, MicrogameId, Outcome, Timestamp};

/// What the renderer paints. Re-read after every `PhaseChanged` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub phase: Phase,
    pub score: i64,
    pub current_index: usize,
    pub total: usize,
    /// Entry being introduced, played or scored.
    pub microgame: Option<MicrogameView>,
    pub last_result: Option<Outcome>,
    /// Intro or promo content.
    pub screen: Option<ScreenView>,
    /// The current entry could not be played and is being passed over.
    pub skipped: bool,
    pub muted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrogameView {
    pub microgame_id: MicrogameId,
    pub variant_id: Option<String>,
    pub controls_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenView {
    pub text: String,
    pub background_image: Option<String>,
    pub click_to_continue: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// The current phase's configured duration.
    Phase,
    SkipGrace,
    Watchdog,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    due: Timestamp,
    kind: TimerKind,
}

struct ActiveUnit {
    unit: Box<dyn Microgame>,
    results: ResultSlot,
    index: usize,
}

#[derive(Debug, Clone)]
struct Session {
    phase: Phase,
    cursor: usize,
    score: i64,
    last_result: Option<Outcome>,
    skipped: bool,
}

impl Session {
    fn fresh() -> Self {
        Session {
            phase: Phase::Loading,
            cursor: 0,
            score: 0,
            last_result: None,
            skipped: false,
        }
    }
}

/// Sequences intro, per-microgame screens, play, promo and end for one campaign.
pub struct PlaybackEngine {
    campaign: CampaignDefinition,
    plan: FlowPlan,
    registry: Rc<MicrogameRegistry>,
    audio: AudioDirector,
    surface: Surface,
    session: Session,
    active: Option<ActiveUnit>,
    timer: Option<PendingTimer>,
    events: Vec<EngineEvent>,
    now: Timestamp,
    torn_down: bool,
}

impl PlaybackEngine {
    pub fn new(
        campaign: CampaignDefinition,
        registry: Rc<MicrogameRegistry>,
        audio: Box<dyn AudioBackend>,
    ) -> Result<Self, EngineError> {
        campaign.validate()?;
        for entry in &campaign.flow {
            if !registry.contains(&entry.microgame_id) {
                tracing::warn!(microgame = %entry.microgame_id, "flow references an unregistered microgame; it will be skipped");
            }
        }
        Ok(PlaybackEngine {
            plan: campaign.plan(),
            campaign,
            registry,
            audio: AudioDirector::new(audio),
            surface: Surface::new(),
            session: Session::fresh(),
            active: None,
            timer: None,
            events: Vec::new(),
            now: Timestamp::default(),
            torn_down: false,
        })
    }

    // -------------------------------------------------------------------------
    // Host intents
    // -------------------------------------------------------------------------

    /// Begin playback, or start over from the top if already running.
    pub fn start(&mut self, now: Timestamp) {
        self.clock(now);
        self.reset();
        tracing::info!(entries = self.plan.flow_len, "playback started");
        self.apply(Trigger::Start, self.now);
        self.pump();
    }

    /// Play again from the end screen.
    pub fn restart(&mut self, now: Timestamp) -> Result<(), EngineError> {
        let step = transition(self.session.phase, self.session.cursor, &self.plan, Trigger::Restart)
            .filter(|_| !self.torn_down)
            .ok_or(EngineError::InvalidTransition {
                phase: self.session.phase,
                action: "restart",
            })?;
        self.clock(now);
        self.reset();
        tracing::info!("playback restarted");
        self.enter(step, self.now);
        self.pump();
        Ok(())
    }

    /// Animation frame: hand the frame to the active microgame, then run due transitions.
    pub fn update(&mut self, now: Timestamp, input: &InputState) {
        if self.torn_down {
            return;
        }
        self.clock(now);
        if self.session.phase == Phase::Playing {
            if let Some(active) = self.active.as_mut() {
                let mut ctx = FrameContext {
                    now: self.now,
                    input: *input,
                    surface: &mut self.surface,
                };
                active.unit.update(&mut ctx);
            }
        }
        self.pump();
    }

    /// Run due transitions without delivering a frame.
    pub fn tick(&mut self, now: Timestamp) {
        if self.torn_down {
            return;
        }
        self.clock(now);
        self.pump();
    }

    /// Click-to-continue on intro or promo. Returns whether the click advanced the sequence.
    pub fn advance(&mut self, now: Timestamp) -> bool {
        if self.torn_down {
            return false;
        }
        // Overdue timers fire before the click is judged.
        self.clock(now);
        self.pump();
        let clickable = match self.session.phase {
            Phase::Intro => self.campaign.intro_config.click_to_continue,
            Phase::Promo => self.campaign.promo_config.click_to_continue,
            _ => false,
        };
        if !clickable {
            return false;
        }
        self.apply(Trigger::Continue, self.now);
        self.pump();
        true
    }

    /// Mute or unmute sound. The phase is unaffected; ignored after teardown.
    pub fn toggle_mute(&mut self) -> bool {
        if self.torn_down {
            return self.audio.is_muted();
        }
        let muted = self.audio.toggle_mute();
        self.events.push(EngineEvent::MuteChanged { muted });
        muted
    }

    /// Replace the audio backend, e.g. once the host has unlocked audio.
    pub fn set_audio_backend(&mut self, backend: Box<dyn AudioBackend>) {
        self.audio.replace_backend(backend);
        if !self.torn_down {
            let track = self
                .session
                .phase
                .screen_key()
                .and_then(|key| self.campaign.resolve_track(key));
            self.audio.enter(track);
        }
    }

    /// Host unmount. Cancels the timer, cleans up the active unit and silences audio.
    /// Nothing happens afterwards until `start` is called again.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.release_all();
        self.torn_down = true;
        tracing::info!(phase = ?self.session.phase, "playback torn down");
    }

    // -------------------------------------------------------------------------
    // Read side
    // -------------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn score(&self) -> i64 {
        self.session.score
    }

    pub fn current_index(&self) -> usize {
        self.session.cursor
    }

    pub fn last_result(&self) -> Option<Outcome> {
        self.session.last_result
    }

    pub fn is_muted(&self) -> bool {
        self.audio.is_muted()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn has_active_unit(&self) -> bool {
        self.active.is_some()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn campaign(&self) -> &CampaignDefinition {
        &self.campaign
    }

    /// When the pending timer fires, if any. Hosts may sleep until then.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        if self.torn_down {
            return None;
        }
        self.timer.map(|t| t.due)
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn view(&self) -> ViewState {
        let phase = self.session.phase;
        let microgame = match phase {
            Phase::Title | Phase::Controls | Phase::Playing | Phase::Result => {
                self.campaign.flow.get(self.session.cursor).map(|entry| MicrogameView {
                    microgame_id: entry.microgame_id.clone(),
                    variant_id: entry.variant_id.clone(),
                    controls_text: entry.controls_text.clone(),
                })
            }
            _ => None,
        };
        let screen = match phase {
            Phase::Intro => Some(&self.campaign.intro_config),
            Phase::Promo => Some(&self.campaign.promo_config),
            _ => None,
        }
        .map(|config| ScreenView {
            text: config.text.clone(),
            background_image: config.background_image.clone(),
            click_to_continue: config.click_to_continue,
        });

        ViewState {
            phase,
            score: self.session.score,
            current_index: self.session.cursor,
            total: self.plan.flow_len,
            microgame,
            last_result: self.session.last_result,
            screen,
            skipped: self.session.skipped,
            muted: self.audio.is_muted(),
        }
    }

    // -------------------------------------------------------------------------
    // Sequencing
    // -------------------------------------------------------------------------

    fn clock(&mut self, now: Timestamp) {
        // Host clocks can jitter backwards; never let time regress.
        self.now = self.now.max(now);
    }

    fn reset(&mut self) {
        self.release_all();
        self.session = Session::fresh();
        self.torn_down = false;
    }

    fn release_all(&mut self) {
        if let Some(active) = self.active.take() {
            self.dispose(active);
        }
        self.timer = None;
        self.audio.stop();
        self.surface.clear();
    }

    /// Run everything that is due: unit results first, then expired timers, until idle.
    fn pump(&mut self) {
        while !self.torn_down {
            if let Some(outcome) = self.poll_unit() {
                self.finish_unit(outcome);
                continue;
            }
            match self.timer {
                Some(timer) if timer.due <= self.now => {
                    self.timer = None;
                    self.fire(timer);
                }
                _ => return,
            }
        }
    }

    fn poll_unit(&self) -> Option<Outcome> {
        if self.session.phase != Phase::Playing {
            return None;
        }
        self.active.as_ref().and_then(|active| active.results.take())
    }

    fn fire(&mut self, timer: PendingTimer) {
        match timer.kind {
            TimerKind::Phase => self.apply(Trigger::TimerElapsed, timer.due),
            TimerKind::SkipGrace => self.apply(Trigger::SkipElapsed, timer.due),
            TimerKind::Watchdog => {
                let index = self.session.cursor;
                tracing::warn!(index, "microgame never reported; forcing a loss");
                self.events.push(EngineEvent::UnitStalled { index });
                self.finish_unit(Outcome::LOSE);
            }
        }
    }

    fn apply(&mut self, trigger: Trigger, at: Timestamp) {
        match transition(self.session.phase, self.session.cursor, &self.plan, trigger) {
            Some(step) => self.enter(step, at),
            None => tracing::debug!(?trigger, phase = ?self.session.phase, "trigger ignored"),
        }
    }

    fn enter(&mut self, step: Step, at: Timestamp) {
        let Step { phase, cursor } = step;
        self.session.phase = phase;
        self.session.cursor = cursor;
        self.session.skipped = false;
        self.events.push(EngineEvent::PhaseChanged {
            phase,
            index: cursor,
        });
        tracing::debug!(?phase, index = cursor, "phase entered");

        let track = phase
            .screen_key()
            .and_then(|key| self.campaign.resolve_track(key));
        self.audio.enter(track);

        let per_game = &self.campaign.per_game_config;
        let delay = match phase {
            Phase::Intro => self.campaign.intro_config.timer_ms(),
            Phase::Title => Some(per_game.title_duration_ms),
            Phase::Controls => Some(per_game.controls_duration_ms),
            Phase::Result => Some(per_game.result_duration_ms),
            Phase::Promo => self.campaign.promo_config.timer_ms(),
            Phase::Loading | Phase::Playing | Phase::End => None,
        };
        self.schedule(TimerKind::Phase, delay, at);

        match phase {
            Phase::Playing => self.launch(cursor),
            Phase::Result => {
                let effect = match self.session.last_result {
                    Some(Outcome { win: true }) => SoundEffect::Win,
                    _ => SoundEffect::Lose,
                };
                self.audio.effect(effect);
            }
            Phase::End => tracing::info!(score = self.session.score, "playback finished"),
            _ => {}
        }
    }

    fn schedule(&mut self, kind: TimerKind, delay_ms: Option<u64>, at: Timestamp) {
        self.timer = delay_ms.map(|ms| PendingTimer {
            due: at.saturating_add(ms),
            kind,
        });
    }

    /// Instantiate and start the unit for `index`. Any failure turns into a skip.
    fn launch(&mut self, index: usize) {
        let Some(entry) = self.campaign.flow.get(index) else {
            return;
        };
        let microgame_id = entry.microgame_id.clone();
        let (reporter, results) = result_channel();
        let setup = MicrogameSetup {
            reporter,
            skin: entry.skin.clone(),
            variant: entry.variant_id.clone(),
            seed: self.campaign.seed.wrapping_add(index as u64),
        };

        // Hand over an empty surface.
        self.surface.clear();
        let mut unit = match self.registry.spawn(&microgame_id, setup) {
            Ok(unit) => unit,
            Err(err) => return self.skip(index, microgame_id, err),
        };

        let mut ctx = FrameContext {
            now: self.now,
            input: InputState::default(),
            surface: &mut self.surface,
        };
        if let Err(err) = unit.start(&mut ctx) {
            unit.cleanup();
            self.surface.clear();
            return self.skip(index, microgame_id, err);
        }

        tracing::debug!(index, microgame = %microgame_id, "microgame started");
        self.events.push(EngineEvent::UnitStarted {
            index,
            microgame_id,
        });
        self.active = Some(ActiveUnit {
            unit,
            results,
            index,
        });
        let stall_timeout = self.campaign.per_game_config.stall_timeout_ms;
        self.schedule(TimerKind::Watchdog, stall_timeout, self.now);
    }

    fn skip(&mut self, index: usize, microgame_id: MicrogameId, err: EngineError) {
        tracing::warn!(index, microgame = %microgame_id, error = %err, "skipping flow entry");
        self.events.push(EngineEvent::UnitSkipped {
            index,
            microgame_id,
            reason: err.to_string(),
        });
        self.session.skipped = true;
        let grace = self.campaign.per_game_config.skip_grace_ms;
        self.schedule(TimerKind::SkipGrace, Some(grace), self.now);
    }

    /// Score the active unit, release it, and move to the result screen.
    fn finish_unit(&mut self, outcome: Outcome) {
        let Some(active) = self.active.take() else {
            return;
        };
        let index = active.index;
        self.dispose(active);
        self.timer = None;

        let points = self.campaign.points_for(index, outcome);
        self.session.score = self.session.score.saturating_add(points);
        self.session.last_result = Some(outcome);
        self.events.push(EngineEvent::UnitFinished {
            index,
            outcome,
            points,
        });
        if points != 0 {
            self.events.push(EngineEvent::ScoreChanged {
                score: self.session.score,
            });
        }
        self.apply(Trigger::UnitFinished, self.now);
    }

    fn dispose(&mut self, mut active: ActiveUnit) {
        active.unit.cleanup();
        self.surface.clear();
    }
}
