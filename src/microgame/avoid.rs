// Avoid: steer along the bottom edge and dodge falling hazards until the countdown ends.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    elapsed_secs, follow_pointer, skin_key, touching, Countdown, Difficulty, Falling, FrameContext,
    Microgame, MicrogameSetup, ResultReporter,
};
use crate::campaign::SkinConfig;
use crate::error::EngineError;
use crate::types::{NormalizedCoord, Outcome, Timestamp};

const ROUND_MS: u64 = 5_000;
const PLAYER_SIZE: f32 = 0.08;
const HAZARD_SIZE: f32 = 0.06;
const PLAYER_SPEED: f32 = 1.2;
const HAZARD_SPEED: f32 = 0.45;
const SPAWN_EVERY_MS: u64 = 450;

const PLAYER_NODE: u32 = 0;
const TIMER_NODE: u32 = 1;
const FIRST_HAZARD_NODE: u32 = 100;

pub struct Avoid {
    reporter: Option<ResultReporter>,
    skin: SkinConfig,
    difficulty: Difficulty,
    rng: StdRng,
    round: Option<Round>,
}

struct Round {
    countdown: Countdown,
    last_frame: Timestamp,
    next_spawn: Timestamp,
    player: NormalizedCoord,
    hazards: Vec<Falling>,
    next_id: u32,
}

impl Avoid {
    pub fn new(setup: MicrogameSetup) -> Self {
        Avoid {
            reporter: Some(setup.reporter),
            difficulty: Difficulty::from_variant(setup.variant.as_deref()),
            skin: setup.skin,
            rng: StdRng::seed_from_u64(setup.seed),
            round: None,
        }
    }

    fn spawn_interval(&self) -> u64 {
        (SPAWN_EVERY_MS as f32 / self.difficulty.pace()) as u64
    }

    fn finish(&mut self, outcome: Outcome) {
        self.round = None;
        if let Some(reporter) = self.reporter.take() {
            reporter.report(outcome);
        }
    }
}

impl Microgame for Avoid {
    fn start(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), EngineError> {
        if self.round.is_some() || self.reporter.is_none() {
            return Ok(());
        }
        self.round = Some(Round {
            countdown: Countdown::new(ctx.now, ROUND_MS),
            last_frame: ctx.now,
            next_spawn: ctx.now,
            player: NormalizedCoord::new(0.5, 0.9),
            hazards: Vec::new(),
            next_id: FIRST_HAZARD_NODE,
        });
        self.update(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let pace = self.difficulty.pace();
        let interval = self.spawn_interval();
        let Some(round) = self.round.as_mut() else {
            return;
        };

        let dt = elapsed_secs(ctx.now, round.last_frame);
        round.last_frame = ctx.now;
        round.player = follow_pointer(round.player, &ctx.input, PLAYER_SPEED * dt);

        while round.next_spawn <= ctx.now {
            let x = self.rng.gen_range(0.05..0.95);
            round.hazards.push(Falling {
                id: round.next_id,
                position: NormalizedCoord { x, y: 0.0 },
                speed: HAZARD_SPEED * pace * self.rng.gen_range(0.8..1.2),
            });
            round.next_id = round.next_id.wrapping_add(1).max(FIRST_HAZARD_NODE);
            round.next_spawn = round.next_spawn.saturating_add(interval.max(1));
        }

        for hazard in &mut round.hazards {
            hazard.step(dt);
        }
        round.hazards.retain(|h| !h.off_screen());

        let player = round.player;
        if round
            .hazards
            .iter()
            .any(|h| touching(&player, PLAYER_SIZE, &h.position, HAZARD_SIZE))
        {
            self.finish(Outcome::LOSE);
            return;
        }
        if round.countdown.expired(ctx.now) {
            self.finish(Outcome::WIN);
            return;
        }

        let surface = &mut *ctx.surface;
        surface.clear();
        surface.sprite(
            PLAYER_NODE,
            skin_key(&self.skin, "player", "avoid.player"),
            round.player,
            PLAYER_SIZE,
        );
        let hazard_key = skin_key(&self.skin, "hazard", "avoid.hazard");
        for hazard in &round.hazards {
            surface.sprite(hazard.id, hazard_key, hazard.position, HAZARD_SIZE);
        }
        surface.text(
            TIMER_NODE,
            round.countdown.display_secs(ctx.now).to_string(),
            NormalizedCoord::new(0.5, 0.05),
        );
    }

    fn cleanup(&mut self) {
        self.round = None;
        self.reporter = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::microgame::result_channel;
    use crate::surface::Surface;
    use crate::types::InputState;

    fn setup(seed: u64) -> (Avoid, crate::microgame::ResultSlot) {
        let (reporter, slot) = result_channel();
        let game = Avoid::new(MicrogameSetup {
            reporter,
            skin: SkinConfig::new(),
            variant: None,
            seed,
        });
        (game, slot)
    }

    #[test]
    fn start_draws_player_and_countdown() {
        let (mut game, slot) = setup(1);
        let mut surface = Surface::new();
        let mut ctx = FrameContext {
            now: Timestamp::from_millis(0),
            input: InputState::default(),
            surface: &mut surface,
        };
        game.start(&mut ctx).unwrap();
        assert!(surface
            .nodes()
            .iter()
            .any(|n| n.id == PLAYER_NODE));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn round_ends_with_exactly_one_report() {
        let (mut game, slot) = setup(42);
        let mut surface = Surface::new();
        let mut reports = 0;
        let mut now = 0;
        game.start(&mut FrameContext {
            now: Timestamp::from_millis(now),
            input: InputState::default(),
            surface: &mut surface,
        })
        .unwrap();

        // Sit still; either a hazard lands on the player or the clock runs out.
        while now <= ROUND_MS + 100 {
            now += 16;
            game.update(&mut FrameContext {
                now: Timestamp::from_millis(now),
                input: InputState::default(),
                surface: &mut surface,
            });
            if slot.take().is_some() {
                reports += 1;
            }
        }
        assert_eq!(reports, 1);
    }

    #[test]
    fn no_surface_writes_after_reporting() {
        let (mut game, slot) = setup(3);
        let mut surface = Surface::new();
        game.start(&mut FrameContext {
            now: Timestamp::from_millis(0),
            input: InputState::default(),
            surface: &mut surface,
        })
        .unwrap();
        // Jump past the countdown in one frame.
        game.update(&mut FrameContext {
            now: Timestamp::from_millis(ROUND_MS * 10),
            input: InputState::default(),
            surface: &mut surface,
        });
        assert!(slot.take().is_some());

        let revision = surface.revision();
        game.update(&mut FrameContext {
            now: Timestamp::from_millis(ROUND_MS * 11),
            input: InputState::default(),
            surface: &mut surface,
        });
        assert_eq!(surface.revision(), revision);
    }

    #[test]
    fn cleanup_is_idempotent_and_silent() {
        let (mut game, slot) = setup(5);
        game.cleanup();
        game.cleanup();
        let mut surface = Surface::new();
        game.update(&mut FrameContext {
            now: Timestamp::from_millis(ROUND_MS * 2),
            input: InputState::default(),
            surface: &mut surface,
        });
        assert_eq!(slot.take(), None);
        assert!(surface.is_empty());
    }
}
