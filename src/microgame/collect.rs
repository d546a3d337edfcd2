// Collect: touch every scattered collectible with the pointer before time runs out.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    skin_key, touching, Countdown, Difficulty, FrameContext, Microgame, MicrogameSetup,
    ResultReporter,
};
use crate::campaign::SkinConfig;
use crate::error::EngineError;
use crate::types::{NormalizedCoord, Outcome};

const ROUND_MS: u64 = 6_000;
const PIECES: u32 = 6;
const PIECE_SIZE: f32 = 0.08;
const POINTER_SIZE: f32 = 0.04;

const TIMER_NODE: u32 = 1;
const FIRST_PIECE_NODE: u32 = 100;

pub struct Collect {
    reporter: Option<ResultReporter>,
    skin: SkinConfig,
    difficulty: Difficulty,
    rng: StdRng,
    round: Option<Round>,
}

struct Round {
    countdown: Countdown,
    pieces: Vec<(u32, NormalizedCoord)>,
}

impl Collect {
    pub fn new(setup: MicrogameSetup) -> Self {
        Collect {
            reporter: Some(setup.reporter),
            difficulty: Difficulty::from_variant(setup.variant.as_deref()),
            skin: setup.skin,
            rng: StdRng::seed_from_u64(setup.seed),
            round: None,
        }
    }

    fn round_ms(&self) -> u64 {
        (ROUND_MS as f32 / self.difficulty.pace()) as u64
    }

    fn finish(&mut self, outcome: Outcome) {
        self.round = None;
        if let Some(reporter) = self.reporter.take() {
            reporter.report(outcome);
        }
    }
}

impl Microgame for Collect {
    fn start(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), EngineError> {
        if self.round.is_some() || self.reporter.is_none() {
            return Ok(());
        }
        let pieces = (0..PIECES)
            .map(|i| {
                let x = self.rng.gen_range(0.1..0.9);
                let y = self.rng.gen_range(0.15..0.9);
                (FIRST_PIECE_NODE + i, NormalizedCoord::new(x, y))
            })
            .collect();
        self.round = Some(Round {
            countdown: Countdown::new(ctx.now, self.round_ms()),
            pieces,
        });
        self.update(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let Some(round) = self.round.as_mut() else {
            return;
        };

        if let Some(pointer) = ctx.input.pointer {
            round
                .pieces
                .retain(|(_, at)| !touching(&pointer, POINTER_SIZE, at, PIECE_SIZE));
        }

        if round.pieces.is_empty() {
            self.finish(Outcome::WIN);
            return;
        }
        if round.countdown.expired(ctx.now) {
            self.finish(Outcome::LOSE);
            return;
        }

        let surface = &mut *ctx.surface;
        surface.clear();
        let key = skin_key(&self.skin, "piece", "collect.piece");
        for (id, at) in &round.pieces {
            surface.sprite(*id, key, *at, PIECE_SIZE);
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
