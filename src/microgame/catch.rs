// Catch: move a basket under falling items and catch enough of them before time runs out.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    elapsed_secs, follow_pointer, skin_key, touching, Countdown, Difficulty, Falling, FrameContext,
    Microgame, MicrogameSetup, ResultReporter,
};
use crate::campaign::SkinConfig;
use crate::error::EngineError;
use crate::types::{NormalizedCoord, Outcome, Timestamp};

const ROUND_MS: u64 = 8_000;
const TARGET: u32 = 5;
const BASKET_SIZE: f32 = 0.14;
const ITEM_SIZE: f32 = 0.06;
const BASKET_SPEED: f32 = 1.4;
const ITEM_SPEED: f32 = 0.35;
const SPAWN_EVERY_MS: u64 = 700;

const BASKET_NODE: u32 = 0;
const TIMER_NODE: u32 = 1;
const TALLY_NODE: u32 = 2;
const FIRST_ITEM_NODE: u32 = 100;

pub struct Catch {
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
    basket: NormalizedCoord,
    items: Vec<Falling>,
    caught: u32,
    next_id: u32,
}

impl Catch {
    pub fn new(setup: MicrogameSetup) -> Self {
        Catch {
            reporter: Some(setup.reporter),
            difficulty: Difficulty::from_variant(setup.variant.as_deref()),
            skin: setup.skin,
            rng: StdRng::seed_from_u64(setup.seed),
            round: None,
        }
    }

    /// Harder variants need more catches.
    fn target(&self) -> u32 {
        match self.difficulty {
            Difficulty::Easy => TARGET - 2,
            Difficulty::Normal => TARGET,
            Difficulty::Hard => TARGET + 2,
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.round = None;
        if let Some(reporter) = self.reporter.take() {
            reporter.report(outcome);
        }
    }
}

impl Microgame for Catch {
    fn start(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), EngineError> {
        if self.round.is_some() || self.reporter.is_none() {
            return Ok(());
        }
        self.round = Some(Round {
            countdown: Countdown::new(ctx.now, ROUND_MS),
            last_frame: ctx.now,
            next_spawn: ctx.now,
            basket: NormalizedCoord::new(0.5, 0.92),
            items: Vec::new(),
            caught: 0,
            next_id: FIRST_ITEM_NODE,
        });
        self.update(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let pace = self.difficulty.pace();
        let target = self.target();
        let Some(round) = self.round.as_mut() else {
            return;
        };

        let dt = elapsed_secs(ctx.now, round.last_frame);
        round.last_frame = ctx.now;
        round.basket = follow_pointer(round.basket, &ctx.input, BASKET_SPEED * dt);

        while round.next_spawn <= ctx.now {
            let x = self.rng.gen_range(0.1..0.9);
            round.items.push(Falling {
                id: round.next_id,
                position: NormalizedCoord { x, y: 0.0 },
                speed: ITEM_SPEED * pace,
            });
            round.next_id = round.next_id.wrapping_add(1).max(FIRST_ITEM_NODE);
            round.next_spawn = round
                .next_spawn
                .saturating_add(((SPAWN_EVERY_MS as f32 / pace) as u64).max(1));
        }

        for item in &mut round.items {
            item.step(dt);
        }
        let basket = round.basket;
        let before = round.items.len();
        round
            .items
            .retain(|item| !touching(&basket, BASKET_SIZE, &item.position, ITEM_SIZE));
        round.caught += (before - round.items.len()) as u32;
        round.items.retain(|item| !item.off_screen());

        if round.caught >= target {
            self.finish(Outcome::WIN);
            return;
        }
        if round.countdown.expired(ctx.now) {
            self.finish(Outcome::LOSE);
            return;
        }

        let surface = &mut *ctx.surface;
        surface.clear();
        surface.sprite(
            BASKET_NODE,
            skin_key(&self.skin, "basket", "catch.basket"),
            round.basket,
            BASKET_SIZE,
        );
        let item_key = skin_key(&self.skin, "item", "catch.item");
        for item in &round.items {
            surface.sprite(item.id, item_key, item.position, ITEM_SIZE);
        }
        surface.text(
            TIMER_NODE,
            round.countdown.display_secs(ctx.now).to_string(),
            NormalizedCoord::new(0.5, 0.05),
        );
        surface.text(
            TALLY_NODE,
            format!("{}/{}", round.caught, target),
            NormalizedCoord::new(0.9, 0.05),
        );
    }

    fn cleanup(&mut self) {
        self.round = None;
        self.reporter = None;
    }
}
