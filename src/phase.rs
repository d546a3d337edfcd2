// Playback state machine as a tagged union plus one pure transition function.
// The engine applies side effects (timers, units, audio); this module only decides where to go.

use serde::{Deserialize, Serialize};

/// Current state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Constructed but not started. Never re-entered.
    Loading,
    Intro,
    /// Per-microgame title card.
    Title,
    /// Per-microgame controls card.
    Controls,
    /// A microgame owns the surface.
    Playing,
    /// Win/lose card for the microgame that just finished.
    Result,
    Promo,
    /// Terminal. Only a restart leaves it.
    End,
}

impl Phase {
    /// Key used to look up per-screen audio. `Loading` has no screen.
    pub fn screen_key(&self) -> Option<ScreenKey> {
        match self {
            Phase::Loading => None,
            Phase::Intro => Some(ScreenKey::Intro),
            Phase::Title => Some(ScreenKey::Title),
            Phase::Controls => Some(ScreenKey::Controls),
            Phase::Playing => Some(ScreenKey::Game),
            Phase::Result => Some(ScreenKey::Result),
            Phase::Promo => Some(ScreenKey::Promo),
            Phase::End => Some(ScreenKey::End),
        }
    }
}

/// Screen identifiers used by the campaign's audio configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenKey {
    Intro,
    Title,
    Controls,
    Game,
    Result,
    Promo,
    End,
}

/// Everything that can move the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    /// Play-again intent from the end screen.
    Restart,
    /// The phase's configured duration elapsed.
    TimerElapsed,
    /// Click-to-continue on intro/promo.
    Continue,
    /// The active unit reported (or was forced to) an outcome.
    UnitFinished,
    /// Grace period after a flow entry could not be played.
    SkipElapsed,
}

/// The parts of a campaign the machine needs to pick successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowPlan {
    pub flow_len: usize,
    pub intro_enabled: bool,
    pub promo_enabled: bool,
}

/// Destination of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub phase: Phase,
    pub cursor: usize,
}

impl Step {
    fn to(phase: Phase, cursor: usize) -> Option<Step> {
        Some(Step { phase, cursor })
    }
}

/// Decide the successor of `phase` for `trigger`. `None` means the trigger is ignored there.
pub fn transition(phase: Phase, cursor: usize, plan: &FlowPlan, trigger: Trigger) -> Option<Step> {
    match (phase, trigger) {
        (_, Trigger::Start) | (Phase::End, Trigger::Restart) => {
            if plan.intro_enabled {
                Step::to(Phase::Intro, 0)
            } else {
                first_game_or_outro(plan)
            }
        }
        (Phase::Intro, Trigger::TimerElapsed | Trigger::Continue) => first_game_or_outro(plan),
        (Phase::Title, Trigger::TimerElapsed) => Step::to(Phase::Controls, cursor),
        (Phase::Controls, Trigger::TimerElapsed) => Step::to(Phase::Playing, cursor),
        (Phase::Playing, Trigger::UnitFinished) => Step::to(Phase::Result, cursor),
        (Phase::Playing, Trigger::SkipElapsed) | (Phase::Result, Trigger::TimerElapsed) => {
            next_game_or_outro(cursor, plan)
        }
        (Phase::Promo, Trigger::TimerElapsed | Trigger::Continue) => {
            Step::to(Phase::End, plan.flow_len)
        }
        _ => None,
    }
}

fn first_game_or_outro(plan: &FlowPlan) -> Option<Step> {
    if plan.flow_len > 0 {
        Step::to(Phase::Title, 0)
    } else {
        outro(plan)
    }
}

fn next_game_or_outro(cursor: usize, plan: &FlowPlan) -> Option<Step> {
    let next = cursor + 1;
    if next < plan.flow_len {
        Step::to(Phase::Title, next)
    } else {
        outro(plan)
    }
}

fn outro(plan: &FlowPlan) -> Option<Step> {
    if plan.promo_enabled {
        Step::to(Phase::Promo, plan.flow_len)
    } else {
        Step::to(Phase::End, plan.flow_len)
    }
}
