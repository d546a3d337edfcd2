// Test-only microgame with a fixed script and shared call counters.

use std::cell::RefCell;
use std::rc::Rc;

use super::{FrameContext, Microgame, MicrogameSetup, ResultReporter};
use crate::error::EngineError;
use crate::types::{MicrogameId, NormalizedCoord, Outcome, Timestamp};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// Report from inside `start`.
    Immediately(Outcome),
    /// Report on the first frame at least `ms` after start.
    After { ms: u64, outcome: Outcome },
    /// Never report.
    Stall,
    /// Fail `start`.
    FailStart,
}

#[derive(Debug, Default)]
pub(crate) struct UnitStats {
    /// Cleanup calls per constructed instance, in construction order.
    pub cleanups: Vec<u32>,
    pub started: Vec<MicrogameId>,
    pub frames: u32,
    pub live: u32,
    pub max_live: u32,
    /// Set when a unit saw a non-empty surface at start.
    pub dirty_start: bool,
}

pub(crate) type SharedStats = Rc<RefCell<UnitStats>>;

pub(crate) struct ScriptedUnit {
    id: MicrogameId,
    instance: usize,
    script: Script,
    reporter: Option<ResultReporter>,
    started_at: Option<Timestamp>,
    stats: SharedStats,
}

impl ScriptedUnit {
    pub(crate) fn new(id: MicrogameId, script: Script, setup: MicrogameSetup, stats: SharedStats) -> Self {
        let instance = {
            let mut s = stats.borrow_mut();
            s.cleanups.push(0);
            s.cleanups.len() - 1
        };
        ScriptedUnit {
            id,
            instance,
            script,
            reporter: Some(setup.reporter),
            started_at: None,
            stats,
        }
    }

    fn report(&mut self, outcome: Outcome) {
        if let Some(reporter) = self.reporter.take() {
            reporter.report(outcome);
        }
    }
}

impl Microgame for ScriptedUnit {
    fn start(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), EngineError> {
        if let Script::FailStart = self.script {
            return Err(EngineError::UnitFailed {
                microgame_id: self.id.clone(),
                message: "scripted start failure".to_string(),
            });
        }
        {
            let mut s = self.stats.borrow_mut();
            s.started.push(self.id.clone());
            s.live += 1;
            s.max_live = s.max_live.max(s.live);
            s.dirty_start |= !ctx.surface.is_empty();
        }
        self.started_at = Some(ctx.now);
        ctx.surface.sprite(0, self.id.as_str(), NormalizedCoord::center(), 0.1);
        if let Script::Immediately(outcome) = self.script {
            self.report(outcome);
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.stats.borrow_mut().frames += 1;
        if let (Script::After { ms, outcome }, Some(at)) = (self.script, self.started_at) {
            if ctx.now.saturating_since(at) >= ms {
                self.report(outcome);
            }
        }
    }

    fn cleanup(&mut self) {
        let mut s = self.stats.borrow_mut();
        s.cleanups[self.instance] += 1;
        if self.started_at.take().is_some() {
            s.live -= 1;
        }
        self.reporter = None;
    }
}
