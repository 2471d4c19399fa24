//! One evaluation of one document, as a state machine.
//!
//! ```text
//! Pending --start--> Loaded --on_load--> Measuring --on_fonts_ready/finish--> Decided
//!    |                  |                  |    ^
//!    |                  |                  +----+ on_settle
//!    +------------------+------------------+------- detach ------> Detached
//! ```
//!
//! Exactly one [`EvalEvent::Decided`] is emitted per evaluation, unless it is
//! detached first. Re-measurements after the decision only emit
//! [`EvalEvent::HeightRefined`]. The settle measurement never ends the
//! evaluation: web fonts can still reflow the page after it.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::{QualityGate, FONTS_TIMEOUT};
use crate::rendering::RenderContext;
use crate::{ComposedDocument, RenderDecision};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    /// Nothing loaded yet
    Pending,
    /// Document loaded, rendered check not run
    Loaded,
    /// Accepted; waiting for the height to stabilize
    Measuring { last: u32 },
    /// Final; no further events
    Decided,
    /// Cancelled by the caller; no further events
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalEvent {
    Decided(RenderDecision),
    HeightRefined(u32),
}

type Sink = Box<dyn FnMut(EvalEvent) + Send>;

pub struct Evaluation {
    gate: QualityGate,
    document: ComposedDocument,
    state: EvalState,
    sink: Sink,
}

impl std::fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluation")
            .field("state", &self.state)
            .field("document", &self.document.digest())
            .finish()
    }
}

impl Evaluation {
    pub fn new(
        gate: QualityGate,
        document: ComposedDocument,
        sink: impl FnMut(EvalEvent) + Send + 'static,
    ) -> Self {
        Self {
            gate,
            document,
            state: EvalState::Pending,
            sink: Box::new(sink),
        }
    }

    pub fn state(&self) -> EvalState {
        self.state
    }

    pub fn is_measuring(&self) -> bool {
        matches!(self.state, EvalState::Measuring { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, EvalState::Decided | EvalState::Detached)
    }

    fn decide(&mut self, decision: RenderDecision, next: EvalState) {
        debug!(
            "decided: accepted={} height={:?}",
            decision.accepted, decision.measured_height
        );
        self.state = next;
        (self.sink)(EvalEvent::Decided(decision));
    }

    /// Run the pre-filter and load the document. Rejects on a missing button
    /// signature or a load failure.
    pub fn start<C>(&mut self, ctx: &mut C)
    where
        C: RenderContext + ?Sized,
    {
        if self.state != EvalState::Pending {
            return;
        }
        if !self.gate.prefilter(&self.document) {
            debug!("no button signature, rejecting before render");
            self.decide(RenderDecision::reject(), EvalState::Decided);
            return;
        }
        match ctx.load(&self.document) {
            Ok(()) => self.state = EvalState::Loaded,
            Err(e) => {
                warn!("load failed: {}", e);
                self.decide(RenderDecision::reject(), EvalState::Decided);
            }
        }
    }

    /// Load signal: run the rendered check and emit the decision.
    pub fn on_load<C>(&mut self, ctx: &mut C)
    where
        C: RenderContext + ?Sized,
    {
        if self.state != EvalState::Loaded {
            return;
        }
        let config = self.gate.config();
        let outcome = self.gate.check_rendered(ctx).and_then(|pass| {
            if !pass {
                return Ok(None);
            }
            if config.auto_height {
                self.gate.measure_height(&*ctx).map(Some)
            } else {
                Ok(Some(config.fixed_height))
            }
        });
        match outcome {
            Ok(None) => self.decide(RenderDecision::reject(), EvalState::Decided),
            Ok(Some(height)) if self.gate.config().auto_height => {
                self.decide(
                    RenderDecision::accept(height),
                    EvalState::Measuring { last: height },
                )
            }
            Ok(Some(height)) => self.decide(RenderDecision::accept(height), EvalState::Decided),
            Err(e) => {
                warn!("rendered check failed: {}", e);
                self.decide(RenderDecision::reject(), EvalState::Decided);
            }
        }
    }

    fn remeasure<C>(&mut self, ctx: &C)
    where
        C: RenderContext + ?Sized,
    {
        let EvalState::Measuring { last } = self.state else {
            return;
        };
        match self.gate.measure_height(ctx) {
            Ok(height) if height == last => debug!("height unchanged at {}px", height),
            Ok(height) => {
                debug!("height refined {}px -> {}px", last, height);
                self.state = EvalState::Measuring { last: height };
                (self.sink)(EvalEvent::HeightRefined(height));
            }
            Err(e) => warn!("re-measurement failed, keeping {}px: {}", last, e),
        }
    }

    /// Settle-delay signal: refine the height and keep measuring.
    pub fn on_settle<C>(&mut self, ctx: &C)
    where
        C: RenderContext + ?Sized,
    {
        self.remeasure(ctx);
    }

    /// Fonts-ready signal: last re-measurement, then the evaluation is final.
    pub fn on_fonts_ready<C>(&mut self, ctx: &C)
    where
        C: RenderContext + ?Sized,
    {
        self.remeasure(ctx);
        self.finish();
    }

    /// Stop measuring; the last reported height stands.
    pub fn finish(&mut self) {
        if self.is_measuring() {
            self.state = EvalState::Decided;
        }
    }

    /// Cancel. No events are emitted afterwards.
    pub fn detach(&mut self) {
        if self.state != EvalState::Detached {
            debug!("evaluation detached in {:?}", self.state);
            self.state = EvalState::Detached;
        }
    }

    /// Drive the evaluation through every signal of `ctx` in order.
    ///
    /// `after_step` runs after each transition and may call [`detach`].
    /// Settle delays are only slept on contexts whose layout can still change.
    ///
    /// [`detach`]: Evaluation::detach
    pub fn run<C>(&mut self, ctx: &mut C, mut after_step: impl FnMut(&mut Self))
    where
        C: RenderContext + ?Sized,
    {
        self.start(ctx);
        after_step(self);
        self.on_load(ctx);
        after_step(self);

        let settle = Duration::from_millis(self.gate.config().settle_delay_ms);
        let fonts_settle = Duration::from_millis(self.gate.config().fonts_settle_ms);

        if self.is_measuring() {
            if ctx.is_dynamic() {
                thread::sleep(settle);
            }
            self.on_settle(&*ctx);
            after_step(self);
        }
        if self.is_measuring() {
            match ctx.wait_for_fonts(FONTS_TIMEOUT) {
                Ok(true) => {}
                Ok(false) => debug!("fonts not ready after {:?}", FONTS_TIMEOUT),
                Err(e) => warn!("waiting for fonts failed: {}", e),
            }
            if ctx.is_dynamic() {
                thread::sleep(fonts_settle);
            }
            self.on_fonts_ready(&*ctx);
            after_step(self);
        }
        self.finish();
    }
}
