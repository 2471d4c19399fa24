//! Async previewer backed by a dedicated worker thread.
//!
//! The worker owns the rendering context (headless Chrome tabs are not
//! `Send`) and runs evaluations one after another. Each evaluation reports
//! through a [`PreviewHandle`]: the decision arrives on a oneshot channel,
//! height refinements on a watch channel. Dropping the handle detaches the
//! evaluation at its next transition.

use std::sync::mpsc::{self, Sender};
use std::thread;

use log::{debug, warn};
use tokio::sync::{oneshot, watch};

use crate::gate::{EvalEvent, Evaluation, QualityGate};
use crate::rendering::RenderContext;
use crate::{
    compose_snippet, new_context, Backend, ComposedDocument, Error, PreviewConfig,
    RenderDecision, Result, Snippet,
};

enum Command {
    Evaluate {
        document: ComposedDocument,
        decision: oneshot::Sender<RenderDecision>,
        heights: watch::Sender<Option<u32>>,
    },
    Close(oneshot::Sender<Result<()>>),
}

/// Pending outcome of one evaluation.
#[derive(Debug)]
pub struct PreviewHandle {
    decision: oneshot::Receiver<RenderDecision>,
    heights: watch::Receiver<Option<u32>>,
}

impl PreviewHandle {
    /// Latest reported height, updated on the decision and each refinement.
    /// Keep a clone to follow refinements after awaiting the decision.
    pub fn heights(&self) -> watch::Receiver<Option<u32>> {
        self.heights.clone()
    }

    /// Wait for the decision. `None` when the worker went away first.
    pub async fn decision(self) -> Option<RenderDecision> {
        self.decision.await.ok()
    }

    /// Wait for the decision and every height refinement after it. The
    /// returned height is the last one measured.
    pub async fn settled(self) -> Option<RenderDecision> {
        let mut heights = self.heights;
        let mut decision = self.decision.await.ok()?;
        if decision.accepted {
            // the sender drops when the worker is done measuring
            while heights.changed().await.is_ok() {}
            if let Some(h) = *heights.borrow() {
                decision.measured_height = Some(h);
            }
        }
        Some(decision)
    }

    /// Give up on the evaluation. The worker stops at its next transition
    /// and emits nothing further.
    pub fn detach(self) {
        drop(self);
    }
}

/// An async-friendly previewer.
///
/// Clones share the same worker and therefore the same rendering context.
#[derive(Clone)]
pub struct Previewer {
    cmd_tx: Sender<Command>,
    config: PreviewConfig,
}

impl Previewer {
    /// Spawn a worker thread and build its rendering context with `factory`.
    pub async fn new<F>(config: PreviewConfig, factory: F) -> Result<Self>
    where
        F: FnOnce(&PreviewConfig) -> Result<Box<dyn RenderContext>> + Send + 'static,
    {
        config.validate()?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();
        let worker_config = config.clone();

        thread::spawn(move || {
            let mut ctx = match factory(&worker_config) {
                Ok(ctx) => ctx,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            let gate = QualityGate::new(worker_config);
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Evaluate {
                        document,
                        decision,
                        heights,
                    } => run_evaluation(&mut *ctx, &gate, document, decision, heights),
                    Command::Close(resp) => {
                        ctx.unload();
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
            debug!("preview worker exiting");
        });

        init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx, config })
    }

    /// Previewer over a built-in backend.
    pub async fn with_backend(config: PreviewConfig, backend: Backend) -> Result<Self> {
        Self::new(config, move |cfg| new_context(backend, cfg)).await
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Compose `snippet` and queue it for evaluation.
    pub fn preview(&self, snippet: &Snippet) -> PreviewHandle {
        self.evaluate(compose_snippet(snippet, &self.config))
    }

    /// Queue an already composed document for evaluation.
    pub fn evaluate(&self, document: ComposedDocument) -> PreviewHandle {
        let (decision_tx, decision_rx) = oneshot::channel();
        let (heights_tx, heights_rx) = watch::channel(None);
        // a dead worker drops the senders, which the handle reports as `None`
        let _ = self.cmd_tx.send(Command::Evaluate {
            document,
            decision: decision_tx,
            heights: heights_tx,
        });
        PreviewHandle {
            decision: decision_rx,
            heights: heights_rx,
        }
    }

    /// Shut down the worker and release its rendering context.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| Error::Other("worker already stopped".into()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

fn run_evaluation(
    ctx: &mut dyn RenderContext,
    gate: &QualityGate,
    document: ComposedDocument,
    decision_tx: oneshot::Sender<RenderDecision>,
    heights_tx: watch::Sender<Option<u32>>,
) {
    if decision_tx.is_closed() {
        debug!("handle dropped before evaluation started");
        return;
    }

    let (event_tx, event_rx) = mpsc::channel();
    let mut evaluation = Evaluation::new(gate.clone(), document, move |event| {
        let _ = event_tx.send(event);
    });
    let mut decision_tx = Some(decision_tx);

    evaluation.run(ctx, |eval| {
        for event in event_rx.try_iter() {
            match event {
                EvalEvent::Decided(decision) => {
                    heights_tx.send_replace(decision.measured_height);
                    if let Some(tx) = decision_tx.take() {
                        if tx.send(decision).is_err() {
                            warn!("decision receiver dropped");
                        }
                    }
                }
                EvalEvent::HeightRefined(h) => {
                    heights_tx.send_replace(Some(h));
                }
            }
        }
        let cancelled = match &decision_tx {
            Some(tx) => tx.is_closed(),
            None => heights_tx.is_closed(),
        };
        if cancelled && !eval.is_finished() {
            eval.detach();
        }
    });
}
