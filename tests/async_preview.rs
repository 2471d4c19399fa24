use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rfpreview::rendering::{ComputedStyle, ElementProbe, Rect};
use rfpreview::{
    Backend, ComposedDocument, PreviewConfig, Previewer, RenderContext, RenderDecision, Result,
    Snippet,
};

/// Context whose load takes a while and which counts probes
struct Slow {
    load_delay: Duration,
    probes: Arc<AtomicUsize>,
    heights: Vec<u32>,
    measured: AtomicUsize,
}

impl RenderContext for Slow {
    fn load(&mut self, _document: &ComposedDocument) -> Result<()> {
        std::thread::sleep(self.load_delay);
        Ok(())
    }

    fn inject_style(&mut self, _css: &str) -> Result<()> {
        Ok(())
    }

    fn probe(&self, _selector: &str) -> Result<Vec<ElementProbe>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ElementProbe {
            style: ComputedStyle {
                background_color: "rgb(20, 20, 20)".into(),
                ..Default::default()
            },
            rect: Rect {
                x: 0.0,
                y: 0.0,
                width: 140.0,
                height: 44.0,
            },
        }])
    }

    fn scroll_height(&self) -> Result<u32> {
        let i = self.measured.fetch_add(1, Ordering::SeqCst);
        Ok(self.heights[i.min(self.heights.len() - 1)])
    }

    fn wait_for_fonts(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    fn is_dynamic(&self) -> bool {
        true
    }
}

fn fast_config() -> PreviewConfig {
    PreviewConfig {
        settle_delay_ms: 5,
        fonts_settle_ms: 1,
        ..Default::default()
    }
}

async fn slow_previewer(
    load_delay: Duration,
    heights: Vec<u32>,
) -> (Previewer, Arc<AtomicUsize>) {
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = probes.clone();
    let previewer = Previewer::new(fast_config(), move |_| {
        Ok(Box::new(Slow {
            load_delay,
            probes: counter,
            heights,
            measured: AtomicUsize::new(0),
        }) as Box<dyn RenderContext>)
    })
    .await
    .expect("worker starts");
    (previewer, probes)
}

#[tokio::test]
async fn detached_evaluation_never_probes() {
    let (previewer, probes) = slow_previewer(Duration::from_millis(150), vec![400]).await;

    let first = previewer.evaluate(ComposedDocument::new("<button>One</button>"));
    // give the worker time to pick it up and enter the slow load
    tokio::time::sleep(Duration::from_millis(30)).await;
    first.detach();

    let second = previewer.evaluate(ComposedDocument::new("<button>Two</button>"));
    let decision = second.decision().await.expect("second decision");
    assert!(decision.accepted);
    assert_eq!(probes.load(Ordering::SeqCst), 1);

    previewer.close().await.unwrap();
}

#[tokio::test]
async fn dropped_before_start_is_skipped() {
    let (previewer, probes) = slow_previewer(Duration::from_millis(100), vec![400]).await;

    let busy = previewer.evaluate(ComposedDocument::new("<button>Busy</button>"));
    let queued = previewer.evaluate(ComposedDocument::new("<button>Queued</button>"));
    drop(queued);

    assert!(busy.decision().await.expect("decision").accepted);
    let last = previewer.evaluate(ComposedDocument::new("<button>Last</button>"));
    assert!(last.decision().await.expect("decision").accepted);
    assert_eq!(probes.load(Ordering::SeqCst), 2);

    previewer.close().await.unwrap();
}

#[tokio::test]
async fn heights_are_refined_after_the_decision() {
    let (previewer, _) = slow_previewer(Duration::ZERO, vec![380, 520, 640]).await;

    let handle = previewer.evaluate(ComposedDocument::new("<button>Go</button>"));
    let decision = handle.settled().await.expect("decision");
    assert_eq!(decision, RenderDecision::accept(640));

    previewer.close().await.unwrap();
}

#[tokio::test]
async fn font_reflow_after_a_stable_settle_is_reported() {
    let (previewer, _) = slow_previewer(Duration::ZERO, vec![500, 500, 800]).await;

    let handle = previewer.evaluate(ComposedDocument::new("<button>Go</button>"));
    let decision = handle.settled().await.expect("decision");
    assert_eq!(decision, RenderDecision::accept(800));

    previewer.close().await.unwrap();
}

#[tokio::test]
async fn single_decision_per_evaluation() {
    let (previewer, _) = slow_previewer(Duration::ZERO, vec![380, 520]).await;

    let handle = previewer.evaluate(ComposedDocument::new("<button>Go</button>"));
    let mut heights = handle.heights();
    let decision = handle.decision().await.expect("decision");
    assert_eq!(decision, RenderDecision::accept(380));

    // only refinements follow; the watch closes when measuring ends
    while heights.changed().await.is_ok() {}
    assert_eq!(*heights.borrow(), Some(520));

    previewer.close().await.unwrap();
}

#[tokio::test]
async fn static_backend_rejects_unstyled_fragment() {
    let previewer = Previewer::with_backend(PreviewConfig::default(), Backend::Static)
        .await
        .unwrap();
    let handle = previewer.preview(&Snippet::new(r#"<button class="btn">Buy</button>"#));
    assert_eq!(handle.decision().await, Some(RenderDecision::reject()));
    previewer.close().await.unwrap();
}

#[tokio::test]
async fn clones_share_one_worker() {
    let (previewer, probes) = slow_previewer(Duration::ZERO, vec![400]).await;
    let other = previewer.clone();

    let a = previewer.evaluate(ComposedDocument::new("<button>A</button>"));
    let b = other.evaluate(ComposedDocument::new("<button>B</button>"));
    let (a, b) = futures::join!(a.decision(), b.decision());
    assert!(a.unwrap().accepted && b.unwrap().accepted);
    assert_eq!(probes.load(Ordering::SeqCst), 2);

    previewer.close().await.unwrap();
}
