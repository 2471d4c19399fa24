use std::cell::Cell;
use std::time::Duration;

use rfpreview::rendering::{ComputedStyle, ElementProbe, Rect, StaticEngine};
use rfpreview::{
    preview, ComposedDocument, Error, PreviewConfig, QualityGate, RenderContext, RenderDecision,
    Result, Snippet,
};

/// Render context that counts calls and reports a fixed set of candidates
#[derive(Default)]
struct Counting {
    loads: Cell<usize>,
    probes: Cell<usize>,
    injected: Vec<String>,
    candidates: Vec<ElementProbe>,
    height: u32,
    fail_probe: bool,
}

impl RenderContext for Counting {
    fn load(&mut self, _document: &ComposedDocument) -> Result<()> {
        self.loads.set(self.loads.get() + 1);
        Ok(())
    }

    fn inject_style(&mut self, css: &str) -> Result<()> {
        self.injected.push(css.to_string());
        Ok(())
    }

    fn probe(&self, _selector: &str) -> Result<Vec<ElementProbe>> {
        self.probes.set(self.probes.get() + 1);
        if self.fail_probe {
            return Err(Error::RenderError("probe exploded".into()));
        }
        Ok(self.candidates.clone())
    }

    fn scroll_height(&self) -> Result<u32> {
        Ok(self.height)
    }

    fn wait_for_fonts(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }
}

fn candidate(style: ComputedStyle, width: f32, height: f32) -> ElementProbe {
    ElementProbe {
        style,
        rect: Rect {
            x: 0.0,
            y: 0.0,
            width,
            height,
        },
    }
}

fn styled() -> ComputedStyle {
    ComputedStyle {
        display: "inline-block".into(),
        box_shadow: "rgba(0, 0, 0, 0.2) 0px 2px 4px 0px".into(),
        ..Default::default()
    }
}

fn static_preview(code: &str) -> RenderDecision {
    let config = PreviewConfig::default();
    let mut ctx = StaticEngine::new(config.viewport);
    preview(&mut ctx, &Snippet::new(code), &config)
}

#[test]
fn documents_without_button_signature_never_render() {
    let gate = QualityGate::new(PreviewConfig::default());
    let mut ctx = Counting::default();
    let decision = gate.evaluate(&mut ctx, &ComposedDocument::new("<div class=\"card\">Hi</div>"));
    assert_eq!(decision, RenderDecision::reject());
    assert_eq!(ctx.loads.get(), 0);
    assert_eq!(ctx.probes.get(), 0);
}

#[test]
fn overflow_style_is_injected_before_probing() {
    let gate = QualityGate::new(PreviewConfig::default());
    let mut ctx = Counting::default();
    gate.evaluate(&mut ctx, &ComposedDocument::new("<button>Go</button>"));
    assert_eq!(ctx.loads.get(), 1);
    assert_eq!(ctx.probes.get(), 1);
    assert_eq!(ctx.injected, vec![rfpreview::gate::OVERFLOW_STYLE.to_string()]);
}

#[test]
fn styled_visible_candidate_is_accepted_with_floor_height() {
    let gate = QualityGate::new(PreviewConfig::default());
    let mut ctx = Counting {
        candidates: vec![candidate(styled(), 120.0, 40.0)],
        height: 80,
        ..Default::default()
    };
    let decision = gate.evaluate(&mut ctx, &ComposedDocument::new("<button>Go</button>"));
    assert_eq!(decision, RenderDecision::accept(360));
}

#[test]
fn small_or_unstyled_candidates_are_rejected() {
    let gate = QualityGate::new(PreviewConfig::default());
    let mut ctx = Counting {
        candidates: vec![
            candidate(styled(), 40.0, 40.0),
            candidate(ComputedStyle::default(), 200.0, 60.0),
        ],
        height: 500,
        ..Default::default()
    };
    let decision = gate.evaluate(&mut ctx, &ComposedDocument::new("<button>Go</button>"));
    assert!(!decision.accepted);
    assert_eq!(decision.measured_height, None);
}

#[test]
fn styling_threshold_is_configurable() {
    let gate = QualityGate::new(PreviewConfig {
        min_styled_signals: 2,
        ..Default::default()
    });
    let mut ctx = Counting {
        candidates: vec![candidate(styled(), 120.0, 40.0)],
        height: 500,
        ..Default::default()
    };
    let doc = ComposedDocument::new("<button>Go</button>");
    assert!(!gate.evaluate(&mut ctx, &doc).accepted);

    ctx.candidates[0].style.transform = "matrix(1, 0, 0, 1, 0, -2)".into();
    assert!(gate.evaluate(&mut ctx, &doc).accepted);
}

#[test]
fn context_errors_reject() {
    let gate = QualityGate::new(PreviewConfig::default());
    let mut ctx = Counting {
        fail_probe: true,
        ..Default::default()
    };
    let decision = gate.evaluate(&mut ctx, &ComposedDocument::new("<button>Go</button>"));
    assert_eq!(decision, RenderDecision::reject());
}

#[test]
fn fixed_height_when_auto_height_is_off() {
    let gate = QualityGate::new(PreviewConfig {
        auto_height: false,
        fixed_height: 300,
        ..Default::default()
    });
    let mut ctx = Counting {
        candidates: vec![candidate(styled(), 120.0, 40.0)],
        height: 5000,
        ..Default::default()
    };
    let decision = gate.evaluate(&mut ctx, &ComposedDocument::new("<button>Go</button>"));
    assert_eq!(decision, RenderDecision::accept(300));
}

#[test]
fn tall_documents_are_clamped() {
    let gate = QualityGate::new(PreviewConfig {
        max_height: 1200,
        ..Default::default()
    });
    let mut ctx = Counting {
        candidates: vec![candidate(styled(), 120.0, 40.0)],
        height: 4000,
        ..Default::default()
    };
    let decision = gate.evaluate(&mut ctx, &ComposedDocument::new("<button>Go</button>"));
    assert_eq!(decision, RenderDecision::accept(1200));
}

// Static engine scenarios

#[test]
fn block_button_without_styling_is_rejected() {
    let decision = static_preview(r#"<button style="display:block;height:40px">Button</button>"#);
    assert!(!decision.accepted);
}

#[test]
fn block_button_with_background_is_accepted() {
    let decision = static_preview(
        r#"<button style="display:block;height:40px;background-color:#2563eb">Button</button>"#,
    );
    assert!(decision.accepted);
    let h = decision.measured_height.expect("height on accept");
    assert!((360..=10_000).contains(&h));
}

#[test]
fn plain_fragment_passes_prefilter_but_fails_render_check() {
    let code = r#"<button class="btn">Buy</button>"#;
    assert!(rfpreview::has_button_signature(code));
    assert!(!static_preview(code).accepted);
}

#[test]
fn hidden_and_transparent_buttons_are_rejected() {
    assert!(!static_preview(
        r#"<button style="display:block;height:40px;background:#000;visibility:hidden">B</button>"#
    )
    .accepted);
    assert!(!static_preview(
        r#"<button style="display:block;height:40px;background:#000;opacity:0.05">B</button>"#
    )
    .accepted);
}

#[test]
fn stylesheet_classes_are_resolved() {
    let code = r#"<style>
        .btn { padding: 12px 28px; border-radius: 999px; box-shadow: 0 4px 12px rgba(0,0,0,.25); }
    </style>
    <button class="btn">Button</button>"#;
    assert!(static_preview(code).accepted);
}

#[test]
fn extended_named_colors_count_as_background() {
    for color in ["lightblue", "darkorange", "slateblue", "chocolate", "tan", "lavender"] {
        let code = format!(
            r#"<button style="display:block;height:40px;background-color:{color}">Button</button>"#
        );
        assert!(static_preview(&code).accepted, "{color} background rejected");
    }
}

#[test]
fn tailwind_utility_button_is_accepted() {
    let code = r#"<button class="bg-blue-500 text-white rounded-lg px-4 py-2 shadow-md">Button</button>"#;
    assert!(static_preview(code).accepted);
}

#[test]
fn tailwind_state_variants_alone_do_not_style() {
    let code = r#"<button class="hover:bg-blue-500 focus:shadow-md px-4 py-2">Button</button>"#;
    assert!(!static_preview(code).accepted);
}
