//! Render quality gate
//!
//! Two stages: a cheap textual pre-filter that rejects documents with no
//! trace of a button, then a rendered check that loads the document into a
//! [`RenderContext`] and looks for a visible, plausibly styled candidate.

use std::sync::mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use log::{debug, trace};
use regex::Regex;

use crate::rendering::{ComputedStyle, ElementProbe, RenderContext};
use crate::{ComposedDocument, PreviewConfig, RenderDecision, Result};

pub mod evaluation;

pub use evaluation::{EvalEvent, EvalState, Evaluation};

/// Elements considered button candidates
pub const CANDIDATE_SELECTOR: &str = r#"button, [role="button"], .button, .btn"#;

/// Injected after load so the preview never shows its own scrollbars
pub const OVERFLOW_STYLE: &str =
    "html,body{overflow:hidden} ._preview-root{overflow:auto; max-height:100%}";

/// Upper bound on waiting for web fonts before the last re-measurement
pub const FONTS_TIMEOUT: Duration = Duration::from_secs(10);

const HIDDEN_OPACITY: f32 = 0.05;
const MIN_RADIUS: f32 = 4.0;
const MIN_BACKGROUND_ALPHA: f32 = 0.05;
const MIN_BORDER_SUM: f32 = 0.5;

fn signature_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<(button)\b|role=["']button["']|class=["'][^"']*\b(btn|button)\b"#)
            .expect("valid regex")
    })
}

/// Whether the markup carries any trace of a button: a `<button>` tag, a
/// `role="button"` attribute, or a class containing `btn` or `button`.
///
/// # Examples
///
/// ```
/// use rfpreview::has_button_signature;
///
/// assert!(has_button_signature(r#"<a class="cta btn-primary">Go</a>"#));
/// assert!(!has_button_signature("<p>Hello</p>"));
/// ```
pub fn has_button_signature(html: &str) -> bool {
    signature_re().is_match(html)
}

/// Leading-number parse with the semantics of JavaScript's `parseFloat`:
/// `"4px"` is 4, `"0.3s, 1s"` is 0.3 and anything without a numeric prefix is
/// NaN.
pub fn parse_css_float(value: &str) -> f32 {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let mut digits = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
        }
        if frac > end + 1 {
            digits = true;
            end = frac;
        } else if digits {
            end += 1;
        }
    }
    if !digits {
        return f32::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let start = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > start {
            end = exp;
        }
    }
    s[..end].parse().unwrap_or(f32::NAN)
}

fn rgb_args_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)rgba?\(([^)]+)\)").expect("valid regex"))
}

/// Alpha of a computed `background-color`. Colors not in `rgb()`/`rgba()`
/// form count as fully transparent.
pub fn background_alpha(color: &str) -> f32 {
    let Some(args) = rgb_args_re().captures(color).and_then(|c| c.get(1)) else {
        return 0.0;
    };
    let parts: Vec<&str> = args.as_str().split(',').map(str::trim).collect();
    let alpha = if parts.len() == 4 {
        parse_css_float(parts[3])
    } else {
        1.0
    };
    if alpha.is_nan() {
        0.0
    } else {
        alpha
    }
}

/// Visible means displayed, not hidden, not (nearly) transparent, and at
/// least `min_width` x `min_height`.
pub fn is_visible(probe: &ElementProbe, min_width: f32, min_height: f32) -> bool {
    let cs = &probe.style;
    if cs.display == "none" || cs.visibility == "hidden" {
        return false;
    }
    if parse_css_float(&cs.opacity) <= HIDDEN_OPACITY {
        return false;
    }
    !(probe.rect.width < min_width || probe.rect.height < min_height)
}

fn not_none(value: &str) -> bool {
    !value.is_empty() && value != "none"
}

/// Number of independent styling signals on a computed style.
pub fn styled_score(cs: &ComputedStyle) -> u32 {
    let rounded = [
        &cs.border_top_left_radius,
        &cs.border_top_right_radius,
        &cs.border_bottom_left_radius,
        &cs.border_bottom_right_radius,
    ]
    .iter()
    .any(|r| parse_css_float(r) > MIN_RADIUS);

    let border_sum: f32 = [
        &cs.border_top_width,
        &cs.border_right_width,
        &cs.border_bottom_width,
        &cs.border_left_width,
    ]
    .iter()
    .map(|w| parse_css_float(w))
    .sum();

    let animated = cs
        .transition_duration
        .split(',')
        .any(|d| parse_css_float(d) > 0.0)
        || not_none(&cs.animation_name);

    let signals = [
        rounded,
        not_none(&cs.box_shadow),
        not_none(&cs.background_image),
        background_alpha(&cs.background_color) > MIN_BACKGROUND_ALPHA,
        border_sum > MIN_BORDER_SUM,
        not_none(&cs.transform),
        not_none(&cs.filter),
        not_none(&cs.backdrop_filter),
        animated,
    ];
    let score = signals.iter().filter(|s| **s).count() as u32;
    trace!("styling signals {:?} -> {}", signals, score);
    score
}

/// Decides whether a composed document is worth previewing
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    config: PreviewConfig,
}

impl QualityGate {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Static pre-filter; `false` means reject without rendering.
    pub fn prefilter(&self, document: &ComposedDocument) -> bool {
        has_button_signature(document.as_str())
    }

    /// Rendered check on a loaded context. Injects the overflow style, then
    /// looks for a visible candidate with enough styling signals.
    pub fn check_rendered<C>(&self, ctx: &mut C) -> Result<bool>
    where
        C: RenderContext + ?Sized,
    {
        ctx.inject_style(OVERFLOW_STYLE)?;
        let candidates = ctx.probe(CANDIDATE_SELECTOR)?;
        debug!("{} button candidates", candidates.len());

        let pass = candidates.iter().any(|probe| {
            if !is_visible(probe, self.config.min_width, self.config.min_height) {
                trace!("candidate not visible: {:?}", probe.rect);
                return false;
            }
            styled_score(&probe.style) >= self.config.min_styled_signals
        });
        Ok(pass)
    }

    /// Content height: the scroll height floored at `min_content_height` and
    /// clamped to `max_height`.
    pub fn measure_height<C>(&self, ctx: &C) -> Result<u32>
    where
        C: RenderContext + ?Sized,
    {
        let h = ctx.scroll_height()?.max(self.config.min_content_height);
        Ok(h.min(self.config.max_height))
    }

    /// Run a complete evaluation on `ctx` and return the decision, with the
    /// height as refined by the later measurements.
    ///
    /// Never fails; context errors end in a rejection.
    pub fn evaluate<C>(&self, ctx: &mut C, document: &ComposedDocument) -> RenderDecision
    where
        C: RenderContext + ?Sized,
    {
        let (tx, rx) = mpsc::channel();
        let mut evaluation = Evaluation::new(self.clone(), document.clone(), move |event| {
            let _ = tx.send(event);
        });
        evaluation.run(ctx, |_| {});
        drop(evaluation);

        let mut decision = RenderDecision::reject();
        for event in rx.try_iter() {
            match event {
                EvalEvent::Decided(d) => decision = d,
                EvalEvent::HeightRefined(h) => decision.measured_height = Some(h),
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::Rect;

    fn probe(style: ComputedStyle, width: f32, height: f32) -> ElementProbe {
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

    #[test]
    fn signature_detection() {
        assert!(has_button_signature("<BUTTON>x</BUTTON>"));
        assert!(has_button_signature(r#"<div role='button'>x</div>"#));
        assert!(has_button_signature(r#"<a class="big btn">x</a>"#));
        assert!(has_button_signature(r#"<a class="button-3d">x</a>"#));
        assert!(!has_button_signature("<buttons>x</buttons>"));
        assert!(!has_button_signature(r#"<div class="card">x</div>"#));
    }

    #[test]
    fn parse_float_like_javascript() {
        assert_eq!(parse_css_float("4px"), 4.0);
        assert_eq!(parse_css_float(" .5s"), 0.5);
        assert_eq!(parse_css_float("-2.5e1px"), -25.0);
        assert_eq!(parse_css_float("3."), 3.0);
        assert!(parse_css_float("none").is_nan());
        assert!(parse_css_float("").is_nan());
        assert!(parse_css_float(".").is_nan());
    }

    #[test]
    fn background_alpha_forms() {
        assert_eq!(background_alpha("rgb(1, 2, 3)"), 1.0);
        assert_eq!(background_alpha("rgba(0, 0, 0, 0)"), 0.0);
        assert_eq!(background_alpha("rgba(0, 0, 0, 0.5)"), 0.5);
        assert_eq!(background_alpha("transparent"), 0.0);
    }

    #[test]
    fn visibility_rules() {
        let style = ComputedStyle::default();
        assert!(is_visible(&probe(style.clone(), 60.0, 24.0), 60.0, 24.0));
        assert!(!is_visible(&probe(style.clone(), 59.0, 24.0), 60.0, 24.0));
        let faded = ComputedStyle {
            opacity: "0.05".into(),
            ..style.clone()
        };
        assert!(!is_visible(&probe(faded, 100.0, 40.0), 60.0, 24.0));
        let hidden = ComputedStyle {
            visibility: "hidden".into(),
            ..style
        };
        assert!(!is_visible(&probe(hidden, 100.0, 40.0), 60.0, 24.0));
    }

    #[test]
    fn score_counts_each_signal_once() {
        assert_eq!(styled_score(&ComputedStyle::default()), 0);
        let styled = ComputedStyle {
            border_top_left_radius: "8px".into(),
            border_bottom_right_radius: "12px".into(),
            background_color: "rgb(10, 10, 10)".into(),
            border_top_width: "1px".into(),
            transition_duration: "0s, 0.2s".into(),
            ..Default::default()
        };
        assert_eq!(styled_score(&styled), 4);
        let radius_only = ComputedStyle {
            border_top_left_radius: "4px".into(),
            ..Default::default()
        };
        assert_eq!(styled_score(&radius_only), 0);
    }
}
