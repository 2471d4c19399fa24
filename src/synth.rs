//! Markup synthesis from CSS class signatures.
//!
//! Catalog submissions frequently ship a stylesheet with no markup, or with a
//! placeholder that does not match the selectors. The synthesizer extracts a
//! [`FeatureSignature`] from the CSS and walks [`PATTERN_RULES`] in order; the
//! first rule whose predicate holds picks the template. Ambiguous CSS can
//! satisfy several predicates, so the order of the table is the tie-break.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

/// Detector values extracted once per CSS block.
///
/// Every field is a pure function of the CSS text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSignature {
    /// `button {` or `.button {` rule
    pub btn_base: bool,
    /// `button span {` rule
    pub btn_span: bool,
    pub pat_container: bool,
    pub pat_border: bool,
    pub pat_button: bool,
    pub pat_real_button: bool,
    pub pat_spin: bool,
    /// Glow effects referencing `url(#unopaq…)` SVG filters
    pub pat_uses_svg_filters: bool,
    /// `.container` plus checked-state play/pause selectors
    pub play_pause_container: bool,
    pub outer_cont: bool,
    pub gradient: bool,
    pub label: bool,
    pub transition: bool,
    pub hover_text: bool,
    /// `.icon-N` or `.fil-leaf-N` classes
    pub icon_series: bool,
    pub scene: bool,
    pub cube: bool,
    pub side: bool,
    pub top: bool,
    pub front: bool,
    /// First class selector defined in the stylesheet
    pub first_class: Option<String>,
}

/// Regex for a rule whose selector starts the text or follows a `}`.
fn rule_pattern(selector: &str) -> String {
    format!(r"(^|\}})\s*{selector}\s*\{{")
}

struct Detectors {
    button_rule: Regex,
    dot_button_rule: Regex,
    button_span_rule: Regex,
    container_rule: Regex,
    button_container_rule: Regex,
    button_border_rule: Regex,
    button_base_rule: Regex,
    real_button_rule: Regex,
    spin: Regex,
    svg_filters: Regex,
    checked_play: Regex,
    checked_pause: Regex,
    outer_cont_rule: Regex,
    gradient_rule: Regex,
    gradient_nested: Regex,
    label_rule: Regex,
    label_nested: Regex,
    transition_rule: Regex,
    transition_nested: Regex,
    hover_text_rule: Regex,
    icon_series: Regex,
    leaf_series: Regex,
    scene_rule: Regex,
    cube_rule: Regex,
    side_rule: Regex,
    top_rule: Regex,
    front_rule: Regex,
    first_class: Regex,
    press_font: Regex,
}

fn detectors() -> &'static Detectors {
    static DETECTORS: OnceLock<Detectors> = OnceLock::new();
    DETECTORS.get_or_init(|| {
        let rule = |sel: &str| Regex::new(&rule_pattern(sel)).expect("valid rule detector");
        let re = |p: &str| Regex::new(p).expect("valid detector");
        Detectors {
            button_rule: rule("button"),
            dot_button_rule: rule(r"\.button"),
            button_span_rule: rule(r"button\s+span"),
            container_rule: rule(r"\.container"),
            button_container_rule: rule(r"\.button-container"),
            button_border_rule: rule(r"\.button-border"),
            button_base_rule: rule(r"\.button-base"),
            real_button_rule: rule(r"\.real-button"),
            spin: re(r"(^|\})\s*\.spin(\b|:)"),
            svg_filters: re(r"url\(#unopaq[23]?\)"),
            checked_play: re(r"input:checked\s*~\s*\.play"),
            checked_pause: re(r"input:checked\s*~\s*\.pause"),
            outer_cont_rule: rule(r"\.outer-cont"),
            gradient_rule: rule(r"\.gradient"),
            gradient_nested: re(r"button\s+\.gradient"),
            label_rule: rule(r"\.label"),
            label_nested: re(r"button\s+\.label"),
            transition_rule: rule(r"\.transition"),
            transition_nested: re(r"button\s+\.transition"),
            hover_text_rule: rule(r"\.hover-text"),
            icon_series: re(r"\.icon-\d"),
            leaf_series: re(r"\.fil-leaf-\d"),
            scene_rule: rule(r"\.scene"),
            cube_rule: rule(r"\.cube"),
            side_rule: rule(r"\.side"),
            top_rule: rule(r"\.top"),
            front_rule: rule(r"\.front"),
            first_class: re(r"\.([A-Za-z_][\w-]*)\s*\{"),
            press_font: re(r"(?i)press\s*start\s*2p"),
        }
    })
}

impl FeatureSignature {
    /// Run every detector over `css`.
    pub fn extract(css: &str) -> Self {
        let d = detectors();
        let dot_button = d.dot_button_rule.is_match(css);
        Self {
            btn_base: d.button_rule.is_match(css) || dot_button,
            btn_span: d.button_span_rule.is_match(css),
            pat_container: d.button_container_rule.is_match(css),
            pat_border: d.button_border_rule.is_match(css),
            pat_button: dot_button,
            pat_real_button: d.real_button_rule.is_match(css),
            pat_spin: d.spin.is_match(css),
            pat_uses_svg_filters: d.svg_filters.is_match(css),
            play_pause_container: d.container_rule.is_match(css)
                && d.checked_play.is_match(css)
                && d.checked_pause.is_match(css),
            outer_cont: d.outer_cont_rule.is_match(css),
            gradient: d.gradient_rule.is_match(css) || d.gradient_nested.is_match(css),
            label: d.label_rule.is_match(css) || d.label_nested.is_match(css),
            transition: d.transition_rule.is_match(css) || d.transition_nested.is_match(css),
            hover_text: d.hover_text_rule.is_match(css),
            icon_series: d.icon_series.is_match(css) || d.leaf_series.is_match(css),
            scene: d.scene_rule.is_match(css),
            cube: d.cube_rule.is_match(css),
            side: d.side_rule.is_match(css),
            top: d.top_rule.is_match(css),
            front: d.front_rule.is_match(css),
            first_class: d
                .first_class
                .captures(css)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        }
    }

    /// Whether any rule styles a bare or classed button.
    pub fn has_button_rule(&self) -> bool {
        self.btn_base
    }
}

/// Structural patterns recognised from a signature, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    PlayPauseToggle,
    SpinBorderContainer,
    OuterContainer,
    LayeredButton,
    SpanButton,
    IconSeriesButton,
    CubeScene,
    HoverText,
    BareButton,
}

/// A priority slot: the pattern and the predicate that selects it
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub kind: PatternKind,
    pub matches: fn(&FeatureSignature) -> bool,
}

/// Evaluated top to bottom; the first match wins.
pub static PATTERN_RULES: &[PatternRule] = &[
    PatternRule {
        kind: PatternKind::PlayPauseToggle,
        matches: |f| f.play_pause_container,
    },
    PatternRule {
        kind: PatternKind::SpinBorderContainer,
        matches: |f| f.pat_container && (f.pat_border || f.pat_button || f.pat_real_button || f.pat_spin),
    },
    PatternRule {
        kind: PatternKind::OuterContainer,
        matches: |f| f.outer_cont,
    },
    PatternRule {
        kind: PatternKind::LayeredButton,
        matches: |f| f.btn_base && (f.gradient || f.label || f.transition),
    },
    PatternRule {
        kind: PatternKind::SpanButton,
        matches: |f| f.btn_base && f.btn_span,
    },
    PatternRule {
        kind: PatternKind::IconSeriesButton,
        matches: |f| f.btn_base && f.icon_series,
    },
    PatternRule {
        kind: PatternKind::CubeScene,
        matches: |f| f.scene && f.cube && (f.top || f.front || f.side),
    },
    PatternRule {
        kind: PatternKind::HoverText,
        matches: |f| f.hover_text,
    },
    PatternRule {
        kind: PatternKind::BareButton,
        matches: |f| f.btn_base,
    },
];

/// The template chosen for a signature, with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    PlayPauseToggle,
    SpinBorderContainer { svg_filters: bool },
    OuterContainer,
    LayeredButton { label: bool, transition: bool, gradient: bool },
    SpanButton,
    IconSeriesButton,
    CubeScene,
    HoverText,
    BareButton,
    /// No structural match: the first class in the stylesheet
    FirstClass { class: String, button_like: bool },
    /// Nothing recognisable at all
    Fallback,
}

impl PatternKind {
    fn instantiate(self, f: &FeatureSignature) -> Pattern {
        match self {
            PatternKind::PlayPauseToggle => Pattern::PlayPauseToggle,
            PatternKind::SpinBorderContainer => Pattern::SpinBorderContainer {
                svg_filters: f.pat_uses_svg_filters,
            },
            PatternKind::OuterContainer => Pattern::OuterContainer,
            PatternKind::LayeredButton => Pattern::LayeredButton {
                label: f.label,
                transition: f.transition,
                gradient: f.gradient,
            },
            PatternKind::SpanButton => Pattern::SpanButton,
            PatternKind::IconSeriesButton => Pattern::IconSeriesButton,
            PatternKind::CubeScene => Pattern::CubeScene,
            PatternKind::HoverText => Pattern::HoverText,
            PatternKind::BareButton => Pattern::BareButton,
        }
    }
}

fn looks_button_like(class: &str) -> bool {
    let lower = class.to_ascii_lowercase();
    lower.contains("btn") || lower.contains("button")
}

impl Pattern {
    /// Pick the template for a signature.
    pub fn select(f: &FeatureSignature) -> Self {
        if let Some(rule) = PATTERN_RULES.iter().find(|r| (r.matches)(f)) {
            return rule.kind.instantiate(f);
        }
        match &f.first_class {
            Some(class) => Pattern::FirstClass {
                class: class.clone(),
                button_like: looks_button_like(class),
            },
            None => Pattern::Fallback,
        }
    }

    /// Markup for this template.
    pub fn render(&self) -> String {
        match self {
            Pattern::PlayPauseToggle => PLAY_PAUSE_TOGGLE.to_string(),
            Pattern::SpinBorderContainer { svg_filters } => {
                if *svg_filters {
                    format!("{SPIN_BORDER_CONTAINER}\n{UNOPAQ_FILTERS}")
                } else {
                    SPIN_BORDER_CONTAINER.to_string()
                }
            }
            Pattern::OuterContainer => OUTER_CONTAINER.to_string(),
            Pattern::LayeredButton {
                label,
                transition,
                gradient,
            } => {
                let mut parts = vec![if *label {
                    r#"<span class="label">Button</span>"#
                } else {
                    "<span>Button</span>"
                }];
                if *transition {
                    parts.push(r#"<span class="transition"></span>"#);
                }
                if *gradient {
                    parts.push(r#"<span class="gradient"></span>"#);
                }
                format!("<button type=\"button\">\n  {}\n</button>", parts.join("\n  "))
            }
            Pattern::SpanButton => r#"<button type="button"><span>Button</span></button>"#.to_string(),
            Pattern::IconSeriesButton => {
                let leaves = (1..=5)
                    .map(|i| {
                        format!(
                            r#"<svg class="icon-{i}" viewBox="0 0 100 100" width="0" height="0" aria-hidden="true"><circle class="fil-leaf-{i}" cx="50" cy="50" r="45"></circle></svg>"#
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n  ");
                format!("<button type=\"button\"><span>Hover me</span>\n  {leaves}</button>")
            }
            Pattern::CubeScene => CUBE_SCENE.to_string(),
            Pattern::HoverText => HOVER_TEXT.to_string(),
            Pattern::BareButton | Pattern::Fallback => BARE_BUTTON.to_string(),
            Pattern::FirstClass { class, button_like } => {
                if *button_like {
                    format!(r#"<button class="{class}">Button</button>"#)
                } else {
                    format!(r#"<div class="{class}">Preview</div>"#)
                }
            }
        }
    }
}

/// Fabricate body markup for a stylesheet.
pub fn synthesize(css: &str) -> String {
    let signature = FeatureSignature::extract(css);
    let pattern = Pattern::select(&signature);
    debug!("synthesizing markup with {:?}", pattern);
    pattern.render()
}

const BARE_BUTTON: &str = r#"<button type="button">Button</button>"#;

const PLAY_PAUSE_TOGGLE: &str = r#"<label class="container" role="button" aria-label="play/pause toggle" style="display:inline-flex">
  <input type="checkbox" aria-hidden="true"/>
  <svg class="play" viewBox="0 0 64 64" width="1em" height="1em" aria-hidden="true">
    <polygon points="22,16 50,32 22,48" />
  </svg>
  <svg class="pause" viewBox="0 0 64 64" width="1em" height="1em" aria-hidden="true">
    <rect x="18" y="16" width="10" height="32" />
    <rect x="36" y="16" width="10" height="32" />
  </svg>
</label>"#;

const SPIN_BORDER_CONTAINER: &str = r#"<div class="button-container" style="display:inline-block">
  <button class="real-button" aria-label="button"></button>
  <div class="button-border">
    <div class="button">
      <span>Button</span>
      <div class="backdrop"></div>
      <div class="spin spin-blur"></div>
      <div class="spin spin-intense"></div>
      <div class="spin spin-inside"></div>
    </div>
  </div>
</div>"#;

const UNOPAQ_FILTERS: &str = r#"<svg width="0" height="0" style="position:absolute">
  <defs>
    <filter id="unopaq">
      <feGaussianBlur stdDeviation="8"></feGaussianBlur>
      <feColorMatrix type="matrix" values="1 0 0 0 0 0 1 0 0 0 0 0 1 0 0 0 0 0 18 -8"></feColorMatrix>
    </filter>
    <filter id="unopaq2">
      <feGaussianBlur stdDeviation="2"></feGaussianBlur>
      <feColorMatrix type="matrix" values="1 0 0 0 0 0 1 0 0 0 0 0 1 0 0 0 0 0 18 -8"></feColorMatrix>
    </filter>
    <filter id="unopaq3">
      <feGaussianBlur stdDeviation="1.5"></feGaussianBlur>
      <feColorMatrix type="matrix" values="1 0 0 0 0 0 1 0 0 0 0 0 1 0 0 0 0 0 18 -8"></feColorMatrix>
    </filter>
  </defs>
</svg>"#;

const OUTER_CONTAINER: &str = r#"<button class="outer-cont" type="button" style="display:inline-block">
  <span class="flex">
    <span>Button</span>
  </span>
</button>"#;

const CUBE_SCENE: &str = r#"<div class="scene"><div class="cube"><div class="side front">Front</div><div class="side top">Top</div></div></div>"#;

const HOVER_TEXT: &str =
    r#"<button class="button"><span class="hover-text" data-text="Button">Button</span></button>"#;

/// The three-layer retro pixel button ("Press Start 2P" border/base/face).
///
/// Reproducing its nested depth effect from partial markup is unreliable, so
/// it is collapsed into one element carrying [`RETRO_PIXEL_STYLE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetroPixelSignature {
    pub has_border: bool,
    pub has_base: bool,
    pub has_face: bool,
    pub uses_press_font: bool,
}

impl RetroPixelSignature {
    pub fn extract(css: &str) -> Self {
        let d = detectors();
        Self {
            has_border: d.button_border_rule.is_match(css),
            has_base: d.button_base_rule.is_match(css),
            has_face: d.dot_button_rule.is_match(css),
            uses_press_font: d.press_font.is_match(css),
        }
    }

    /// Full border/base/face triple drawn in the pixel font.
    pub fn is_complete(&self) -> bool {
        self.has_border && self.has_base && self.has_face && self.uses_press_font
    }
}

fn class_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"class=["']([^"']*)["']"#).expect("valid regex"))
}

/// Body markup carries only the outer `button-border` layer.
///
/// Classes are compared as whitespace-separated tokens, so `button-border`
/// does not count as a `button` face.
pub fn body_has_only_border_button(inner: &str) -> bool {
    let lower = inner.to_lowercase();
    let mut has_border = false;
    for caps in class_attr_re().captures_iter(&lower) {
        let Some(list) = caps.get(1) else { continue };
        for token in list.as_str().split_whitespace() {
            match token {
                "button-border" => has_border = true,
                "button" | "button-base" => return false,
                _ => {}
            }
        }
    }
    has_border
}

/// Whether the retro pixel collapse applies to this stylesheet and body.
pub fn retro_pixel_collapse_applies(css: &str, body_inner: &str) -> bool {
    RetroPixelSignature::extract(css).is_complete() && body_has_only_border_button(body_inner)
}

/// Single-element replacement for the retro pixel button.
pub const RETRO_PIXEL_MARKUP: &str = r#"<button class="btn-press">Button</button>"#;

/// Pre-authored style block for [`RETRO_PIXEL_MARKUP`].
pub const RETRO_PIXEL_STYLE: &str = r#"
:root{
  --bdr: #ffae70;
  --base: #75221c;
  --face: #e64539;
  --c1:   #e7b8b4;
  --c2:   #f8c9c5;
  --c3:   #4e1814;
  --c4:   #79241e;
  --text: #ffee83;
}
.btn-press{
  position: relative;
  display: inline-block;
  font-family: "Press Start 2P", cursive;
  font-size: 20px;
  color: var(--text);
  background: var(--face);
  border: 4px solid;
  border-left-color: var(--c1);
  border-top-color: var(--c2);
  border-bottom-color: var(--c3);
  border-right-color: var(--c4);
  border-radius: 100px;
  padding: 18px 28px;
  cursor: pointer;
  outline: 2px solid black;
  transform: translateY(-8px);
  transition: transform .15s ease, box-shadow .15s ease;
  box-shadow: 0 6px 0 0 var(--base), 0 10px 16px rgba(0,0,0,.25);
}
.btn-press::before{
  content:"";
  position:absolute; inset:-14px;
  border:8px solid var(--bdr);
  outline:4px solid currentColor;
  border-radius:inherit;
  pointer-events:none;
}
.btn-press:hover{ transform: translateY(-4px); }
.btn-press:active{ transform: translateY(0); }
html,body{ margin:0; padding:16px; }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_pause_wins_over_container_patterns() {
        let css = ".container{display:flex}.container input:checked ~ .play{display:none}.container input:checked ~ .pause{display:block}.button-container{}.button-border{}";
        let f = FeatureSignature::extract(css);
        assert!(f.play_pause_container && f.pat_container);
        assert_eq!(Pattern::select(&f), Pattern::PlayPauseToggle);
        let html = synthesize(css);
        assert_eq!(html.matches("type=\"checkbox\"").count(), 1);
        assert!(html.contains("class=\"play\"") && html.contains("class=\"pause\""));
    }

    #[test]
    fn spin_container_with_filters() {
        let css = ".button-container{}.button-border{}.button{}.spin{filter:url(#unopaq)}";
        let p = Pattern::select(&FeatureSignature::extract(css));
        assert_eq!(p, Pattern::SpinBorderContainer { svg_filters: true });
        let html = p.render();
        assert!(html.contains("<filter id=\"unopaq2\">"));
        assert!(html.contains("class=\"spin spin-blur\""));
    }

    #[test]
    fn layered_button_parts() {
        let css = "button{border:0} button .label{color:#fff} .gradient{background:red}";
        let p = Pattern::select(&FeatureSignature::extract(css));
        assert_eq!(
            p,
            Pattern::LayeredButton {
                label: true,
                transition: false,
                gradient: true
            }
        );
        let html = p.render();
        assert!(html.contains(r#"<span class="label">Button</span>"#));
        assert!(html.contains(r#"<span class="gradient"></span>"#));
        assert!(!html.contains("transition"));
    }

    #[test]
    fn fallback_chain() {
        assert_eq!(
            synthesize(".fancy-btn { color: red }"),
            r#"<button class="fancy-btn">Button</button>"#
        );
        assert_eq!(synthesize(".card { color: red }"), r#"<div class="card">Preview</div>"#);
        assert_eq!(synthesize("p { color: red }"), r#"<button type="button">Button</button>"#);
        assert_eq!(synthesize(""), r#"<button type="button">Button</button>"#);
    }

    #[test]
    fn cube_and_hover_text() {
        assert_eq!(
            Pattern::select(&FeatureSignature::extract(".scene{}.cube{}.side{}")),
            Pattern::CubeScene
        );
        assert_eq!(
            Pattern::select(&FeatureSignature::extract(".hover-text{}")),
            Pattern::HoverText
        );
    }

    #[test]
    fn icon_series_emits_five_leaves() {
        let html = synthesize("button{}.icon-1{}.fil-leaf-1{}");
        assert_eq!(html.matches("<svg").count(), 5);
        assert!(html.contains("icon-5") && html.contains("fil-leaf-5"));
    }

    #[test]
    fn signature_is_deterministic() {
        let css = ".outer-cont{}.gradient{}button{}";
        assert_eq!(FeatureSignature::extract(css), FeatureSignature::extract(css));
        assert_eq!(synthesize(css), synthesize(css));
    }

    #[test]
    fn retro_pixel_trigger_is_narrow() {
        let css = ".button-border{}.button-base{}.button{font-family:'Press Start 2P'}";
        let body = r#"<button class="button-border">Button</button>"#;
        assert!(retro_pixel_collapse_applies(css, body));
        // face layer present in markup
        assert!(!retro_pixel_collapse_applies(
            css,
            r#"<div class="button-border"><div class="button-base"></div><button class="button">B</button></div>"#
        ));
        // no pixel font
        assert!(!retro_pixel_collapse_applies(
            ".button-border{}.button-base{}.button{}",
            body
        ));
        // no base layer in the stylesheet
        assert!(!retro_pixel_collapse_applies(
            ".button-border{}.button{font-family:'Press Start 2P'}",
            body
        ));
    }
}
