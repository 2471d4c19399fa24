//! Cascade and computed values for the static engine.
//!
//! Author `<style>` blocks and inline `style` attributes are cascaded over a
//! small user-agent sheet. Shorthands the quality gate cares about are
//! expanded into longhands, `var()` references are resolved against
//! inherited custom properties, and colors are normalized to the
//! `rgb()`/`rgba()` form browsers report. Documents that load the Tailwind
//! runtime also get their utility classes resolved.

use std::collections::HashMap;

use log::trace;
use scraper::{ElementRef, Html, Node, Selector};

use super::css::{
    comma_layers, component_values, parse_declarations, parse_stylesheet, substitute_vars, Declaration, APPLY,
};
use super::utility::utility_declarations;
use super::ComputedStyle;
use crate::Viewport;

const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Defaults applied before any author style.
///
/// Buttons only get layout defaults here: no border and no background, so an
/// unstyled button scores zero.
const UA_STYLESHEET: &str = r#"
html, body, div, p, section, article, aside, header, footer, main, nav, form, fieldset,
figure, figcaption, blockquote, details, summary, address, center, dl, dt, dd, ol, ul,
menu, pre, hr, h1, h2, h3, h4, h5, h6, legend, dialog { display: block }
li { display: list-item }
head, style, script, link, meta, title, template, noscript, base, datalist, param { display: none }
[hidden], input[type="hidden"] { display: none }
table { display: table } tr { display: table-row } td, th { display: table-cell }
thead, tbody, tfoot { display: table-row-group }
body { margin: 8px }
p, blockquote, figure, dl, ol, ul, pre { margin-top: 1em; margin-bottom: 1em }
h1 { font-size: 2em; margin-top: .67em; margin-bottom: .67em }
h2 { font-size: 1.5em; margin-top: .83em; margin-bottom: .83em }
h3 { font-size: 1.17em; margin-top: 1em; margin-bottom: 1em }
small { font-size: .83em }
button, input, select, textarea { display: inline-block }
button { padding: 1px 6px }
img, svg, canvas, video, iframe, object, embed { display: inline }
"#;

const INHERITED: &[&str] = &[
    "visibility",
    "color",
    "font-family",
    "line-height",
    "white-space",
    "text-align",
];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "solid", "dashed", "dotted", "double", "groove", "ridge", "inset", "outset",
];

const ANIMATION_KEYWORDS: &[&str] = &[
    "none", "infinite", "normal", "reverse", "alternate", "alternate-reverse", "forwards",
    "backwards", "both", "running", "paused", "ease", "ease-in", "ease-out", "ease-in-out",
    "linear", "step-start", "step-end", "initial", "inherit", "unset",
];

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];
const CORNERS: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];

/// Specificity of a single class selector, packed the way `selectors` packs it
const CLASS_SPECIFICITY: u32 = 1 << 10;

const MAX_VAR_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    UserAgent,
    Author,
    Inline,
}

struct CompiledRule {
    selector: Selector,
    specificity: u32,
    origin: Origin,
    order: usize,
    block: usize,
}

/// Ordering key of a declaration in the cascade; larger wins.
type CascadeKey = (bool, Origin, u32, usize, usize);

/// Compiled style rules for one document
pub struct Cascade {
    rules: Vec<CompiledRule>,
    blocks: Vec<Vec<Declaration>>,
    /// Set when utility classes resolve, to the viewport they resolve at
    utilities: Option<Viewport>,
}

impl Default for Cascade {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the document loads the Tailwind runtime.
fn loads_tailwind(document: &Html) -> bool {
    let Ok(scripts) = Selector::parse("script[src]") else {
        return false;
    };
    document
        .select(&scripts)
        .filter_map(|s| s.value().attr("src"))
        .any(|src| src.to_ascii_lowercase().contains("tailwindcss"))
}

impl Cascade {
    /// A cascade holding only the user-agent sheet.
    pub fn new() -> Self {
        let mut cascade = Self {
            rules: Vec::new(),
            blocks: Vec::new(),
            utilities: None,
        };
        cascade.add(UA_STYLESHEET, Origin::UserAgent);
        cascade
    }

    /// Resolve utility classes (and `@apply`) at `viewport` from now on.
    pub fn with_utilities(mut self, viewport: Viewport) -> Self {
        self.utilities = Some(viewport);
        self
    }

    /// Replace `@apply` lists by the utilities they name. Without the
    /// runtime they mean nothing and are dropped.
    fn expand_apply(&self, declarations: Vec<Declaration>) -> Vec<Declaration> {
        let mut out = Vec::with_capacity(declarations.len());
        for decl in declarations {
            if decl.name != APPLY {
                out.push(decl);
                continue;
            }
            let Some(viewport) = self.utilities else {
                continue;
            };
            for class in decl.value.split_whitespace() {
                for mut applied in utility_declarations(class, viewport).unwrap_or_default() {
                    applied.important |= decl.important;
                    out.push(applied);
                }
            }
        }
        out
    }

    fn add(&mut self, css: &str, origin: Origin) {
        for rule in parse_stylesheet(css) {
            let declarations = self.expand_apply(rule.declarations);
            if declarations.is_empty() {
                continue;
            }
            let block = self.blocks.len();
            self.blocks.push(declarations);
            for part in &rule.selectors {
                // pseudo-elements and dynamic pseudo-classes fail to parse
                match Selector::parse(part) {
                    Ok(selector) => {
                        let order = self.rules.len();
                        let specificity = selector.selectors.iter().map(|s| s.specificity()).max().unwrap_or(0);
                        self.rules.push(CompiledRule {
                            selector,
                            specificity,
                            origin,
                            order,
                            block,
                        });
                    }
                    Err(e) => trace!("skipping selector {:?}: {:?}", part, e),
                }
            }
        }
    }

    /// Add an author stylesheet after everything added so far.
    pub fn add_stylesheet(&mut self, css: &str) {
        self.add(css, Origin::Author);
    }

    /// Cascade for a parsed document: its style blocks, then the `injected`
    /// sheets in order.
    ///
    /// `text/tailwindcss` blocks and utility classes only count when the
    /// document loads the Tailwind runtime.
    pub fn for_document(document: &Html, injected: &[String], viewport: Viewport) -> Self {
        let mut cascade = Self::new();
        if loads_tailwind(document) {
            cascade = cascade.with_utilities(viewport);
        }
        if let Ok(style_sel) = Selector::parse("style") {
            for style in document.select(&style_sel) {
                let kind = style.value().attr("type").map(|t| t.trim().to_ascii_lowercase());
                let accepted = match kind.as_deref() {
                    None | Some("") | Some("text/css") => true,
                    Some("text/tailwindcss") => cascade.utilities.is_some(),
                    Some(_) => false,
                };
                if accepted {
                    cascade.add_stylesheet(&style.text().collect::<String>());
                }
            }
        }
        for css in injected {
            cascade.add_stylesheet(css);
        }
        cascade
    }

    /// Declarations applying to `element`, lowest priority first.
    fn matched(&self, element: &ElementRef<'_>, inline: &[Declaration]) -> Vec<Declaration> {
        let mut hits: Vec<(CascadeKey, Declaration)> = Vec::new();
        for rule in &self.rules {
            if !rule.selector.matches(element) {
                continue;
            }
            for (i, decl) in self.blocks[rule.block].iter().enumerate() {
                hits.push((
                    (decl.important, rule.origin, rule.specificity, rule.order, i),
                    decl.clone(),
                ));
            }
        }
        if let Some(viewport) = self.utilities {
            // the runtime's generated sheet comes after every author rule
            let order = self.rules.len();
            let mut i = 0;
            let classes = element.value().attr("class").unwrap_or_default();
            for class in classes.split_whitespace() {
                for decl in utility_declarations(class, viewport).unwrap_or_default() {
                    hits.push(((decl.important, Origin::Author, CLASS_SPECIFICITY, order, i), decl));
                    i += 1;
                }
            }
        }
        for (i, decl) in inline.iter().enumerate() {
            hits.push(((decl.important, Origin::Inline, 0, 0, i), decl.clone()));
        }
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits.into_iter().map(|(_, d)| d).collect()
    }
}

/// An RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Serialized the way `getComputedStyle` reports colors.
    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, format_number(self.a))
        }
    }
}

fn format_number(v: f32) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// `12px`, `12.5px`
pub fn format_px(v: f32) -> String {
    format!("{}px", format_number(v))
}

/// Parse a CSS color. `current` resolves `currentcolor`.
pub fn parse_color(value: &str, current: Option<Rgba>) -> Option<Rgba> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("currentcolor") {
        return Some(current.unwrap_or(Rgba::opaque(0, 0, 0)));
    }
    // csscolorparser also reads bare hex digits, CSS does not
    if v.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let color = csscolorparser::parse(v).ok()?;
    let channel = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Some(Rgba {
        r: channel(color.r),
        g: channel(color.g),
        b: channel(color.b),
        a: (color.a as f32).clamp(0.0, 1.0),
    })
}

/// What relative lengths resolve against
#[derive(Debug, Clone, Copy)]
pub struct LengthContext {
    pub font_size: f32,
    pub viewport: Viewport,
    /// Basis for percentages; `None` leaves them unresolved
    pub percent_base: Option<f32>,
}

fn split_number(s: &str) -> Option<(f32, &str)> {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map_or(s.len(), |(i, _)| i);
    let n = s[..end].parse::<f32>().ok()?;
    Some((n, &s[end..]))
}

/// Resolve a length to CSS pixels. `auto`, `calc()` and friends give `None`.
pub fn parse_length(value: &str, ctx: &LengthContext) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" {
        return Some(0.0);
    }
    let (n, unit) = split_number(&v)?;
    let px = match unit {
        "px" => n,
        "em" => n * ctx.font_size,
        "rem" => n * DEFAULT_FONT_SIZE,
        "%" => n / 100.0 * ctx.percent_base?,
        "vw" => n / 100.0 * ctx.viewport.width as f32,
        "vh" => n / 100.0 * ctx.viewport.height as f32,
        "vmin" => n / 100.0 * ctx.viewport.width.min(ctx.viewport.height) as f32,
        "vmax" => n / 100.0 * ctx.viewport.width.max(ctx.viewport.height) as f32,
        "pt" => n * 4.0 / 3.0,
        "pc" => n * 16.0,
        "in" => n * 96.0,
        "cm" => n * 96.0 / 2.54,
        "mm" => n * 96.0 / 25.4,
        "ch" | "ex" => n * ctx.font_size * 0.5,
        "" => n,
        _ => return None,
    };
    Some(px)
}

/// Expand 1–4 values to top, right, bottom, left.
fn box_values(value: &str) -> Option<[String; 4]> {
    let t = component_values(value);
    let [a, b, c, d] = match t.len() {
        1 => [0, 0, 0, 0],
        2 => [0, 1, 0, 1],
        3 => [0, 1, 2, 1],
        4 => [0, 1, 2, 3],
        _ => return None,
    };
    Some([t[a].clone(), t[b].clone(), t[c].clone(), t[d].clone()])
}

fn is_time(token: &str) -> bool {
    let t = token.to_ascii_lowercase();
    (t.ends_with("ms") || t.ends_with('s')) && split_number(&t).is_some_and(|(_, u)| u == "s" || u == "ms")
}

fn is_image_function(token: &str) -> bool {
    let t = token.to_ascii_lowercase();
    t.starts_with("url(") || t.contains("gradient(") || t.starts_with("image-set(")
}

fn is_border_width(token: &str) -> bool {
    matches!(token, "thin" | "medium" | "thick")
        || split_number(token).is_some_and(|(_, u)| u.chars().all(|c| c.is_ascii_alphabetic()))
}

fn expand_background(value: &str) -> Vec<(String, String)> {
    let layers = comma_layers(value);
    let mut images = Vec::new();
    let mut color = "transparent".to_string();
    for (i, layer) in layers.iter().enumerate() {
        for token in component_values(layer) {
            if is_image_function(&token) {
                images.push(token);
            } else if i + 1 == layers.len() && parse_color(&token, None).is_some() {
                color = token;
            } else if token.eq_ignore_ascii_case("currentcolor") {
                color = token;
            }
        }
    }
    let image = if images.is_empty() {
        "none".to_string()
    } else {
        images.join(", ")
    };
    vec![
        ("background-image".into(), image),
        ("background-color".into(), color),
    ]
}

fn expand_border_side(sides: &[&str], value: &str) -> Vec<(String, String)> {
    let mut width = "medium".to_string();
    let mut style = "none".to_string();
    let mut color = "currentcolor".to_string();
    for token in component_values(value) {
        let lower = token.to_ascii_lowercase();
        if BORDER_STYLES.contains(&lower.as_str()) {
            style = lower;
        } else if is_border_width(&lower) {
            width = lower;
        } else {
            color = token;
        }
    }
    let mut out = Vec::new();
    for side in sides {
        out.push((format!("border-{side}-width"), width.clone()));
        out.push((format!("border-{side}-style"), style.clone()));
        out.push((format!("border-{side}-color"), color.clone()));
    }
    out
}

fn expand_box(prefix: &str, suffix: &str, value: &str) -> Vec<(String, String)> {
    match box_values(value) {
        Some(values) => SIDES
            .iter()
            .zip(values)
            .map(|(side, v)| (format!("{prefix}{side}{suffix}"), v))
            .collect(),
        None => Vec::new(),
    }
}

fn expand_transition(value: &str) -> Vec<(String, String)> {
    let durations: Vec<String> = comma_layers(value)
        .iter()
        .map(|layer| {
            component_values(layer)
                .into_iter()
                .find(|t| is_time(t))
                .unwrap_or_else(|| "0s".to_string())
        })
        .collect();
    vec![("transition-duration".into(), durations.join(", "))]
}

fn expand_animation(value: &str) -> Vec<(String, String)> {
    let names: Vec<String> = comma_layers(value)
        .iter()
        .map(|layer| {
            component_values(layer)
                .into_iter()
                .find(|t| {
                    let lower = t.to_ascii_lowercase();
                    !is_time(&lower)
                        && lower.parse::<f32>().is_err()
                        && !ANIMATION_KEYWORDS.contains(&lower.as_str())
                        && !lower.contains('(')
                })
                .unwrap_or_else(|| "none".to_string())
        })
        .collect();
    vec![("animation-name".into(), names.join(", "))]
}

/// Longhands for a declaration. Unknown properties pass through unchanged.
pub fn expand_shorthand(name: &str, value: &str) -> Vec<(String, String)> {
    match name {
        "background" => expand_background(value),
        "border" => expand_border_side(&SIDES, value),
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            expand_border_side(&[&name["border-".len()..]], value)
        }
        "border-width" => expand_box("border-", "-width", value),
        "border-style" => expand_box("border-", "-style", value),
        "border-color" => expand_box("border-", "-color", value),
        "border-radius" => {
            let first = value.split('/').next().unwrap_or(value);
            match box_values(first) {
                Some(values) => CORNERS
                    .iter()
                    .zip(values)
                    .map(|(corner, v)| (format!("border-{corner}-radius"), v))
                    .collect(),
                None => Vec::new(),
            }
        }
        "margin" => expand_box("margin-", "", value),
        "padding" => expand_box("padding-", "", value),
        "inset" => expand_box("", "", value),
        "transition" => expand_transition(value),
        "animation" => expand_animation(value),
        "-webkit-backdrop-filter" => vec![("backdrop-filter".into(), value.to_string())],
        "-webkit-transform" => vec![("transform".into(), value.to_string())],
        "gap" | "grid-gap" => {
            let t = component_values(value);
            let row = t.first().cloned().unwrap_or_default();
            let column = t.get(1).cloned().unwrap_or_else(|| row.clone());
            vec![("row-gap".into(), row), ("column-gap".into(), column)]
        }
        "flex-flow" => component_values(value)
            .into_iter()
            .filter(|t| t.starts_with("row") || t.starts_with("column"))
            .map(|t| ("flex-direction".to_string(), t))
            .collect(),
        _ => vec![(name.to_string(), value.to_string())],
    }
}

/// Substitute `var()` references. `None` when a reference cannot be resolved.
pub fn resolve_vars(value: &str, custom: &HashMap<String, String>) -> Option<String> {
    resolve_vars_depth(value, custom, 0)
}

fn resolve_vars_depth(value: &str, custom: &HashMap<String, String>, depth: usize) -> Option<String> {
    if depth > MAX_VAR_DEPTH {
        return None;
    }
    if !value.to_ascii_lowercase().contains("var(") {
        return Some(value.to_string());
    }
    substitute_vars(value, |name, fallback| match custom.get(name) {
        Some(v) => resolve_vars_depth(v, custom, depth + 1),
        None => fallback.and_then(|f| resolve_vars_depth(f, custom, depth + 1)),
    })
}

fn font_size_keyword(value: &str, parent: f32) -> Option<f32> {
    Some(match value {
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "medium" => 16.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        "smaller" => parent / 1.2,
        "larger" => parent * 1.2,
        _ => return None,
    })
}

/// Computed values of one element
#[derive(Debug, Clone)]
pub struct ComputedValues {
    props: HashMap<String, String>,
    custom: HashMap<String, String>,
    pub font_size: f32,
}

impl Default for ComputedValues {
    fn default() -> Self {
        Self {
            props: HashMap::new(),
            custom: HashMap::new(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl ComputedValues {
    fn inherit(parent: Option<&ComputedValues>) -> Self {
        match parent {
            None => Self::default(),
            Some(p) => Self {
                props: INHERITED
                    .iter()
                    .filter_map(|&k| p.props.get(k).map(|v| (k.to_string(), v.clone())))
                    .collect(),
                custom: p.custom.clone(),
                font_size: p.font_size,
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    pub fn display(&self) -> &str {
        self.get("display").unwrap_or("inline")
    }

    /// A length property in pixels; `None` for `auto` or unresolvable values.
    pub fn length(&self, name: &str, percent_base: Option<f32>, viewport: Viewport) -> Option<f32> {
        let ctx = LengthContext {
            font_size: self.font_size,
            viewport,
            percent_base,
        };
        self.get(name).and_then(|v| parse_length(v, &ctx))
    }

    /// Used border width of one side (zero when the style is `none`).
    pub fn border_width(&self, side: &str, viewport: Viewport) -> f32 {
        let style = self
            .get(&format!("border-{side}-style"))
            .unwrap_or("none")
            .to_ascii_lowercase();
        if style == "none" || style == "hidden" {
            return 0.0;
        }
        match self.get(&format!("border-{side}-width")).unwrap_or("medium") {
            "thin" => 1.0,
            "medium" => 3.0,
            "thick" => 5.0,
            other => parse_length(other, &self.length_context(viewport))
                .unwrap_or(0.0)
                .max(0.0),
        }
    }

    fn length_context(&self, viewport: Viewport) -> LengthContext {
        LengthContext {
            font_size: self.font_size,
            viewport,
            percent_base: None,
        }
    }

    /// Line height in pixels.
    pub fn line_height(&self, viewport: Viewport) -> f32 {
        match self.get("line-height") {
            None | Some("normal") => self.font_size * 1.2,
            Some(v) => match v.parse::<f32>() {
                Ok(factor) => factor * self.font_size,
                Err(_) => parse_length(
                    v,
                    &LengthContext {
                        font_size: self.font_size,
                        viewport,
                        percent_base: Some(self.font_size),
                    },
                )
                .unwrap_or(self.font_size * 1.2),
            },
        }
    }

    fn color(&self) -> Rgba {
        self.get("color")
            .and_then(|c| parse_color(c, None))
            .unwrap_or(Rgba::opaque(0, 0, 0))
    }

    fn radius(&self, corner: &str, viewport: Viewport) -> String {
        let Some(v) = self.get(&format!("border-{corner}-radius")) else {
            return "0px".to_string();
        };
        if v.trim_end().ends_with('%') {
            return v.trim().to_string();
        }
        parse_length(v, &self.length_context(viewport))
            .map(format_px)
            .unwrap_or_else(|| "0px".to_string())
    }

    fn keyword_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default).to_string()
    }

    /// What `getComputedStyle` would report for the properties the gate reads.
    pub fn computed_style(&self, viewport: Viewport) -> ComputedStyle {
        let opacity = match self.get("opacity") {
            None => "1".to_string(),
            Some(v) => match v.strip_suffix('%') {
                Some(p) => p
                    .trim()
                    .parse::<f32>()
                    .map(|n| format_number((n / 100.0).clamp(0.0, 1.0)))
                    .unwrap_or_else(|_| v.to_string()),
                None => v
                    .parse::<f32>()
                    .map(|n| format_number(n.clamp(0.0, 1.0)))
                    .unwrap_or_else(|_| v.to_string()),
            },
        };
        let background_color = self
            .get("background-color")
            .and_then(|c| parse_color(c, Some(self.color())))
            .unwrap_or(Rgba::TRANSPARENT)
            .to_css();
        let border = |side: &str| format_px(self.border_width(side, viewport));

        ComputedStyle {
            display: self.display().to_string(),
            visibility: self.keyword_or("visibility", "visible"),
            opacity,
            border_top_left_radius: self.radius("top-left", viewport),
            border_top_right_radius: self.radius("top-right", viewport),
            border_bottom_left_radius: self.radius("bottom-left", viewport),
            border_bottom_right_radius: self.radius("bottom-right", viewport),
            box_shadow: self.keyword_or("box-shadow", "none"),
            background_image: self.keyword_or("background-image", "none"),
            background_color,
            border_top_width: border("top"),
            border_right_width: border("right"),
            border_bottom_width: border("bottom"),
            border_left_width: border("left"),
            transform: self.keyword_or("transform", "none"),
            filter: self.keyword_or("filter", "none"),
            backdrop_filter: self.keyword_or("backdrop-filter", "none"),
            transition_duration: self.keyword_or("transition-duration", "0s"),
            animation_name: self.keyword_or("animation-name", "none"),
        }
    }
}

/// Compute values for `element` given its parent's values.
pub fn compute_values(
    cascade: &Cascade,
    element: &ElementRef<'_>,
    parent: Option<&ComputedValues>,
    viewport: Viewport,
) -> ComputedValues {
    let inline = element
        .value()
        .attr("style")
        .map(parse_declarations)
        .unwrap_or_default();
    let matched = cascade.matched(element, &inline);
    let mut values = ComputedValues::inherit(parent);
    let parent_font = values.font_size;

    for decl in matched.iter().filter(|d| d.name.starts_with("--")) {
        values.custom.insert(decl.name.clone(), decl.value.clone());
    }

    for decl in matched.iter().filter(|d| !d.name.starts_with("--")) {
        let Some(value) = resolve_vars(&decl.value, &values.custom) else {
            trace!("unresolved var() in {}: {}", decl.name, decl.value);
            continue;
        };
        let keyword = value.trim().to_ascii_lowercase();
        if decl.name == "font-size" || decl.name == "font" {
            let candidate = if decl.name == "font" {
                component_values(&value)
                    .into_iter()
                    .map(|t| t.split('/').next().unwrap_or("").to_string())
                    .find(|t| split_number(t).is_some_and(|(_, u)| !u.is_empty()))
            } else {
                Some(value.clone())
            };
            if let Some(size) = candidate {
                let ctx = LengthContext {
                    font_size: parent_font,
                    viewport,
                    percent_base: Some(parent_font),
                };
                let lower = size.trim().to_ascii_lowercase();
                if let Some(px) = font_size_keyword(&lower, parent_font).or_else(|| parse_length(&lower, &ctx)) {
                    values.font_size = px;
                }
            }
            if decl.name == "font-size" {
                continue;
            }
        }
        match keyword.as_str() {
            "inherit" => {
                let inherited = parent.and_then(|p| p.props.get(&decl.name)).cloned();
                match inherited {
                    Some(v) => {
                        values.props.insert(decl.name.clone(), v);
                    }
                    None => {
                        values.props.remove(&decl.name);
                    }
                }
            }
            "initial" | "unset" | "revert" => {
                for (name, _) in expand_shorthand(&decl.name, "initial") {
                    values.props.remove(&name);
                }
                values.props.remove(&decl.name);
            }
            _ => {
                for (name, v) in expand_shorthand(&decl.name, value.trim()) {
                    values.props.insert(name, v);
                }
            }
        }
    }

    // relative line heights resolve against the declaring element
    if let Some(lh) = values.get("line-height").map(str::to_string) {
        if lh.parse::<f32>().is_err() && lh != "normal" {
            let px = values.line_height(viewport);
            values.props.insert("line-height".into(), format_px(px));
        }
    }
    values
}

/// An element with its computed values, in the styled tree
#[derive(Debug)]
pub struct StyledElement<'a> {
    pub element: ElementRef<'a>,
    /// Pre-order position among all elements of the document
    pub index: usize,
    pub values: ComputedValues,
    pub children: Vec<StyledChild<'a>>,
}

#[derive(Debug)]
pub enum StyledChild<'a> {
    Element(StyledElement<'a>),
    /// Whitespace-collapsed text run
    Text(String),
}

impl<'a> StyledElement<'a> {
    /// Lower-cased tag name.
    pub fn tag(&self) -> String {
        self.element.value().name().to_ascii_lowercase()
    }

    /// Visit this element and every descendant element in pre-order.
    pub fn walk<'s>(&'s self, f: &mut impl FnMut(&'s StyledElement<'a>)) {
        f(self);
        for child in &self.children {
            if let StyledChild::Element(el) = child {
                el.walk(f);
            }
        }
    }
}

fn build<'a>(
    cascade: &Cascade,
    element: ElementRef<'a>,
    parent: Option<&ComputedValues>,
    viewport: Viewport,
    next_index: &mut usize,
) -> StyledElement<'a> {
    let index = *next_index;
    *next_index += 1;
    let values = compute_values(cascade, &element, parent, viewport);
    let mut children = Vec::new();
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            children.push(StyledChild::Element(build(
                cascade,
                child_el,
                Some(&values),
                viewport,
                next_index,
            )));
        } else if let Node::Text(text) = child.value() {
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !collapsed.is_empty() {
                children.push(StyledChild::Text(collapsed));
            }
        }
    }
    StyledElement {
        element,
        index,
        values,
        children,
    }
}

/// Style every element of `document`, rooted at the `<html>` element.
pub fn style_tree<'a>(document: &'a Html, cascade: &Cascade, viewport: Viewport) -> StyledElement<'a> {
    let mut next_index = 0;
    build(cascade, document.root_element(), None, viewport, &mut next_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(html: &str, selector: &str) -> ComputedStyle {
        let doc = Html::parse_document(html);
        let cascade = Cascade::for_document(&doc, &[], Viewport::default());
        let tree = style_tree(&doc, &cascade, Viewport::default());
        let sel = Selector::parse(selector).unwrap();
        let mut found = None;
        tree.walk(&mut |el| {
            if found.is_none() && sel.matches(&el.element) {
                found = Some(el.values.computed_style(Viewport::default()));
            }
        });
        found.expect("element present")
    }

    #[test]
    fn more_specific_selectors_win_regardless_of_order() {
        let cs = styled(
            r#"<style>#go{opacity:.1} .wrap .b:not(.x)[type]{opacity:.2} button.b{opacity:.3} .b{opacity:.4}</style>
               <div class="wrap"><button id="go" class="b" type="button">x</button></div>"#,
            "button",
        );
        assert_eq!(cs.opacity, "0.1");
        let cs = styled(
            r#"<style>.wrap .b:not(.x)[type]{opacity:.2} li.b:nth-child(1), button.b{opacity:.3}</style>
               <div class="wrap"><button class="b" type="button">x</button></div>"#,
            "button",
        );
        assert_eq!(cs.opacity, "0.2");
    }

    #[test]
    fn pseudo_elements_and_states_do_not_style_the_element() {
        let cs = styled(
            r#"<style>.b::before{opacity:.1} .b:before{opacity:.2} .b:hover{opacity:.3}</style><button class="b">x</button>"#,
            "button",
        );
        assert_eq!(cs.opacity, "1");
    }

    #[test]
    fn colors_normalize_like_browsers() {
        assert_eq!(parse_color("#fff", None).unwrap().to_css(), "rgb(255, 255, 255)");
        assert_eq!(parse_color("#00000080", None).unwrap().to_css(), "rgba(0, 0, 0, 0.502)");
        assert_eq!(parse_color("rgba(10, 20, 30, .5)", None).unwrap().to_css(), "rgba(10, 20, 30, 0.5)");
        assert_eq!(parse_color("hsl(0, 100%, 50%)", None).unwrap().to_css(), "rgb(255, 0, 0)");
        assert_eq!(parse_color("transparent", None).unwrap().to_css(), "rgba(0, 0, 0, 0)");
        assert_eq!(parse_color("RED", None).unwrap().to_css(), "rgb(255, 0, 0)");
        assert!(parse_color("notacolor", None).is_none());
        assert!(parse_color("fff", None).is_none());
    }

    #[test]
    fn every_named_color_is_known() {
        for (name, css) in [
            ("lightblue", "rgb(173, 216, 230)"),
            ("darkorange", "rgb(255, 140, 0)"),
            ("slateblue", "rgb(106, 90, 205)"),
            ("chocolate", "rgb(210, 105, 30)"),
            ("tan", "rgb(210, 180, 140)"),
            ("lavender", "rgb(230, 230, 250)"),
            ("rebeccapurple", "rgb(102, 51, 153)"),
        ] {
            assert_eq!(parse_color(name, None).map(|c| c.to_css()).as_deref(), Some(css), "{name}");
        }
    }

    #[test]
    fn cascade_order_and_important() {
        let cs = styled(
            r#"<style>.b{background-color:red !important} button.b{background-color:blue} .b{opacity:.5}</style>
               <button class="b" style="background-color:green;opacity:0.8">x</button>"#,
            "button",
        );
        assert_eq!(cs.background_color, "rgb(255, 0, 0)");
        assert_eq!(cs.opacity, "0.8");
    }

    #[test]
    fn shorthands_expand() {
        let cs = styled(
            r#"<style>.b{border:2px solid #000;border-radius:8px 4px;background:linear-gradient(red,blue);transition:all .3s ease;animation:spin 1s linear infinite}</style>
               <div class="b">x</div>"#,
            ".b",
        );
        assert_eq!(cs.border_top_width, "2px");
        assert_eq!(cs.border_left_width, "2px");
        assert_eq!(cs.border_top_left_radius, "8px");
        assert_eq!(cs.border_top_right_radius, "4px");
        assert_eq!(cs.background_image, "linear-gradient(red,blue)");
        assert_eq!(cs.background_color, "rgba(0, 0, 0, 0)");
        assert_eq!(cs.transition_duration, ".3s");
        assert_eq!(cs.animation_name, "spin");
    }

    #[test]
    fn border_without_style_has_no_width() {
        let cs = styled(r#"<div style="border-width:4px">x</div>"#, "div");
        assert_eq!(cs.border_top_width, "0px");
    }

    #[test]
    fn custom_properties_and_inheritance() {
        let cs = styled(
            r#"<style>:root{--face:#e64539} .wrap{visibility:hidden} .b{background:var(--face);border-radius:var(--r, 1em)}</style>
               <div class="wrap"><span class="b">x</span></div>"#,
            ".b",
        );
        assert_eq!(cs.background_color, "rgb(230, 69, 57)");
        assert_eq!(cs.border_top_left_radius, "16px");
        assert_eq!(cs.visibility, "hidden");
    }

    #[test]
    fn unstyled_button_scores_nothing() {
        let cs = styled("<button>Go</button>", "button");
        assert_eq!(cs.display, "inline-block");
        assert_eq!(cs.background_color, "rgba(0, 0, 0, 0)");
        assert_eq!(cs.border_top_width, "0px");
    }

    #[test]
    fn tailwind_blocks_need_the_runtime() {
        let without = styled(
            r#"<style type="text/tailwindcss">button{background:red}</style><button class="bg-blue-500">Go</button>"#,
            "button",
        );
        assert_eq!(without.background_color, "rgba(0, 0, 0, 0)");

        let with = styled(
            r#"<script src="https://cdn.tailwindcss.com"></script>
               <style type="text/tailwindcss">.btn{border-radius:3px; @apply shadow-md;}</style>
               <button class="btn bg-blue-500 rounded-lg hover:bg-red-500">Go</button>"#,
            "button",
        );
        assert_eq!(with.background_color, "rgb(59, 130, 246)");
        assert_eq!(with.border_top_left_radius, "8px");
        assert!(with.box_shadow.starts_with("0 4px 6px -1px"));
    }

    #[test]
    fn utilities_lose_to_more_specific_author_rules() {
        let cs = styled(
            r#"<script src="https://cdn.tailwindcss.com"></script>
               <style>button.b{background-color:#000} .b{opacity:.5}</style>
               <button class="b bg-white opacity-75 md:opacity-90">Go</button>"#,
            "button",
        );
        assert_eq!(cs.background_color, "rgb(0, 0, 0)");
        assert_eq!(cs.opacity, "0.9");
    }
}
